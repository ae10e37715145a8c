// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local registry of running agent child processes, keyed by
//! `"<runId>/<nodeId>"`. Tracks pid and liveness; never touches the
//! filesystem.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct Entry {
    pid: Option<u32>,
    alive: bool,
}

#[derive(Clone, Default)]
pub struct ProcessTable {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent_id: &str, pid: Option<u32>) {
        self.inner.lock().insert(agent_id.to_string(), Entry { pid, alive: true });
    }

    pub fn pid_of(&self, agent_id: &str) -> Option<u32> {
        self.inner.lock().get(agent_id).and_then(|e| e.pid)
    }

    pub fn is_alive(&self, agent_id: &str) -> bool {
        self.inner.lock().get(agent_id).map(|e| e.alive).unwrap_or(false)
    }

    pub fn mark_dead(&self, agent_id: &str) {
        if let Some(entry) = self.inner.lock().get_mut(agent_id) {
            entry.alive = false;
        }
    }

    pub fn forget(&self, agent_id: &str) {
        self.inner.lock().remove(agent_id);
    }

    /// Remove every entry belonging to `run_id` (keys of shape
    /// `"<runId>/<nodeId>"`).
    pub fn forget_run(&self, run_id: &str) {
        let prefix = format!("{run_id}/");
        self.inner.lock().retain(|k, _| !k.starts_with(&prefix));
    }

    /// Pids of every entry still marked alive, for a shutdown sweep.
    pub fn alive_pids(&self) -> Vec<u32> {
        self.inner.lock().values().filter(|e| e.alive).filter_map(|e| e.pid).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_forget() {
        let table = ProcessTable::new();
        table.register("run-1/a", Some(123));
        assert!(table.is_alive("run-1/a"));
        assert_eq!(table.pid_of("run-1/a"), Some(123));
        table.mark_dead("run-1/a");
        assert!(!table.is_alive("run-1/a"));
        table.forget("run-1/a");
        assert!(table.pid_of("run-1/a").is_none());
    }

    #[test]
    fn forget_run_clears_only_matching_prefix() {
        let table = ProcessTable::new();
        table.register("run-1/a", Some(1));
        table.register("run-2/a", Some(2));
        table.forget_run("run-1");
        assert!(table.pid_of("run-1/a").is_none());
        assert_eq!(table.pid_of("run-2/a"), Some(2));
    }
}
