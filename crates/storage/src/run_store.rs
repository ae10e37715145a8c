// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CRUD over run records, with read-modify-write mutations serialized
//! under the run's per-file write lock.

use crate::atomic::{atomic_write_json, read_json, sanitize_id};
use crate::lock::LockTable;
use crate::paths::StoreRoot;
use mission_core::{
    Mission, MissionError, NodeState, Run, RunId, RunMessage, RunStatus, RunSummary,
};
use std::path::PathBuf;

pub struct RunStore {
    root: StoreRoot,
    locks: LockTable,
}

impl RunStore {
    pub fn new(root: StoreRoot) -> Self {
        Self { root, locks: LockTable::new() }
    }

    fn run_path(&self, id: &str) -> Result<PathBuf, MissionError> {
        Ok(self.root.mission_runs_dir().join(format!("{}.json", sanitize_id(id)?)))
    }

    pub fn list(&self, mission_id: Option<&str>) -> Vec<Run> {
        let Ok(entries) = std::fs::read_dir(self.root.mission_runs_dir()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(run) = read_json::<Run>(&path) {
                let matches = match mission_id {
                    Some(mid) => run.mission_id.as_str() == mid,
                    None => true,
                };
                if matches {
                    out.push(run);
                }
            }
        }
        out
    }

    pub fn get(&self, id: &str) -> Option<Run> {
        let path = self.run_path(id).ok()?;
        read_json(&path)
    }

    /// Initializes `node_states` with every mission node in `Pending`.
    /// `context` is the mission's context merged with any run-start
    /// overrides, snapshotted once so later template resolution does not
    /// depend on the mission definition being unchanged mid-run.
    pub fn create_run(&self, mission: &Mission, workdir: Option<String>, started_at: String, context: std::collections::HashMap<String, String>) -> Result<Run, MissionError> {
        let mut node_states = std::collections::HashMap::new();
        for node in &mission.nodes {
            node_states.insert(node.id.clone(), NodeState::pending());
        }
        let run = Run {
            id: RunId::new(),
            mission_id: mission.id.clone(),
            status: RunStatus::Running,
            started_at,
            completed_at: None,
            error: None,
            workdir,
            node_states,
            messages: Vec::new(),
            summary: None,
            context,
        };
        self.save(&run)?;
        Ok(run)
    }

    fn save(&self, run: &Run) -> Result<(), MissionError> {
        let path = self.run_path(run.id.as_str())?;
        let key = run.id.as_str().to_string();
        self.locks.with_lock(&key, || atomic_write_json(&path, run))
    }

    /// Merge `patch` into the existing node state under the run's lock.
    pub fn update_node_state(
        &self,
        run_id: &str,
        node_id: &str,
        patch: impl FnOnce(&mut NodeState),
    ) -> Result<Run, MissionError> {
        let path = self.run_path(run_id)?;
        self.locks.with_lock(run_id, || {
            let mut run: Run = read_json(&path).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
            let state = run
                .node_states
                .get_mut(node_id)
                .ok_or_else(|| MissionError::NodeNotFound(node_id.to_string()))?;
            patch(state);
            atomic_write_json(&path, &run)?;
            Ok(run)
        })
    }

    pub fn update_run_status(&self, run_id: &str, status: RunStatus, error: Option<String>, completed_at: Option<String>) -> Result<Run, MissionError> {
        let path = self.run_path(run_id)?;
        self.locks.with_lock(run_id, || {
            let mut run: Run = read_json(&path).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
            run.status = status;
            run.error = error;
            if completed_at.is_some() {
                run.completed_at = completed_at;
            }
            atomic_write_json(&path, &run)?;
            Ok(run)
        })
    }

    pub fn add_run_message(&self, run_id: &str, msg: RunMessage) -> Result<Run, MissionError> {
        let path = self.run_path(run_id)?;
        self.locks.with_lock(run_id, || {
            let mut run: Run = read_json(&path).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
            run.messages.push(msg);
            atomic_write_json(&path, &run)?;
            Ok(run)
        })
    }

    pub fn update_run_summary(&self, run_id: &str, summary: RunSummary) -> Result<Run, MissionError> {
        let path = self.run_path(run_id)?;
        self.locks.with_lock(run_id, || {
            let mut run: Run = read_json(&path).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
            run.summary = Some(summary);
            atomic_write_json(&path, &run)?;
            Ok(run)
        })
    }
}
