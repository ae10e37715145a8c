// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario tests: a task-file-driven fake
//! provider plus small mission-building helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mission_core::{Edge, Mission, MissionId, Node, NodeConfig, TaskFile, TaskFileStatus, TeamConfig};
use mission_provider::{write_task_file, AgentProvider, ProviderError};
use mission_store::StoreRoot;

/// How a node resolves once `execute_node` spawns it.
#[derive(Clone)]
pub enum Behavior {
    /// Writes a completed task file on the first call.
    Succeed(&'static str),
    /// Fails `fail_times` calls, then completes.
    FailThenSucceed { fail_times: u32, output: &'static str },
    /// Writes a failed task file on every call.
    AlwaysFail,
    /// Never writes a task file, leaving the node running.
    Hang,
}

/// Resolves nodes by writing real task files, the same protocol a
/// subprocess-backed provider uses, so tests exercise the engine's
/// actual poll-and-transition logic rather than a shortcut.
pub struct FakeProvider {
    root: StoreRoot,
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeProvider {
    pub fn new(root: StoreRoot, behaviors: HashMap<String, Behavior>) -> Self {
        Self { root, behaviors, calls: Mutex::new(HashMap::new()) }
    }

    pub fn single(root: StoreRoot, node_id: &str, behavior: Behavior) -> Self {
        Self::new(root, HashMap::from([(node_id.to_string(), behavior)]))
    }
}

#[async_trait]
impl AgentProvider for FakeProvider {
    async fn initialize_team(&self, _run_id: &str, _mission: &Mission) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn execute_node(&self, node: &Node, _resolved_prompt: &str, run_id: &str, _workdir: Option<&Path>) -> Result<String, ProviderError> {
        let team_name = TeamConfig::run_team_name(run_id);
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            let n = calls.entry(node.id.clone()).or_insert(0);
            *n += 1;
            *n
        };

        match self.behaviors.get(&node.id) {
            Some(Behavior::Succeed(output)) => write_completed(&self.root, &team_name, &node.id, output),
            Some(Behavior::FailThenSucceed { fail_times, output }) => {
                if call <= *fail_times {
                    write_failed(&self.root, &team_name, &node.id, "not ready yet");
                } else {
                    write_completed(&self.root, &team_name, &node.id, output);
                }
            }
            Some(Behavior::AlwaysFail) => write_failed(&self.root, &team_name, &node.id, "simulated failure"),
            Some(Behavior::Hang) | None => {}
        }

        Ok(format!("agent-{}", node.id))
    }

    async fn abort_node(&self, _run_id: &str, _node_id: &str) {}

    fn cleanup_run(&self, _run_id: &str) {}

    fn is_process_alive(&self, _agent_id: &str) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supported_agent_types(&self) -> Vec<&'static str> {
        vec!["fake"]
    }

    fn provider_info(&self) -> &'static str {
        "fake"
    }
}

fn write_completed(root: &StoreRoot, team_name: &str, node_id: &str, output: &str) {
    let mut task = TaskFile::new_pending(node_id, node_id);
    task.status = TaskFileStatus::Completed;
    task.output = Some(output.to_string());
    let _ = write_task_file(root, team_name, &task);
}

fn write_failed(root: &StoreRoot, team_name: &str, node_id: &str, error: &str) {
    let mut task = TaskFile::new_pending(node_id, node_id);
    task.status = TaskFileStatus::Failed;
    task.error = Some(error.to_string());
    let _ = write_task_file(root, team_name, &task);
}

pub fn node(id: &str, config: NodeConfig) -> Node {
    Node {
        id: id.to_string(),
        label: id.to_string(),
        agent_type: "general".to_string(),
        prompt: format!("run step {id}"),
        config,
        provider: "claude-code".to_string(),
        model: None,
        mcp_servers: vec![],
        skills: vec![],
        legacy_droid_class: None,
        unit_class: None,
    }
}

pub fn edge(from: &str, to: &str) -> Edge {
    Edge { from: from.to_string(), to: to.to_string() }
}

pub fn mission(name: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> Mission {
    Mission {
        id: MissionId::new(),
        name: name.to_string(),
        description: String::new(),
        nodes,
        edges,
        context: HashMap::new(),
        updated_at: String::new(),
    }
}

/// Polls `check` every 50ms until it returns true or `timeout` elapses.
/// Returns whether it converged, so callers get a clear assertion
/// failure instead of a silent timeout.
pub async fn wait_until<F: Fn() -> bool>(check: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
