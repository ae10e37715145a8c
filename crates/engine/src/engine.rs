// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mission engine: DAG scheduler and node/run state machines.
//!
//! Owns exactly one poller task per active run (2 s tick, reentrancy
//! guarded), the id -> `JoinHandle` map, and dispatch into the
//! provider registry.

use crate::bus::EventBus;
use crate::dag;
use crate::summary;
use crate::template;
use mission_core::{
    EngineEvent, Mission, MissionError, Node, NodeState, NodeStatus, Run, RunMessage, RunStatus,
};
use mission_provider::{read_task_file, AgentProvider, ProviderRegistry};
use mission_store::{MissionStore, RunStore, StoreRoot};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const ORPHAN_GRACE_SECONDS: i64 = 30;

/// Structured per-status breakdown for `GetProgress`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeProgress {
    pub status: NodeStatus,
    pub retry_count: u32,
    pub has_output: bool,
    pub file_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunProgress {
    pub run_id: String,
    pub status: RunStatus,
    pub percent: f64,
    pub nodes: HashMap<String, NodeProgress>,
}

pub struct Engine {
    store_root: StoreRoot,
    missions: MissionStore,
    runs: RunStore,
    providers: ProviderRegistry,
    bus: EventBus,
    pollers: Mutex<HashMap<String, JoinHandle<()>>>,
    ticking: Mutex<HashSet<String>>,
    pre_snapshots: Mutex<HashMap<(String, String), HashSet<String>>>,
}

fn now_iso() -> String {
    mission_core::format_utc_now()
}

impl Engine {
    pub fn new(store_root: StoreRoot, providers: ProviderRegistry, bus: EventBus) -> Arc<Self> {
        Arc::new(Self {
            missions: MissionStore::new(store_root.clone()),
            runs: RunStore::new(store_root.clone()),
            store_root,
            providers,
            bus,
            pollers: Mutex::new(HashMap::new()),
            ticking: Mutex::new(HashSet::new()),
            pre_snapshots: Mutex::new(HashMap::new()),
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn team_name(run_id: &str) -> String {
        format!("run-{run_id}")
    }

    fn provider_for(&self, node: &Node) -> Result<Arc<dyn AgentProvider>, MissionError> {
        self.providers
            .get(&node.provider)
            .ok_or_else(|| MissionError::InvalidInput(format!("unknown provider: {}", node.provider)))
    }

    pub async fn start_mission(
        self: &Arc<Self>,
        mission_id: &str,
        context_overrides: HashMap<String, String>,
    ) -> Result<Run, MissionError> {
        let mission = self.missions.get(mission_id).ok_or_else(|| MissionError::MissionNotFound(mission_id.to_string()))?;
        dag::validate(&mission)?;
        let mut context = mission.context.clone();
        context.extend(context_overrides);

        let run = self.runs.create_run(&mission, None, now_iso(), context)?;

        for provider_name in mission.nodes.iter().map(|n| n.provider.clone()).collect::<HashSet<_>>() {
            if let Some(provider) = self.providers.get(&provider_name) {
                provider.initialize_team(run.id.as_str(), &mission).await?;
            }
        }

        self.bus.publish(EngineEvent::RunStarted { run_id: run.id.as_str().to_string(), mission_id: mission.id.as_str().to_string() });
        self.spawn_poller(run.id.as_str().to_string());
        Ok(run)
    }

    pub async fn abort_mission(&self, run_id: &str) -> Result<(), MissionError> {
        let run = self.runs.get(run_id).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
        if run.status.is_terminal() {
            return Ok(());
        }
        let mission = self.missions.get(run.mission_id.as_str()).ok_or_else(|| MissionError::MissionNotFound(run.mission_id.as_str().to_string()))?;

        for (node_id, state) in &run.node_states {
            if !state.status.is_terminal() {
                if let Some(node) = mission.node(node_id) {
                    if let Ok(provider) = self.provider_for(node) {
                        provider.abort_node(run_id, node_id).await;
                    }
                }
                self.runs.update_node_state(run_id, node_id, |s| {
                    s.status = NodeStatus::Failed;
                    s.error = Some("Run aborted".to_string());
                })?;
            }
        }

        self.runs.update_run_status(run_id, RunStatus::Aborted, None, Some(now_iso()))?;
        self.cleanup_run(run_id, &mission);
        self.bus.publish(EngineEvent::RunAborted { run_id: run_id.to_string() });
        self.stop_poller(run_id);
        Ok(())
    }

    pub async fn retry_node(&self, run_id: &str, node_id: &str) -> Result<(), MissionError> {
        let run = self.runs.get(run_id).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
        let state = run.node_states.get(node_id).ok_or_else(|| MissionError::NodeNotFound(node_id.to_string()))?;
        if !matches!(state.status, NodeStatus::Failed | NodeStatus::Timeout) {
            return Err(MissionError::NotRetriable { node_id: node_id.to_string() });
        }

        let mission = self.missions.get(run.mission_id.as_str()).ok_or_else(|| MissionError::MissionNotFound(run.mission_id.as_str().to_string()))?;
        let reachable = dag::reachable_from(&mission, node_id);

        self.runs.update_node_state(run_id, node_id, |s| {
            s.status = NodeStatus::Pending;
            s.error = None;
            s.output = None;
        })?;
        for downstream in reachable {
            let is_failed_descendant = run
                .node_states
                .get(&downstream)
                .map(|s| matches!(s.status, NodeStatus::Failed | NodeStatus::Timeout))
                .unwrap_or(false);
            if is_failed_descendant {
                self.runs.update_node_state(run_id, &downstream, |s| {
                    s.status = NodeStatus::Pending;
                    s.error = None;
                })?;
            }
        }

        if run.status.is_terminal() {
            self.runs.update_run_status(run_id, RunStatus::Running, None, None)?;
            self.spawn_poller(run_id.to_string());
        }
        Ok(())
    }

    pub fn relay_message(&self, run_id: &str, from: &str, to: &str, content: &str) -> Result<(), MissionError> {
        let run = self.runs.get(run_id).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
        if !run.node_states.contains_key(to) {
            return Err(MissionError::NodeNotFound(to.to_string()));
        }
        self.runs.add_run_message(run_id, RunMessage {
            timestamp: now_iso(),
            node_id: Some(to.to_string()),
            role: mission_core::MessageRole::Relay,
            content: content.to_string(),
        })?;
        self.bus.publish(EngineEvent::MessageRelayed { run_id: run_id.to_string(), from: from.to_string(), to: to.to_string(), content: content.to_string() });
        Ok(())
    }

    pub fn get_progress(&self, run_id: &str) -> Option<RunProgress> {
        let run = self.runs.get(run_id)?;
        let total = run.node_states.len().max(1);
        let completed = run.node_states.values().filter(|s| s.status == NodeStatus::Completed).count();
        let nodes = run
            .node_states
            .iter()
            .map(|(id, s)| {
                (
                    id.clone(),
                    NodeProgress {
                        status: s.status,
                        retry_count: s.retry_count,
                        has_output: s.output.is_some(),
                        file_count: s.files.len(),
                    },
                )
            })
            .collect();
        Some(RunProgress { run_id: run_id.to_string(), status: run.status, percent: (completed as f64 / total as f64) * 100.0, nodes })
    }

    pub fn get_active_runs(&self) -> Vec<String> {
        self.pollers.lock().keys().cloned().collect()
    }

    /// Reattach pollers to runs still `RUNNING` on disk, and reschedule
    /// any node left `RETRYING` when the process stopped.
    pub fn resume_active_runs(self: &Arc<Self>) {
        for run in self.runs.list(None) {
            if run.status == RunStatus::Running {
                self.spawn_poller(run.id.as_str().to_string());
            }
        }
    }

    fn spawn_poller(self: &Arc<Self>, run_id: String) {
        if self.pollers.lock().contains_key(&run_id) {
            return;
        }
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                match engine.runs.get(&run_id) {
                    Some(run) if !run.status.is_terminal() => {
                        engine.tick(&run_id).await;
                    }
                    _ => break,
                }
            }
            engine.pollers.lock().remove(&run_id);
        });
        self.pollers.lock().insert(run_id, handle);
    }

    fn stop_poller(&self, run_id: &str) {
        if let Some(handle) = self.pollers.lock().remove(run_id) {
            handle.abort();
        }
    }

    /// One scheduling pass: advance active nodes, spawn newly-ready
    /// nodes, and evaluate run completion. Reentrancy-guarded: a tick
    /// still running when the next timer fires is skipped entirely.
    async fn tick(self: &Arc<Self>, run_id: &str) {
        if !self.ticking.lock().insert(run_id.to_string()) {
            return;
        }
        if let Err(e) = self.tick_inner(run_id).await {
            tracing::warn!(run_id, error = %e, "poller tick failed");
        }
        self.ticking.lock().remove(run_id);
    }

    async fn tick_inner(self: &Arc<Self>, run_id: &str) -> Result<(), MissionError> {
        let run = self.runs.get(run_id).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
        let mission = self.missions.get(run.mission_id.as_str()).ok_or_else(|| MissionError::MissionNotFound(run.mission_id.as_str().to_string()))?;
        let team_name = Self::team_name(run_id);

        for node in &mission.nodes {
            let Some(state) = run.node_states.get(&node.id) else { continue };
            match state.status {
                NodeStatus::Pending => {
                    if parents_completed(&mission, &run, &node.id) {
                        self.schedule_node(run_id, &run, node, &team_name).await;
                    }
                }
                NodeStatus::Spawning | NodeStatus::Running => {
                    self.poll_active_node(run_id, &mission, &run, node, &team_name, state).await;
                }
                NodeStatus::Retrying => {
                    self.schedule_node(run_id, &run, node, &team_name).await;
                }
                NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Timeout => {}
            }
        }

        self.evaluate_run_completion(run_id, &mission).await?;
        Ok(())
    }

    async fn schedule_node(self: &Arc<Self>, run_id: &str, run: &Run, node: &Node, team_name: &str) {
        let _ = self.runs.update_node_state(run_id, &node.id, |s| {
            s.status = NodeStatus::Spawning;
            s.started_at = Some(now_iso());
        });
        self.bus.publish(EngineEvent::NodeScheduled { run_id: run_id.to_string(), node_id: node.id.clone() });

        if let Some(workdir) = &run.workdir {
            if let Some(snap) = summary::snapshot(std::path::Path::new(workdir)) {
                self.pre_snapshots.lock().insert((run_id.to_string(), node.id.clone()), snap);
            }
        }

        let provider = match self.provider_for(node) {
            Ok(p) => p,
            Err(e) => {
                self.fail_or_retry(run_id, run, node, &e.to_string()).await;
                return;
            }
        };

        let prompt = template::resolve(&node.prompt, run);
        let workdir = run.workdir.as_ref().map(std::path::Path::new);

        match provider.execute_node(node, &prompt, run_id, workdir).await {
            Ok(agent_id) => {
                let _ = self.runs.update_node_state(run_id, &node.id, |s| {
                    s.status = NodeStatus::Running;
                    s.agent_id = Some(agent_id.clone());
                });
                self.bus.publish(EngineEvent::NodeStarted { run_id: run_id.to_string(), node_id: node.id.clone(), agent_id });
            }
            Err(e) => {
                self.fail_or_retry(run_id, run, node, &e.to_string()).await;
            }
        }
        let _ = team_name;
    }

    async fn poll_active_node(self: &Arc<Self>, run_id: &str, mission: &Mission, run: &Run, node: &Node, team_name: &str, state: &NodeState) {
        if let Some(task) = read_task_file(&self.store_root, team_name, &node.id) {
            match task.status {
                mission_core::TaskFileStatus::Completed => {
                    self.complete_node(run_id, node, task.output).await;
                    return;
                }
                mission_core::TaskFileStatus::Failed | mission_core::TaskFileStatus::Error => {
                    self.fail_or_retry(run_id, run, node, task.error.as_deref().unwrap_or("agent reported failure")).await;
                    return;
                }
                _ => {}
            }
        }

        let elapsed = elapsed_seconds(state.started_at.as_deref());

        if let Some(timeout) = node.config.timeout_seconds {
            if elapsed >= timeout as i64 {
                if let Ok(provider) = self.provider_for(node) {
                    provider.abort_node(run_id, &node.id).await;
                }
                self.timeout_or_retry(run_id, run, node).await;
                return;
            }
        }

        if elapsed >= ORPHAN_GRACE_SECONDS {
            if let Some(agent_id) = &state.agent_id {
                if let Ok(provider) = self.provider_for(node) {
                    if !provider.is_process_alive(agent_id) {
                        let _ = self.runs.update_node_state(run_id, &node.id, |s| {
                            s.status = NodeStatus::Failed;
                            s.error = Some("orphaned: process exited without a terminal task file".to_string());
                        });
                        self.bus.publish(EngineEvent::NodeFailed { run_id: run_id.to_string(), node_id: node.id.clone(), error: "orphaned".to_string() });
                    }
                }
            }
        }
        let _ = mission;
    }

    async fn complete_node(self: &Arc<Self>, run_id: &str, node: &Node, output: Option<String>) {
        let files = self.diff_node_files(run_id, node);
        let _ = self.runs.update_node_state(run_id, &node.id, |s| {
            s.status = NodeStatus::Completed;
            s.completed_at = Some(now_iso());
            s.output = output.clone();
            s.files = files;
        });
        self.bus.publish(EngineEvent::NodeCompleted { run_id: run_id.to_string(), node_id: node.id.clone(), output });
    }

    fn diff_node_files(&self, run_id: &str, node: &Node) -> Vec<String> {
        let Some(run) = self.runs.get(run_id) else { return Vec::new() };
        let Some(workdir) = &run.workdir else { return Vec::new() };
        let pre = self.pre_snapshots.lock().remove(&(run_id.to_string(), node.id.clone()));
        let Some(pre) = pre else { return Vec::new() };
        let Some(post) = summary::snapshot(std::path::Path::new(workdir)) else { return Vec::new() };
        summary::diff(&pre, &post)
    }

    async fn fail_or_retry(self: &Arc<Self>, run_id: &str, run: &Run, node: &Node, error: &str) {
        let retry_count = run.node_states.get(&node.id).map(|s| s.retry_count).unwrap_or(0);
        if retry_count < node.config.retries {
            let _ = self.runs.update_node_state(run_id, &node.id, |s| {
                s.status = NodeStatus::Retrying;
                s.retry_count += 1;
                s.error = Some(error.to_string());
            });
            self.bus.publish(EngineEvent::NodeRetrying { run_id: run_id.to_string(), node_id: node.id.clone(), retry_count: retry_count + 1 });
        } else {
            let _ = self.runs.update_node_state(run_id, &node.id, |s| {
                s.status = NodeStatus::Failed;
                s.error = Some(error.to_string());
            });
            self.bus.publish(EngineEvent::NodeFailed { run_id: run_id.to_string(), node_id: node.id.clone(), error: error.to_string() });
        }
    }

    async fn timeout_or_retry(self: &Arc<Self>, run_id: &str, run: &Run, node: &Node) {
        let retry_count = run.node_states.get(&node.id).map(|s| s.retry_count).unwrap_or(0);
        if retry_count < node.config.retries {
            let _ = self.runs.update_node_state(run_id, &node.id, |s| {
                s.status = NodeStatus::Retrying;
                s.retry_count += 1;
                s.error = Some("timed out".to_string());
            });
            self.bus.publish(EngineEvent::NodeRetrying { run_id: run_id.to_string(), node_id: node.id.clone(), retry_count: retry_count + 1 });
        } else {
            let _ = self.runs.update_node_state(run_id, &node.id, |s| {
                s.status = NodeStatus::Timeout;
                s.error = Some("exceeded its timeout budget".to_string());
            });
            self.bus.publish(EngineEvent::NodeTimeout { run_id: run_id.to_string(), node_id: node.id.clone() });
        }
    }

    async fn evaluate_run_completion(self: &Arc<Self>, run_id: &str, mission: &Mission) -> Result<(), MissionError> {
        let run = self.runs.get(run_id).ok_or_else(|| MissionError::RunNotFound(run_id.to_string()))?;
        if run.status.is_terminal() {
            return Ok(());
        }

        if run.all_completed() {
            let summary = summary::build(mission, &run, run.workdir.as_deref(), now_iso());
            self.runs.update_run_summary(run_id, summary)?;
            self.runs.update_run_status(run_id, RunStatus::Completed, None, Some(now_iso()))?;
            self.cleanup_run(run_id, mission);
            self.bus.publish(EngineEvent::RunCompleted { run_id: run_id.to_string() });
            return Ok(());
        }

        let mut blocking_node = None;
        for (node_id, state) in &run.node_states {
            if matches!(state.status, NodeStatus::Failed | NodeStatus::Timeout) {
                let reachable = dag::reachable_from(mission, node_id);
                let blocks = reachable.iter().any(|downstream| {
                    run.node_states
                        .get(downstream)
                        .map(|s| s.status != NodeStatus::Completed && !s.status.is_active() && s.status != NodeStatus::Retrying)
                        .unwrap_or(false)
                });
                if blocks {
                    blocking_node = Some(node_id.clone());
                    break;
                }
            }
        }

        if let Some(node_id) = blocking_node {
            self.runs.update_run_status(run_id, RunStatus::Failed, Some(format!("node {node_id} failed and blocks remaining execution")), Some(now_iso()))?;
            self.cleanup_run(run_id, mission);
            self.bus.publish(EngineEvent::RunFailed { run_id: run_id.to_string(), error: format!("node {node_id} failed") });
        }
        Ok(())
    }

    fn cleanup_run(&self, run_id: &str, mission: &Mission) {
        for provider_name in mission.nodes.iter().map(|n| n.provider.clone()).collect::<HashSet<_>>() {
            if let Some(provider) = self.providers.get(&provider_name) {
                provider.cleanup_run(run_id);
            }
        }
    }
}

fn parents_completed(mission: &Mission, run: &Run, node_id: &str) -> bool {
    mission.parents_of(node_id).all(|parent| run.node_states.get(parent).map(|s| s.status == NodeStatus::Completed).unwrap_or(false))
}

fn elapsed_seconds(started_at: Option<&str>) -> i64 {
    started_at.map(mission_core::elapsed_seconds_since).unwrap_or(0)
}
