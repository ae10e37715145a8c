// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent provider: translates between the engine's in-memory notion
//! of a node and the external agent child process + task file protocol.

use crate::command::build_command;
use crate::process_table::ProcessTable;
use crate::ring_buffer::RingBuffer;
use crate::stream::{parse_stdout_line, stderr_active_form, StdoutEvent};
use crate::task_io::{read_task_file, remove_run_dirs, write_task_file, write_team_config};
use async_trait::async_trait;
use mission_core::{MissionError, Mission, Node, TaskFile, TaskFileStatus, TeamConfig, TeamMember};
use mission_store::StoreRoot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;

/// How long to wait after spawn for an immediate failure (e.g.
/// command-not-found) before declaring the spawn successful.
const SPAWN_VERIFY_WINDOW: Duration = Duration::from_millis(300);
/// Grace period between SIGTERM and SIGKILL escalation on abort.
const ABORT_GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Minimum interval between `activeForm` task-file updates for one node.
const ACTIVE_FORM_THROTTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("spawn failed for node {node_id}: {reason}")]
    SpawnFailed { node_id: String, reason: String },
    #[error(transparent)]
    Mission(#[from] MissionError),
}

/// Provider capability set. A registry maps provider names (`node.provider`)
/// to an instance; `ProviderRegistry::get` is the only dispatch point.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    async fn initialize_team(&self, run_id: &str, mission: &Mission) -> Result<(), ProviderError>;
    async fn execute_node(&self, node: &Node, resolved_prompt: &str, run_id: &str, workdir: Option<&std::path::Path>) -> Result<String, ProviderError>;
    async fn abort_node(&self, run_id: &str, node_id: &str);
    fn cleanup_run(&self, run_id: &str);
    fn is_process_alive(&self, agent_id: &str) -> bool;
    fn is_available(&self) -> bool;
    fn supported_agent_types(&self) -> Vec<&'static str>;
    fn provider_info(&self) -> &'static str;
}

/// The local subprocess provider: spawns `claude` as a direct child
/// process per node.
pub struct LocalClaudeProvider {
    root: StoreRoot,
    processes: ProcessTable,
}

impl LocalClaudeProvider {
    pub fn new(root: StoreRoot) -> Self {
        Self { root, processes: ProcessTable::new() }
    }

    fn team_name(run_id: &str) -> String {
        TeamConfig::run_team_name(run_id)
    }

    fn agent_id(run_id: &str, node_id: &str) -> String {
        format!("{run_id}/{node_id}")
    }

    /// Send SIGTERM (escalating to SIGKILL after `grace`) to every child
    /// this provider still believes is alive. Used on daemon shutdown;
    /// leaves run/task-file state untouched so a restart can still
    /// resume the runs as orphans.
    pub async fn terminate_all_children(&self, grace: Duration) {
        for pid in self.processes.alive_pids() {
            crate::signal::terminate_then_kill(pid, grace).await;
        }
    }
}

#[async_trait]
impl AgentProvider for LocalClaudeProvider {
    async fn initialize_team(&self, run_id: &str, mission: &Mission) -> Result<(), ProviderError> {
        let team_name = Self::team_name(run_id);
        let members = mission
            .nodes
            .iter()
            .map(|n| TeamMember { name: n.id.clone(), node_id: Some(n.id.clone()) })
            .collect();
        write_team_config(&self.root, &team_name, &TeamConfig { members })
            .map_err(|e| ProviderError::SpawnFailed { node_id: "*team*".into(), reason: e.to_string() })?;
        Ok(())
    }

    async fn execute_node(&self, node: &Node, resolved_prompt: &str, run_id: &str, workdir: Option<&std::path::Path>) -> Result<String, ProviderError> {
        let team_name = Self::team_name(run_id);
        let agent_id = Self::agent_id(run_id, &node.id);

        let task = TaskFile::new_pending(&node.id, &node.label);
        write_task_file(&self.root, &team_name, &task)
            .map_err(|e| ProviderError::SpawnFailed { node_id: node.id.clone(), reason: e.to_string() })?;

        let mut cmd = build_command(node, resolved_prompt, workdir);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                mark_task_failed(&self.root, &team_name, &node.id, &format!("spawn error: {e}"));
                return Err(ProviderError::SpawnFailed { node_id: node.id.clone(), reason: e.to_string() });
            }
        };

        // Spawn verification: wait up to 300ms for the process to die
        // immediately (command-not-found and similar). An `error` event
        // handler is always attached so an unhandled failure here can
        // never crash the whole server.
        match tokio::time::timeout(SPAWN_VERIFY_WINDOW, child.wait()).await {
            Ok(Ok(status)) if !status.success() => {
                let reason = format!("process exited with code {:?} during spawn verification", status.code());
                mark_task_failed(&self.root, &team_name, &node.id, &reason);
                return Err(ProviderError::SpawnFailed { node_id: node.id.clone(), reason });
            }
            Ok(Err(e)) => {
                mark_task_failed(&self.root, &team_name, &node.id, &format!("wait error: {e}"));
                return Err(ProviderError::SpawnFailed { node_id: node.id.clone(), reason: e.to_string() });
            }
            // Still running (or exited 0 nearly instantly, unlikely but not
            // a spawn failure) — proceed to stream and register.
            Ok(Ok(_)) | Err(_) => {}
        }

        let pid = child.id();
        self.processes.register(&agent_id, pid);

        spawn_streamer(self.root.clone(), team_name.clone(), node.id.clone(), agent_id.clone(), child, self.processes.clone());

        Ok(agent_id)
    }

    async fn abort_node(&self, run_id: &str, node_id: &str) {
        let agent_id = Self::agent_id(run_id, node_id);
        let team_name = Self::team_name(run_id);

        if let Some(pid) = self.processes.pid_of(&agent_id) {
            crate::signal::terminate_then_kill(pid, ABORT_GRACE_PERIOD).await;
        }
        self.processes.forget(&agent_id);
        mark_task_failed(&self.root, &team_name, node_id, "Aborted by user");
    }

    fn cleanup_run(&self, run_id: &str) {
        let team_name = Self::team_name(run_id);
        self.processes.forget_run(run_id);
        remove_run_dirs(&self.root, &team_name);
    }

    fn is_process_alive(&self, agent_id: &str) -> bool {
        self.processes.is_alive(agent_id)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supported_agent_types(&self) -> Vec<&'static str> {
        vec!["Plan", "Explore", "general-purpose", "code-implementer", "code-reviewer", "security-reviewer", "architect", "refactor-cleaner", "Bash"]
    }

    fn provider_info(&self) -> &'static str {
        "claude-code (local subprocess)"
    }
}

fn mark_task_failed(root: &StoreRoot, team_name: &str, node_id: &str, error: &str) {
    let task = match read_task_file(root, team_name, node_id) {
        Some(mut existing) => {
            existing.status = TaskFileStatus::Failed;
            existing.error = Some(error.to_string());
            existing
        }
        // The existing task file cannot be read; write a minimal
        // completion record instead, preserving the id.
        None => TaskFile::minimal_completion(node_id, node_id, TaskFileStatus::Failed, None, Some(error.to_string())),
    };
    let _ = write_task_file(root, team_name, &task);
}

fn spawn_streamer(root: StoreRoot, team_name: String, node_id: String, agent_id: String, mut child: Child, processes: ProcessTable) {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let buffer = Arc::new(Mutex::new(RingBuffer::new()));
    let last_update = Arc::new(Mutex::new(None::<std::time::Instant>));

    if let Some(stdout) = stdout {
        let root = root.clone();
        let team_name = team_name.clone();
        let node_id = node_id.clone();
        let buffer = buffer.clone();
        let last_update = last_update.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buffer.lock().push(line.clone());
                match parse_stdout_line(&line) {
                    StdoutEvent::ActiveForm(form) => {
                        maybe_update_active_form(&root, &team_name, &node_id, &form, &last_update);
                    }
                    StdoutEvent::Result(_) | StdoutEvent::None => {}
                }
            }
        });
    }

    if let Some(stderr) = stderr {
        let root = root.clone();
        let team_name = team_name.clone();
        let node_id = node_id.clone();
        let buffer = buffer.clone();
        let last_update = last_update.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buffer.lock().push(line.clone());
                let form = stderr_active_form(&line);
                maybe_update_active_form(&root, &team_name, &node_id, &form, &last_update);
            }
        });
    }

    tokio::spawn(async move {
        let status = child.wait().await;
        processes.mark_dead(&agent_id);

        let existing = read_task_file(&root, &team_name, &node_id);
        let final_output = last_result_in_buffer(&buffer);

        let task = match status {
            Ok(status) if status.success() => match existing {
                Some(mut t) => {
                    t.status = TaskFileStatus::Completed;
                    t.output = final_output.or(t.output);
                    t
                }
                None => TaskFile::minimal_completion(&node_id, &node_id, TaskFileStatus::Completed, final_output, None),
            },
            Ok(status) => {
                let error = format!("Process exited with code {:?}", status.code());
                match existing {
                    Some(mut t) => {
                        t.status = TaskFileStatus::Failed;
                        t.error = Some(error);
                        t
                    }
                    None => TaskFile::minimal_completion(&node_id, &node_id, TaskFileStatus::Failed, None, Some(error)),
                }
            }
            Err(e) => TaskFile::minimal_completion(&node_id, &node_id, TaskFileStatus::Failed, None, Some(format!("wait error: {e}"))),
        };
        let _ = write_task_file(&root, &team_name, &task);
    });
}

fn maybe_update_active_form(root: &StoreRoot, team_name: &str, node_id: &str, form: &str, last_update: &Arc<Mutex<Option<std::time::Instant>>>) {
    let now = std::time::Instant::now();
    {
        let mut last = last_update.lock();
        if let Some(prev) = *last {
            if now.duration_since(prev) < ACTIVE_FORM_THROTTLE {
                return;
            }
        }
        *last = Some(now);
    }
    if let Some(mut task) = read_task_file(root, team_name, node_id) {
        task.active_form = Some(form.to_string());
        let _ = write_task_file(root, team_name, &task);
    }
}

fn last_result_in_buffer(buffer: &Arc<Mutex<RingBuffer>>) -> Option<String> {
    buffer
        .lock()
        .snapshot()
        .into_iter()
        .rev()
        .find_map(|line| match parse_stdout_line(&line) {
            StdoutEvent::Result(r) => Some(r),
            _ => None,
        })
}

/// Maps provider names (`node.provider`) to instances.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AgentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn AgentProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentProvider>> {
        self.providers.get(name).cloned()
    }
}
