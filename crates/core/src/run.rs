// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run records: one execution of a mission, and the per-node state table.

use crate::id::{MissionId, RunId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node state machine. See the mission engine for transition rules.
///
/// `Spawning` and `Running` are "active"; `Completed`, `Failed`, and
/// `Timeout` are terminal. `Retrying` is a cross-cutting state that always
/// returns to `Spawning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Pending,
    Spawning,
    Running,
    Retrying,
    Completed,
    Failed,
    Timeout,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Spawning | Self::Running)
    }
}

crate::simple_display! {
    NodeStatus {
        Pending => "pending",
        Spawning => "spawning",
        Running => "running",
        Retrying => "retrying",
        Completed => "completed",
        Failed => "failed",
        Timeout => "timeout",
    }
}

/// Run status. Terminal except that `RetryNode` may transition
/// `Failed|Aborted -> Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Aborted => "aborted",
    }
}

/// Per-node mutable state within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub status: NodeStatus,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    pub agent_id: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    /// Workdir-relative paths created by this node.
    #[serde(default)]
    pub files: Vec<String>,

    // Private edge-detection fields (prefix `_` in the data model), used
    // only by the poller to decide whether a task-file observation changed.
    #[serde(default, rename = "_lastTaskFileStatus")]
    pub last_task_file_status: Option<String>,
    #[serde(default, rename = "_lastActiveForm")]
    pub last_active_form: Option<String>,
    #[serde(default, rename = "_lastMsgCount")]
    pub last_msg_count: usize,
}

impl NodeState {
    pub fn pending() -> Self {
        Self {
            status: NodeStatus::Pending,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            agent_id: None,
            output: None,
            error: None,
            files: Vec::new(),
            last_task_file_status: None,
            last_active_form: None,
            last_msg_count: 0,
        }
    }
}

/// Role of a message in the run's append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Info,
    Output,
    Relay,
}

/// One entry in the run's append-only message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMessage {
    pub timestamp: String,
    pub node_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
}

/// Per-node file list, heuristic setup hints, and directory summary
/// produced once a run reaches `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunSummary {
    pub total_files: usize,
    pub files: Vec<String>,
    pub workdir: Option<String>,
    pub node_file_map: HashMap<String, Vec<String>>,
    pub setup_hints: Vec<String>,
    pub dirs: Vec<String>,
    pub nodes_completed: usize,
    pub nodes_total: usize,
    pub completed_at: Option<String>,
}

/// One execution of a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub mission_id: MissionId,
    pub status: RunStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    pub workdir: Option<String>,
    pub node_states: HashMap<String, NodeState>,
    #[serde(default)]
    pub messages: Vec<RunMessage>,
    pub summary: Option<RunSummary>,
    /// Mission context merged with this run's start-time overrides;
    /// snapshotted at creation so later template resolution is stable
    /// even if the mission definition changes underneath the run.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl Run {
    /// True iff every node in the run has reached `Completed`.
    pub fn all_completed(&self) -> bool {
        self.node_states.values().all(|s| s.status == NodeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_status_terminal_classification() {
        assert!(NodeStatus::Completed.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(NodeStatus::Timeout.is_terminal());
        assert!(!NodeStatus::Retrying.is_terminal());
        assert!(!NodeStatus::Pending.is_terminal());
    }

    #[test]
    fn node_status_active_classification() {
        assert!(NodeStatus::Spawning.is_active());
        assert!(NodeStatus::Running.is_active());
        assert!(!NodeStatus::Pending.is_active());
        assert!(!NodeStatus::Completed.is_active());
    }

    #[test]
    fn node_status_display_matches_data_model_strings() {
        assert_eq!(NodeStatus::Timeout.to_string(), "timeout");
        assert_eq!(RunStatus::Aborted.to_string(), "aborted");
    }
}
