// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task file: the on-disk, bidirectional protocol file between the
//! agent provider (writer) and the mission engine (reader).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status progression observed by the engine:
/// `pending -> in_progress -> {completed | failed | error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFileStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Error,
}

impl TaskFileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }
}

/// One inline message appended to a task file's `messages[]` log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    pub timestamp: String,
    pub from: Option<String>,
    pub content: String,
}

/// The per-node task file, written by the provider and read by the engine.
///
/// The engine never writes this file — it only observes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFile {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub status: TaskFileStatus,
    /// The node id that owns this task.
    pub owner: String,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub siblings: Vec<String>,
    #[serde(default)]
    pub peers: HashMap<String, String>,
    /// Short (<=100 char) human-readable progress string.
    #[serde(default)]
    pub active_form: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub messages: Vec<TaskMessage>,
}

impl TaskFile {
    /// A fresh task file in `pending` status for a newly-spawned node.
    pub fn new_pending(node_id: &str, subject: &str) -> Self {
        Self {
            id: node_id.to_string(),
            subject: subject.to_string(),
            description: String::new(),
            status: TaskFileStatus::Pending,
            owner: node_id.to_string(),
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            siblings: Vec::new(),
            peers: HashMap::new(),
            active_form: None,
            output: None,
            error: None,
            messages: Vec::new(),
        }
    }

    /// A minimal completion record, used when the existing task file
    /// cannot be read or updated on process close.
    pub fn minimal_completion(id: &str, owner: &str, status: TaskFileStatus, output: Option<String>, error: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            subject: String::new(),
            description: String::new(),
            status,
            owner: owner.to_string(),
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            siblings: Vec::new(),
            peers: HashMap::new(),
            active_form: None,
            output,
            error,
            messages: Vec::new(),
        }
    }
}
