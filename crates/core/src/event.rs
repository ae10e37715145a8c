// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types published on the event bus.
//!
//! Serializes with `{"type": "event_name", ...fields}`. Fire-and-forget:
//! no persistence, no replay.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An event published by the mission engine, the team watcher, or the
/// activity pipeline that derives from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    #[serde(rename = "run_started")]
    RunStarted { run_id: String, mission_id: String },

    #[serde(rename = "node_scheduled")]
    NodeScheduled { run_id: String, node_id: String },

    #[serde(rename = "node_started")]
    NodeStarted { run_id: String, node_id: String, agent_id: String },

    #[serde(rename = "node_completed")]
    NodeCompleted { run_id: String, node_id: String, output: Option<String> },

    #[serde(rename = "node_failed")]
    NodeFailed { run_id: String, node_id: String, error: String },

    #[serde(rename = "node_retrying")]
    NodeRetrying { run_id: String, node_id: String, retry_count: u32 },

    #[serde(rename = "node_timeout")]
    NodeTimeout { run_id: String, node_id: String },

    #[serde(rename = "run_completed")]
    RunCompleted { run_id: String },

    #[serde(rename = "run_failed")]
    RunFailed { run_id: String, error: String },

    #[serde(rename = "run_aborted")]
    RunAborted { run_id: String },

    #[serde(rename = "message_logged")]
    MessageLogged { run_id: String, node_id: Option<String>, content: String },

    #[serde(rename = "message_relayed")]
    MessageRelayed { run_id: String, from: String, to: String, content: String },

    // -- activity pipeline (team watcher) --
    #[serde(rename = "agent_spawned")]
    AgentSpawned { agent_id: String, team: String, task: Option<String> },

    #[serde(rename = "agent_updated")]
    AgentUpdated { agent_id: String, task: Option<String> },

    #[serde(rename = "agent_completing")]
    AgentCompleting { agent_id: String, status: String },

    #[serde(rename = "agent_removed")]
    AgentRemoved { agent_id: String },

    #[serde(rename = "agents_cleared")]
    AgentsCleared { team: String },
}

/// Snapshot sent to a client immediately on subscription, so it has a
/// consistent starting state without a separate REST bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InitSnapshot {
    pub active_runs: HashSet<String>,
    pub active_agents: HashSet<String>,
}
