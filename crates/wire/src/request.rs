// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control messages a real-time client may push over its WebSocket
//! connection, equivalent to their REST counterparts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    AbortRun { run_id: String },
    RetryNode { run_id: String, node_id: String },
    RelayMessage { run_id: String, from: String, to: String, content: String },
}

/// Body of `POST /api/missions/:id/run`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartMissionRequest {
    #[serde(default)]
    pub context: HashMap<String, String>,
}

/// Body of `POST /api/missions/runs/:id/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessageRequest {
    pub from: String,
    pub to: String,
    pub content: String,
}
