// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error taxonomy shared by the store, provider, and engine.
//!
//! Conceptual kinds per the error handling design; these are the types
//! realizing them. Converted to the `{ data }` / `{ error }` envelope at
//! the HTTP boundary in `mission-daemon`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission {0} not found")]
    MissionNotFound(String),

    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error("template {0} not found")]
    TemplateNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("mission graph contains a cycle")]
    CycleDetected,

    #[error("mission has nodes but no root nodes")]
    NoRootNodes,

    #[error("node {node_id} is not retriable in its current state")]
    NotRetriable { node_id: String },

    #[error("failed to spawn agent for node {node_id}: {reason}")]
    SpawnError { node_id: String, reason: String },

    #[error("node {node_id} orphaned: process exited without a terminal task file")]
    OrphanDetected { node_id: String },

    #[error("node {node_id} exceeded its timeout budget")]
    Timeout { node_id: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MissionError {
    /// HTTP status this error maps to, per the external interface design.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissionNotFound(_) | Self::RunNotFound(_) | Self::NodeNotFound(_) | Self::TemplateNotFound(_) => 404,
            Self::InvalidInput(_) | Self::CycleDetected | Self::NoRootNodes | Self::NotRetriable { .. } => 400,
            Self::SpawnError { .. } | Self::OrphanDetected { .. } | Self::Timeout { .. } => 409,
            Self::Io(_) | Self::Json(_) => 500,
        }
    }
}
