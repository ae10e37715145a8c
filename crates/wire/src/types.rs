// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin wire-facing views over the storage-layer data model. List
//! endpoints return these rather than the full record to keep listing
//! responses small; single-item endpoints return the record itself.

use mission_core::{Mission, Run};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionListEntry {
    pub id: String,
    pub name: String,
    pub node_count: usize,
    pub updated_at: String,
}

impl From<&Mission> for MissionListEntry {
    fn from(m: &Mission) -> Self {
        Self { id: m.id.as_str().to_string(), name: m.name.clone(), node_count: m.nodes.len(), updated_at: m.updated_at.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunListEntry {
    pub id: String,
    pub mission_id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl From<&Run> for RunListEntry {
    fn from(r: &Run) -> Self {
        Self {
            id: r.id.as_str().to_string(),
            mission_id: r.mission_id.as_str().to_string(),
            status: r.status.to_string(),
            started_at: r.started_at.clone(),
            completed_at: r.completed_at.clone(),
        }
    }
}
