// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission definitions: the saved DAG of nodes a user can run.

use crate::id::MissionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-node execution tuning (`config` in the data model).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_retries() -> u32 {
    1
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { timeout_seconds: None, retries: default_retries() }
    }
}

/// A vertex of the mission DAG; one external agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub agent_type: String,
    pub prompt: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    #[serde(default)]
    pub mcp_servers: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,

    /// Legacy field name, superseded by `unit_class`. Kept only so
    /// `migrate_legacy_node_fields` can copy it forward on load.
    #[serde(default, rename = "droidClass")]
    pub legacy_droid_class: Option<String>,
    /// Current name for the field formerly called `droidClass`.
    #[serde(default, rename = "unitClass")]
    pub unit_class: Option<String>,
}

fn default_provider() -> String {
    "claude-code".to_string()
}

/// A directed edge `{from, to}` between node ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A saved mission definition: immutable once saved except via explicit edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub context: HashMap<String, String>,
    #[serde(default)]
    pub updated_at: String,
}

impl Mission {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Parents of `node_id`: nodes with an edge `-> node_id`.
    pub fn parents_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges.iter().filter(move |e| e.to == node_id).map(|e| e.from.as_str())
    }

    /// Children of `node_id`: nodes with an edge `node_id ->`.
    pub fn children_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges.iter().filter(move |e| e.from == node_id).map(|e| e.to.as_str())
    }

    /// Nodes with no incoming edge.
    pub fn roots(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| self.parents_of(&n.id).next().is_none()).collect()
    }
}

/// Compatibility shim: if a node has the legacy `droidClass` field and no
/// `unitClass`, copy one to the other. Applied on load, not on save.
pub fn migrate_legacy_node_fields(mission: &mut Mission) {
    for node in &mut mission.nodes {
        if node.unit_class.is_none() {
            if let Some(legacy) = node.legacy_droid_class.clone() {
                node.unit_class = Some(legacy);
            }
        }
    }
}

/// A mission saved for reuse (same shape, different storage bucket).
pub type Template = Mission;
