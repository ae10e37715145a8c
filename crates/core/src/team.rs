// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team config: the on-disk agent roster written once by the provider at
//! run start, consumed by the team watcher to drive UI presence.

use serde::{Deserialize, Serialize};

/// One declared member of a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub node_id: Option<String>,
}

/// `teams/<teamName>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub members: Vec<TeamMember>,
}

impl TeamConfig {
    /// A run's team is named `run-<runId>`.
    pub fn run_team_name(run_id: &str) -> String {
        format!("run-{run_id}")
    }

    /// Whether a team name corresponds to a mission run (vs. a
    /// user-managed team definition).
    pub fn is_run_team(team_name: &str) -> bool {
        team_name.starts_with("run-")
    }

    pub fn has_team_lead(&self) -> bool {
        self.members.iter().any(|m| m.name == "team-lead")
    }
}
