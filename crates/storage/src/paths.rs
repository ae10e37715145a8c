// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known directory root and its subdirectories.

use std::path::{Path, PathBuf};

/// Canonical layout under the well-known directory root (spec §6).
#[derive(Debug, Clone)]
pub struct StoreRoot {
    root: PathBuf,
}

impl StoreRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the default root: `$MISSION_HOME` if set, else `~/.claude`.
    pub fn resolve_default() -> Self {
        if let Ok(p) = std::env::var("MISSION_HOME") {
            return Self::new(p);
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".claude"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mission_defs_dir(&self) -> PathBuf {
        self.root.join("missions").join("defs")
    }

    pub fn mission_templates_dir(&self) -> PathBuf {
        self.root.join("missions").join("templates")
    }

    pub fn mission_runs_dir(&self) -> PathBuf {
        self.root.join("missions").join("runs")
    }

    pub fn teams_dir(&self) -> PathBuf {
        self.root.join("teams")
    }

    pub fn team_dir(&self, team_name: &str) -> PathBuf {
        self.teams_dir().join(team_name)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn task_dir(&self, team_name: &str) -> PathBuf {
        self.tasks_dir().join(team_name)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn settings_local_path(&self) -> PathBuf {
        self.root.join("settings.local.json")
    }

    pub fn projects_path(&self) -> PathBuf {
        self.root.join("projects.json")
    }
}
