// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CRUD over mission definitions and templates.

use crate::atomic::{atomic_write_json, read_json, sanitize_id};
use crate::lock::LockTable;
use crate::paths::StoreRoot;
use mission_core::mission::migrate_legacy_node_fields;
use mission_core::{Mission, MissionError, MissionId};
use std::path::PathBuf;

pub struct MissionStore {
    root: StoreRoot,
    locks: LockTable,
}

impl MissionStore {
    pub fn new(root: StoreRoot) -> Self {
        Self { root, locks: LockTable::new() }
    }

    fn def_path(&self, id: &str) -> Result<PathBuf, MissionError> {
        Ok(self.root.mission_defs_dir().join(format!("{}.json", sanitize_id(id)?)))
    }

    fn template_path(&self, id: &str) -> Result<PathBuf, MissionError> {
        Ok(self.root.mission_templates_dir().join(format!("{}.json", sanitize_id(id)?)))
    }

    pub fn list(&self) -> Vec<Mission> {
        list_json_dir(&self.root.mission_defs_dir())
    }

    pub fn list_templates(&self) -> Vec<Mission> {
        list_json_dir(&self.root.mission_templates_dir())
    }

    /// Missing file -> `None` (not an error). Applies the legacy
    /// `droidClass` -> `unitClass`-equivalent node field migration by
    /// delegating to `migrate_legacy_node_fields`.
    pub fn get(&self, id: &str) -> Option<Mission> {
        let path = self.def_path(id).ok()?;
        let mut mission: Mission = read_json(&path)?;
        migrate_legacy_node_fields(&mut mission);
        Some(mission)
    }

    pub fn get_template(&self, id: &str) -> Option<Mission> {
        let path = self.template_path(id).ok()?;
        let mut template: Mission = read_json(&path)?;
        migrate_legacy_node_fields(&mut template);
        Some(template)
    }

    pub fn create(&self, mut mission: Mission) -> Result<Mission, MissionError> {
        if mission.id.as_str().is_empty() {
            mission.id = MissionId::new();
        }
        let path = self.def_path(mission.id.as_str())?;
        let key = mission.id.as_str().to_string();
        self.locks.with_lock(&key, || atomic_write_json(&path, &mission))?;
        Ok(mission)
    }

    pub fn update(&self, mission: Mission) -> Result<Mission, MissionError> {
        let path = self.def_path(mission.id.as_str())?;
        let key = mission.id.as_str().to_string();
        self.locks.with_lock(&key, || atomic_write_json(&path, &mission))?;
        Ok(mission)
    }

    /// Missing file on delete -> `false`.
    pub fn delete(&self, id: &str) -> Result<bool, MissionError> {
        let path = self.def_path(id)?;
        let key = id.to_string();
        self.locks.with_lock(&key, || {
            if path.exists() {
                std::fs::remove_file(&path)?;
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }

    pub fn save_template(&self, mut template: Mission) -> Result<Mission, MissionError> {
        if template.id.as_str().is_empty() {
            template.id = MissionId::new();
        }
        let path = self.template_path(template.id.as_str())?;
        let key = template.id.as_str().to_string();
        self.locks.with_lock(&key, || atomic_write_json(&path, &template))?;
        Ok(template)
    }

    pub fn delete_template(&self, id: &str) -> Result<bool, MissionError> {
        let path = self.template_path(id)?;
        let key = id.to_string();
        self.locks.with_lock(&key, || {
            if path.exists() {
                std::fs::remove_file(&path)?;
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }
}

fn list_json_dir(dir: &std::path::Path) -> Vec<Mission> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(mission) = read_json::<Mission>(&path) {
            out.push(mission);
        }
    }
    out
}
