// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task file and team config I/O. The provider is the sole writer of
//! both; the engine only reads task files, and never writes either.

use mission_core::{TaskFile, TeamConfig};
use mission_store::{atomic_write_json, read_json, StoreRoot};
use std::path::PathBuf;

fn task_path(root: &StoreRoot, team_name: &str, node_id: &str) -> PathBuf {
    root.task_dir(team_name).join(format!("{node_id}.json"))
}

pub fn write_task_file(root: &StoreRoot, team_name: &str, task: &TaskFile) -> std::io::Result<()> {
    let path = task_path(root, team_name, &task.id);
    atomic_write_json(&path, task).map_err(|e| std::io::Error::other(e.to_string()))
}

pub fn read_task_file(root: &StoreRoot, team_name: &str, node_id: &str) -> Option<TaskFile> {
    read_json(&task_path(root, team_name, node_id))
}

pub fn write_team_config(root: &StoreRoot, team_name: &str, config: &TeamConfig) -> std::io::Result<()> {
    let path = root.team_dir(team_name).join("config.json");
    atomic_write_json(&path, config).map_err(|e| std::io::Error::other(e.to_string()))
}

pub fn remove_run_dirs(root: &StoreRoot, team_name: &str) {
    let _ = std::fs::remove_dir_all(root.team_dir(team_name));
    let _ = std::fs::remove_dir_all(root.task_dir(team_name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_core::{TaskFileStatus, TeamMember};
    use tempfile::tempdir;

    #[test]
    fn write_then_read_task_file_round_trips() {
        let dir = tempdir().expect("tempdir");
        let root = StoreRoot::new(dir.path());
        let task = TaskFile::new_pending("a", "do it");
        write_task_file(&root, "run-1", &task).expect("write");
        let back = read_task_file(&root, "run-1", "a").expect("present");
        assert_eq!(back.status, TaskFileStatus::Pending);
    }

    #[test]
    fn remove_run_dirs_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let root = StoreRoot::new(dir.path());
        write_team_config(&root, "run-1", &TeamConfig { members: vec![TeamMember { name: "team-lead".into(), node_id: None }] }).expect("write");
        remove_run_dirs(&root, "run-1");
        remove_run_dirs(&root, "run-1");
        assert!(!root.team_dir("run-1").exists());
    }
}
