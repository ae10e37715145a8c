// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run summary generation: workdir pre/post snapshot diffing, setup-hint
//! heuristics, and the per-node file map.

use mission_core::{Mission, Run, RunSummary};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use walkdir::WalkDir;

/// Hard ceiling above which a snapshot is abandoned rather than
/// collected unbounded.
const SNAPSHOT_FILE_CEILING: usize = 10_000;
/// Cap on the number of files reported in a run summary.
const SUMMARY_FILE_CAP: usize = 100;

const SETUP_HINTS: &[(&str, &str)] = &[
    ("package.json", "npm install"),
    ("requirements.txt", "pip install -r requirements.txt"),
    ("Gemfile", "bundle install"),
    ("go.mod", "go mod download"),
    ("server.js", "node server.js"),
    ("index.js", "node server.js"),
];

/// Snapshot of workdir-relative file paths, excluding dotfiles and
/// `node_modules`. Returns `None` if the ceiling would be exceeded.
pub fn snapshot(workdir: &Path) -> Option<HashSet<String>> {
    let mut files = HashSet::new();
    for entry in WalkDir::new(workdir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(workdir) else { continue };
        if is_excluded(rel) {
            continue;
        }
        if files.len() >= SNAPSHOT_FILE_CEILING {
            return None;
        }
        files.insert(rel.to_string_lossy().replace('\\', "/"));
    }
    Some(files)
}

fn is_excluded(rel: &Path) -> bool {
    rel.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        s.starts_with('.') || s == "node_modules"
    })
}

/// Files newly present in `post` that were absent from `pre`.
pub fn diff(pre: &HashSet<String>, post: &HashSet<String>) -> Vec<String> {
    let mut files: Vec<String> = post.difference(pre).cloned().collect();
    files.sort();
    files
}

/// Build the run summary from a completed run's per-node file lists.
pub fn build(mission: &Mission, run: &Run, workdir: Option<&str>, completed_at: String) -> RunSummary {
    let mut node_file_map: HashMap<String, Vec<String>> = HashMap::new();
    let mut all_files: HashSet<String> = HashSet::new();

    for node in &mission.nodes {
        if let Some(state) = run.node_states.get(&node.id) {
            if !state.files.is_empty() {
                node_file_map.insert(node.label.clone(), state.files.clone());
                all_files.extend(state.files.iter().cloned());
            }
        }
    }

    let mut files: Vec<String> = all_files.into_iter().collect();
    files.sort();
    files.truncate(SUMMARY_FILE_CAP);

    let setup_hints = setup_hints_for(&files);
    let dirs = directories_of(&files);

    let nodes_total = mission.nodes.len();
    let nodes_completed = run
        .node_states
        .values()
        .filter(|s| s.status == mission_core::NodeStatus::Completed)
        .count();

    RunSummary {
        total_files: files.len(),
        files,
        workdir: workdir.map(|s| s.to_string()),
        node_file_map,
        setup_hints,
        dirs,
        nodes_completed,
        nodes_total,
        completed_at: Some(completed_at),
    }
}

fn setup_hints_for(files: &[String]) -> Vec<String> {
    let mut hints = Vec::new();
    for (marker, hint) in SETUP_HINTS {
        let present = files.iter().any(|f| Path::new(f).file_name().map(|n| n == *marker).unwrap_or(false));
        if present && !hints.contains(&hint.to_string()) {
            hints.push(hint.to_string());
        }
    }
    hints
}

fn directories_of(files: &[String]) -> Vec<String> {
    let mut dirs: HashSet<String> = HashSet::new();
    for f in files {
        if let Some(parent) = Path::new(f).parent() {
            let s = parent.to_string_lossy();
            if !s.is_empty() {
                dirs.insert(s.replace('\\', "/"));
            }
        }
    }
    let mut dirs: Vec<String> = dirs.into_iter().collect();
    dirs.sort();
    dirs
}
