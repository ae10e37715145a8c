// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safe atomic JSON writes: write to `<path>.tmp-<rand>`, then
//! rename onto the target. Callers see either the old or the new file,
//! never a partial one. On failure the temp file is best-effort unlinked.

use mission_core::MissionError;
use std::path::{Path, PathBuf};

/// Strip path separators and `..` components from an id that will be
/// joined onto a directory. Failed sanitization is a programmer error —
/// ids reaching this layer are expected to already be well-formed.
pub fn sanitize_id(id: &str) -> Result<String, MissionError> {
    if id.is_empty() {
        return Err(MissionError::InvalidInput("empty id".to_string()));
    }
    let cleaned: String = id
        .chars()
        .filter(|c| *c != '/' && *c != '\\')
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." || cleaned.contains("..") {
        return Err(MissionError::InvalidInput(format!("unsafe id: {id:?}")));
    }
    Ok(cleaned)
}

/// Atomically write `bytes` to `path`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rand_suffix: u32 = {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(0);
        nanos ^ (std::process::id())
    };
    let tmp_path: PathBuf = path.with_extension(format!("tmp-{rand_suffix:x}"));

    let result = std::fs::write(&tmp_path, bytes).and_then(|_| std::fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

/// Atomically write a JSON-serializable value to `path`.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), MissionError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &bytes).map_err(MissionError::from)
}

/// Read and parse a JSON file. Missing file -> `Ok(None)`. Parse errors
/// are treated as absent (the caller must not proceed to write on that
/// assumption) but are logged by the caller, not here.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}
