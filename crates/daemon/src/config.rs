// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: store root, bind port, single-instance lock.

use std::path::PathBuf;

use mission_store::StoreRoot;

const DEFAULT_PORT: u16 = 3848;

pub struct Config {
    pub store_root: StoreRoot,
    pub port: u16,
    pub lock_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let store_root = StoreRoot::resolve_default();
        let port = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT);
        let lock_path = store_root.root().join("missiond.lock");
        let log_dir = store_root.root().join("logs");
        Self { store_root, port, lock_path, log_dir }
    }
}
