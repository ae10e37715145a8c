// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mission daemon: HTTP + WebSocket front end over the mission
//! engine. Owns the axum router; the engine and team watcher own all
//! state.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod http;
pub mod ws;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use mission_engine::Engine;
use mission_store::{MissionStore, RunStore};
use mission_watcher::TeamWatcher;

/// Shared handle every axum handler extracts via `State`.
///
/// `missions`/`runs` are separate store handles from the engine's
/// internal ones, used for the read/CRUD paths the engine itself never
/// touches (mission definitions, template CRUD, run listing/reads).
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub watcher: Arc<TeamWatcher>,
    pub missions: Arc<MissionStore>,
    pub runs: Arc<RunStore>,
}
