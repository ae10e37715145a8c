// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mission-engine: the DAG scheduler. Owns the poller lifecycle, node
//! and run state transitions, prompt template resolution, and run
//! summary generation. See `mission-core` for the data model and
//! `mission-provider` for the process boundary this drives.

mod bus;
mod dag;
mod engine;
mod summary;
mod template;

pub use bus::EventBus;
pub use dag::{check_acyclic, check_has_roots, reachable_from, validate};
pub use engine::{Engine, NodeProgress, RunProgress};
pub use summary::build as build_summary;
pub use template::resolve as resolve_template;
