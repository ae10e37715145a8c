// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SIGTERM-then-SIGKILL escalation for aborting a child agent process.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::time::Duration;
use tracing::warn;

/// Send SIGTERM, wait up to `grace`, then SIGKILL if the process is
/// still alive. Idempotent: a process that is already gone is silently
/// ignored (`kill` on a dead pid returns `ESRCH`, not an error we act on).
///
/// Every child is spawned as its own process-group leader, so the
/// negated pid targets the whole group and reaps any shell children it
/// forked along the way.
pub async fn terminate_then_kill(pid: u32, grace: Duration) {
    let target = Pid::from_raw(-(pid as i32));

    if let Err(e) = kill(target, Signal::SIGTERM) {
        if e != nix::errno::Errno::ESRCH {
            warn!(pid, error = %e, "SIGTERM delivery failed");
        }
        return;
    }

    tokio::time::sleep(grace).await;

    if process_is_alive(pid) {
        if let Err(e) = kill(target, Signal::SIGKILL) {
            if e != nix::errno::Errno::ESRCH {
                warn!(pid, error = %e, "SIGKILL delivery failed");
            }
        }
    }
}

/// Signal 0 delivers no signal but still validates that the pid exists
/// and is reachable.
pub fn process_is_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}
