// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the agent command line and the child process environment.
//!
//! `CLAUDECODE` must be *unset*, not set empty — the agent checks for
//! variable existence, not value.

use mission_core::Node;
use tokio::process::Command;

/// Build the `claude` invocation for `node`, with the resolved prompt,
/// model, allowed-tool list, and optional MCP config.
pub fn build_command(node: &Node, resolved_prompt: &str, workdir: Option<&std::path::Path>) -> Command {
    let mut cmd = Command::new("claude");
    cmd.arg("-p").arg(resolved_prompt);
    cmd.arg("--output-format").arg("stream-json");

    if let Some(model) = &node.model {
        cmd.arg("--model").arg(model);
    }
    if !node.mcp_servers.is_empty() {
        cmd.arg("--mcp-config").arg(node.mcp_servers.join(","));
    }
    if !node.skills.is_empty() {
        cmd.arg("--allowed-tools").arg(node.skills.join(","));
    }

    if let Some(dir) = workdir {
        if dir.exists() {
            cmd.current_dir(dir);
        }
    }

    // Inherit the parent environment minus CLAUDECODE: removing the key
    // entirely, not setting it to "", because the agent's check is for
    // variable existence.
    cmd.env_remove("CLAUDECODE");

    // Make the child its own process-group leader so an abort can signal
    // the whole group (e.g. a shell that forked its own children) instead
    // of just this one pid.
    cmd.process_group(0);

    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd
}
