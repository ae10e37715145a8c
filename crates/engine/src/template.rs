// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt template resolution: `{context.KEY}` and `{NODEID.output}`
//! placeholders, expanded in a single top-to-bottom pass. Unresolved
//! placeholders are left verbatim.

use mission_core::Run;
use regex::Regex;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z0-9_.-]+)\.([A-Za-z0-9_]+)\}").expect("constant regex pattern is valid")
});

/// Resolve `prompt` against the run's snapshotted `context` map and its
/// per-node state. A single pass: no nested expansion.
pub fn resolve(prompt: &str, run: &Run) -> String {
    PLACEHOLDER
        .replace_all(prompt, |caps: &regex::Captures| {
            let scope = &caps[1];
            let field = &caps[2];
            if scope == "context" {
                return run.context.get(field).cloned().unwrap_or_else(|| caps[0].to_string());
            }
            if field == "output" {
                if let Some(state) = run.node_states.get(scope) {
                    if let Some(output) = &state.output {
                        return output.clone();
                    }
                }
            }
            caps[0].to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_core::{MissionId, NodeState, Run, RunId, RunStatus};
    use std::collections::HashMap;

    fn run_with_output(node_id: &str, output: &str, ctx: &[(&str, &str)]) -> Run {
        let mut node_states = HashMap::new();
        let mut state = NodeState::pending();
        state.output = Some(output.to_string());
        node_states.insert(node_id.to_string(), state);
        Run {
            id: RunId::new(),
            mission_id: MissionId::new(),
            status: RunStatus::Running,
            started_at: String::new(),
            completed_at: None,
            error: None,
            workdir: None,
            node_states,
            messages: Vec::new(),
            summary: None,
            context: ctx.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn resolves_context_placeholder() {
        let run = run_with_output("a", "", &[("LANG", "rust")]);
        assert_eq!(resolve("write {context.LANG} code", &run), "write rust code");
    }

    #[test]
    fn resolves_node_output_placeholder() {
        let run = run_with_output("a", "the plan", &[]);
        assert_eq!(resolve("use {a.output} as input", &run), "use the plan as input");
    }

    #[test]
    fn unresolved_placeholder_left_verbatim() {
        let run = run_with_output("a", "", &[]);
        assert_eq!(resolve("see {context.MISSING}", &run), "see {context.MISSING}");
        assert_eq!(resolve("see {b.output}", &run), "see {b.output}");
    }

    #[test]
    fn no_nested_expansion() {
        let run = run_with_output("a", "value", &[("KEY", "{a.output}")]);
        assert_eq!(resolve("{context.KEY}", &run), "{a.output}");
    }
}
