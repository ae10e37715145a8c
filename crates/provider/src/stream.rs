// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of the agent's stdout JSON-lines stream and stderr chunks.

use serde::Deserialize;

const ACTIVE_FORM_MAX_CHARS: usize = 200;
const STDERR_MAX_CHARS: usize = 80;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StdoutLine {
    #[serde(rename = "assistant")]
    Assistant { message: AssistantMessage },
    #[serde(rename = "result")]
    Result { result: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// What a single stdout line told us, if anything.
#[derive(Debug, PartialEq, Eq)]
pub enum StdoutEvent {
    /// Progress text, truncated to the last `ACTIVE_FORM_MAX_CHARS` chars.
    ActiveForm(String),
    /// Final captured output.
    Result(String),
    /// Unparseable or irrelevant line — partial chunks across reads are
    /// expected and silently skipped.
    None,
}

/// Parse one line of the agent's stdout stream.
pub fn parse_stdout_line(line: &str) -> StdoutEvent {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return StdoutEvent::None;
    }
    let Ok(parsed) = serde_json::from_str::<StdoutLine>(trimmed) else {
        return StdoutEvent::None;
    };
    match parsed {
        StdoutLine::Assistant { message } => {
            let text: String = message
                .content
                .into_iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text)
                .collect::<Vec<_>>()
                .join("");
            if text.is_empty() {
                StdoutEvent::None
            } else {
                StdoutEvent::ActiveForm(last_n_chars(&text, ACTIVE_FORM_MAX_CHARS))
            }
        }
        StdoutLine::Result { result } => StdoutEvent::Result(result),
        StdoutLine::Other => StdoutEvent::None,
    }
}

/// Cap a stderr chunk at `STDERR_MAX_CHARS` for use as a non-fatal
/// `activeForm` update.
pub fn stderr_active_form(chunk: &str) -> String {
    last_n_chars(chunk.trim(), STDERR_MAX_CHARS)
}

fn last_n_chars(s: &str, n: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= n {
        return s.to_string();
    }
    s.chars().skip(char_count - n).collect()
}
