//! Parsing of agent CLI output
//!
//! Batch mode produces a single JSON document on stdout; streaming mode
//! produces one JSON object per line. Both are parsed leniently: agents
//! interleave non-JSON noise into long-running streams, and a noisy line
//! must never fail a run.

use crate::types::{ContentBlock, ExecutionOutcome, StreamEvent};
use serde_json::Value;

/// Parse the batch-mode stdout of the agent subprocess
///
/// Preference order for the response text: `result` field, then `content`
/// field, then a synthesized tool-use summary when the agent spent its
/// whole turn budget without a final message. Output that is not JSON at
/// all is passed through as plain text rather than treated as an error.
pub fn parse_batch(stdout: &str) -> ExecutionOutcome {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return ExecutionOutcome::error("Empty response from agent");
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(data) => {
            let mut content = field_text(&data, "result");
            if content.is_empty() {
                content = field_text(&data, "content");
            }
            if content.is_empty() {
                content = summarize_tool_use(&data);
            }
            ExecutionOutcome::content(content)
        }
        Err(_) => ExecutionOutcome::content(trimmed),
    }
}

/// Parse one NDJSON line from the streaming agent subprocess
///
/// Returns `None` for empty lines, non-JSON noise (logged at warn),
/// events with an unrecognized `type` (logged at debug), and events whose
/// payload does not match the documented shape. Content blocks of an
/// `assistant` event are parsed individually so one exotic block cannot
/// poison the whole event.
pub fn parse_event(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(line = %truncate(trimmed, 200), "Non-JSON line from agent stream");
            return None;
        }
    };

    match value.get("type").and_then(Value::as_str) {
        Some("assistant") => {
            let content = value
                .get("content")
                .and_then(Value::as_array)
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter_map(|block| {
                            match serde_json::from_value::<ContentBlock>(block.clone()) {
                                Ok(parsed) => Some(parsed),
                                Err(_) => {
                                    tracing::debug!(
                                        block_type = block
                                            .get("type")
                                            .and_then(serde_json::Value::as_str)
                                            .unwrap_or("?"),
                                        "Skipping unrecognized content block"
                                    );
                                    None
                                }
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(StreamEvent::Assistant { content })
        }
        Some("result") | Some("error") => match serde_json::from_value::<StreamEvent>(value) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(error = %err, "Malformed event from agent stream");
                None
            }
        },
        Some(other) => {
            tracing::debug!(event_type = %other, "Ignoring unhandled agent event");
            None
        }
        None => {
            tracing::warn!(line = %truncate(trimmed, 200), "Agent stream event has no type");
            None
        }
    }
}

/// Extract a JSON string field as trimmed text
///
/// Returns an empty string when the field is absent or not a string, so a
/// missing or whitespace-only field is treated as blank by the caller.
fn field_text(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string()
}

/// Summarize a run that produced no final text
///
/// The agent can consume its entire turn budget on tool use; surface the
/// turn count and cost instead of an empty message.
pub fn summarize_tool_use(data: &Value) -> String {
    let mut parts = Vec::new();
    if let Some(turns) = data.get("num_turns").and_then(Value::as_u64) {
        parts.push(format!("Completed in {turns} turn(s)."));
    }
    if let Some(cost) = data.get("total_cost_usd").and_then(Value::as_f64) {
        parts.push(format!("Cost: ${cost:.4}."));
    }
    if parts.is_empty() {
        "Task completed (no text response).".to_string()
    } else {
        parts.join(" ")
    }
}

/// Extract a human-readable failure detail from subprocess output
///
/// Each stderr line is tried as JSON and its `message` field preferred
/// over the raw line (newer CLIs emit structured errors on stderr). Empty
/// stderr falls back to trailing stdout text, then to "(no output)".
pub(crate) fn extract_error_detail(stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr
            .lines()
            .map(|line| {
                serde_json::from_str::<Value>(line)
                    .ok()
                    .and_then(|value| {
                        value
                            .get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| line.to_string())
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    let stdout = stdout.trim();
    if stdout.is_empty() {
        "(no output)".to_string()
    } else {
        stdout.to_string()
    }
}

/// Truncate to at most `max` bytes on a char boundary, for log lines
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
