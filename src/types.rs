//! Core types for the a3s-claw engine
//!
//! Wire-facing types (`ExecutionOutcome`, `StreamEvent`, `ContentBlock`)
//! serialize to the agent CLI's existing JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an agent session
///
/// Transitions are monotonic within a single execution
/// (`Starting` → `Running` → `Stopped`/`Error`); a retried attempt
/// re-enters via `start` before re-running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created but not yet handed to the subprocess
    Starting,
    /// Subprocess in flight
    Running,
    /// Last execution completed; the external session can be resumed
    Stopped,
    /// Last execution failed
    Error,
}

/// One external-agent session, owned by the engine for the duration of a
/// call and by the [`SessionStore`](crate::store::SessionStore) between calls
///
/// `external_session_id` is the identifier handed to the agent CLI to
/// resume conversational state in the CLI's own storage. It never changes
/// once assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Internal session identifier (ses-<uuid>)
    pub id: String,

    /// Stable per-conversation identifier passed to the agent CLI
    pub external_session_id: String,

    /// Owning conversation, if the caller supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Current lifecycle state
    pub state: SessionState,

    /// When the last execution started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the last execution stopped (or errored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new session in the `Starting` state
    pub fn new(external_session_id: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            id: format!("ses-{}", uuid::Uuid::new_v4()),
            external_session_id: external_session_id.into(),
            conversation_id,
            state: SessionState::Starting,
            started_at: None,
            stopped_at: None,
        }
    }

    /// Whether the session is currently running
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Whether the session stopped cleanly (and can be resumed)
    pub fn is_stopped(&self) -> bool {
        self.state == SessionState::Stopped
    }

    /// Elapsed time between start and stop, or start and now while running
    pub fn duration(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.stopped_at.unwrap_or_else(Utc::now);
        Some(end - started)
    }
}

/// Caller-supplied handle to the owning conversation
///
/// Stands in for the persistence layer's conversation record; the engine
/// only consumes its identifiers (session ownership, env injection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    /// Conversation identifier
    pub id: String,

    /// Page the conversation renders into, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

impl ConversationRef {
    /// Create a conversation ref with no page
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            page_id: None,
        }
    }

    /// Attach a page id
    pub fn with_page(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }
}

/// Final result of a batch execution
///
/// Serializes to the original wire shape:
/// `{"type":"content","content":...,"done":true}` or
/// `{"type":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// The agent produced a final text response
    Content {
        /// Response text
        content: String,
        /// Always true; kept for wire compatibility
        done: bool,
    },
    /// The execution failed after any applicable retry
    Error {
        /// Human-readable failure description
        message: String,
    },
}

impl ExecutionOutcome {
    /// Build a content outcome
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
            done: true,
        }
    }

    /// Build an error outcome
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this outcome is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// One NDJSON event from the streaming agent subprocess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Assistant turn carrying content blocks
    Assistant {
        /// Content blocks in the order the agent produced them
        #[serde(default)]
        content: Vec<ContentBlock>,
    },

    /// Terminal event for the run
    Result {
        /// Outcome discriminator; `"success"` means the run completed
        subtype: String,

        /// Final response text, when the agent produced one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,

        /// Number of agent turns consumed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num_turns: Option<u64>,

        /// Total run cost in USD
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
    },

    /// Error surfaced by the subprocess or synthesized by the engine
    Error {
        /// Human-readable failure description
        message: String,
    },
}

/// One content block inside an assistant stream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// The agent is reasoning; payload is not consumed
    Thinking,

    /// The agent invoked a tool
    ToolUse {
        /// Tool name
        #[serde(default)]
        name: String,
    },

    /// Streamed response text
    Text {
        /// Text produced so far
        #[serde(default)]
        text: String,
    },
}
