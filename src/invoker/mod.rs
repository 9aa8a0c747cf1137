//! Agent invocation trait — the seam between retry logic and the subprocess
//!
//! `AgentInvoker` abstracts one invocation of the external agent CLI so the
//! retry coordinator and engine can be exercised against scripted fakes.
//! The real subprocess implementation lives in [`cli`].

use crate::error::Result;
use crate::types::{ConversationRef, StreamEvent};
use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

pub mod cli;

/// Everything needed for one invocation of the agent CLI
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    /// Effective prompt (already built by the prompt collaborator)
    pub prompt: String,

    /// External session id passed to the CLI
    pub session_uuid: Uuid,

    /// Resume the external session instead of creating it
    pub resuming: bool,

    /// Owning conversation, injected into the subprocess environment
    pub conversation: Option<ConversationRef>,

    /// Tool configuration path; `None` means default/all tools
    pub tool_config: Option<PathBuf>,
}

/// Result of one batch invocation
///
/// A failed subprocess run is data, not an error: the retry coordinator
/// inspects the message to decide whether a second attempt is warranted.
/// `Err` is reserved for conditions that end the call outright (missing
/// executable, pipe plumbing faults).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The subprocess exited successfully; `stdout` holds the JSON document
    Completed {
        /// Raw stdout of the run
        stdout: String,
    },
    /// The subprocess exited with a failure status
    Failed {
        /// Human-readable failure description (exit code or signal + detail)
        message: String,
    },
}

impl BatchOutcome {
    /// Whether this outcome is a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Callback receiving stream events as they are parsed
pub type EventSink<'a> = &'a mut (dyn FnMut(StreamEvent) + Send);

/// One invocation of the external agent CLI
///
/// Implementations own exactly one subprocess per call and must not block
/// past the subprocess's own lifetime.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Run the agent to completion, capturing stdout as a single document
    async fn invoke_batch(&self, request: &InvokeRequest) -> Result<BatchOutcome>;

    /// Run the agent with line-delimited output, delivering each parsed
    /// event to `on_event`; returns whether the run succeeded
    async fn invoke_streaming(
        &self,
        request: &InvokeRequest,
        on_event: EventSink<'_>,
    ) -> Result<bool>;
}
