//! Prompt construction seam
//!
//! The effective prompt handed to the subprocess may differ from the raw
//! user text: the surrounding system compresses long conversations through
//! a summarization model before each run. That call is a collaborator
//! concern; the engine only needs the seam.

use crate::error::Result;
use crate::types::ConversationRef;
use async_trait::async_trait;

/// Builds the effective prompt for one execution
#[async_trait]
pub trait PromptBuilder: Send + Sync {
    /// Produce the prompt to hand to the agent CLI
    ///
    /// Failures here abort the execution and surface as an error outcome;
    /// implementations that prefer degraded prompts over failed runs
    /// should fall back to the raw text themselves.
    async fn build(&self, raw: &str, conversation: Option<&ConversationRef>) -> Result<String>;
}

/// Default builder: the raw text is the prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPromptBuilder;

#[async_trait]
impl PromptBuilder for PassthroughPromptBuilder {
    async fn build(&self, raw: &str, _conversation: Option<&ConversationRef>) -> Result<String> {
        Ok(raw.to_string())
    }
}
