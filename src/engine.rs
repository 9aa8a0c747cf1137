//! Agent engine façade
//!
//! Combines identity derivation, session resolution, prompt construction,
//! and retry coordination into two entry points: `execute` (batch) and
//! `execute_streaming` (event callback). Callers only ever receive a
//! well-formed outcome; no internal error or hung subprocess escapes.

use crate::identity;
use crate::invoker::{AgentInvoker, InvokeRequest};
use crate::prompt::{PassthroughPromptBuilder, PromptBuilder};
use crate::retry::RetryCoordinator;
use crate::store::SessionStore;
use crate::tools::{FixedToolConfig, ToolConfigResolver};
use crate::types::{ConversationRef, ExecutionOutcome, StreamEvent};
use std::sync::Arc;

/// Execution engine for an external agent CLI
///
/// Instantiated with its collaborators injected; holds no global state.
/// One subprocess runs per in-flight call, and concurrent calls for
/// different conversations share nothing but the store.
pub struct AgentEngine {
    invoker: Arc<dyn AgentInvoker>,
    store: Arc<dyn SessionStore>,
    prompts: Arc<dyn PromptBuilder>,
    tools: Arc<dyn ToolConfigResolver>,
}

impl AgentEngine {
    /// Create an engine from an invoker and a session store
    ///
    /// The prompt builder defaults to passthrough and the tool config to
    /// none (all tools); override with [`with_prompt_builder`](Self::with_prompt_builder)
    /// and [`with_tool_config`](Self::with_tool_config).
    pub fn new(invoker: impl AgentInvoker + 'static, store: impl SessionStore + 'static) -> Self {
        Self {
            invoker: Arc::new(invoker),
            store: Arc::new(store),
            prompts: Arc::new(PassthroughPromptBuilder),
            tools: Arc::new(FixedToolConfig::none()),
        }
    }

    /// Replace the prompt builder collaborator
    pub fn with_prompt_builder(mut self, prompts: impl PromptBuilder + 'static) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Replace the tool config resolver collaborator
    pub fn with_tool_config(mut self, tools: impl ToolConfigResolver + 'static) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    /// Access the session store
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Execute a prompt and return the final outcome
    ///
    /// Derives the external session id from `session_key`, resolves the
    /// session, and runs the subprocess under the retry policy. Every
    /// failure mode is folded into an [`ExecutionOutcome::Error`].
    pub async fn execute(
        &self,
        prompt: &str,
        session_key: &str,
        conversation: Option<&ConversationRef>,
    ) -> ExecutionOutcome {
        let mut session_id = None;
        match self
            .execute_inner(prompt, session_key, conversation, &mut session_id)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "Agent execution failed");
                self.fail_session(session_id).await;
                ExecutionOutcome::error(err.to_string())
            }
        }
    }

    /// Execute a prompt, delivering parsed stream events as they arrive
    ///
    /// Returns whether the run succeeded. On internal failure a final
    /// error event is delivered before `false` is returned.
    pub async fn execute_streaming(
        &self,
        prompt: &str,
        session_key: &str,
        conversation: Option<&ConversationRef>,
        mut on_event: impl FnMut(StreamEvent) + Send,
    ) -> bool {
        let mut session_id = None;
        match self
            .streaming_inner(prompt, session_key, conversation, &mut session_id, &mut on_event)
            .await
        {
            Ok(success) => success,
            Err(err) => {
                tracing::error!(error = %err, "Streaming agent execution failed");
                self.fail_session(session_id).await;
                on_event(StreamEvent::Error {
                    message: err.to_string(),
                });
                false
            }
        }
    }

    async fn execute_inner(
        &self,
        prompt: &str,
        session_key: &str,
        conversation: Option<&ConversationRef>,
        session_id: &mut Option<String>,
    ) -> crate::Result<ExecutionOutcome> {
        let (session, request) = self
            .prepare(prompt, session_key, conversation, session_id)
            .await?;
        RetryCoordinator::new(self.invoker.as_ref(), self.store.as_ref())
            .run_batch(&session, request)
            .await
    }

    async fn streaming_inner(
        &self,
        prompt: &str,
        session_key: &str,
        conversation: Option<&ConversationRef>,
        session_id: &mut Option<String>,
        on_event: &mut (dyn FnMut(StreamEvent) + Send),
    ) -> crate::Result<bool> {
        let (session, request) = self
            .prepare(prompt, session_key, conversation, session_id)
            .await?;
        RetryCoordinator::new(self.invoker.as_ref(), self.store.as_ref())
            .run_streaming(&session, request, on_event)
            .await
    }

    /// Shared setup: identity, session resolution, prompt, request
    async fn prepare(
        &self,
        prompt: &str,
        session_key: &str,
        conversation: Option<&ConversationRef>,
        session_id: &mut Option<String>,
    ) -> crate::Result<(crate::types::Session, InvokeRequest)> {
        let session_uuid = identity::session_uuid(session_key);
        let session = self
            .store
            .find_or_create(conversation, &session_uuid.to_string())
            .await?;
        *session_id = Some(session.id.clone());

        // Resume only when the previous run for this conversation stopped
        // cleanly; a fresh or errored session gets a new external session.
        let resuming = session.is_stopped();

        let effective_prompt = self.prompts.build(prompt, conversation).await?;
        let request = InvokeRequest {
            prompt: effective_prompt,
            session_uuid,
            resuming,
            conversation: conversation.cloned(),
            tool_config: self.tools.tool_config(conversation),
        };
        Ok((session, request))
    }

    /// Best-effort error marking for the catch-all paths
    async fn fail_session(&self, session_id: Option<String>) {
        if let Some(id) = session_id {
            if let Err(err) = self.store.mark_error(&id).await {
                tracing::warn!(session = %id, error = %err, "Failed to mark session as errored");
            }
        }
    }
}
