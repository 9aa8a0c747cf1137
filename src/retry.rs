//! Resume-vs-fresh retry coordination
//!
//! An external session that stopped cleanly is resumed on the next run;
//! resume can fail (the CLI may have expired the session), and creating a
//! session can fail because the id is already live on the CLI side. Both
//! conditions get exactly one corrective retry, then the run's outcome is
//! final. The session record is walked through its states around each
//! attempt.

use crate::error::Result;
use crate::invoker::{AgentInvoker, BatchOutcome, EventSink, InvokeRequest};
use crate::parse::parse_batch;
use crate::store::SessionStore;
use crate::types::{ExecutionOutcome, Session};

/// Detect the CLI's "session id already in use" failure
///
/// String matching is fragile but it is all the CLI exposes today; kept
/// in one place so a structured error code can replace it.
pub(crate) fn session_in_use(message: &str) -> bool {
    message.contains("already in use")
}

/// Orchestrates bounded retries around an invoker
///
/// Borrows its collaborators for the duration of one call; owns no state.
pub struct RetryCoordinator<'a> {
    invoker: &'a dyn AgentInvoker,
    store: &'a dyn SessionStore,
}

impl<'a> RetryCoordinator<'a> {
    /// Create a coordinator over the given invoker and store
    pub fn new(invoker: &'a dyn AgentInvoker, store: &'a dyn SessionStore) -> Self {
        Self { invoker, store }
    }

    /// Run a batch invocation with at most one corrective retry
    ///
    /// Decision order on failure: a failed resume is retried as a fresh
    /// session; otherwise a fresh attempt rejected because the id is
    /// already in use is retried as a resume. The two triggers are
    /// mutually exclusive per call.
    pub async fn run_batch(
        &self,
        session: &Session,
        mut request: InvokeRequest,
    ) -> Result<ExecutionOutcome> {
        self.store.start(&session.id).await?;

        let mut outcome = self.invoker.invoke_batch(&request).await?;

        let retry_as = match &outcome {
            BatchOutcome::Failed { .. } if request.resuming => {
                tracing::warn!(session = %request.session_uuid, "Resume failed, starting fresh session");
                Some(false)
            }
            BatchOutcome::Failed { message } if session_in_use(message) => {
                tracing::warn!(session = %request.session_uuid, "Session id in use, retrying with resume");
                Some(true)
            }
            _ => None,
        };

        if let Some(resuming) = retry_as {
            request.resuming = resuming;
            self.store.start(&session.id).await?;
            outcome = self.invoker.invoke_batch(&request).await?;
        }

        match outcome {
            BatchOutcome::Completed { stdout } => {
                self.store.stop(&session.id).await?;
                Ok(parse_batch(&stdout))
            }
            BatchOutcome::Failed { message } => {
                self.store.mark_error(&session.id).await?;
                Ok(ExecutionOutcome::error(message))
            }
        }
    }

    /// Run a streaming invocation with at most one corrective retry
    ///
    /// Streaming implements only the resume-failed path; the "already in
    /// use" failure is not detectable here because stderr is folded into
    /// stream events rather than returned.
    pub async fn run_streaming(
        &self,
        session: &Session,
        mut request: InvokeRequest,
        on_event: EventSink<'_>,
    ) -> Result<bool> {
        self.store.start(&session.id).await?;

        let mut success = self.invoker.invoke_streaming(&request, &mut *on_event).await?;

        if !success && request.resuming {
            tracing::warn!(session = %request.session_uuid, "Resume failed (streaming), starting fresh session");
            request.resuming = false;
            self.store.start(&session.id).await?;
            success = self.invoker.invoke_streaming(&request, &mut *on_event).await?;
        }

        if success {
            self.store.stop(&session.id).await?;
        } else {
            self.store.mark_error(&session.id).await?;
        }

        Ok(success)
    }
}
