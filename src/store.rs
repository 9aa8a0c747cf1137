//! Session persistence layer
//!
//! Provides pluggable session storage via the `SessionStore` trait. The
//! engine resolves one `Session` per conversation and walks it through
//! `start`/`stop`/`mark_error` around each subprocess run; everything else
//! about persistence (schema, cleanup, concurrency control across racing
//! calls for the same conversation) belongs to the backend.
//!
//! ## Default Implementation
//!
//! `MemorySessionStore` keeps sessions in process memory, for tests and
//! single-process embedding.
//!
//! ## Custom Backends
//!
//! Implement `SessionStore` for custom backends (SQL, Redis, etc.):
//!
//! ```ignore
//! use a3s_claw::{ConversationRef, Session, SessionStore};
//!
//! struct SqlStore { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl SessionStore for SqlStore {
//!     async fn find_or_create(
//!         &self,
//!         conversation: Option<&ConversationRef>,
//!         external_id: &str,
//!     ) -> a3s_claw::Result<Session> { /* ... */ }
//!     // ...
//! }
//! ```

use crate::error::{ClawError, Result};
use crate::types::{ConversationRef, Session, SessionState};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence seam for agent sessions
///
/// All state transitions the engine performs go through this trait, so a
/// backend can attach timestamps, auditing, or row locking as it sees fit.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve the session for a conversation/external-id pair, creating
    /// it in the `Starting` state on first use
    ///
    /// Without a conversation there is nothing to key reuse on, so a fresh
    /// session is created per call.
    async fn find_or_create(
        &self,
        conversation: Option<&ConversationRef>,
        external_id: &str,
    ) -> Result<Session>;

    /// Transition a session into `Running`, stamping `started_at`
    async fn start(&self, session_id: &str) -> Result<()>;

    /// Transition a session into `Stopped`, stamping `stopped_at`
    async fn stop(&self, session_id: &str) -> Result<()>;

    /// Transition a session into `Error`, stamping `stopped_at`
    async fn mark_error(&self, session_id: &str) -> Result<()>;

    /// Whether the session last stopped cleanly (and can be resumed)
    async fn is_stopped(&self, session_id: &str) -> Result<bool>;

    /// Whether any session exists for the given external id
    async fn exists(&self, external_id: &str) -> Result<bool>;
}

/// In-memory session store for testing and single-process use
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a session snapshot by internal id
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// List sessions, optionally filtered by state
    pub async fn list(&self, state: Option<SessionState>) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| state.map_or(true, |s| session.state == s))
            .cloned()
            .collect()
    }

    async fn update(
        &self,
        session_id: &str,
        apply: impl FnOnce(&mut Session) + Send,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ClawError::Store(format!("Session not found: {session_id}")))?;
        apply(session);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_or_create(
        &self,
        conversation: Option<&ConversationRef>,
        external_id: &str,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write().await;

        if let Some(conversation) = conversation {
            if let Some(existing) = sessions.values().find(|session| {
                session.conversation_id.as_deref() == Some(conversation.id.as_str())
                    && session.external_session_id == external_id
            }) {
                return Ok(existing.clone());
            }
            let session = Session::new(external_id, Some(conversation.id.clone()));
            sessions.insert(session.id.clone(), session.clone());
            return Ok(session);
        }

        let session = Session::new(external_id, None);
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn start(&self, session_id: &str) -> Result<()> {
        self.update(session_id, |session| {
            session.state = SessionState::Running;
            session.started_at = Some(Utc::now());
        })
        .await
    }

    async fn stop(&self, session_id: &str) -> Result<()> {
        self.update(session_id, |session| {
            session.state = SessionState::Stopped;
            session.stopped_at = Some(Utc::now());
        })
        .await
    }

    async fn mark_error(&self, session_id: &str) -> Result<()> {
        self.update(session_id, |session| {
            session.state = SessionState::Error;
            session.stopped_at = Some(Utc::now());
        })
        .await
    }

    async fn is_stopped(&self, session_id: &str) -> Result<bool> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(Session::is_stopped)
            .unwrap_or(false))
    }

    async fn exists(&self, external_id: &str) -> Result<bool> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .any(|session| session.external_session_id == external_id))
    }
}
