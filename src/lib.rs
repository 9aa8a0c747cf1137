//! # a3s-claw
//!
//! Resumable session execution engine for external agent CLIs.
//!
//! ## Overview
//!
//! `a3s-claw` drives a long-lived conversational session against a
//! stateful agent CLI subprocess. Each conversation maps to a durable
//! session that is created on first use, resumed across process restarts,
//! and retried once under the two known failure modes (an expired resume,
//! an externally-held session id). Batch and streaming execution share the
//! same retry semantics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a3s_claw::{AgentEngine, CliInvoker, ConversationRef, MemorySessionStore};
//!
//! # async fn example() {
//! let engine = AgentEngine::new(CliInvoker::default(), MemorySessionStore::new());
//!
//! let conversation = ConversationRef::new("conversation-42");
//! let outcome = engine
//!     .execute("Summarize the open tasks", "conversation-42", Some(&conversation))
//!     .await;
//!
//! println!("{outcome:?}");
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **AgentInvoker** trait — one invocation of the agent CLI; the
//!   subprocess implementation is `CliInvoker`
//! - **SessionStore** trait — session persistence seam with a bundled
//!   in-memory backend
//! - **RetryCoordinator** — resume-vs-fresh decision tree, one retry max
//! - **AgentEngine** — façade combining identity derivation, session
//!   resolution, prompt construction, and retry coordination
//!
//! Streaming runs read stdout line by line while a dedicated task drains
//! stderr, so a chatty subprocess can never deadlock the engine on a full
//! pipe buffer.

pub mod engine;
pub mod error;
pub mod identity;
pub mod invoker;
pub mod parse;
pub mod prompt;
pub mod retry;
pub mod store;
pub mod tools;
pub mod types;

// Re-export core types
pub use engine::AgentEngine;
pub use error::{ClawError, Result};
pub use identity::session_uuid;
pub use invoker::cli::{CliConfig, CliInvoker};
pub use invoker::{AgentInvoker, BatchOutcome, EventSink, InvokeRequest};
pub use parse::{parse_batch, parse_event};
pub use prompt::{PassthroughPromptBuilder, PromptBuilder};
pub use retry::RetryCoordinator;
pub use store::{MemorySessionStore, SessionStore};
pub use tools::{FixedToolConfig, ToolConfigResolver};
pub use types::{
    ContentBlock, ConversationRef, ExecutionOutcome, Session, SessionState, StreamEvent,
};
