//! Error types for a3s-claw

use thiserror::Error;

/// Errors that can occur while driving the agent CLI
#[derive(Debug, Error)]
pub enum ClawError {
    /// The agent executable could not be located (fatal, never retried)
    #[error("{0} command not found")]
    MissingBinary(String),

    /// Subprocess plumbing failure (spawn, pipe wiring, wait)
    #[error("Subprocess error: {0}")]
    Subprocess(String),

    /// Session store collaborator failure
    #[error("Session store error: {0}")]
    Store(String),

    /// Prompt builder collaborator failure
    #[error("Prompt builder error: {0}")]
    Prompt(String),

    /// I/O failure while talking to the subprocess
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ClawError>;
