//! Error types for the finance assistant orchestrator

use crate::agents::AgentRole;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Request-fatal Errors
    // =============================

    #[error("Agents not initialized")]
    NotInitialized,

    #[error("Speech-to-text error: {0}")]
    Transcription(String),

    #[error("Text-to-speech error: {0}")]
    Synthesis(String),

    #[error("request deadline of {0} ms exceeded")]
    DeadlineExceeded(u64),

    #[error("request cancelled")]
    Cancelled,

    // =============================
    // Agent Call Errors
    // =============================

    #[error("{role} agent error: {reason}")]
    AgentCall { role: AgentRole, reason: String },

    #[error("{role} agent timed out after {timeout_ms} ms")]
    AgentTimeout { role: AgentRole, timeout_ms: u64 },

    #[error("No agent registered for role {0}")]
    AgentNotRegistered(AgentRole),

    #[error("{role} agent returned an invalid response: {reason}")]
    InvalidAgentResponse { role: AgentRole, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Errors that end a request rather than degrading one stage
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OrchestrationError::NotInitialized
                | OrchestrationError::Transcription(_)
                | OrchestrationError::Synthesis(_)
                | OrchestrationError::DeadlineExceeded(_)
                | OrchestrationError::Cancelled
        )
    }
}
