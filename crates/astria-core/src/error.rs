//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Text shown in place of a reply when an exchange cannot complete
pub const FALLBACK_REPLY: &str =
    "I encountered an error processing your request. Please ensure the API key is valid and try again.";

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Credential missing or rejected; the exchange never starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model call (initial turn or tool-result follow-up) failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Tool arguments did not match the declared schema
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Operation not allowed in the current state (e.g. settling a terminal record)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable by sending the message again
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether this error belongs to a single tool rather than the exchange
    pub const fn is_tool_error(&self) -> bool {
        matches!(self, Self::ToolValidation(_) | Self::ToolExecution(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Transport(_) => FALLBACK_REPLY.into(),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
