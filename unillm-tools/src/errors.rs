//! Tool-specific error types.
//!
//! A tool error never aborts an agent run on its own: the orchestrator turns
//! it into an error-kind tool result so the model can see it and react.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool execution failed.
    #[error("Tool execution failed: {message}")]
    ExecutionFailed {
        /// Error message.
        message: String,
        /// Whether this error is retryable.
        retryable: bool,
    },

    /// Invalid arguments provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool not found in the tool set.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Tool execution timed out.
    #[error("Tool execution timed out after {0:?}")]
    Timeout(Duration),

    /// Tool was cancelled.
    #[error("Tool execution cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ExecutionFailed { retryable, .. } => *retryable,
            Self::Timeout(_) => true,
            Self::InvalidArguments(_)
            | Self::NotFound(_)
            | Self::Cancelled
            | Self::Json(_)
            | Self::Other(_) => false,
        }
    }

    /// Create a non-retryable execution failure.
    #[must_use]
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create a retryable execution failure.
    #[must_use]
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ToolError::retryable("flaky").is_retryable());
        assert!(!ToolError::execution_failed("broken").is_retryable());
        assert!(ToolError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ToolError::not_found("x").is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(ToolError::not_found("weather").to_string(), "Tool not found: weather");
        assert_eq!(
            ToolError::invalid_args("missing 'city'").to_string(),
            "Invalid arguments: missing 'city'"
        );
    }
}
