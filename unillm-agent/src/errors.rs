//! Agent-specific error types.
//!
//! Tool failures are not errors at this level; they become error-kind tool
//! results the model gets to see. Everything here aborts the run.

use thiserror::Error;
use unillm_core::{ModelError, UsageLimitExceeded};
use unillm_streaming::StreamError;

/// Errors that can occur during an agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model returned an error.
    #[error("Model error: {0}")]
    Model(#[source] ModelError),

    /// A user callback returned an error.
    #[error("{callback} callback failed: {source}")]
    Callback {
        /// Name of the callback.
        callback: &'static str,
        /// The callback's error.
        #[source]
        source: anyhow::Error,
    },

    /// Cumulative usage went past the configured limits.
    #[error(transparent)]
    UsageLimitExceeded(#[from] UsageLimitExceeded),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Agent was cancelled.
    #[error("Agent run was cancelled")]
    Cancelled,
}

impl AgentError {
    /// Create a callback error.
    pub fn callback(callback: &'static str, source: anyhow::Error) -> Self {
        Self::Callback { callback, source }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The underlying model error, if any.
    #[must_use]
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for AgentError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Cancelled => Self::Cancelled,
            other => Self::Model(other),
        }
    }
}

impl From<StreamError> for AgentError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Model(e) => e.into(),
            StreamError::Callback { callback, source } => Self::Callback { callback, source },
        }
    }
}
