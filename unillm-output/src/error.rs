//! Error types for structured object generation.

use std::fmt;
use thiserror::Error;
use unillm_core::{FinishReason, ModelError, Usage};
use unillm_streaming::StreamError;

/// Errors from the structured object pipeline.
#[derive(Debug, Clone, Error)]
pub enum ObjectError {
    /// The model call failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The target schema could not be compiled or used.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The output is not valid JSON.
    #[error("Failed to parse JSON: {0}")]
    Parse(String),

    /// The output is JSON but violates the schema.
    #[error("Schema validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The model answered without calling the object tool.
    #[error("Model did not call the '{0}' tool")]
    MissingToolCall(String),

    /// The validated object does not deserialize into the target type.
    #[error("Object does not match the target type: {0}")]
    Deserialize(String),

    /// Parsing and validation failed, repair included.
    #[error(transparent)]
    NoObjectGenerated(#[from] NoObjectGeneratedError),
}

impl ObjectError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Check if the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Model(e) if e.is_cancelled())
    }
}

impl From<StreamError> for ObjectError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Model(e) => Self::Model(e),
            other => Self::Model(ModelError::other(other.to_string())),
        }
    }
}

/// No valid object could be produced.
///
/// Carries what the model produced so callers can log or retry.
#[derive(Debug, Clone)]
pub struct NoObjectGeneratedError {
    /// Raw text or tool input the model produced.
    pub raw_text: String,
    /// Usage observed so far.
    pub usage: Usage,
    /// Finish reason observed, if the model finished.
    pub finish_reason: Option<FinishReason>,
    /// Why the last attempt failed.
    pub cause: Box<ObjectError>,
}

impl NoObjectGeneratedError {
    /// Create a new error.
    pub fn new(raw_text: impl Into<String>, cause: ObjectError) -> Self {
        Self {
            raw_text: raw_text.into(),
            usage: Usage::default(),
            finish_reason: None,
            cause: Box::new(cause),
        }
    }

    /// Set observed usage.
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Set observed finish reason.
    #[must_use]
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }
}

impl fmt::Display for NoObjectGeneratedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No object generated: {}", self.cause)
    }
}

impl std::error::Error for NoObjectGeneratedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}
