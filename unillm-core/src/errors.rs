//! Error types shared by every backend.
//!
//! The taxonomy mirrors what can go wrong between the runtime and a backend:
//! the caller passed something incompatible ([`InvalidArgumentError`]), the
//! transport failed ([`ApiCallError`]), the backend emitted something the
//! runtime cannot interpret ([`InvalidResponseDataError`]), or a polymorphic
//! payload names a type nobody registered ([`UnknownProviderDataTypeError`]).
//!
//! Settings that merely have no effect are not errors; they travel as
//! [`CallWarning`](crate::messages::CallWarning) entries on the response.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The error type returned by model operations.
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// Transport or HTTP failure reported by the backend.
    #[error(transparent)]
    ApiCall(#[from] ApiCallError),

    /// The caller supplied an incompatible option.
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgumentError),

    /// The backend emitted data missing required fields.
    #[error(transparent)]
    InvalidResponseData(#[from] InvalidResponseDataError),

    /// A polymorphic payload referenced an unregistered type id.
    #[error(transparent)]
    UnknownProviderDataType(#[from] UnknownProviderDataTypeError),

    /// The backend cannot do what was asked at all.
    #[error("Unsupported functionality: {0}")]
    Unsupported(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`ModelError`].
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

impl ModelError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument(InvalidArgumentError::new(argument, message))
    }

    /// Create an invalid-response-data error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponseData(InvalidResponseDataError::new(message))
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Check if retrying the request might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiCall(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// API call failure with everything needed to diagnose it.
#[derive(Error, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCallError {
    /// Error message.
    pub message: String,
    /// Request URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Response headers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub response_headers: HashMap<String, String>,
    /// Dump of the request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    /// Dump of the response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    /// Explicit retry hint from the backend, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl fmt::Display for ApiCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API call error")?;
        if let Some(code) = self.status_code {
            write!(f, " ({})", code)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(ref url) = self.url {
            write!(f, " [{}]", url)?;
        }
        Ok(())
    }
}

impl ApiCallError {
    /// Create a new API call error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the request URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body dump.
    #[must_use]
    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    /// Set the response body dump.
    #[must_use]
    pub fn with_response_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    /// Override the retry classification.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Whether the request may succeed if retried.
    ///
    /// Falls back to the status code: 408, 409, 429 and 5xx are retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        if let Some(explicit) = self.retryable {
            return explicit;
        }
        matches!(self.status_code, Some(408 | 409 | 429) | Some(500..=599))
    }

    /// Check if this is a rate limit response.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        self.status_code == Some(429)
    }
}

/// The caller passed an option the backend cannot work with.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidArgumentError {
    /// Name of the offending argument.
    pub argument: String,
    /// What is wrong with it.
    pub message: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid argument '{}': {}", self.argument, self.message)
    }
}

impl InvalidArgumentError {
    /// Create a new invalid-argument error.
    pub fn new(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

/// The backend produced data the runtime cannot interpret.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidResponseDataError {
    /// Error message.
    pub message: String,
    /// The offending raw event or payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl fmt::Display for InvalidResponseDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid response data: {}", self.message)?;
        if let Some(ref raw) = self.raw {
            write!(f, " (raw: {})", raw)?;
        }
        Ok(())
    }
}

impl InvalidResponseDataError {
    /// Create a new invalid-response-data error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raw: None,
        }
    }

    /// Attach the offending raw data.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// A provider options/metadata envelope referenced an unregistered type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownProviderDataTypeError {
    /// The type id that was looked up.
    pub type_id: String,
}

impl fmt::Display for UnknownProviderDataTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown provider data type: {}", self.type_id)
    }
}

impl UnknownProviderDataTypeError {
    /// Create a new error for the given type id.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_call_error_display() {
        let err = ApiCallError::new("Rate limited")
            .with_status(429)
            .with_url("https://api.example.com/v1/chat");
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("Rate limited"));
        assert!(msg.contains("api.example.com"));
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_api_call_error_retryable() {
        assert!(ApiCallError::new("x").with_status(503).is_retryable());
        assert!(!ApiCallError::new("x").with_status(400).is_retryable());
        assert!(!ApiCallError::new("x")
            .with_status(503)
            .with_retryable(false)
            .is_retryable());
    }

    #[test]
    fn test_model_error_from_parts() {
        let err: ModelError = InvalidArgumentError::new("providerOptions", "wrong type").into();
        assert!(matches!(err, ModelError::InvalidArgument(_)));
        assert!(err.to_string().contains("providerOptions"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_response_carries_raw() {
        let err = InvalidResponseDataError::new("missing id").with_raw(r#"{"type":"text-delta"}"#);
        assert!(err.to_string().contains("text-delta"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ModelError = parse.into();
        assert!(matches!(err, ModelError::Serialization(_)));
    }
}
