//! Streaming errors.

use thiserror::Error;
use unillm_core::{InvalidResponseDataError, ModelError};

/// Errors that can occur while consuming a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The backend reported an error, or the stream broke protocol.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A user callback returned an error.
    #[error("{callback} callback failed: {source}")]
    Callback {
        /// Name of the callback.
        callback: &'static str,
        /// The callback's error.
        #[source]
        source: anyhow::Error,
    },
}

impl StreamError {
    /// Create a callback error.
    pub fn callback(callback: &'static str, source: anyhow::Error) -> Self {
        Self::Callback { callback, source }
    }

    /// Create an invalid response error carrying the offending event.
    pub fn invalid_response(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Model(InvalidResponseDataError::new(message).with_raw(raw).into())
    }

    /// Check if the stream was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Model(e) if e.is_cancelled())
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_error_display() {
        let err = StreamError::callback("on_text_delta", anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "on_text_delta callback failed: disk full");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_invalid_response_keeps_raw() {
        match StreamError::invalid_response("unknown block", "TextDelta { id: \"9\" }") {
            StreamError::Model(ModelError::InvalidResponseData(e)) => {
                assert_eq!(e.raw.as_deref(), Some("TextDelta { id: \"9\" }"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(StreamError::from(ModelError::Cancelled).is_cancelled());
    }
}
