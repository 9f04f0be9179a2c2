//! Per-call context carrying the cancellation signal.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Context passed to every blocking operation.
///
/// Cloning is cheap and every clone observes the same cancellation. Child
/// contexts created with [`CallContext::child`] are cancelled together with
/// their parent but can also be cancelled on their own.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
    metadata: HashMap<String, JsonValue>,
}

impl CallContext {
    /// Create a new context with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Derive a child context.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            metadata: self.metadata.clone(),
        }
    }

    /// The underlying token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Look up a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&JsonValue> {
        self.metadata.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_follows_parent() {
        let parent = CallContext::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_child_cancel_is_local() {
        let parent = CallContext::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_metadata() {
        let ctx = CallContext::new().with_metadata("trace", serde_json::json!("abc"));
        assert_eq!(ctx.metadata("trace"), Some(&serde_json::json!("abc")));
        assert_eq!(ctx.child().metadata("trace"), Some(&serde_json::json!("abc")));
    }

    #[tokio::test]
    async fn test_cancelled_resolves() {
        let ctx = CallContext::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        ctx.cancel();
        handle.await.unwrap();
    }
}
