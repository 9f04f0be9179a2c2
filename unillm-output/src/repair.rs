//! Caller-supplied repair of unparseable output.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::ObjectError;

type RepairFn = dyn Fn(String, ObjectError) -> BoxFuture<'static, Option<String>> + Send + Sync;

/// Async hook that gets one chance to fix raw model output.
///
/// It receives the raw text and the error that rejected it, and returns
/// corrected text or `None` to give up. The pipeline re-parses and
/// re-validates whatever comes back.
///
/// # Example
///
/// ```rust
/// use unillm_output::RepairHook;
///
/// // Models sometimes emit single quotes.
/// let hook = RepairHook::new(|raw, _err| async move { Some(raw.replace('\'', "\"")) });
/// # let _ = hook;
/// ```
#[derive(Clone)]
pub struct RepairHook(Arc<RepairFn>);

impl RepairHook {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(String, ObjectError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        Self(Arc::new(move |raw, err| Box::pin(f(raw, err))))
    }

    /// Ask for corrected text.
    pub async fn repair(&self, raw: &str, error: &ObjectError) -> Option<String> {
        tracing::debug!(error = %error, len = raw.len(), "invoking repair hook");
        (self.0)(raw.to_string(), error.clone()).await
    }
}

impl fmt::Debug for RepairHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepairHook").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hook_sees_raw_text_and_error() {
        let hook = RepairHook::new(|raw, err| async move {
            matches!(err, ObjectError::Parse(_)).then(|| format!("{raw}}}"))
        });
        let fixed = hook.repair(r#"{"a": 1"#, &ObjectError::parse("EOF")).await;
        assert_eq!(fixed.as_deref(), Some(r#"{"a": 1}"#));

        let declined = hook
            .repair("{}", &ObjectError::Validation(vec!["bad".into()]))
            .await;
        assert!(declined.is_none());
    }
}
