//! Core model trait and types.
//!
//! This module defines the [`LanguageModel`] trait, the contract every
//! backend adapter implements. Both operations take the same [`Call`].

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use unillm_core::{CallContext, ModelError, Response};

use crate::call::Call;
use crate::profile::{ModelCapability, ModelProfile};
use crate::stream::StreamPart;

/// A single-use, forward-only stream of events.
///
/// Dropping it before the terminal event stops the producer; adapters must
/// release their transport when that happens.
pub type StreamResponse = Pin<Box<dyn Stream<Item = StreamPart> + Send>>;

/// Core model trait.
///
/// `stream` must end with exactly one [`StreamPart::Finish`] or
/// [`StreamPart::Error`]. Settings a backend cannot honor are reported as
/// [`CallWarning`](unillm_core::CallWarning)s; an outright incompatible call
/// fails before any network I/O, usually via [`Call::validate`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Get the model ID as the backend knows it.
    fn model_id(&self) -> &str;

    /// Get the backend name (openai, anthropic, etc).
    fn provider_name(&self) -> &str;

    /// Get the full model identifier.
    fn identifier(&self) -> String {
        format!("{}:{}", self.provider_name(), self.model_id())
    }

    /// Get the model profile.
    fn profile(&self) -> ModelProfile {
        ModelProfile::default()
    }

    /// Check if the model supports a specific capability.
    fn supports(&self, capability: ModelCapability) -> bool {
        self.profile().supports(capability)
    }

    /// Generate a complete response.
    async fn generate(&self, ctx: &CallContext, call: &Call) -> Result<Response, ModelError>;

    /// Start a streaming generation.
    ///
    /// An `Err` here means the stream never started; failures after the
    /// first event arrive as [`StreamPart::Error`].
    async fn stream(&self, ctx: &CallContext, call: &Call) -> Result<StreamResponse, ModelError>;
}

/// Shared model for dynamic dispatch.
pub type BoxedModel = Arc<dyn LanguageModel>;

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Arc<M> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn identifier(&self) -> String {
        (**self).identifier()
    }

    fn profile(&self) -> ModelProfile {
        (**self).profile()
    }

    async fn generate(&self, ctx: &CallContext, call: &Call) -> Result<Response, ModelError> {
        (**self).generate(ctx, call).await
    }

    async fn stream(&self, ctx: &CallContext, call: &Call) -> Result<StreamResponse, ModelError> {
        (**self).stream(ctx, call).await
    }
}
