//! Mock and function-based models for testing.
//!
//! This module provides testing utilities:
//!
//! - [`MockModel`]: a queue of scripted replies, with every call recorded
//! - [`FunctionModel`]: a model controlled by a closure
//!
//! Both answer `generate` and `stream`; a reply scripted as a full
//! [`Response`] is replayed through [`stream_from_response`] when streamed,
//! so one script drives both modes.
//!
//! # Examples
//!
//! ```rust
//! use unillm_models::MockModel;
//!
//! let model = MockModel::new("test")
//!     .with_text_response("First response")
//!     .with_text_response("Second response");
//! assert_eq!(model.remaining(), 2);
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use unillm_core::{CallContext, ModelError, Response, Role, ToolCallContent, Usage};

use crate::call::Call;
use crate::model::{LanguageModel, StreamResponse};
use crate::profile::ModelProfile;
use crate::stream::{response_to_parts, stream_from_parts, stream_from_response, StreamPart};

// ============================================================================
// MockModel - Scripted replies
// ============================================================================

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A complete response.
    Response(Response),
    /// A raw event sequence, returned as-is by `stream`.
    Stream(Vec<StreamPart>),
    /// A failure before any output.
    Error(ModelError),
}

/// A mock model for testing with pre-configured replies.
///
/// Replies are consumed in order by both `generate` and `stream`. When the
/// queue is empty the model answers with the text `"Mock response"`.
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    profile: ModelProfile,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockModel {
    /// Create a new mock model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile: ModelProfile::default(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply.
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Queue a response.
    #[must_use]
    pub fn with_response(self, response: Response) -> Self {
        self.with_reply(MockReply::Response(response))
    }

    /// Queue a text response.
    #[must_use]
    pub fn with_text_response(self, text: impl Into<String>) -> Self {
        let response = Response::text(text)
            .with_usage(Usage::new(1, 1))
            .with_model_id(self.name.clone());
        self.with_response(response)
    }

    /// Queue a response that calls one tool.
    #[must_use]
    pub fn with_tool_call(
        self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        let response = Response::tool_calls(vec![ToolCallContent::new(
            tool_call_id,
            tool_name,
            input.to_string(),
        )])
        .with_usage(Usage::new(1, 1))
        .with_model_id(self.name.clone());
        self.with_response(response)
    }

    /// Queue a raw event sequence.
    #[must_use]
    pub fn with_stream(self, parts: Vec<StreamPart>) -> Self {
        self.with_reply(MockReply::Stream(parts))
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, error: ModelError) -> Self {
        self.with_reply(MockReply::Error(error))
    }

    /// Set custom profile.
    #[must_use]
    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Get recorded calls.
    pub fn recorded_calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    fn next_reply(&self, call: &Call) -> MockReply {
        self.calls.lock().push(call.clone());
        self.replies.lock().pop_front().unwrap_or_else(|| {
            MockReply::Response(Response::text("Mock response").with_model_id(self.name.clone()))
        })
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn model_id(&self) -> &str {
        &self.name
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn profile(&self) -> ModelProfile {
        self.profile.clone()
    }

    async fn generate(&self, ctx: &CallContext, call: &Call) -> Result<Response, ModelError> {
        if ctx.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        call.validate()?;
        match self.next_reply(call) {
            MockReply::Response(response) => Ok(response),
            MockReply::Error(error) => Err(error),
            MockReply::Stream(_) => Err(ModelError::Unsupported(
                "scripted stream reply consumed by generate".to_string(),
            )),
        }
    }

    async fn stream(&self, ctx: &CallContext, call: &Call) -> Result<StreamResponse, ModelError> {
        if ctx.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        call.validate()?;
        match self.next_reply(call) {
            MockReply::Response(response) => Ok(stream_from_response(response)),
            MockReply::Stream(parts) => Ok(stream_from_parts(parts)),
            MockReply::Error(error) => Err(error),
        }
    }
}

// ============================================================================
// FunctionModel - Dynamic function-based model
// ============================================================================

/// Type alias for function model callback.
///
/// The function receives the call and returns a response.
pub type FunctionDef = Box<dyn Fn(&Call) -> Result<Response, ModelError> + Send + Sync>;

/// Type alias for stream function callback.
///
/// The function receives the call and returns the events to stream.
pub type StreamFunctionDef = Box<dyn Fn(&Call) -> Result<Vec<StreamPart>, ModelError> + Send + Sync>;

/// A model controlled by a local function.
///
/// This is more flexible than [`MockModel`]: the function sees the whole
/// call, so replies can depend on the conversation so far.
///
/// # Example
///
/// ```rust
/// use unillm_core::{Response, Role};
/// use unillm_models::FunctionModel;
///
/// // Reply with the number of tool results seen so far.
/// let model = FunctionModel::new(|call| {
///     let results = call.prompt.iter().filter(|m| m.role == Role::Tool).count();
///     Ok(Response::text(format!("{results} tool results")))
/// });
/// ```
#[derive(Clone)]
pub struct FunctionModel {
    name: String,
    profile: ModelProfile,
    function: Option<Arc<FunctionDef>>,
    stream_function: Option<Arc<StreamFunctionDef>>,
}

impl std::fmt::Debug for FunctionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionModel")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("has_function", &self.function.is_some())
            .field("has_stream_function", &self.stream_function.is_some())
            .finish()
    }
}

impl FunctionModel {
    /// Create a new FunctionModel with a response function.
    ///
    /// Streaming replays the function's response.
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&Call) -> Result<Response, ModelError> + Send + Sync + 'static,
    {
        Self {
            name: "function-model".to_string(),
            profile: ModelProfile::default(),
            function: Some(Arc::new(Box::new(function))),
            stream_function: None,
        }
    }

    /// Create a new FunctionModel with a streaming function.
    ///
    /// `generate` is unsupported on such a model.
    pub fn with_stream<F>(stream_function: F) -> Self
    where
        F: Fn(&Call) -> Result<Vec<StreamPart>, ModelError> + Send + Sync + 'static,
    {
        Self {
            name: "function-model".to_string(),
            profile: ModelProfile::default(),
            function: None,
            stream_function: Some(Arc::new(Box::new(stream_function))),
        }
    }

    /// Set a custom model name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a custom profile.
    #[must_use]
    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Create a model that always returns the same text.
    pub fn constant_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(Response::text(text.clone())))
    }

    /// Create a model that echoes the last user message.
    pub fn echo() -> Self {
        Self::new(|call| {
            let last = call
                .prompt
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.text())
                .unwrap_or_else(|| "No user message".to_string());
            Ok(Response::text(format!("Echo: {last}")))
        })
    }

    /// Create a model that calls `tool_name` until it sees a tool result,
    /// then answers with `final_text`.
    pub fn tool_then_text(
        tool_name: impl Into<String>,
        input: serde_json::Value,
        final_text: impl Into<String>,
    ) -> Self {
        let tool_name = tool_name.into();
        let final_text = final_text.into();
        Self::new(move |call| {
            let answered = call.prompt.iter().any(|m| m.role == Role::Tool);
            if answered {
                Ok(Response::text(final_text.clone()))
            } else {
                Ok(Response::tool_calls(vec![ToolCallContent::new(
                    unillm_core::identifier::generate_tool_call_id(),
                    tool_name.clone(),
                    input.to_string(),
                )]))
            }
        })
    }
}

#[async_trait]
impl LanguageModel for FunctionModel {
    fn model_id(&self) -> &str {
        &self.name
    }

    fn provider_name(&self) -> &str {
        "function"
    }

    fn profile(&self) -> ModelProfile {
        self.profile.clone()
    }

    async fn generate(&self, ctx: &CallContext, call: &Call) -> Result<Response, ModelError> {
        if ctx.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        call.validate()?;
        match &self.function {
            Some(function) => function(call),
            None => Err(ModelError::Unsupported(
                "FunctionModel has no response function".to_string(),
            )),
        }
    }

    async fn stream(&self, ctx: &CallContext, call: &Call) -> Result<StreamResponse, ModelError> {
        if ctx.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        call.validate()?;
        let parts = match (&self.stream_function, &self.function) {
            (Some(stream_function), _) => stream_function(call)?,
            (None, Some(function)) => response_to_parts(function(call)?),
            (None, None) => {
                return Err(ModelError::Unsupported(
                    "FunctionModel has no function".to_string(),
                ))
            }
        };
        Ok(stream_from_parts(parts))
    }
}
