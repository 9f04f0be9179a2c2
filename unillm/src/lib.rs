//! # unillm
//!
//! A backend-agnostic runtime for large language models.
//!
//! Backends implement one contract, [`LanguageModel`], with a non-streaming
//! `generate` and a streaming `stream`. On top of it sit:
//!
//! - a streaming aggregator that turns event streams into complete
//!   [`Response`]s while firing per-event callbacks
//! - an [`Agent`] that loops model rounds and tool executions up to a step
//!   budget
//! - a structured object pipeline that asks for schema-conforming JSON via a
//!   forced tool, native JSON output or prompt instructions, with partial
//!   objects while streaming
//!
//! ## Quick Start
//!
//! ```rust
//! use unillm::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let model = MockModel::new("demo").with_text_response("Paris.");
//! let agent = Agent::builder(model)
//!     .system_prompt("Answer in one word.")
//!     .build()
//!     .unwrap();
//!
//! let result = agent
//!     .generate(&CallContext::new(), "What is the capital of France?")
//!     .await
//!     .unwrap();
//! assert_eq!(result.text(), "Paris.");
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|--------|
//! | `tracing-integration` | Agent and registry logging through `tracing` | ❌ |
//! | `subscriber` | `init_tracing` helpers built on `tracing-subscriber` | ❌ |
//! | `full` | All features | ❌ |
//!
//! ## Architecture
//!
//! - [`unillm_core`] - messages, content, usage, errors, provider options registry
//! - [`unillm_tools`] - tool trait, descriptors and tool sets
//! - [`unillm_models`] - model contract, stream events and test models
//! - [`unillm_streaming`] - stream aggregation and callbacks
//! - [`unillm_agent`] - multi-step agent
//! - [`unillm_output`] - structured object generation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Core types, messages, and error handling.
pub use unillm_core as core;

/// Agent implementation and builder.
pub use unillm_agent as agent;

/// Model contract and test models.
pub use unillm_models as models;

/// Tool system.
pub use unillm_tools as tools;

/// Structured object generation.
pub use unillm_output as output;

/// Stream aggregation.
pub use unillm_streaming as streaming;

// ============================================================================
// Flat Re-exports
// ============================================================================

// Core
pub use unillm_core::{
    register_provider_data, CallContext, CallSettings, CallWarning, Content, ContentSliceExt,
    FinishReason, Message, MessagePart, ModelError, Prompt, ProviderData, ProviderDataType,
    ProviderMetadata, ProviderOptions, Response, Role, ToolCallContent, ToolResultContent,
    ToolResultPart, Usage, UsageLimitExceeded, UsageLimits,
};

// Models
pub use unillm_models::{
    BoxedModel, Call, FunctionModel, LanguageModel, MockModel, ModelProfile, ResponseFormat,
    StreamPart, StreamResponse, ToolChoice,
};

// Tools
pub use unillm_tools::{
    FunctionTool, ObjectJsonSchema, Tool, ToolCall, ToolContext, ToolDescriptor, ToolError,
    ToolResponse, ToolSet, TypedTool,
};

// Streaming
pub use unillm_streaming::{aggregate, StreamAggregator, StreamCallbacks, StreamError};

// Agent
pub use unillm_agent::{
    Agent, AgentBuilder, AgentCallbacks, AgentError, AgentResult, RunContext, StepResult,
    ToolExecution,
};

// Output
pub use unillm_output::{
    generate_object, generate_object_as, parse_partial_json, stream_object, NoObjectGeneratedError,
    ObjectCall, ObjectError, ObjectMode, ObjectResult, ObjectSchema, ObjectStream,
    ObjectStreamPart, PartialParse, RepairHook,
};

// ============================================================================
// Tracing
// ============================================================================

#[cfg(feature = "subscriber")]
#[cfg_attr(docsrs, doc(cfg(feature = "subscriber")))]
pub use subscriber::{init_tracing, init_tracing_json, TracingInitError};

#[cfg(feature = "subscriber")]
mod subscriber {
    use thiserror::Error;
    use tracing_subscriber::EnvFilter;

    /// Failure to install the global subscriber.
    #[derive(Debug, Error)]
    pub enum TracingInitError {
        /// The filter directive did not parse.
        #[error("Invalid tracing filter: {0}")]
        Filter(#[from] tracing_subscriber::filter::ParseError),
        /// A global subscriber is already installed.
        #[error("Failed to install tracing subscriber: {0}")]
        Init(String),
    }

    /// `RUST_LOG` when set, `default_filter` otherwise. A malformed
    /// `RUST_LOG` is an error.
    fn env_filter(default_filter: &str) -> Result<EnvFilter, TracingInitError> {
        let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_filter.to_string());
        Ok(EnvFilter::try_new(directives)?)
    }

    /// Install a human-readable fmt subscriber.
    ///
    /// ```rust,no_run
    /// unillm::init_tracing("unillm_agent=debug,unillm_streaming=info").unwrap();
    /// ```
    pub fn init_tracing(default_filter: &str) -> Result<(), TracingInitError> {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(default_filter)?)
            .try_init()
            .map_err(|e| TracingInitError::Init(e.to_string()))
    }

    /// Install a subscriber that writes one JSON object per event.
    pub fn init_tracing_json(default_filter: &str) -> Result<(), TracingInitError> {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter(default_filter)?)
            .try_init()
            .map_err(|e| TracingInitError::Init(e.to_string()))
    }

}

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient prelude for common imports.
///
/// ```rust
/// use unillm::prelude::*;
/// ```
pub mod prelude {
    pub use unillm_core::prelude::*;
    pub use unillm_models::prelude::*;
    pub use unillm_models::{MockModel, ModelProfile};
    pub use unillm_tools::{FunctionTool, ObjectJsonSchema, Tool, ToolError, ToolResponse, ToolSet};
    pub use unillm_streaming::prelude::*;
    pub use unillm_agent::prelude::*;
    pub use unillm_output::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_agent_and_object_share_a_model() {
        let model = std::sync::Arc::new(
            MockModel::new("shared")
                .with_text_response("hello")
                .with_tool_call("c1", "city", json!({"name": "Oslo"})),
        );

        let agent = Agent::builder(model.clone()).build().unwrap();
        let result = agent.generate(&CallContext::new(), "hi").await.unwrap();
        assert_eq!(result.text(), "hello");

        let schema = ObjectSchema::new(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }))
        .unwrap()
        .with_name("city");
        let call = ObjectCall::new(vec![Message::user("A city?")], schema);
        let object = generate_object(model.as_ref(), &CallContext::new(), &call).await.unwrap();
        assert_eq!(object.object, json!({"name": "Oslo"}));
        assert_eq!(model.call_count(), 2);
    }
}
