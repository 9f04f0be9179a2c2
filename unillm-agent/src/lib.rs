//! Agent implementation for unillm.
//!
//! The agent drives a multi-step loop over a [`LanguageModel`]: call the
//! model, run the tools it asked for, append the results and call it again
//! until it stops asking. It provides:
//!
//! - Tool registration and execution (sequential, or bounded concurrency)
//! - Streaming rounds through the stream aggregator
//! - Lifecycle and per-event callbacks
//! - Step budgets and usage limits
//!
//! Tool failures never abort a run. They reach the model as error-kind tool
//! results so it can react.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use unillm_agent::Agent;
//! use unillm_core::CallContext;
//! use unillm_models::MockModel;
//! use unillm_tools::{FunctionTool, ObjectJsonSchema, ToolError, ToolResponse};
//!
//! # tokio_test::block_on(async {
//! let model = MockModel::new("demo")
//!     .with_tool_call("call_1", "weather", json!({"city": "Paris"}))
//!     .with_text_response("It is sunny in Paris.");
//!
//! let agent = Agent::builder(model)
//!     .system_prompt("You answer weather questions.")
//!     .tool(FunctionTool::new(
//!         "weather",
//!         "Current weather for a city",
//!         ObjectJsonSchema::new().with_property("city", json!({"type": "string"}), true),
//!         |_ctx, _call| async { Ok::<_, ToolError>(ToolResponse::text("sunny, 22C")) },
//!     ))
//!     .max_steps(4)
//!     .build()
//!     .unwrap();
//!
//! let result = agent.generate(&CallContext::new(), "Weather in Paris?").await.unwrap();
//! assert_eq!(result.step_count(), 2);
//! assert_eq!(result.text(), "It is sunny in Paris.");
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `tracing-integration`: log run and step progress through `tracing`
//!
//! [`LanguageModel`]: unillm_models::LanguageModel

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod agent;
pub mod builder;
pub mod callbacks;
pub mod context;
pub mod errors;
pub mod result;
mod run;

pub use agent::{Agent, IntoPrompt, ToolExecution};
pub use builder::AgentBuilder;
pub use callbacks::AgentCallbacks;
pub use context::RunContext;
pub use errors::AgentError;
pub use result::{AgentResult, StepResult};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Agent, AgentBuilder, AgentCallbacks, AgentError, AgentResult, IntoPrompt, RunContext,
        StepResult, ToolExecution,
    };
}
