//! Core tool trait and implementations.
//!
//! This module provides the [`Tool`] trait which all tools must implement,
//! as well as the [`FunctionTool`] wrapper for closure-based tools.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::{
    context::ToolContext,
    definition::{ObjectJsonSchema, ToolDescriptor},
    return_types::{ToolCall, ToolResult},
};

/// Core trait for all tools.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use unillm_tools::{Tool, ToolCall, ToolContext, ToolDescriptor, ToolResponse, ToolResult};
///
/// struct GreetTool;
///
/// #[async_trait]
/// impl Tool for GreetTool {
///     fn info(&self) -> ToolDescriptor {
///         ToolDescriptor::new("greet", "Greet someone")
///     }
///
///     async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> ToolResult {
///         let args = call.parse_input()?;
///         let name = args["name"].as_str().unwrap_or("World");
///         Ok(ToolResponse::text(format!("Hello, {name}!")))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and input schema shown to the model.
    fn info(&self) -> ToolDescriptor;

    /// Execute the tool.
    ///
    /// Returning `Err` is not fatal to an agent run; the error is reported
    /// back to the model as an error tool result.
    async fn run(&self, ctx: &ToolContext, call: ToolCall) -> ToolResult;

    /// Get the tool name.
    fn name(&self) -> String {
        self.info().name
    }
}

/// Type-erased shared tool.
pub type BoxedTool = Arc<dyn Tool>;

/// Wrapper for function-based tools.
///
/// # Example
///
/// ```rust
/// use unillm_tools::{FunctionTool, SchemaBuilder, ToolCall, ToolError, ToolResponse};
///
/// let tool = FunctionTool::new(
///     "add",
///     "Add two numbers",
///     SchemaBuilder::new()
///         .number("a", "First number", true)
///         .number("b", "Second number", true)
///         .build(),
///     |_ctx, call: ToolCall| async move {
///         let args = call.parse_input()?;
///         let a = args["a"].as_f64().unwrap_or(0.0);
///         let b = args["b"].as_f64().unwrap_or(0.0);
///         Ok::<_, ToolError>(ToolResponse::text(format!("{}", a + b)))
///     },
/// );
/// ```
pub struct FunctionTool<F> {
    descriptor: ToolDescriptor,
    function: F,
}

impl<F, Fut> FunctionTool<F>
where
    F: Fn(ToolContext, ToolCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    /// Create a new function tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ObjectJsonSchema,
        function: F,
    ) -> Self {
        Self {
            descriptor: ToolDescriptor::new(name, description).with_parameters(parameters),
            function,
        }
    }
}

#[async_trait]
impl<F, Fut> Tool for FunctionTool<F>
where
    F: Fn(ToolContext, ToolCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    fn info(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn run(&self, ctx: &ToolContext, call: ToolCall) -> ToolResult {
        (self.function)(ctx.clone(), call).await
    }
}

impl<F> fmt::Debug for FunctionTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}
