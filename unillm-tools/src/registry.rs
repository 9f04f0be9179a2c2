//! Named collections of tools.
//!
//! [`ToolSet`] keeps tools in registration order, so descriptors reach the
//! model in the order the caller declared them.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    context::ToolContext,
    definition::ToolDescriptor,
    errors::ToolError,
    return_types::{ToolCall, ToolResult},
    tool::{BoxedTool, Tool},
};

/// Ordered set of tools addressable by name.
///
/// # Example
///
/// ```rust
/// use unillm_tools::{FunctionTool, ObjectJsonSchema, ToolError, ToolResponse, ToolSet};
///
/// let mut tools = ToolSet::new();
/// tools.register(FunctionTool::new(
///     "ping",
///     "Reply with pong",
///     ObjectJsonSchema::new(),
///     |_ctx, _call| async { Ok::<_, ToolError>(ToolResponse::text("pong")) },
/// ));
///
/// assert!(tools.contains("ping"));
/// assert_eq!(tools.descriptors()[0].name, "ping");
/// ```
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: IndexMap<String, BoxedTool>,
}

impl ToolSet {
    /// Create a new empty tool set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool, replacing any tool with the same name.
    pub fn register_arc(&mut self, tool: BoxedTool) -> &mut Self {
        let name = tool.name();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replacing previously registered tool");
        }
        self
    }

    /// Add a tool and return self.
    #[must_use]
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.get(name)
    }

    /// Check whether a tool is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors for every tool, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.info()).collect()
    }

    /// Registered tool names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the tool named by the call.
    ///
    /// With `schema-validation`, input that violates the tool's parameter
    /// schema is rejected before the tool runs.
    pub async fn run(&self, ctx: &ToolContext, call: ToolCall) -> ToolResult {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::not_found(&call.name))?;
        #[cfg(feature = "schema-validation")]
        tool.info().validate_input(&call.parse_input()?)?;
        tool.run(ctx, call).await
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .finish()
    }
}
