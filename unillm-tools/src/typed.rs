//! Tools with typed input.
//!
//! [`TypedTool`] derives its parameter schema from the input type using
//! `schemars` and deserializes the model's raw JSON before calling the
//! handler, so the handler only ever sees a well-formed `I`.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use crate::{
    context::ToolContext,
    definition::{ObjectJsonSchema, ToolDescriptor},
    errors::ToolError,
    return_types::{IntoToolResponse, ToolCall, ToolResult},
    schema::schema_for_type,
    tool::Tool,
};

/// A tool whose input is a Rust type.
///
/// # Example
///
/// ```rust
/// use schemars::JsonSchema;
/// use serde::Deserialize;
/// use unillm_tools::{Tool, ToolError, TypedTool};
///
/// #[derive(Deserialize, JsonSchema)]
/// struct AddInput {
///     a: i64,
///     b: i64,
/// }
///
/// let tool = TypedTool::new("add", "Add two integers", |_ctx, input: AddInput| async move {
///     Ok::<_, ToolError>(format!("{}", input.a + input.b))
/// });
/// assert_eq!(tool.info().required(), &["a".to_string(), "b".to_string()]);
/// ```
pub struct TypedTool<I, O, F> {
    descriptor: ToolDescriptor,
    function: F,
    _phantom: PhantomData<fn(I) -> O>,
}

impl<I, O, F, Fut> TypedTool<I, O, F>
where
    I: JsonSchema + DeserializeOwned + Send + 'static,
    O: IntoToolResponse + Send + 'static,
    F: Fn(ToolContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
{
    /// Create a typed tool.
    pub fn new(name: impl Into<String>, description: impl Into<String>, function: F) -> Self {
        let name = name.into();
        let parameters = schema_for_type::<I>().unwrap_or_else(|e| {
            tracing::warn!(tool = %name, error = %e, "could not derive input schema");
            ObjectJsonSchema::new()
        });
        Self {
            descriptor: ToolDescriptor::new(name, description).with_parameters(parameters),
            function,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<I, O, F, Fut> Tool for TypedTool<I, O, F>
where
    I: JsonSchema + DeserializeOwned + Send + 'static,
    O: IntoToolResponse + Send + 'static,
    F: Fn(ToolContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
{
    fn info(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn run(&self, ctx: &ToolContext, call: ToolCall) -> ToolResult {
        let input: I = call.input_as()?;
        let output = (self.function)(ctx.clone(), input).await?;
        output.into_tool_response()
    }
}

impl<I, O, F> fmt::Debug for TypedTool<I, O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedTool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolResponse;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoInput {
        message: String,
        #[serde(default)]
        times: Option<usize>,
    }

    fn echo_tool() -> impl Tool {
        TypedTool::new("echo", "Echo a message", |_ctx, input: EchoInput| async move {
            let times = input.times.unwrap_or(1);
            Ok::<_, ToolError>(ToolResponse::text(input.message.repeat(times)))
        })
    }

    #[test]
    fn test_schema_is_derived() {
        let info = echo_tool().info();
        assert_eq!(info.name, "echo");
        assert_eq!(info.required(), &["message".to_string()]);
        assert!(info.parameters.get_property("times").is_some());
    }

    #[tokio::test]
    async fn test_input_is_unmarshalled() {
        let out = echo_tool()
            .run(
                &ToolContext::default(),
                ToolCall::new("c1", "echo", r#"{"message": "ab", "times": 2}"#),
            )
            .await
            .unwrap();
        assert_eq!(out.content, "abab");
    }

    #[tokio::test]
    async fn test_bad_input_is_invalid_arguments() {
        let err = echo_tool()
            .run(&ToolContext::default(), ToolCall::new("c1", "echo", r#"{"times": 2}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
