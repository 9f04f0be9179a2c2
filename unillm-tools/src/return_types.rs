//! Tool call and response types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unillm_core::ToolCallContent;

use crate::errors::ToolError;

/// Result type for tool execution.
pub type ToolResult = Result<ToolResponse, ToolError>;

/// A request to run a tool, as issued by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Raw JSON input.
    pub input: String,
}

impl ToolCall {
    /// Create a tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: input.into(),
        }
    }

    /// Parse the raw input; an empty input is treated as `{}`.
    pub fn parse_input(&self) -> Result<JsonValue, ToolError> {
        if self.input.trim().is_empty() {
            return Ok(JsonValue::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.input)
            .map_err(|e| ToolError::invalid_args(format!("input is not valid JSON: {e}")))
    }

    /// Deserialize the input into a typed value.
    pub fn input_as<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        let value = self.parse_input()?;
        serde_json::from_value(value).map_err(|e| ToolError::invalid_args(e.to_string()))
    }
}

impl From<&ToolCallContent> for ToolCall {
    fn from(c: &ToolCallContent) -> Self {
        Self::new(&c.tool_call_id, &c.tool_name, &c.input)
    }
}

/// What a tool returns after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Content shown to the model.
    pub content: String,
    /// Whether this response describes a failure.
    #[serde(default)]
    pub is_error: bool,
    /// Optional structured metadata kept out of the model's view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl ToolResponse {
    /// Create a text response.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            content: s.into(),
            is_error: false,
            metadata: None,
        }
    }

    /// Create a JSON response.
    #[must_use]
    pub fn json(value: &JsonValue) -> Self {
        Self::text(value.to_string())
    }

    /// Create a JSON response from a serializable value.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::text(serde_json::to_string(value)?))
    }

    /// Create an error response.
    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            content: msg.into(),
            is_error: true,
            metadata: None,
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Conversion into a tool response.
pub trait IntoToolResponse {
    /// Convert into a response.
    fn into_tool_response(self) -> ToolResult;
}

impl IntoToolResponse for ToolResponse {
    fn into_tool_response(self) -> ToolResult {
        Ok(self)
    }
}

impl IntoToolResponse for String {
    fn into_tool_response(self) -> ToolResult {
        Ok(ToolResponse::text(self))
    }
}

impl IntoToolResponse for &str {
    fn into_tool_response(self) -> ToolResult {
        Ok(ToolResponse::text(self))
    }
}

impl IntoToolResponse for JsonValue {
    fn into_tool_response(self) -> ToolResult {
        Ok(ToolResponse::json(&self))
    }
}

impl IntoToolResponse for () {
    fn into_tool_response(self) -> ToolResult {
        Ok(ToolResponse::text(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct EchoInput {
        message: String,
    }

    #[test]
    fn test_input_as() {
        let call = ToolCall::new("c1", "echo", r#"{"message": "test"}"#);
        let input: EchoInput = call.input_as().unwrap();
        assert_eq!(input, EchoInput { message: "test".into() });
    }

    #[test]
    fn test_invalid_input() {
        let call = ToolCall::new("c1", "echo", "{not json");
        assert!(matches!(call.parse_input(), Err(ToolError::InvalidArguments(_))));
        let call = ToolCall::new("c1", "echo", r#"{"other": 1}"#);
        assert!(call.input_as::<EchoInput>().is_err());
    }

    #[test]
    fn test_response_ctors() {
        assert!(!ToolResponse::text("ok").is_error);
        assert!(ToolResponse::error("bad").is_error);
        assert_eq!(ToolResponse::json(&serde_json::json!({"a": 1})).content, r#"{"a":1}"#);
        assert_eq!("hi".into_tool_response().unwrap().content, "hi");
    }

    #[test]
    fn test_from_content() {
        let content = ToolCallContent::new("c9", "weather", r#"{"city":"Oslo"}"#);
        let call = ToolCall::from(&content);
        assert_eq!(call.id, "c9");
        assert_eq!(call.name, "weather");
    }
}
