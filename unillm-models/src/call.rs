//! The request shape shared by every backend.
//!
//! A [`Call`] is what a [`LanguageModel`](crate::LanguageModel) receives for
//! both `generate` and `stream`. Backends translate it field by field into
//! their own wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unillm_core::{
    CallSettings, InvalidArgumentError, Message, ModelError, Prompt, ProviderOptions,
};
use unillm_tools::ToolDescriptor;

/// Tool choice strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "tool_name", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to call tools.
    #[default]
    Auto,
    /// Model should not call any tools.
    None,
    /// Model must call at least one tool.
    Required,
    /// Model must call the named tool.
    Tool(String),
}

impl ToolChoice {
    /// Force a specific tool.
    #[must_use]
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool(name.into())
    }
}

/// Requested shape of the model's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Text,
    /// JSON output, optionally constrained by a schema.
    Json {
        /// JSON schema the output must satisfy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<JsonValue>,
        /// Schema name, for backends that require one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Schema description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl ResponseFormat {
    /// JSON output constrained by `schema`.
    #[must_use]
    pub fn json_schema(schema: JsonValue) -> Self {
        Self::Json {
            schema: Some(schema),
            name: None,
            description: None,
        }
    }

    /// Whether JSON output was requested.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json { .. })
    }
}

/// A single model invocation.
///
/// # Example
///
/// ```rust
/// use unillm_core::Message;
/// use unillm_models::{Call, ToolChoice};
///
/// let call = Call::new(vec![Message::user("What's the weather in Paris?")])
///     .with_temperature(0.2)
///     .with_tool_choice(ToolChoice::None);
/// assert!(call.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Conversation so far.
    pub prompt: Prompt,
    /// Tools the model may call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,
    /// Tool choice policy. `None` leaves the backend default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Sampling settings.
    #[serde(default)]
    pub settings: CallSettings,
    /// Requested output format.
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Backend-specific options keyed by backend name.
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

impl Call {
    /// Create a call over a prompt.
    #[must_use]
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            ..Default::default()
        }
    }

    /// Append a message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.prompt.push(message);
        self
    }

    /// Set the tool list.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    /// Add one tool.
    #[must_use]
    pub fn with_tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set the tool choice policy.
    #[must_use]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Replace the sampling settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.settings.temperature = Some(temperature);
        self
    }

    /// Set max output tokens.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u64) -> Self {
        self.settings.max_output_tokens = Some(tokens);
        self
    }

    /// Set the response format.
    #[must_use]
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Set backend options.
    #[must_use]
    pub fn with_provider_options(mut self, options: ProviderOptions) -> Self {
        self.provider_options = options;
        self
    }

    /// Look up a tool descriptor by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Reject calls no backend could satisfy.
    ///
    /// Backends run this before any network I/O.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.settings.validate()?;

        if let Some(ToolChoice::Tool(name)) = &self.tool_choice {
            if self.tool(name).is_none() {
                return Err(InvalidArgumentError::new(
                    "tool_choice",
                    format!("tool '{name}' is not in the tool list"),
                )
                .into());
            }
        }
        if matches!(self.tool_choice, Some(ToolChoice::Required)) && self.tools.is_empty() {
            return Err(InvalidArgumentError::new(
                "tool_choice",
                "a tool call is required but no tools were provided",
            )
            .into());
        }

        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(InvalidArgumentError::new(
                    "tools",
                    format!("duplicate tool name '{}'", tool.name),
                )
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn weather() -> ToolDescriptor {
        ToolDescriptor::new("weather", "Get the weather")
    }

    #[test]
    fn test_builder() {
        let call = Call::new(vec![Message::system("be brief")])
            .with_message(Message::user("hi"))
            .with_tool(weather())
            .with_max_output_tokens(64);
        assert_eq!(call.prompt.len(), 2);
        assert_eq!(call.settings.max_output_tokens, Some(64));
        assert!(call.tool("weather").is_some());
    }

    #[rstest]
    #[case(Some(ToolChoice::tool("weather")), true)]
    #[case(Some(ToolChoice::tool("missing")), false)]
    #[case(Some(ToolChoice::Required), true)]
    #[case(Some(ToolChoice::None), true)]
    #[case(None, true)]
    fn test_validate_tool_choice(#[case] choice: Option<ToolChoice>, #[case] ok: bool) {
        let mut call = Call::new(vec![Message::user("hi")]).with_tool(weather());
        call.tool_choice = choice;
        assert_eq!(call.validate().is_ok(), ok);
    }

    #[test]
    fn test_required_without_tools() {
        let call = Call::new(vec![]).with_tool_choice(ToolChoice::Required);
        assert!(matches!(call.validate(), Err(ModelError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_settings() {
        let err = Call::new(vec![]).with_temperature(3.5).validate().unwrap_err();
        match err {
            ModelError::InvalidArgument(e) => assert_eq!(e.argument, "temperature"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_tools() {
        let call = Call::new(vec![]).with_tool(weather()).with_tool(weather());
        assert!(call.validate().is_err());
    }

    #[test]
    fn test_tool_choice_serde() {
        let json = serde_json::to_value(ToolChoice::tool("weather")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "tool", "tool_name": "weather"}));
        let auto = serde_json::to_value(ToolChoice::Auto).unwrap();
        assert_eq!(auto, serde_json::json!({"type": "auto"}));
    }
}
