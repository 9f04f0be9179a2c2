//! Output-side content produced by a model.
//!
//! [`Content`] mirrors [`MessagePart`](super::MessagePart): text, reasoning,
//! tool calls, tool results (for backend-executed tools) plus sources. Each
//! entry is immutable once produced.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::prompt::{MessagePart, ReasoningPart, TextPart, ToolCallPart, ToolResultPart};
use crate::provider::ProviderMetadata;

/// One produced content entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Content {
    /// Generated text.
    Text(TextContent),
    /// Model reasoning.
    Reasoning(ReasoningContent),
    /// A tool call requested by the model.
    ToolCall(ToolCallContent),
    /// A tool result (backend-executed tools).
    ToolResult(ToolResultContent),
    /// A source or citation.
    Source(SourceContent),
}

impl Content {
    /// Create text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent {
            text: text.into(),
            provider_metadata: ProviderMetadata::new(),
        })
    }

    /// Create reasoning content.
    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning(ReasoningContent {
            text: text.into(),
            provider_metadata: ProviderMetadata::new(),
        })
    }

    /// Create tool call content.
    #[must_use]
    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self::ToolCall(ToolCallContent::new(tool_call_id, tool_name, input))
    }

    /// Get the kind name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Reasoning(_) => "reasoning",
            Self::ToolCall(_) => "tool-call",
            Self::ToolResult(_) => "tool-result",
            Self::Source(_) => "source",
        }
    }

    /// Text if this is text content.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Tool call if this is one.
    #[must_use]
    pub fn as_tool_call(&self) -> Option<&ToolCallContent> {
        match self {
            Self::ToolCall(c) => Some(c),
            _ => None,
        }
    }

    /// Convert to the prompt part an assistant message replays.
    ///
    /// Sources have no prompt-side counterpart.
    #[must_use]
    pub fn to_message_part(&self) -> Option<MessagePart> {
        match self {
            Self::Text(t) => Some(MessagePart::Text(TextPart {
                text: t.text.clone(),
                provider_options: t.provider_metadata.clone(),
            })),
            Self::Reasoning(r) => Some(MessagePart::Reasoning(ReasoningPart {
                text: r.text.clone(),
                provider_options: r.provider_metadata.clone(),
            })),
            Self::ToolCall(c) => Some(MessagePart::ToolCall(ToolCallPart {
                tool_call_id: c.tool_call_id.clone(),
                tool_name: c.tool_name.clone(),
                input: c.input.clone(),
                provider_options: c.provider_metadata.clone(),
            })),
            Self::ToolResult(r) => Some(MessagePart::ToolResult(ToolResultPart {
                tool_call_id: r.tool_call_id.clone(),
                tool_name: r.tool_name.clone(),
                content: r.result.clone(),
                is_error: r.is_error,
                provider_options: r.provider_metadata.clone(),
            })),
            Self::Source(_) => None,
        }
    }
}

/// Generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text.
    pub text: String,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// Model reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningContent {
    /// The reasoning text.
    pub text: String,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallContent {
    /// Call ID, unique within a step.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Raw JSON input.
    pub input: String,
    /// Whether the backend already executed this tool itself.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub provider_executed: bool,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

impl ToolCallContent {
    /// Create a tool call.
    #[must_use]
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input: input.into(),
            provider_executed: false,
            provider_metadata: ProviderMetadata::new(),
        }
    }

    /// Parse the raw input; an empty input is treated as `{}`.
    pub fn parsed_input(&self) -> Result<JsonValue, serde_json::Error> {
        if self.input.trim().is_empty() {
            return Ok(JsonValue::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.input)
    }
}

/// A tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultContent {
    /// The call this answers.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Result text.
    pub result: String,
    /// Whether the tool failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

impl ToolResultContent {
    /// Create a tool result.
    #[must_use]
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result: result.into(),
            is_error,
            provider_metadata: ProviderMetadata::new(),
        }
    }
}

/// What a source points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A web page.
    Url,
    /// A document supplied with the prompt.
    Document,
}

/// A source or citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContent {
    /// Source ID.
    pub id: String,
    /// Source kind.
    pub source_type: SourceType,
    /// URL for web sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Media type for document sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

impl SourceContent {
    /// Create a URL source.
    #[must_use]
    pub fn url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_type: SourceType::Url,
            url: Some(url.into()),
            title: None,
            media_type: None,
            provider_metadata: ProviderMetadata::new(),
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Accessors over an ordered content list.
pub trait ContentSliceExt {
    /// Concatenated text of all text entries.
    fn text(&self) -> String;
    /// Concatenated reasoning text.
    fn reasoning_text(&self) -> String;
    /// Tool calls in emission order.
    fn tool_calls(&self) -> Vec<&ToolCallContent>;
    /// Tool results in order.
    fn tool_results(&self) -> Vec<&ToolResultContent>;
    /// Sources in order.
    fn sources(&self) -> Vec<&SourceContent>;
}

impl ContentSliceExt for [Content] {
    fn text(&self) -> String {
        self.iter().filter_map(Content::as_text).collect()
    }

    fn reasoning_text(&self) -> String {
        self.iter()
            .filter_map(|c| match c {
                Content::Reasoning(r) => Some(r.text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn tool_calls(&self) -> Vec<&ToolCallContent> {
        self.iter().filter_map(Content::as_tool_call).collect()
    }

    fn tool_results(&self) -> Vec<&ToolResultContent> {
        self.iter()
            .filter_map(|c| match c {
                Content::ToolResult(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn sources(&self) -> Vec<&SourceContent> {
        self.iter()
            .filter_map(|c| match c {
                Content::Source(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}
