//! Materialized model responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{Content, ContentSliceExt, ToolCallContent};
use super::prompt::{Message, Role};
use crate::provider::ProviderMetadata;
use crate::usage::Usage;

/// A complete response from one model round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Produced content in emission order.
    pub content: Vec<Content>,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Token usage for this round.
    #[serde(default)]
    pub usage: Usage,
    /// Non-fatal warnings raised by the backend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CallWarning>,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
    /// Model that produced the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Backend response ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    /// When the response was produced.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Response {
    /// Create a response with the given content.
    #[must_use]
    pub fn new(content: Vec<Content>) -> Self {
        Self {
            content,
            finish_reason: FinishReason::Unknown,
            usage: Usage::default(),
            warnings: Vec::new(),
            provider_metadata: ProviderMetadata::new(),
            model_id: None,
            response_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a single-text response that finished normally.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Content::text(text)]).with_finish_reason(FinishReason::Stop)
    }

    /// Create a response requesting the given tool calls.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCallContent>) -> Self {
        Self::new(calls.into_iter().map(Content::ToolCall).collect())
            .with_finish_reason(FinishReason::ToolCalls)
    }

    /// Set the finish reason.
    #[must_use]
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }

    /// Set the usage.
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Add a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: CallWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Set the model id.
    #[must_use]
    pub fn with_model_id(mut self, id: impl Into<String>) -> Self {
        self.model_id = Some(id.into());
        self
    }

    /// Set provider metadata.
    #[must_use]
    pub fn with_provider_metadata(mut self, metadata: ProviderMetadata) -> Self {
        self.provider_metadata = metadata;
        self
    }

    /// Concatenated text content.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content.text()
    }

    /// Concatenated reasoning content.
    #[must_use]
    pub fn reasoning_text(&self) -> String {
        self.content.reasoning_text()
    }

    /// Tool calls in emission order.
    #[must_use]
    pub fn tool_call_contents(&self) -> Vec<&ToolCallContent> {
        self.content.tool_calls()
    }

    /// Check if the response requests tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::ToolCall(_)))
    }

    /// The assistant message that replays this response in a prompt.
    #[must_use]
    pub fn to_assistant_message(&self) -> Message {
        Message::new(
            Role::Assistant,
            self.content
                .iter()
                .filter_map(Content::to_message_part)
                .collect(),
        )
    }
}

/// Reason why the model stopped generating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// Natural end of response.
    Stop,
    /// Maximum tokens reached.
    Length,
    /// Content was filtered.
    ContentFilter,
    /// Model wants tools to be called.
    ToolCalls,
    /// An error occurred.
    Error,
    /// Some other backend-specific reason.
    Other,
    /// The backend did not say.
    #[default]
    Unknown,
}

impl FinishReason {
    /// Check if this indicates the response is complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Stop)
    }

    /// Check if this indicates truncation.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Length)
    }

    /// Check if this indicates tool use.
    #[must_use]
    pub fn is_tool_calls(&self) -> bool {
        matches!(self, Self::ToolCalls)
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ContentFilter => write!(f, "content-filter"),
            Self::ToolCalls => write!(f, "tool-calls"),
            Self::Error => write!(f, "error"),
            Self::Other => write!(f, "other"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A setting or feature the backend ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CallWarning {
    /// A call setting has no effect for this backend or model.
    UnsupportedSetting {
        /// Setting name.
        setting: String,
        /// Extra details.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// A tool could not be passed to the backend.
    UnsupportedTool {
        /// Tool name.
        tool_name: String,
        /// Extra details.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Free-form warning.
    Other {
        /// Message.
        message: String,
    },
}

impl CallWarning {
    /// Warn about an ignored setting.
    #[must_use]
    pub fn unsupported_setting(setting: impl Into<String>, details: Option<String>) -> Self {
        Self::UnsupportedSetting {
            setting: setting.into(),
            details,
        }
    }
}

impl std::fmt::Display for CallWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSetting { setting, details } => {
                write!(f, "unsupported setting '{setting}'")?;
                if let Some(d) = details {
                    write!(f, ": {d}")?;
                }
                Ok(())
            }
            Self::UnsupportedTool { tool_name, details } => {
                write!(f, "unsupported tool '{tool_name}'")?;
                if let Some(d) = details {
                    write!(f, ": {d}")?;
                }
                Ok(())
            }
            Self::Other { message } => write!(f, "{message}"),
        }
    }
}
