//! Prompt-side message types.
//!
//! A prompt is an ordered list of [`Message`]s. Each message has a [`Role`]
//! and an ordered list of [`MessagePart`]s. Order is preserved end-to-end.

use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::provider::ProviderOptions;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions.
    System,
    /// End user.
    User,
    /// The model.
    Assistant,
    /// Tool results.
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// One message of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Ordered parts.
    pub parts: Vec<MessagePart>,
    /// Backend-specific options for the whole message.
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

/// An ordered conversation.
pub type Prompt = Vec<Message>;

impl Message {
    /// Create a message from parts.
    #[must_use]
    pub fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        Self {
            role,
            parts,
            provider_options: ProviderOptions::new(),
        }
    }

    /// Create a system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![MessagePart::text(text)])
    }

    /// Create a user text message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![MessagePart::text(text)])
    }

    /// Create an assistant text message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![MessagePart::text(text)])
    }

    /// Create a tool message carrying results.
    #[must_use]
    pub fn tool(results: Vec<ToolResultPart>) -> Self {
        Self::new(
            Role::Tool,
            results.into_iter().map(MessagePart::ToolResult).collect(),
        )
    }

    /// Set provider options.
    #[must_use]
    pub fn with_provider_options(mut self, options: ProviderOptions) -> Self {
        self.provider_options = options;
        self
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool call parts in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallPart> {
        self.parts.iter().filter_map(|p| match p {
            MessagePart::ToolCall(c) => Some(c),
            _ => None,
        })
    }

    /// Tool result parts in order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResultPart> {
        self.parts.iter().filter_map(|p| match p {
            MessagePart::ToolResult(r) => Some(r),
            _ => None,
        })
    }
}

/// A part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Plain text.
    Text(TextPart),
    /// File or attachment.
    File(FilePart),
    /// Model reasoning from an earlier turn.
    Reasoning(ReasoningPart),
    /// A tool call issued by the model.
    ToolCall(ToolCallPart),
    /// The result of a tool call.
    ToolResult(ToolResultPart),
}

impl MessagePart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart::new(text))
    }

    /// Get the part kind name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::File(_) => "file",
            Self::Reasoning(_) => "reasoning",
            Self::ToolCall(_) => "tool-call",
            Self::ToolResult(_) => "tool-result",
        }
    }

    /// Backend-specific options of this part.
    #[must_use]
    pub fn provider_options(&self) -> &ProviderOptions {
        match self {
            Self::Text(p) => &p.provider_options,
            Self::File(p) => &p.provider_options,
            Self::Reasoning(p) => &p.provider_options,
            Self::ToolCall(p) => &p.provider_options,
            Self::ToolResult(p) => &p.provider_options,
        }
    }
}

/// Text part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    /// The text.
    pub text: String,
    /// Backend-specific options.
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

impl TextPart {
    /// Create a text part.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider_options: ProviderOptions::new(),
        }
    }
}

/// Where a file's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileData {
    /// Inline base64-encoded data.
    Base64 {
        /// Encoded bytes.
        data: String,
    },
    /// Remote URL.
    Url {
        /// Location.
        url: Url,
    },
}

/// File or attachment part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePart {
    /// The data.
    pub data: FileData,
    /// IANA media type, e.g. `image/png`.
    pub media_type: String,
    /// Optional file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Backend-specific options.
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

impl FilePart {
    /// Create a file part from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self {
            data: FileData::Base64 {
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
            media_type: media_type.into(),
            filename: None,
            provider_options: ProviderOptions::new(),
        }
    }

    /// Create a file part pointing at a URL.
    #[must_use]
    pub fn from_url(url: Url, media_type: impl Into<String>) -> Self {
        Self {
            data: FileData::Url { url },
            media_type: media_type.into(),
            filename: None,
            provider_options: ProviderOptions::new(),
        }
    }

    /// Set the file name.
    #[must_use]
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    /// Decode inline data; `None` for URL files or invalid base64.
    #[must_use]
    pub fn bytes(&self) -> Option<Vec<u8>> {
        match &self.data {
            FileData::Base64 { data } => base64::engine::general_purpose::STANDARD.decode(data).ok(),
            FileData::Url { .. } => None,
        }
    }
}

/// Reasoning ("thinking") part replayed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPart {
    /// The reasoning text.
    pub text: String,
    /// Backend-specific options (signatures, redaction markers).
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

impl ReasoningPart {
    /// Create a reasoning part.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider_options: ProviderOptions::new(),
        }
    }
}

/// A tool call issued by the model in an earlier turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    /// Call ID, unique within a step.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Raw JSON input.
    pub input: String,
    /// Backend-specific options.
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

impl ToolCallPart {
    /// Create a tool call part.
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
            provider_options: ProviderOptions::new(),
        }
    }
}

/// The result of running a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPart {
    /// The call this result answers.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Result content shown to the model.
    pub content: String,
    /// Whether the tool failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    /// Backend-specific options.
    #[serde(default, skip_serializing_if = "ProviderOptions::is_empty")]
    pub provider_options: ProviderOptions,
}

impl ToolResultPart {
    /// Create a successful result.
    #[must_use]
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
            provider_options: ProviderOptions::new(),
        }
    }

    /// Create an error result.
    #[must_use]
    pub fn error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            is_error: true,
            ..Self::new(tool_call_id, tool_name, content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello");
    }

    #[test]
    fn test_part_serde_tag() {
        let part = MessagePart::ToolCall(ToolCallPart::new("c1", "echo", r#"{"a":1}"#));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "tool-call");
        assert_eq!(json["tool_name"], "echo");
        let back: MessagePart = serde_json::from_value(json).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn test_tool_message_order() {
        let msg = Message::tool(vec![
            ToolResultPart::new("a", "t", "1"),
            ToolResultPart::error("b", "t", "boom"),
        ]);
        let ids: Vec<_> = msg.tool_results().map(|r| r.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(msg.tool_results().nth(1).unwrap().is_error);
    }

    #[test]
    fn test_file_part_bytes() {
        let part = FilePart::from_bytes(b"\x89PNG", "image/png").with_filename("a.png");
        assert_eq!(part.bytes().unwrap(), b"\x89PNG".to_vec());
        let url = FilePart::from_url(Url::parse("https://example.com/a.png").unwrap(), "image/png");
        assert!(url.bytes().is_none());
    }

    #[test]
    fn test_is_error_skipped_when_false() {
        let json = serde_json::to_value(ToolResultPart::new("a", "t", "ok")).unwrap();
        assert!(json.get("is_error").is_none());
    }
}
