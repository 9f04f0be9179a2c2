//! Streaming events.
//!
//! A stream is a sequence of [`StreamPart`]s. Text, reasoning and tool-input
//! blocks follow start/delta*/end bracket discipline keyed by `id`; the
//! stream ends with one `Finish` or `Error`.

use futures::stream;
use std::fmt;
use unillm_core::{
    CallWarning, Content, FinishReason, ModelError, ProviderMetadata, Response, SourceContent,
    ToolCallContent, ToolResultContent, Usage,
};

use crate::model::StreamResponse;

/// One streaming event.
#[derive(Debug, Clone)]
pub enum StreamPart {
    /// Warnings about the call, usually first.
    Warnings {
        /// Settings the backend ignored.
        warnings: Vec<CallWarning>,
    },
    /// A text block opened.
    TextStart {
        /// Block ID.
        id: String,
        /// Backend metadata for the block.
        provider_metadata: ProviderMetadata,
    },
    /// Text appended to an open block.
    TextDelta {
        /// Block ID.
        id: String,
        /// Appended text.
        delta: String,
    },
    /// A text block closed.
    TextEnd {
        /// Block ID.
        id: String,
    },
    /// A reasoning block opened.
    ReasoningStart {
        /// Block ID.
        id: String,
        /// Backend metadata for the block.
        provider_metadata: ProviderMetadata,
    },
    /// Reasoning appended to an open block.
    ReasoningDelta {
        /// Block ID.
        id: String,
        /// Appended text.
        delta: String,
    },
    /// A reasoning block closed.
    ReasoningEnd {
        /// Block ID.
        id: String,
    },
    /// The model started writing a tool call's input.
    ToolInputStart {
        /// Tool call ID.
        id: String,
        /// Name of the tool being called.
        tool_name: String,
    },
    /// Raw JSON appended to a tool call's input.
    ToolInputDelta {
        /// Tool call ID.
        id: String,
        /// Appended JSON fragment.
        delta: String,
    },
    /// The tool call's input is complete.
    ToolInputEnd {
        /// Tool call ID.
        id: String,
    },
    /// A complete tool call.
    ToolCall(ToolCallContent),
    /// A result of a backend-executed tool.
    ToolResult(ToolResultContent),
    /// A source or citation.
    Source(SourceContent),
    /// Terminal success event.
    Finish {
        /// Usage for the whole call.
        usage: Usage,
        /// Why generation stopped.
        finish_reason: FinishReason,
        /// Response-level backend metadata.
        provider_metadata: ProviderMetadata,
    },
    /// Terminal failure event.
    Error {
        /// The failure.
        error: ModelError,
    },
}

/// Discriminator of a [`StreamPart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamPartType {
    /// `warnings`
    Warnings,
    /// `text-start`
    TextStart,
    /// `text-delta`
    TextDelta,
    /// `text-end`
    TextEnd,
    /// `reasoning-start`
    ReasoningStart,
    /// `reasoning-delta`
    ReasoningDelta,
    /// `reasoning-end`
    ReasoningEnd,
    /// `tool-input-start`
    ToolInputStart,
    /// `tool-input-delta`
    ToolInputDelta,
    /// `tool-input-end`
    ToolInputEnd,
    /// `tool-call`
    ToolCall,
    /// `tool-result`
    ToolResult,
    /// `source`
    Source,
    /// `finish`
    Finish,
    /// `error`
    Error,
}

impl StreamPartType {
    /// Wire name of the event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warnings => "warnings",
            Self::TextStart => "text-start",
            Self::TextDelta => "text-delta",
            Self::TextEnd => "text-end",
            Self::ReasoningStart => "reasoning-start",
            Self::ReasoningDelta => "reasoning-delta",
            Self::ReasoningEnd => "reasoning-end",
            Self::ToolInputStart => "tool-input-start",
            Self::ToolInputDelta => "tool-input-delta",
            Self::ToolInputEnd => "tool-input-end",
            Self::ToolCall => "tool-call",
            Self::ToolResult => "tool-result",
            Self::Source => "source",
            Self::Finish => "finish",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for StreamPartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StreamPart {
    /// Open a text block.
    #[must_use]
    pub fn text_start(id: impl Into<String>) -> Self {
        Self::TextStart {
            id: id.into(),
            provider_metadata: ProviderMetadata::new(),
        }
    }

    /// Append to a text block.
    #[must_use]
    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    /// Close a text block.
    #[must_use]
    pub fn text_end(id: impl Into<String>) -> Self {
        Self::TextEnd { id: id.into() }
    }

    /// Open a reasoning block.
    #[must_use]
    pub fn reasoning_start(id: impl Into<String>) -> Self {
        Self::ReasoningStart {
            id: id.into(),
            provider_metadata: ProviderMetadata::new(),
        }
    }

    /// Append to a reasoning block.
    #[must_use]
    pub fn reasoning_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    /// Close a reasoning block.
    #[must_use]
    pub fn reasoning_end(id: impl Into<String>) -> Self {
        Self::ReasoningEnd { id: id.into() }
    }

    /// Open a tool-input block.
    #[must_use]
    pub fn tool_input_start(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::ToolInputStart {
            id: id.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Append to a tool-input block.
    #[must_use]
    pub fn tool_input_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ToolInputDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    /// Close a tool-input block.
    #[must_use]
    pub fn tool_input_end(id: impl Into<String>) -> Self {
        Self::ToolInputEnd { id: id.into() }
    }

    /// A complete tool call.
    #[must_use]
    pub fn tool_call(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self::ToolCall(ToolCallContent::new(id, tool_name, input))
    }

    /// Terminal success event.
    #[must_use]
    pub fn finish(usage: Usage, finish_reason: FinishReason) -> Self {
        Self::Finish {
            usage,
            finish_reason,
            provider_metadata: ProviderMetadata::new(),
        }
    }

    /// Terminal failure event.
    #[must_use]
    pub fn error(error: impl Into<ModelError>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Event type.
    #[must_use]
    pub fn kind(&self) -> StreamPartType {
        match self {
            Self::Warnings { .. } => StreamPartType::Warnings,
            Self::TextStart { .. } => StreamPartType::TextStart,
            Self::TextDelta { .. } => StreamPartType::TextDelta,
            Self::TextEnd { .. } => StreamPartType::TextEnd,
            Self::ReasoningStart { .. } => StreamPartType::ReasoningStart,
            Self::ReasoningDelta { .. } => StreamPartType::ReasoningDelta,
            Self::ReasoningEnd { .. } => StreamPartType::ReasoningEnd,
            Self::ToolInputStart { .. } => StreamPartType::ToolInputStart,
            Self::ToolInputDelta { .. } => StreamPartType::ToolInputDelta,
            Self::ToolInputEnd { .. } => StreamPartType::ToolInputEnd,
            Self::ToolCall(_) => StreamPartType::ToolCall,
            Self::ToolResult(_) => StreamPartType::ToolResult,
            Self::Source(_) => StreamPartType::Source,
            Self::Finish { .. } => StreamPartType::Finish,
            Self::Error { .. } => StreamPartType::Error,
        }
    }

    /// Correlation ID, for events that have one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::TextStart { id, .. }
            | Self::TextDelta { id, .. }
            | Self::TextEnd { id }
            | Self::ReasoningStart { id, .. }
            | Self::ReasoningDelta { id, .. }
            | Self::ReasoningEnd { id }
            | Self::ToolInputStart { id, .. }
            | Self::ToolInputDelta { id, .. }
            | Self::ToolInputEnd { id } => Some(id),
            Self::ToolCall(call) => Some(&call.tool_call_id),
            Self::ToolResult(result) => Some(&result.tool_call_id),
            Self::Source(source) => Some(&source.id),
            Self::Warnings { .. } | Self::Finish { .. } | Self::Error { .. } => None,
        }
    }

    /// Delta payload, for delta events.
    #[must_use]
    pub fn delta(&self) -> Option<&str> {
        match self {
            Self::TextDelta { delta, .. }
            | Self::ReasoningDelta { delta, .. }
            | Self::ToolInputDelta { delta, .. } => Some(delta),
            _ => None,
        }
    }

    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }
}

/// Replay a complete response as a well-bracketed event sequence.
///
/// Used by backends without native streaming. Block IDs are the content
/// index, tool-input blocks use the tool call ID.
#[must_use]
pub fn response_to_parts(response: Response) -> Vec<StreamPart> {
    let mut parts = Vec::new();
    if !response.warnings.is_empty() {
        parts.push(StreamPart::Warnings {
            warnings: response.warnings,
        });
    }

    for (index, content) in response.content.into_iter().enumerate() {
        let id = index.to_string();
        match content {
            Content::Text(text) => {
                parts.push(StreamPart::TextStart {
                    id: id.clone(),
                    provider_metadata: text.provider_metadata,
                });
                if !text.text.is_empty() {
                    parts.push(StreamPart::text_delta(id.clone(), text.text));
                }
                parts.push(StreamPart::text_end(id));
            }
            Content::Reasoning(reasoning) => {
                parts.push(StreamPart::ReasoningStart {
                    id: id.clone(),
                    provider_metadata: reasoning.provider_metadata,
                });
                if !reasoning.text.is_empty() {
                    parts.push(StreamPart::reasoning_delta(id.clone(), reasoning.text));
                }
                parts.push(StreamPart::reasoning_end(id));
            }
            Content::ToolCall(call) => {
                let call_id = call.tool_call_id.clone();
                parts.push(StreamPart::tool_input_start(call_id.clone(), call.tool_name.clone()));
                if !call.input.is_empty() {
                    parts.push(StreamPart::tool_input_delta(call_id.clone(), call.input.clone()));
                }
                parts.push(StreamPart::tool_input_end(call_id));
                parts.push(StreamPart::ToolCall(call));
            }
            Content::ToolResult(result) => parts.push(StreamPart::ToolResult(result)),
            Content::Source(source) => parts.push(StreamPart::Source(source)),
        }
    }

    parts.push(StreamPart::Finish {
        usage: response.usage,
        finish_reason: response.finish_reason,
        provider_metadata: response.provider_metadata,
    });
    parts
}

/// Stream a complete response.
#[must_use]
pub fn stream_from_response(response: Response) -> StreamResponse {
    stream_from_parts(response_to_parts(response))
}

/// Stream a fixed list of events.
#[must_use]
pub fn stream_from_parts(parts: Vec<StreamPart>) -> StreamResponse {
    Box::pin(stream::iter(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_names() {
        assert_eq!(StreamPart::text_start("1").kind().to_string(), "text-start");
        assert_eq!(StreamPart::tool_input_delta("c", "{").kind().as_str(), "tool-input-delta");
        assert_eq!(
            StreamPart::finish(Usage::default(), FinishReason::Stop).kind(),
            StreamPartType::Finish
        );
    }

    #[test]
    fn test_id_and_delta() {
        let part = StreamPart::text_delta("7", "hi");
        assert_eq!(part.id(), Some("7"));
        assert_eq!(part.delta(), Some("hi"));
        assert!(!part.is_terminal());
        assert_eq!(StreamPart::error(ModelError::Cancelled).id(), None);
        assert!(StreamPart::error(ModelError::Cancelled).is_terminal());
    }

    #[test]
    fn test_response_to_parts_bracketing() {
        let response = Response::new(vec![
            Content::reasoning("thinking"),
            Content::text("Hello"),
            Content::tool_call("call_1", "weather", r#"{"city":"Paris"}"#),
        ])
        .with_finish_reason(FinishReason::ToolCalls)
        .with_usage(Usage::new(3, 4));

        let kinds: Vec<_> = response_to_parts(response)
            .iter()
            .map(|p| p.kind().as_str())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "reasoning-start",
                "reasoning-delta",
                "reasoning-end",
                "text-start",
                "text-delta",
                "text-end",
                "tool-input-start",
                "tool-input-delta",
                "tool-input-end",
                "tool-call",
                "finish",
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_from_response_ends_with_finish() {
        let parts: Vec<_> = stream_from_response(Response::text("ok")).collect().await;
        match parts.last() {
            Some(StreamPart::Finish { finish_reason, .. }) => {
                assert_eq!(*finish_reason, FinishReason::Stop)
            }
            other => panic!("unexpected last part: {other:?}"),
        }
    }
}
