//! Message types for model interactions.
//!
//! - **Prompt side**: [`Message`], [`Role`] and the [`MessagePart`] variants
//! - **Output side**: [`Content`] variants produced by a model
//! - **Responses**: [`Response`], [`FinishReason`] and [`CallWarning`]
//!
//! ## Example
//!
//! ```rust
//! use unillm_core::messages::{Content, Message, Response};
//!
//! let prompt = vec![
//!     Message::system("You are a helpful assistant."),
//!     Message::user("Hello!"),
//! ];
//! assert_eq!(prompt.len(), 2);
//!
//! let response = Response::new(vec![Content::text("Hello! How can I help?")]);
//! assert_eq!(response.text_content(), "Hello! How can I help?");
//! ```

pub mod content;
pub mod prompt;
pub mod response;

pub use content::{
    Content, ContentSliceExt, ReasoningContent, SourceContent, SourceType, TextContent,
    ToolCallContent, ToolResultContent,
};
pub use prompt::{
    FileData, FilePart, Message, MessagePart, Prompt, ReasoningPart, Role, TextPart, ToolCallPart,
    ToolResultPart,
};
pub use response::{CallWarning, FinishReason, Response};
