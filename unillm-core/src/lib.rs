//! # unillm-core
//!
//! Core types, messages, and error handling for the unillm runtime.
//!
//! This crate provides the foundational types every backend and every layer
//! above the model contract shares:
//!
//! - **Messages**: prompt messages, produced content and responses
//! - **Errors**: the error taxonomy backends report through
//! - **Usage**: additive token usage and limits
//! - **Settings**: backend-independent sampling settings
//! - **Provider data**: backend-specific options/metadata and their registry
//! - **Context**: the cancellation signal passed to every blocking call
//!
//! ## Feature Flags
//!
//! - `tracing-integration`: Enable tracing instrumentation
//! - `full`: Enable all optional features
//!
//! ## Example
//!
//! ```rust
//! use unillm_core::{CallSettings, Message, Usage, UsageLimits};
//!
//! let prompt = vec![Message::system("Be brief."), Message::user("Hello!")];
//! let settings = CallSettings::new().max_output_tokens(256).temperature(0.2);
//! settings.validate().expect("valid settings");
//!
//! let usage = Usage::new(100, 50) + Usage::new(20, 10);
//! assert_eq!(usage.total_tokens, 180);
//! UsageLimits::new().max_total_tokens(1000).check(&usage).expect("within limits");
//! # let _ = prompt;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod context;
pub mod errors;
pub mod identifier;
pub mod messages;
pub mod provider;
pub mod settings;
pub mod usage;

// Re-exports for convenience
pub use context::CallContext;
pub use errors::{
    ApiCallError, InvalidArgumentError, InvalidResponseDataError, ModelError, Result,
    UnknownProviderDataTypeError,
};
pub use messages::{
    CallWarning, Content, ContentSliceExt, FilePart, FinishReason, Message, MessagePart, Prompt,
    ReasoningContent, ReasoningPart, Response, Role, SourceContent, TextContent, TextPart,
    ToolCallContent, ToolCallPart, ToolResultContent, ToolResultPart,
};
pub use provider::{
    register_provider_data, ProviderData, ProviderDataType, ProviderMap, ProviderMetadata,
    ProviderOptions,
};
pub use settings::CallSettings;
pub use usage::{Usage, UsageLimitExceeded, UsageLimits};

/// Prelude module for common imports.
///
/// ```rust
/// use unillm_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::context::CallContext;
    pub use crate::errors::{ModelError, Result};
    pub use crate::messages::{
        CallWarning, Content, ContentSliceExt, FinishReason, Message, MessagePart, Response, Role,
        ToolCallContent, ToolResultPart,
    };
    pub use crate::provider::{ProviderDataType, ProviderMetadata, ProviderOptions};
    pub use crate::settings::CallSettings;
    pub use crate::usage::{Usage, UsageLimits};
}
