//! # unillm-models
//!
//! The model contract for unillm.
//!
//! Every backend adapter implements [`LanguageModel`]: a single-shot
//! `generate` and a streaming `stream`, both over the same [`Call`]. Adapters
//! for concrete vendors live outside this crate; what lives here is the
//! contract itself, the [`StreamPart`] event vocabulary and a pair of
//! scripted models for tests.
//!
//! ## Example
//!
//! ```rust
//! use unillm_core::{CallContext, Message};
//! use unillm_models::{Call, LanguageModel, MockModel};
//!
//! # tokio_test::block_on(async {
//! let model = MockModel::new("test-model").with_text_response("Hi there!");
//! let call = Call::new(vec![Message::user("Hello!")]);
//!
//! let response = model.generate(&CallContext::new(), &call).await.unwrap();
//! assert_eq!(response.text_content(), "Hi there!");
//! # });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod call;
pub mod mock;
pub mod model;
pub mod profile;
pub mod stream;

pub use call::{Call, ResponseFormat, ToolChoice};
pub use mock::{FunctionModel, MockModel, MockReply};
pub use model::{BoxedModel, LanguageModel, StreamResponse};
pub use profile::{ModelCapability, ModelProfile};
pub use stream::{
    response_to_parts, stream_from_parts, stream_from_response, StreamPart, StreamPartType,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BoxedModel, Call, LanguageModel, ResponseFormat, StreamPart, StreamResponse, ToolChoice,
    };
}
