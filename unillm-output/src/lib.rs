//! # unillm-output
//!
//! Structured object generation for unillm.
//!
//! A model is asked for one JSON value conforming to a schema, by one of
//! three strategies:
//!
//! - **Tool**: a synthesized tool whose input schema is the target, with
//!   tool choice forced to it. The tool input is the object.
//! - **Native**: the backend's own schema-constrained output mode.
//! - **Text**: the schema goes into the system prompt and the reply text is
//!   searched for JSON.
//!
//! [`ObjectMode::Auto`] picks one from the model's [`ModelProfile`].
//!
//! Output is validated with `jsonschema`. A [`RepairHook`] gets one chance to
//! fix rejected output before the operation fails with
//! [`ObjectError::NoObjectGenerated`].
//!
//! [`stream_object`] emits partial objects while the payload streams in,
//! using [`parse_partial_json`] to complete truncated JSON.
//!
//! ## Example
//!
//! ```rust
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use serde_json::json;
//! use unillm_core::{CallContext, Message};
//! use unillm_models::MockModel;
//! use unillm_output::{generate_object_as, ObjectCall, ObjectSchema};
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct Recipe {
//!     name: String,
//!     minutes: u32,
//! }
//!
//! # tokio_test::block_on(async {
//! let schema = ObjectSchema::of::<Recipe>().unwrap();
//! let model = MockModel::new("mock")
//!     .with_tool_call("call_1", "Recipe", json!({"name": "Lasagna", "minutes": 90}));
//!
//! let call = ObjectCall::new(vec![Message::user("Something Italian")], schema);
//! let result = generate_object_as::<Recipe, _>(&model, &CallContext::new(), &call)
//!     .await
//!     .unwrap();
//! assert_eq!(result.object.name, "Lasagna");
//! # });
//! ```
//!
//! [`ModelProfile`]: unillm_models::ModelProfile

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod call;
pub mod error;
pub mod generate;
pub mod mode;
pub mod parser;
pub mod partial;
pub mod repair;
pub mod schema;
pub mod stream;

pub use call::ObjectCall;
pub use error::{NoObjectGeneratedError, ObjectError};
pub use generate::{generate_object, generate_object_as, ObjectResult};
pub use mode::ObjectMode;
pub use parser::{
    extract_json_from_text, json_candidates, parse_json_from_text, parse_json_from_text_with,
};
pub use partial::{parse_partial_json, PartialParse};
pub use repair::RepairHook;
pub use schema::{ObjectSchema, DEFAULT_OBJECT_NAME};
pub use stream::{stream_object, ObjectStream, ObjectStreamPart};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        generate_object, generate_object_as, stream_object, NoObjectGeneratedError, ObjectCall,
        ObjectError, ObjectMode, ObjectResult, ObjectSchema, ObjectStreamPart, RepairHook,
    };
}
