//! # unillm-tools
//!
//! Tool system for unillm agents.
//!
//! This crate provides the infrastructure for defining, registering, and
//! executing tools that agents expose to models.
//!
//! ## Core Concepts
//!
//! - **[`Tool`]**: Trait for callable tools (`info` + `run`)
//! - **[`ToolDescriptor`]**: JSON Schema-based tool descriptions for models
//! - **[`ToolCall`]** / **[`ToolResponse`]**: what goes in and what comes out
//! - **[`ToolSet`]**: Ordered, name-addressable collection of tools
//! - **[`TypedTool`]**: Tools whose schema and input come from a Rust type
//!
//! ## Defining Tools
//!
//! ```rust
//! use async_trait::async_trait;
//! use unillm_tools::{
//!     ObjectJsonSchema, Tool, ToolCall, ToolContext, ToolDescriptor, ToolResponse, ToolResult,
//! };
//!
//! struct WeatherTool;
//!
//! #[async_trait]
//! impl Tool for WeatherTool {
//!     fn info(&self) -> ToolDescriptor {
//!         ToolDescriptor::new("get_weather", "Get current weather for a location")
//!             .with_parameters(ObjectJsonSchema::new().with_property(
//!                 "location",
//!                 serde_json::json!({"type": "string", "description": "City name"}),
//!                 true,
//!             ))
//!     }
//!
//!     async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> ToolResult {
//!         let args = call.parse_input()?;
//!         let location = args["location"].as_str().unwrap_or("Unknown");
//!         Ok(ToolResponse::text(format!("Weather in {}: 22C, sunny", location)))
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `schema-validation`: validate inputs against the descriptor with `jsonschema`

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod context;
pub mod definition;
pub mod errors;
pub mod registry;
pub mod return_types;
pub mod schema;
pub mod tool;
pub mod typed;

pub use context::ToolContext;
pub use definition::{ObjectJsonSchema, ToolDescriptor};
pub use errors::ToolError;
pub use registry::ToolSet;
pub use return_types::{IntoToolResponse, ToolCall, ToolResponse, ToolResult};
pub use schema::{json_schema_for, schema_for_type, SchemaBuilder};
pub use tool::{BoxedTool, FunctionTool, Tool};
pub use typed::TypedTool;
