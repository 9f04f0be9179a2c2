//! # unillm-streaming
//!
//! Streaming aggregation for unillm.
//!
//! A backend's [`StreamResponse`](unillm_models::StreamResponse) is a lazy
//! sequence of [`StreamPart`](unillm_models::StreamPart)s. This crate turns
//! it into two things at once: a sequence of user callbacks, in event order,
//! and the materialized [`Response`](unillm_core::Response) a non-streaming
//! call would have returned.
//!
//! ## Core Concepts
//!
//! - **[`StreamAggregator`]**: synchronous, one event at a time
//! - **[`aggregate`]**: async driver with cancellation
//! - **[`StreamCallbacks`]**: one optional callback per event type
//!
//! ## Example
//!
//! ```rust
//! use unillm_core::{CallContext, FinishReason, Usage};
//! use unillm_models::{stream_from_parts, StreamPart};
//! use unillm_streaming::{aggregate, StreamCallbacks};
//!
//! # tokio_test::block_on(async {
//! let stream = stream_from_parts(vec![
//!     StreamPart::text_start("0"),
//!     StreamPart::text_delta("0", "Hello"),
//!     StreamPart::text_end("0"),
//!     StreamPart::finish(Usage::new(3, 1), FinishReason::Stop),
//! ]);
//!
//! let response = aggregate(stream, &CallContext::new(), StreamCallbacks::new())
//!     .await
//!     .unwrap();
//! assert_eq!(response.text_content(), "Hello");
//! # });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aggregator;
pub mod callbacks;
pub mod error;

pub use aggregator::{aggregate, AggregatorState, StreamAggregator};
pub use callbacks::StreamCallbacks;
pub use error::{StreamError, StreamResult};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{aggregate, StreamAggregator, StreamCallbacks, StreamError};
}
