//! Per-event stream callbacks.
//!
//! Every callback is optional and returns `anyhow::Result<()>`. The first
//! callback error aborts consumption of the stream and becomes the error of
//! the whole operation.

use std::fmt;
use std::sync::Arc;
use unillm_core::{CallWarning, FinishReason, SourceContent, ToolCallContent, ToolResultContent, Usage};

use crate::error::{StreamError, StreamResult};

/// Callback taking a block ID.
pub type IdCallback = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;
/// Callback taking a block ID and a delta.
pub type DeltaCallback = Arc<dyn Fn(&str, &str) -> anyhow::Result<()> + Send + Sync>;
/// Callback for a tool-input block opening: ID and tool name.
pub type ToolInputStartCallback = Arc<dyn Fn(&str, &str) -> anyhow::Result<()> + Send + Sync>;
/// Callback for warnings.
pub type WarningsCallback = Arc<dyn Fn(&[CallWarning]) -> anyhow::Result<()> + Send + Sync>;
/// Callback for a complete tool call.
pub type ToolCallCallback = Arc<dyn Fn(&ToolCallContent) -> anyhow::Result<()> + Send + Sync>;
/// Callback for a tool result.
pub type ToolResultCallback = Arc<dyn Fn(&ToolResultContent) -> anyhow::Result<()> + Send + Sync>;
/// Callback for a source.
pub type SourceCallback = Arc<dyn Fn(&SourceContent) -> anyhow::Result<()> + Send + Sync>;
/// Callback for the finish event.
pub type FinishCallback = Arc<dyn Fn(&Usage, FinishReason) -> anyhow::Result<()> + Send + Sync>;

/// The set of stream callbacks.
///
/// Cloning is cheap; callbacks are shared.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use unillm_streaming::StreamCallbacks;
///
/// let text = Arc::new(Mutex::new(String::new()));
/// let sink = text.clone();
/// let callbacks = StreamCallbacks::new().on_text_delta(move |_id, delta| {
///     sink.lock().unwrap().push_str(delta);
///     Ok(())
/// });
/// # let _ = callbacks;
/// ```
#[derive(Clone, Default)]
pub struct StreamCallbacks {
    warnings: Option<WarningsCallback>,
    text_start: Option<IdCallback>,
    text_delta: Option<DeltaCallback>,
    text_end: Option<IdCallback>,
    reasoning_start: Option<IdCallback>,
    reasoning_delta: Option<DeltaCallback>,
    reasoning_end: Option<IdCallback>,
    tool_input_start: Option<ToolInputStartCallback>,
    tool_input_delta: Option<DeltaCallback>,
    tool_input_end: Option<IdCallback>,
    tool_call: Option<ToolCallCallback>,
    tool_result: Option<ToolResultCallback>,
    source: Option<SourceCallback>,
    stream_finish: Option<FinishCallback>,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident, $field:ident, $($arg:ty),+) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name<F>(mut self, f: F) -> Self
        where
            F: Fn($($arg),+) -> anyhow::Result<()> + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(f));
            self
        }
    };
}

impl StreamCallbacks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    setter!(
        /// Warnings about the call.
        on_warnings, warnings, &[CallWarning]
    );
    setter!(
        /// A text block opened.
        on_text_start, text_start, &str
    );
    setter!(
        /// Text appended: `(id, delta)`.
        on_text_delta, text_delta, &str, &str
    );
    setter!(
        /// A text block closed.
        on_text_end, text_end, &str
    );
    setter!(
        /// A reasoning block opened.
        on_reasoning_start, reasoning_start, &str
    );
    setter!(
        /// Reasoning appended: `(id, delta)`.
        on_reasoning_delta, reasoning_delta, &str, &str
    );
    setter!(
        /// A reasoning block closed.
        on_reasoning_end, reasoning_end, &str
    );
    setter!(
        /// A tool-input block opened: `(id, tool_name)`.
        on_tool_input_start, tool_input_start, &str, &str
    );
    setter!(
        /// Tool input appended: `(id, delta)`.
        on_tool_input_delta, tool_input_delta, &str, &str
    );
    setter!(
        /// A tool-input block closed, explicitly or by inference.
        on_tool_input_end, tool_input_end, &str
    );
    setter!(
        /// A tool call is complete.
        on_tool_call, tool_call, &ToolCallContent
    );
    setter!(
        /// A tool result arrived.
        on_tool_result, tool_result, &ToolResultContent
    );
    setter!(
        /// A source or citation arrived.
        on_source, source, &SourceContent
    );
    setter!(
        /// The stream finished successfully.
        on_stream_finish, stream_finish, &Usage, FinishReason
    );

    /// Invoke the warnings callback.
    pub fn emit_warnings(&self, warnings: &[CallWarning]) -> StreamResult<()> {
        fire("on_warnings", self.warnings.as_ref().map(|f| f(warnings)))
    }

    /// Invoke the text-start callback.
    pub fn emit_text_start(&self, id: &str) -> StreamResult<()> {
        fire("on_text_start", self.text_start.as_ref().map(|f| f(id)))
    }

    /// Invoke the text-delta callback.
    pub fn emit_text_delta(&self, id: &str, delta: &str) -> StreamResult<()> {
        fire("on_text_delta", self.text_delta.as_ref().map(|f| f(id, delta)))
    }

    /// Invoke the text-end callback.
    pub fn emit_text_end(&self, id: &str) -> StreamResult<()> {
        fire("on_text_end", self.text_end.as_ref().map(|f| f(id)))
    }

    /// Invoke the reasoning-start callback.
    pub fn emit_reasoning_start(&self, id: &str) -> StreamResult<()> {
        fire("on_reasoning_start", self.reasoning_start.as_ref().map(|f| f(id)))
    }

    /// Invoke the reasoning-delta callback.
    pub fn emit_reasoning_delta(&self, id: &str, delta: &str) -> StreamResult<()> {
        fire("on_reasoning_delta", self.reasoning_delta.as_ref().map(|f| f(id, delta)))
    }

    /// Invoke the reasoning-end callback.
    pub fn emit_reasoning_end(&self, id: &str) -> StreamResult<()> {
        fire("on_reasoning_end", self.reasoning_end.as_ref().map(|f| f(id)))
    }

    /// Invoke the tool-input-start callback.
    pub fn emit_tool_input_start(&self, id: &str, tool_name: &str) -> StreamResult<()> {
        fire("on_tool_input_start", self.tool_input_start.as_ref().map(|f| f(id, tool_name)))
    }

    /// Invoke the tool-input-delta callback.
    pub fn emit_tool_input_delta(&self, id: &str, delta: &str) -> StreamResult<()> {
        fire("on_tool_input_delta", self.tool_input_delta.as_ref().map(|f| f(id, delta)))
    }

    /// Invoke the tool-input-end callback.
    pub fn emit_tool_input_end(&self, id: &str) -> StreamResult<()> {
        fire("on_tool_input_end", self.tool_input_end.as_ref().map(|f| f(id)))
    }

    /// Invoke the tool-call callback.
    pub fn emit_tool_call(&self, call: &ToolCallContent) -> StreamResult<()> {
        fire("on_tool_call", self.tool_call.as_ref().map(|f| f(call)))
    }

    /// Invoke the tool-result callback.
    pub fn emit_tool_result(&self, result: &ToolResultContent) -> StreamResult<()> {
        fire("on_tool_result", self.tool_result.as_ref().map(|f| f(result)))
    }

    /// Invoke the source callback.
    pub fn emit_source(&self, source: &SourceContent) -> StreamResult<()> {
        fire("on_source", self.source.as_ref().map(|f| f(source)))
    }

    /// Invoke the stream-finish callback.
    pub fn emit_stream_finish(&self, usage: &Usage, reason: FinishReason) -> StreamResult<()> {
        fire("on_stream_finish", self.stream_finish.as_ref().map(|f| f(usage, reason)))
    }
}

fn fire(callback: &'static str, outcome: Option<anyhow::Result<()>>) -> StreamResult<()> {
    match outcome {
        Some(Err(source)) => Err(StreamError::callback(callback, source)),
        _ => Ok(()),
    }
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = [
            ("on_warnings", self.warnings.is_some()),
            ("on_text_start", self.text_start.is_some()),
            ("on_text_delta", self.text_delta.is_some()),
            ("on_text_end", self.text_end.is_some()),
            ("on_reasoning_start", self.reasoning_start.is_some()),
            ("on_reasoning_delta", self.reasoning_delta.is_some()),
            ("on_reasoning_end", self.reasoning_end.is_some()),
            ("on_tool_input_start", self.tool_input_start.is_some()),
            ("on_tool_input_delta", self.tool_input_delta.is_some()),
            ("on_tool_input_end", self.tool_input_end.is_some()),
            ("on_tool_call", self.tool_call.is_some()),
            ("on_tool_result", self.tool_result.is_some()),
            ("on_source", self.source.is_some()),
            ("on_stream_finish", self.stream_finish.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();
        f.debug_struct("StreamCallbacks").field("set", &set).finish()
    }
}
