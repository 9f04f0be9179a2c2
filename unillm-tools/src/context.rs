//! Context passed to tools during execution.

use unillm_core::CallContext;

/// Context passed to a tool invocation.
///
/// Carries the run's cancellation signal; a long-running tool is expected to
/// watch [`ToolContext::cancelled`] and return [`ToolError::Cancelled`](crate::ToolError::Cancelled).
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The call context of the surrounding run.
    pub call: CallContext,
    /// Zero-based step of the agent run issuing the call.
    pub step: usize,
    /// Tool call ID being answered.
    pub tool_call_id: String,
    /// Name of the tool being run.
    pub tool_name: String,
}

impl ToolContext {
    /// Create a context for one tool call.
    #[must_use]
    pub fn new(call: CallContext, step: usize, tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call,
            step,
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.call.is_cancelled()
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        self.call.cancelled().await;
    }
}
