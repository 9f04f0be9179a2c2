//! Lifecycle callbacks of an agent run.
//!
//! Stream-event callbacks live in [`StreamCallbacks`] and are only fired by
//! [`Agent::stream`](crate::Agent::stream). The lifecycle callbacks here fire
//! in both modes.

use std::fmt;
use std::sync::Arc;
use unillm_core::Response;
use unillm_streaming::StreamCallbacks;

use crate::context::RunContext;
use crate::errors::AgentError;
use crate::result::{AgentResult, StepResult};

/// Callback receiving the run context.
pub type RunCallback = Arc<dyn Fn(&RunContext) -> anyhow::Result<()> + Send + Sync>;
/// Callback receiving a finished round.
pub type StepCallback = Arc<dyn Fn(&StepResult) -> anyhow::Result<()> + Send + Sync>;
/// Callback receiving the finished run.
pub type AgentFinishCallback = Arc<dyn Fn(&AgentResult) -> anyhow::Result<()> + Send + Sync>;
/// Callback receiving the final response.
pub type ResponseCallback = Arc<dyn Fn(&Response) -> anyhow::Result<()> + Send + Sync>;
/// Callback receiving the error that ended a run.
pub type ErrorCallback = Arc<dyn Fn(&AgentError) + Send + Sync>;

/// Callbacks for an agent run. All default to no-op.
#[derive(Clone, Default)]
pub struct AgentCallbacks {
    agent_start: Option<RunCallback>,
    step_start: Option<RunCallback>,
    step_finish: Option<StepCallback>,
    agent_finish: Option<AgentFinishCallback>,
    finish: Option<ResponseCallback>,
    error: Option<ErrorCallback>,
    /// Per-event callbacks used in stream mode.
    pub stream: StreamCallbacks,
}

impl AgentCallbacks {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired once before the first round.
    #[must_use]
    pub fn on_agent_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.agent_start = Some(Arc::new(f));
        self
    }

    /// Fired before each round; `RunContext::step` holds the round number.
    #[must_use]
    pub fn on_step_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.step_start = Some(Arc::new(f));
        self
    }

    /// Fired after each round, tool results included.
    #[must_use]
    pub fn on_step_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&StepResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.step_finish = Some(Arc::new(f));
        self
    }

    /// Fired once with the assembled result.
    #[must_use]
    pub fn on_agent_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentResult) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.agent_finish = Some(Arc::new(f));
        self
    }

    /// Fired once with the final response, after `on_agent_finish`.
    #[must_use]
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.finish = Some(Arc::new(f));
        self
    }

    /// Fired exactly once when the run fails.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentError) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }

    /// Replace the stream-event callbacks.
    #[must_use]
    pub fn with_stream(mut self, stream: StreamCallbacks) -> Self {
        self.stream = stream;
        self
    }

    pub(crate) fn emit_agent_start(&self, ctx: &RunContext) -> Result<(), AgentError> {
        fire("on_agent_start", self.agent_start.as_ref().map(|f| f(ctx)))
    }

    pub(crate) fn emit_step_start(&self, ctx: &RunContext) -> Result<(), AgentError> {
        fire("on_step_start", self.step_start.as_ref().map(|f| f(ctx)))
    }

    pub(crate) fn emit_step_finish(&self, step: &StepResult) -> Result<(), AgentError> {
        fire("on_step_finish", self.step_finish.as_ref().map(|f| f(step)))
    }

    pub(crate) fn emit_agent_finish(&self, result: &AgentResult) -> Result<(), AgentError> {
        fire("on_agent_finish", self.agent_finish.as_ref().map(|f| f(result)))
    }

    pub(crate) fn emit_finish(&self, response: &Response) -> Result<(), AgentError> {
        fire("on_finish", self.finish.as_ref().map(|f| f(response)))
    }

    pub(crate) fn emit_error(&self, error: &AgentError) {
        if let Some(f) = &self.error {
            f(error);
        }
    }
}

fn fire(callback: &'static str, outcome: Option<anyhow::Result<()>>) -> Result<(), AgentError> {
    match outcome {
        Some(Err(source)) => Err(AgentError::callback(callback, source)),
        _ => Ok(()),
    }
}

impl fmt::Debug for AgentCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentCallbacks")
            .field("on_agent_start", &self.agent_start.is_some())
            .field("on_step_start", &self.step_start.is_some())
            .field("on_step_finish", &self.step_finish.is_some())
            .field("on_agent_finish", &self.agent_finish.is_some())
            .field("on_finish", &self.finish.is_some())
            .field("on_error", &self.error.is_some())
            .field("stream", &self.stream)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_callbacks_are_noops() {
        let callbacks = AgentCallbacks::new();
        assert!(callbacks.emit_agent_start(&RunContext::new("m")).is_ok());
        callbacks.emit_error(&AgentError::Cancelled);
    }

    #[test]
    fn test_callback_error_is_named() {
        let callbacks = AgentCallbacks::new().on_step_start(|_| anyhow::bail!("stop"));
        match callbacks.emit_step_start(&RunContext::new("m")) {
            Err(AgentError::Callback { callback, .. }) => assert_eq!(callback, "on_step_start"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
