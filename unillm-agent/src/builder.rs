//! Agent builder pattern.
//!
//! The builder provides a fluent interface for configuring agents.

use std::sync::Arc;
use unillm_core::{CallSettings, ProviderOptions, UsageLimits};
use unillm_models::{BoxedModel, LanguageModel, ToolChoice};
use unillm_streaming::StreamCallbacks;
use unillm_tools::{BoxedTool, Tool, ToolSet};

use crate::agent::{Agent, ToolExecution};
use crate::callbacks::AgentCallbacks;
use crate::errors::AgentError;

/// Builder for creating agents.
pub struct AgentBuilder {
    model: BoxedModel,
    name: Option<String>,
    system_prompt: Option<String>,
    tools: ToolSet,
    max_steps: Option<usize>,
    settings: CallSettings,
    tool_choice: Option<ToolChoice>,
    provider_options: ProviderOptions,
    usage_limits: Option<UsageLimits>,
    tool_execution: ToolExecution,
    callbacks: AgentCallbacks,
}

impl AgentBuilder {
    /// Create a new agent builder with the given model.
    pub fn new<M: LanguageModel + 'static>(model: M) -> Self {
        Self::from_arc(Arc::new(model))
    }

    /// Create a builder around a shared model.
    pub fn from_arc(model: BoxedModel) -> Self {
        Self {
            model,
            name: None,
            system_prompt: None,
            tools: ToolSet::new(),
            max_steps: None,
            settings: CallSettings::default(),
            tool_choice: None,
            provider_options: ProviderOptions::new(),
            usage_limits: None,
            tool_execution: ToolExecution::Sequential,
            callbacks: AgentCallbacks::default(),
        }
    }

    /// Set agent name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the system prompt placed before every conversation.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Register a tool.
    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Register a shared tool.
    #[must_use]
    pub fn tool_arc(mut self, tool: BoxedTool) -> Self {
        self.tools.register_arc(tool);
        self
    }

    /// Replace the tool set.
    #[must_use]
    pub fn tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Limit the number of model rounds.
    ///
    /// Reaching the budget ends the run normally with the last round's
    /// response. Unbounded by default.
    #[must_use]
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Set call settings.
    #[must_use]
    pub fn settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn temperature(mut self, temp: f64) -> Self {
        self.settings = self.settings.temperature(temp);
        self
    }

    /// Set max output tokens.
    #[must_use]
    pub fn max_output_tokens(mut self, tokens: u64) -> Self {
        self.settings = self.settings.max_output_tokens(tokens);
        self
    }

    /// Set top-p.
    #[must_use]
    pub fn top_p(mut self, p: f64) -> Self {
        self.settings = self.settings.top_p(p);
        self
    }

    /// Set the tool choice sent on every round.
    #[must_use]
    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Set backend options sent on every round.
    #[must_use]
    pub fn provider_options(mut self, options: ProviderOptions) -> Self {
        self.provider_options = options;
        self
    }

    /// Set usage limits, checked against cumulative usage after each round.
    #[must_use]
    pub fn usage_limits(mut self, limits: UsageLimits) -> Self {
        self.usage_limits = Some(limits);
        self
    }

    /// Run the tool calls of a round concurrently, `max` at a time.
    #[must_use]
    pub fn concurrent_tools(mut self, max: usize) -> Self {
        self.tool_execution = ToolExecution::Concurrent {
            max_concurrency: max,
        };
        self
    }

    /// Run the tool calls of a round one after another (the default).
    #[must_use]
    pub fn sequential_tools(mut self) -> Self {
        self.tool_execution = ToolExecution::Sequential;
        self
    }

    /// Set lifecycle callbacks.
    #[must_use]
    pub fn callbacks(mut self, callbacks: AgentCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Set stream-event callbacks.
    #[must_use]
    pub fn stream_callbacks(mut self, callbacks: StreamCallbacks) -> Self {
        self.callbacks.stream = callbacks;
        self
    }

    /// Build the agent.
    pub fn build(self) -> Result<Agent, AgentError> {
        if self.max_steps == Some(0) {
            return Err(AgentError::config("max_steps must be at least 1"));
        }
        if self.tool_execution == (ToolExecution::Concurrent { max_concurrency: 0 }) {
            return Err(AgentError::config("max_concurrency must be at least 1"));
        }
        if let Some(ToolChoice::Tool(name)) = &self.tool_choice {
            if !self.tools.contains(name) {
                return Err(AgentError::config(format!(
                    "tool choice names unregistered tool '{name}'"
                )));
            }
        }
        self.settings
            .validate()
            .map_err(|e| AgentError::config(e.to_string()))?;

        Ok(Agent {
            model: self.model,
            name: self.name,
            system_prompt: self.system_prompt,
            tools: self.tools,
            max_steps: self.max_steps,
            settings: self.settings,
            tool_choice: self.tool_choice,
            provider_options: self.provider_options,
            usage_limits: self.usage_limits,
            tool_execution: self.tool_execution,
            callbacks: self.callbacks,
        })
    }
}

impl std::fmt::Debug for AgentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBuilder")
            .field("model", &self.model.identifier())
            .field("tools", &self.tools)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}
