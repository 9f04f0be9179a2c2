//! The agent type.
//!
//! An [`Agent`] owns a model, a tool set and the configuration of the
//! multi-step loop. It is immutable once built and can serve any number of
//! runs, concurrently if the model allows it.

use serde::{Deserialize, Serialize};
use unillm_core::{CallContext, CallSettings, Message, Prompt, ProviderOptions, UsageLimits};
use unillm_models::{BoxedModel, Call, ToolChoice};
use unillm_tools::ToolSet;

use crate::builder::AgentBuilder;
use crate::callbacks::AgentCallbacks;
use crate::errors::AgentError;
use crate::result::AgentResult;
use crate::run::{AgentRun, RunMode};

/// How the tool calls of one round are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ToolExecution {
    /// One after another, in call order.
    #[default]
    Sequential,
    /// Up to `max_concurrency` at a time. Results still come back in call order.
    Concurrent {
        /// Maximum number of tools running at once.
        max_concurrency: usize,
    },
}

/// Anything that can start a conversation.
pub trait IntoPrompt {
    /// Convert into prompt messages.
    fn into_prompt(self) -> Prompt;
}

impl IntoPrompt for Prompt {
    fn into_prompt(self) -> Prompt {
        self
    }
}

impl IntoPrompt for Message {
    fn into_prompt(self) -> Prompt {
        vec![self]
    }
}

impl IntoPrompt for &str {
    fn into_prompt(self) -> Prompt {
        vec![Message::user(self)]
    }
}

impl IntoPrompt for String {
    fn into_prompt(self) -> Prompt {
        vec![Message::user(self)]
    }
}

/// A configured tool-calling agent.
///
/// # Example
///
/// ```rust
/// use unillm_agent::Agent;
/// use unillm_core::CallContext;
/// use unillm_models::MockModel;
///
/// # tokio_test::block_on(async {
/// let agent = Agent::builder(MockModel::new("test").with_text_response("Hi there"))
///     .system_prompt("Be brief.")
///     .build()
///     .unwrap();
///
/// let result = agent.generate(&CallContext::new(), "Hello").await.unwrap();
/// assert_eq!(result.text(), "Hi there");
/// # });
/// ```
pub struct Agent {
    pub(crate) model: BoxedModel,
    pub(crate) name: Option<String>,
    pub(crate) system_prompt: Option<String>,
    pub(crate) tools: ToolSet,
    pub(crate) max_steps: Option<usize>,
    pub(crate) settings: CallSettings,
    pub(crate) tool_choice: Option<ToolChoice>,
    pub(crate) provider_options: ProviderOptions,
    pub(crate) usage_limits: Option<UsageLimits>,
    pub(crate) tool_execution: ToolExecution,
    pub(crate) callbacks: AgentCallbacks,
}

impl Agent {
    /// Start configuring an agent around `model`.
    pub fn builder<M: unillm_models::LanguageModel + 'static>(model: M) -> AgentBuilder {
        AgentBuilder::new(model)
    }

    /// Agent name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The model in use.
    #[must_use]
    pub fn model(&self) -> &BoxedModel {
        &self.model
    }

    /// Registered tools.
    #[must_use]
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Step budget, `None` when unbounded.
    #[must_use]
    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    /// Tool execution policy.
    #[must_use]
    pub fn tool_execution(&self) -> ToolExecution {
        self.tool_execution
    }

    /// Run to completion using non-streaming model calls.
    pub async fn generate(
        &self,
        ctx: &CallContext,
        prompt: impl IntoPrompt,
    ) -> Result<AgentResult, AgentError> {
        AgentRun::new(self, ctx, RunMode::Generate, prompt.into_prompt())
            .execute()
            .await
    }

    /// Run to completion using streaming model calls.
    ///
    /// Every round goes through the stream aggregator, so the stream
    /// callbacks fire as events arrive. Tool results are reported through
    /// `on_tool_result` once the tools ran.
    pub async fn stream(
        &self,
        ctx: &CallContext,
        prompt: impl IntoPrompt,
    ) -> Result<AgentResult, AgentError> {
        AgentRun::new(self, ctx, RunMode::Stream, prompt.into_prompt())
            .execute()
            .await
    }

    /// The call sent to the model for the given conversation.
    pub(crate) fn build_call(&self, prompt: Prompt) -> Call {
        let mut call = Call::new(prompt)
            .with_tools(self.tools.descriptors())
            .with_settings(self.settings.clone())
            .with_provider_options(self.provider_options.clone());
        call.tool_choice = self.tool_choice.clone();
        call
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model.identifier())
            .field("name", &self.name)
            .field("tools", &self.tools)
            .field("max_steps", &self.max_steps)
            .field("tool_execution", &self.tool_execution)
            .finish_non_exhaustive()
    }
}
