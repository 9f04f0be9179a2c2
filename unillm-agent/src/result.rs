//! Agent run results.

use serde::{Deserialize, Serialize};
use unillm_core::{
    CallWarning, Content, ContentSliceExt, FinishReason, Message, Response, ToolResultContent,
    Usage,
};

/// Outcome of one model round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Zero-based round number.
    pub step: usize,
    /// Model content followed by the tool results of this round.
    pub content: Vec<Content>,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
    /// Usage of this round.
    pub usage: Usage,
    /// Warnings the backend reported for this round.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CallWarning>,
    /// Messages this round appended to the conversation.
    pub messages: Vec<Message>,
    /// The raw model response.
    pub response: Response,
}

impl StepResult {
    /// Text produced in this round.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Tool results produced in this round, in call order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResultContent> {
        self.content.iter().filter_map(|c| match c {
            Content::ToolResult(r) => Some(r),
            _ => None,
        })
    }

    /// Whether the model asked for tools this round.
    #[must_use]
    pub fn requested_tools(&self) -> bool {
        self.finish_reason.is_tool_calls()
    }
}

/// Result of a complete agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Every round, in order.
    pub steps: Vec<StepResult>,
    /// The last round's response.
    pub response: Response,
    /// Sum of the usage of every round.
    pub total_usage: Usage,
}

impl AgentResult {
    /// Assemble a result from its steps.
    ///
    /// Returns `None` when no round ran.
    #[must_use]
    pub fn from_steps(steps: Vec<StepResult>) -> Option<Self> {
        let response = steps.last()?.response.clone();
        let total_usage = steps.iter().map(|s| s.usage).sum();
        Some(Self {
            steps,
            response,
            total_usage,
        })
    }

    /// Final text output.
    #[must_use]
    pub fn text(&self) -> String {
        self.response.text_content()
    }

    /// Number of rounds.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Finish reason of the last round.
    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        self.response.finish_reason
    }

    /// All messages the run appended, across rounds.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.steps.iter().flat_map(|s| s.messages.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn step(step: usize, response: Response) -> StepResult {
        StepResult {
            step,
            content: response.content.clone(),
            finish_reason: response.finish_reason,
            usage: response.usage,
            warnings: Vec::new(),
            messages: vec![response.to_assistant_message()],
            response,
        }
    }

    #[test]
    fn test_from_steps_sums_usage() {
        let steps = vec![
            step(0, Response::text("a").with_usage(Usage::new(10, 5))),
            step(1, Response::text("b").with_usage(Usage::new(20, 7))),
        ];
        let result = AgentResult::from_steps(steps).unwrap();
        assert_eq!(result.total_usage.total_tokens, 42);
        assert_eq!(result.text(), "b");
        assert_eq!(result.step_count(), 2);
        assert_eq!(result.messages().count(), 2);
    }

    #[test]
    fn test_from_no_steps() {
        assert!(AgentResult::from_steps(Vec::new()).is_none());
    }

    #[test]
    fn test_tool_results_filter() {
        let mut s = step(0, Response::text("x"));
        s.content.push(Content::ToolResult(ToolResultContent::new("c1", "t", "out", true)));
        let results: Vec<_> = s.tool_results().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_error);
    }
}
