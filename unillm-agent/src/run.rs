//! The multi-step run loop.
//!
//! Each round calls the model once, runs the tools it asked for and feeds
//! the results back. The loop ends when a round finishes for any reason
//! other than tool calls, or when the step budget is spent.

use futures::future::join_all;
use std::future::Future;
use tokio::sync::Semaphore;
use unillm_core::{
    CallContext, Content, Message, Prompt, Response, ToolCallContent, ToolResultContent,
    ToolResultPart,
};
use unillm_streaming::aggregate;
use unillm_tools::{ToolCall, ToolContext};

use crate::agent::{Agent, ToolExecution};
use crate::context::RunContext;
use crate::errors::AgentError;
use crate::result::{AgentResult, StepResult};

#[cfg(feature = "tracing-integration")]
use tracing::{debug, error, info, warn};

#[cfg(not(feature = "tracing-integration"))]
macro_rules! debug { ($($arg:tt)*) => {} }
#[cfg(not(feature = "tracing-integration"))]
macro_rules! info { ($($arg:tt)*) => {} }
#[cfg(not(feature = "tracing-integration"))]
macro_rules! error { ($($arg:tt)*) => {} }
#[cfg(not(feature = "tracing-integration"))]
macro_rules! warn { ($($arg:tt)*) => {} }

/// Which model entry point a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    Generate,
    Stream,
}

/// State of one agent run.
pub(crate) struct AgentRun<'a> {
    agent: &'a Agent,
    ctx: &'a CallContext,
    mode: RunMode,
    run: RunContext,
    messages: Prompt,
    steps: Vec<StepResult>,
}

impl<'a> AgentRun<'a> {
    pub(crate) fn new(agent: &'a Agent, ctx: &'a CallContext, mode: RunMode, prompt: Prompt) -> Self {
        let mut messages = Vec::with_capacity(prompt.len() + 1);
        if let Some(system) = &agent.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.extend(prompt);

        Self {
            agent,
            ctx,
            mode,
            run: RunContext::new(agent.model.identifier()),
            messages,
            steps: Vec::new(),
        }
    }

    /// Drive the run to completion, firing `on_error` once on failure.
    pub(crate) async fn execute(mut self) -> Result<AgentResult, AgentError> {
        let outcome = self.drive().await;
        if let Err(e) = &outcome {
            error!(run_id = %self.run.run_id, step = self.run.step, error = %e, "Agent run failed");
            self.agent.callbacks.emit_error(e);
        }
        outcome
    }

    async fn drive(&mut self) -> Result<AgentResult, AgentError> {
        let agent = self.agent;
        let callbacks = &agent.callbacks;
        info!(run_id = %self.run.run_id, model = %self.run.model, mode = ?self.mode, "Agent run started");
        callbacks.emit_agent_start(&self.run)?;

        loop {
            if let Some(max) = agent.max_steps {
                if self.steps.len() >= max {
                    debug!(max_steps = max, "Step budget reached");
                    break;
                }
            }
            if self.ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            self.run.step = self.steps.len();
            callbacks.emit_step_start(&self.run)?;

            let (step, follow_up) = self.step().await?;
            callbacks.emit_step_finish(&step)?;
            debug!(
                step = step.step,
                finish_reason = %step.finish_reason,
                tokens = step.usage.total_tokens,
                "Step finished"
            );
            self.steps.push(step);

            if !follow_up {
                break;
            }
        }

        let result = AgentResult::from_steps(std::mem::take(&mut self.steps))
            .ok_or_else(|| AgentError::config("run ended before any step"))?;
        callbacks.emit_agent_finish(&result)?;
        callbacks.emit_finish(&result.response)?;
        info!(
            run_id = %self.run.run_id,
            steps = result.steps.len(),
            total_tokens = result.total_usage.total_tokens,
            "Agent run finished"
        );
        Ok(result)
    }

    /// One model round plus its tool calls.
    ///
    /// Returns the step and whether another round should follow.
    async fn step(&mut self) -> Result<(StepResult, bool), AgentError> {
        let call = self.agent.build_call(self.messages.clone());
        let response = match self.mode {
            RunMode::Generate => self.agent.model.generate(self.ctx, &call).await?,
            RunMode::Stream => {
                let stream = self.agent.model.stream(self.ctx, &call).await?;
                aggregate(stream, self.ctx, self.agent.callbacks.stream.clone()).await?
            }
        };

        self.run.usage += response.usage;
        if let Some(limits) = &self.agent.usage_limits {
            limits.check(&self.run.usage)?;
        }

        let mut content = response.content.clone();
        let mut messages = vec![response.to_assistant_message()];

        let calls = local_tool_calls(&response);
        let follow_up = response.finish_reason.is_tool_calls() && !calls.is_empty();
        if follow_up {
            let results = self.execute_tools(&calls).await;
            if self.mode == RunMode::Stream {
                for result in &results {
                    self.agent.callbacks.stream.emit_tool_result(result)?;
                }
            }
            messages.push(Message::tool(results.iter().map(to_result_part).collect()));
            content.extend(results.into_iter().map(Content::ToolResult));
        }

        self.messages.extend(messages.iter().cloned());
        let step = StepResult {
            step: self.run.step,
            content,
            finish_reason: response.finish_reason,
            usage: response.usage,
            warnings: response.warnings.clone(),
            messages,
            response,
        };
        Ok((step, follow_up))
    }

    /// Run every tool call of the round. Results are in call order.
    async fn execute_tools(&self, calls: &[ToolCallContent]) -> Vec<ToolResultContent> {
        let futures: Vec<_> = calls.iter().map(|call| self.run_tool(call)).collect();

        match self.agent.tool_execution {
            ToolExecution::Sequential => {
                let mut results = Vec::with_capacity(futures.len());
                for fut in futures {
                    results.push(fut.await);
                }
                results
            }
            ToolExecution::Concurrent { max_concurrency } => {
                debug!(count = futures.len(), max_concurrency, "Executing tools concurrently");
                execute_with_semaphore(futures, max_concurrency).await
            }
        }
    }

    async fn run_tool(&self, call: &ToolCallContent) -> ToolResultContent {
        let ctx = ToolContext::new(
            self.ctx.child(),
            self.run.step,
            &call.tool_call_id,
            &call.tool_name,
        );
        debug!(tool = %call.tool_name, tool_call_id = %call.tool_call_id, "Running tool");

        match self.agent.tools.run(&ctx, ToolCall::from(call)).await {
            Ok(response) => ToolResultContent::new(
                &call.tool_call_id,
                &call.tool_name,
                response.content,
                response.is_error,
            ),
            Err(e) => {
                warn!(tool = %call.tool_name, error = %e, "Tool failed");
                ToolResultContent::new(&call.tool_call_id, &call.tool_name, e.to_string(), true)
            }
        }
    }
}

/// Tool calls the runtime has to execute; backend-executed ones are skipped.
fn local_tool_calls(response: &Response) -> Vec<ToolCallContent> {
    response
        .tool_call_contents()
        .into_iter()
        .filter(|c| !c.provider_executed)
        .cloned()
        .collect()
}

fn to_result_part(result: &ToolResultContent) -> ToolResultPart {
    if result.is_error {
        ToolResultPart::error(&result.tool_call_id, &result.tool_name, &result.result)
    } else {
        ToolResultPart::new(&result.tool_call_id, &result.tool_name, &result.result)
    }
}

/// Execute futures with a concurrency limit using a semaphore.
///
/// `join_all` keeps `results[i]` paired with `futures[i]`.
async fn execute_with_semaphore<F, T>(futures: Vec<F>, max_concurrent: usize) -> Vec<T>
where
    F: Future<Output = T>,
{
    let semaphore = Semaphore::new(max_concurrent.max(1));
    let semaphore = &semaphore;

    let wrapped: Vec<_> = futures
        .into_iter()
        .map(|fut| async move {
            // The semaphore is never closed; holding the result holds the permit.
            let _permit = semaphore.acquire().await;
            fut.await
        })
        .collect();

    join_all(wrapped).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use unillm_core::{FinishReason, ModelError, Role, Usage, UsageLimits};
    use unillm_models::{
        stream_from_parts, Call, FunctionModel, LanguageModel, MockModel, StreamPart,
        StreamResponse,
    };
    use unillm_streaming::StreamCallbacks;
    use unillm_tools::{FunctionTool, ObjectJsonSchema, Tool, ToolError, ToolResponse};

    use crate::callbacks::AgentCallbacks;

    fn echo_tool() -> impl Tool {
        FunctionTool::new(
            "echo",
            "Echo the message back",
            ObjectJsonSchema::new().with_property("message", json!({"type": "string"}), true),
            |_ctx, call| async move {
                let args = call.parse_input()?;
                Ok(ToolResponse::text(args["message"].as_str().unwrap_or_default()))
            },
        )
    }

    fn failing_tool() -> impl Tool {
        FunctionTool::new("fail", "Always fails", ObjectJsonSchema::new(), |_ctx, _call| async {
            Err::<ToolResponse, _>(ToolError::execution_failed("disk on fire"))
        })
    }

    fn sleepy_tool(name: &'static str, millis: u64, active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> impl Tool {
        FunctionTool::new(name, "Sleeps", ObjectJsonSchema::new(), move |_ctx, _call| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ToolError>(ToolResponse::text(name))
            }
        })
    }

    fn multi_call(names: &[&str]) -> Response {
        Response::tool_calls(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| ToolCallContent::new(format!("call_{i}"), *name, "{}"))
                .collect(),
        )
        .with_usage(Usage::new(1, 1))
    }

    #[tokio::test]
    async fn test_single_step_text() {
        let model = Arc::new(MockModel::new("m").with_text_response("done"));
        let agent = Agent::builder(model.clone())
            .system_prompt("sys")
            .build()
            .unwrap();

        let result = agent.generate(&CallContext::new(), "hi").await.unwrap();
        assert_eq!(result.text(), "done");
        assert_eq!(result.step_count(), 1);
        assert_eq!(result.finish_reason(), FinishReason::Stop);

        let calls = model.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt[0].role, Role::System);
        assert_eq!(calls[0].prompt[1].text(), "hi");
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let model = Arc::new(
            MockModel::new("m")
                .with_tool_call("c1", "echo", json!({"message": "ping"}))
                .with_text_response("pong"),
        );
        let agent = Agent::builder(model.clone()).tool(echo_tool()).build().unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 2);
        assert_eq!(result.text(), "pong");

        let first = &result.steps[0];
        let results: Vec<_> = first.tool_results().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].result, "ping");
        assert!(!results[0].is_error);
        assert_eq!(first.messages.len(), 2);
        assert_eq!(first.messages[1].role, Role::Tool);

        let second_call = &model.recorded_calls()[1];
        let replayed: Vec<_> = second_call.prompt.iter().flat_map(|m| m.tool_results()).collect();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].tool_call_id, "c1");
        assert_eq!(second_call.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_tool_is_error_result() {
        let model = MockModel::new("m")
            .with_tool_call("c1", "nope", json!({}))
            .with_text_response("sorry");
        let agent = Agent::builder(model).build().unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 2);
        let results: Vec<_> = result.steps[0].tool_results().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_error);
        assert!(results[0].result.contains("nope"));
    }

    #[tokio::test]
    async fn test_tool_error_is_error_result() {
        let model = MockModel::new("m")
            .with_tool_call("c1", "fail", json!({}))
            .with_text_response("recovered");
        let agent = Agent::builder(model).tool(failing_tool()).build().unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        let results: Vec<_> = result.steps[0].tool_results().collect();
        assert!(results[0].is_error);
        assert!(results[0].result.contains("disk on fire"));
        assert_eq!(result.text(), "recovered");
    }

    #[tokio::test]
    async fn test_total_usage_is_sum_of_steps() {
        let model = MockModel::new("m")
            .with_response(multi_call(&["echo"]).with_usage(Usage::new(100, 20)))
            .with_response(multi_call(&["echo"]).with_usage(Usage::new(150, 30)))
            .with_response(Response::text("ok").with_usage(Usage::new(200, 5)));
        let agent = Agent::builder(model).tool(echo_tool()).build().unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 3);
        let summed: u64 = result.steps.iter().map(|s| s.usage.total_tokens).sum();
        assert_eq!(result.total_usage.total_tokens, summed);
        assert_eq!(summed, 505);
    }

    #[tokio::test]
    async fn test_max_steps_is_normal_exit() {
        let agent = Agent::builder(
            MockModel::new("loop")
                .with_tool_call("c1", "echo", json!({"message": "a"}))
                .with_tool_call("c2", "echo", json!({"message": "b"})),
        )
        .tool(echo_tool())
        .max_steps(2)
        .build()
        .unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 2);
        assert_eq!(result.finish_reason(), FinishReason::ToolCalls);
    }

    #[tokio::test]
    async fn test_stream_mode_aggregates_and_reports_tool_results() {
        let model = MockModel::new("m")
            .with_stream(vec![
                StreamPart::tool_input_start("c1", "echo"),
                StreamPart::tool_input_delta("c1", r#"{"message""#),
                StreamPart::tool_input_delta("c1", r#": "test"}"#),
                StreamPart::finish(Usage::new(3, 4), FinishReason::ToolCalls),
            ])
            .with_stream(vec![
                StreamPart::text_start("t"),
                StreamPart::text_delta("t", "Hello, "),
                StreamPart::text_delta("t", "world!"),
                StreamPart::text_end("t"),
                StreamPart::finish(Usage::new(3, 10), FinishReason::Stop),
            ]);

        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let stream = StreamCallbacks::new()
            .on_tool_call(move |c| {
                l1.lock().push(format!("call:{}", c.input));
                Ok(())
            })
            .on_tool_result(move |r| {
                l2.lock().push(format!("result:{}", r.result));
                Ok(())
            })
            .on_text_delta(move |_, d| {
                l3.lock().push(format!("text:{d}"));
                Ok(())
            });

        let agent = Agent::builder(model)
            .tool(echo_tool())
            .stream_callbacks(stream)
            .build()
            .unwrap();

        let result = agent.stream(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.text(), "Hello, world!");
        assert_eq!(result.total_usage.total_tokens, 20);
        assert_eq!(
            *log.lock(),
            vec![
                r#"call:{"message": "test"}"#.to_string(),
                "result:test".to_string(),
                "text:Hello, ".to_string(),
                "text:world!".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_error_fires_on_error_once() {
        let model = MockModel::new("m").with_stream(vec![
            StreamPart::text_start("t"),
            StreamPart::text_delta("t", "partial"),
            StreamPart::error(ModelError::other("connection reset")),
        ]);
        let errors = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (e, f) = (errors.clone(), finished.clone());
        let agent = Agent::builder(model)
            .callbacks(
                AgentCallbacks::new()
                    .on_error(move |_| {
                        e.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_agent_finish(move |_| {
                        f.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .build()
            .unwrap();

        let err = agent.stream(&CallContext::new(), "go").await.unwrap_err();
        assert!(matches!(err, AgentError::Model(_)));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_order() {
        let model = MockModel::new("m")
            .with_tool_call("c1", "echo", json!({"message": "x"}))
            .with_text_response("done");
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let callbacks = {
            let (a, b, c, d, e) = (log.clone(), log.clone(), log.clone(), log.clone(), log.clone());
            AgentCallbacks::new()
                .on_agent_start(move |_| {
                    a.lock().push("agent_start".into());
                    Ok(())
                })
                .on_step_start(move |ctx| {
                    b.lock().push(format!("step_start:{}", ctx.step));
                    Ok(())
                })
                .on_step_finish(move |step| {
                    c.lock().push(format!("step_finish:{}", step.step));
                    Ok(())
                })
                .on_agent_finish(move |_| {
                    d.lock().push("agent_finish".into());
                    Ok(())
                })
                .on_finish(move |response| {
                    e.lock().push(format!("finish:{}", response.text_content()));
                    Ok(())
                })
        };
        let agent = Agent::builder(model)
            .tool(echo_tool())
            .callbacks(callbacks)
            .build()
            .unwrap();

        agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "agent_start",
                "step_start:0",
                "step_finish:0",
                "step_start:1",
                "step_finish:1",
                "agent_finish",
                "finish:done",
            ]
        );
    }

    #[tokio::test]
    async fn test_callback_error_aborts_run() {
        let model = Arc::new(
            MockModel::new("m")
                .with_tool_call("c1", "echo", json!({"message": "x"}))
                .with_text_response("done"),
        );
        let errors = Arc::new(AtomicUsize::new(0));
        let e = errors.clone();
        let agent = Agent::builder(model.clone())
            .tool(echo_tool())
            .callbacks(
                AgentCallbacks::new()
                    .on_step_finish(|_| anyhow::bail!("stop here"))
                    .on_error(move |_| {
                        e.fetch_add(1, Ordering::SeqCst);
                    }),
            )
            .build()
            .unwrap();

        let err = agent.generate(&CallContext::new(), "go").await.unwrap_err();
        assert!(matches!(err, AgentError::Callback { callback: "on_step_finish", .. }));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_usage_limit_exceeded() {
        let model = MockModel::new("m")
            .with_response(multi_call(&["echo"]).with_usage(Usage::new(40, 20)))
            .with_response(Response::text("late").with_usage(Usage::new(40, 20)));
        let agent = Agent::builder(model)
            .tool(echo_tool())
            .usage_limits(UsageLimits::new().max_total_tokens(100))
            .build()
            .unwrap();

        let err = agent.generate(&CallContext::new(), "go").await.unwrap_err();
        match err {
            AgentError::UsageLimitExceeded(e) => {
                assert_eq!(e.current, 120);
                assert_eq!(e.max, 100);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_first_step() {
        let model = Arc::new(MockModel::new("m").with_text_response("never"));
        let agent = Agent::builder(model.clone()).build().unwrap();
        let ctx = CallContext::new();
        ctx.cancel();

        let err = agent.generate(&ctx, "go").await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_between_steps() {
        let ctx = CallContext::new();
        let cancel = ctx.clone();
        let tool = FunctionTool::new("stop", "Cancels the run", ObjectJsonSchema::new(), move |_ctx, _call| {
            let cancel = cancel.clone();
            async move {
                cancel.cancel();
                Ok::<_, ToolError>(ToolResponse::text("cancelled"))
            }
        });
        let model = Arc::new(
            MockModel::new("m")
                .with_tool_call("c1", "stop", json!({}))
                .with_text_response("never"),
        );
        let agent = Agent::builder(model.clone()).tool(tool).build().unwrap();

        let err = agent.generate(&ctx, "go").await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_context_carries_step_and_id() {
        let seen = Arc::new(Mutex::new(Vec::<(usize, String)>::new()));
        let sink = seen.clone();
        let tool = FunctionTool::new("inspect", "Records its context", ObjectJsonSchema::new(), move |ctx, _call| {
            let sink = sink.clone();
            async move {
                sink.lock().push((ctx.step, ctx.tool_call_id.clone()));
                Ok::<_, ToolError>(ToolResponse::text("ok"))
            }
        });
        let model = MockModel::new("m")
            .with_tool_call("first", "inspect", json!({}))
            .with_tool_call("second", "inspect", json!({}))
            .with_text_response("done");
        let agent = Agent::builder(model).tool(tool).build().unwrap();

        agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(
            *seen.lock(),
            vec![(0, "first".to_string()), (1, "second".to_string())]
        );
    }

    #[tokio::test]
    async fn test_concurrent_tools_keep_call_order() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let model = MockModel::new("m")
            .with_response(multi_call(&["slow", "fast", "medium"]))
            .with_text_response("done");
        let agent = Agent::builder(model)
            .tool(sleepy_tool("slow", 60, active.clone(), peak.clone()))
            .tool(sleepy_tool("fast", 5, active.clone(), peak.clone()))
            .tool(sleepy_tool("medium", 30, active.clone(), peak.clone()))
            .concurrent_tools(2)
            .build()
            .unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        let order: Vec<_> = result.steps[0]
            .tool_results()
            .map(|r| (r.tool_call_id.as_str(), r.result.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("call_0", "slow"), ("call_1", "fast"), ("call_2", "medium")]
        );
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sequential_tools_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let model = MockModel::new("m")
            .with_response(multi_call(&["a", "b"]))
            .with_text_response("done");
        let agent = Agent::builder(model)
            .tool(sleepy_tool("a", 10, active.clone(), peak.clone()))
            .tool(sleepy_tool("b", 10, active.clone(), peak.clone()))
            .build()
            .unwrap();

        agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_executed_calls_are_not_run() {
        let mut call = ToolCallContent::new("c1", "web_search", "{}");
        call.provider_executed = true;
        let response = Response::new(vec![
            Content::ToolCall(call),
            Content::ToolResult(ToolResultContent::new("c1", "web_search", "results", false)),
            Content::text("summary"),
        ])
        .with_finish_reason(FinishReason::ToolCalls);
        let model = MockModel::new("m").with_response(response);
        let agent = Agent::builder(model).build().unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 1);
        assert_eq!(result.text(), "summary");
    }

    #[tokio::test]
    async fn test_provider_executed_calls_are_not_run_in_stream_mode() {
        let mut call = ToolCallContent::new("c1", "web_search", r#"{"q": "rust"}"#);
        call.provider_executed = true;
        let response = Response::new(vec![
            Content::ToolCall(call),
            Content::ToolResult(ToolResultContent::new("c1", "web_search", "results", false)),
            Content::text("summary"),
        ])
        .with_finish_reason(FinishReason::ToolCalls);
        let model = MockModel::new("m").with_response(response);
        let agent = Agent::builder(model).build().unwrap();

        let result = agent.stream(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 1);
        assert_eq!(result.text(), "summary");
        let step = &result.steps[0];
        let calls: Vec<_> = step.content.iter().filter_map(Content::as_tool_call).collect();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].provider_executed);
        let results = step.content.iter().filter(|c| matches!(c, Content::ToolResult(_))).count();
        assert_eq!(results, 1);
    }

    #[tokio::test]
    async fn test_function_model_drives_tool_loop() {
        let agent = Agent::builder(FunctionModel::tool_then_text(
            "echo",
            json!({"message": "hi"}),
            "all done",
        ))
        .tool(echo_tool())
        .build()
        .unwrap();

        let result = agent.generate(&CallContext::new(), "go").await.unwrap();
        assert_eq!(result.step_count(), 2);
        assert_eq!(result.text(), "all done");
    }

    mock! {
        Backend {}

        #[async_trait]
        impl LanguageModel for Backend {
            fn model_id(&self) -> &str;
            fn provider_name(&self) -> &str;
            async fn generate(&self, ctx: &CallContext, call: &Call) -> Result<Response, ModelError>;
            async fn stream(&self, ctx: &CallContext, call: &Call) -> Result<StreamResponse, ModelError>;
        }
    }

    #[tokio::test]
    async fn test_failing_backend_surfaces_model_error() {
        let mut backend = MockBackend::new();
        backend.expect_model_id().return_const("broken".to_string());
        backend.expect_provider_name().return_const("mockall".to_string());
        backend
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(ModelError::other("503 from upstream")));

        let errors = Arc::new(AtomicUsize::new(0));
        let e = errors.clone();
        let agent = Agent::builder(backend)
            .callbacks(AgentCallbacks::new().on_error(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        let err = agent.generate(&CallContext::new(), "go").await.unwrap_err();
        assert!(err.model_error().is_some());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_without_finish_is_error() {
        let mut backend = MockBackend::new();
        backend.expect_model_id().return_const("broken".to_string());
        backend.expect_provider_name().return_const("mockall".to_string());
        backend
            .expect_stream()
            .returning(|_, _| Ok(stream_from_parts(vec![StreamPart::text_start("1")])));

        let agent = Agent::builder(backend).build().unwrap();
        let err = agent.stream(&CallContext::new(), "go").await.unwrap_err();
        assert!(err.to_string().contains("finish"));
    }
}
