//! Stream aggregation.
//!
//! [`StreamAggregator`] consumes [`StreamPart`]s one at a time, enforces
//! start/delta/end bracket discipline per block ID, fans each event out to
//! [`StreamCallbacks`] and materializes the equivalent non-streaming
//! [`Response`].
//!
//! Some backends never close a tool-input block. A tool-input block is
//! therefore treated as complete the moment its accumulated input parses as
//! JSON: the missing end is synthesized, a tool call is emitted, and later
//! deltas for that ID are ignored. A backend that streams a value which is
//! already valid JSON before it meant to finish (`{}` followed by more
//! input) is cut short by this rule; there is no way to tell the two apart
//! without an explicit end marker.

use futures::StreamExt;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use unillm_core::{
    CallContext, CallWarning, Content, FinishReason, ModelError, ProviderMetadata,
    ReasoningContent, Response, TextContent, ToolCallContent, Usage,
};
use unillm_models::{StreamPart, StreamResponse};

use crate::callbacks::StreamCallbacks;
use crate::error::{StreamError, StreamResult};

/// Whether the aggregator expects more events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Still consuming.
    Streaming,
    /// A finish event was processed.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockKind {
    Text,
    Reasoning,
    ToolInput { tool_name: String },
}

impl BlockKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Reasoning => "reasoning",
            Self::ToolInput { .. } => "tool-input",
        }
    }

    fn same_kind(&self, other: &BlockKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug)]
struct OpenBlock {
    kind: BlockKind,
    buffer: String,
    provider_metadata: ProviderMetadata,
    slot: usize,
}

/// A tool-input block closed explicitly, waiting for its tool call.
#[derive(Debug)]
struct AwaitingCall {
    tool_name: String,
    input: String,
    slot: usize,
}

/// Incremental stream-to-response state machine.
///
/// Content keeps the order in which blocks were opened.
#[derive(Debug)]
pub struct StreamAggregator {
    callbacks: StreamCallbacks,
    open: IndexMap<String, OpenBlock>,
    awaiting_call: IndexMap<String, AwaitingCall>,
    /// Tool inputs completed by inference, with their content slot.
    inferred: HashMap<String, usize>,
    emitted_calls: HashSet<String>,
    slots: Vec<Option<Content>>,
    warnings: Vec<CallWarning>,
    usage: Usage,
    finish_reason: FinishReason,
    provider_metadata: ProviderMetadata,
    state: AggregatorState,
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new(StreamCallbacks::default())
    }
}

impl StreamAggregator {
    /// Create an aggregator that reports to `callbacks`.
    #[must_use]
    pub fn new(callbacks: StreamCallbacks) -> Self {
        Self {
            callbacks,
            open: IndexMap::new(),
            awaiting_call: IndexMap::new(),
            inferred: HashMap::new(),
            emitted_calls: HashSet::new(),
            slots: Vec::new(),
            warnings: Vec::new(),
            usage: Usage::default(),
            finish_reason: FinishReason::Unknown,
            provider_metadata: ProviderMetadata::new(),
            state: AggregatorState::Streaming,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Whether a finish event was processed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == AggregatorState::Finished
    }

    /// Whether the tool input for `id` is complete, by end event, inference
    /// or tool call.
    #[must_use]
    pub fn is_tool_input_complete(&self, id: &str) -> bool {
        self.inferred.contains_key(id) || self.awaiting_call.contains_key(id) || self.emitted_calls.contains(id)
    }

    /// Content materialized so far.
    pub fn content(&self) -> impl Iterator<Item = &Content> {
        self.slots.iter().flatten()
    }

    /// Process one event.
    ///
    /// An error event, a protocol violation or a failing callback returns
    /// `Err`; the caller must stop consuming.
    pub fn process(&mut self, part: StreamPart) -> StreamResult<AggregatorState> {
        if self.is_finished() {
            tracing::warn!(event = %part.kind(), "event after finish ignored");
            return Ok(self.state);
        }

        match &part {
            StreamPart::Warnings { warnings } => {
                self.callbacks.emit_warnings(warnings)?;
                self.warnings.extend(warnings.iter().cloned());
            }
            StreamPart::TextStart { id, provider_metadata } => {
                self.open_block(id, BlockKind::Text, provider_metadata.clone(), &part)?;
                self.callbacks.emit_text_start(id)?;
            }
            StreamPart::TextDelta { id, delta } => {
                self.append(id, &BlockKind::Text, delta, &part)?;
                self.callbacks.emit_text_delta(id, delta)?;
            }
            StreamPart::TextEnd { id } => {
                let block = self.take_block(id, &BlockKind::Text, &part)?;
                self.close_block(id, block)?;
            }
            StreamPart::ReasoningStart { id, provider_metadata } => {
                self.open_block(id, BlockKind::Reasoning, provider_metadata.clone(), &part)?;
                self.callbacks.emit_reasoning_start(id)?;
            }
            StreamPart::ReasoningDelta { id, delta } => {
                self.append(id, &BlockKind::Reasoning, delta, &part)?;
                self.callbacks.emit_reasoning_delta(id, delta)?;
            }
            StreamPart::ReasoningEnd { id } => {
                let block = self.take_block(id, &BlockKind::Reasoning, &part)?;
                self.close_block(id, block)?;
            }
            StreamPart::ToolInputStart { id, tool_name } => {
                if self.inferred.contains_key(id) || self.emitted_calls.contains(id) {
                    return Err(StreamError::invalid_response(
                        format!("tool call '{id}' was already completed"),
                        format!("{part:?}"),
                    ));
                }
                let kind = BlockKind::ToolInput {
                    tool_name: tool_name.clone(),
                };
                self.open_block(id, kind, ProviderMetadata::new(), &part)?;
                self.callbacks.emit_tool_input_start(id, tool_name)?;
            }
            StreamPart::ToolInputDelta { id, delta } => {
                if self.inferred.contains_key(id) {
                    tracing::debug!(id = %id, "delta for completed tool input ignored");
                    return Ok(self.state);
                }
                let tool_input = BlockKind::ToolInput {
                    tool_name: String::new(),
                };
                self.append(id, &tool_input, delta, &part)?;
                self.callbacks.emit_tool_input_delta(id, delta)?;
                self.infer_tool_input_end(id)?;
            }
            StreamPart::ToolInputEnd { id } => {
                if self.inferred.contains_key(id) {
                    tracing::debug!(id = %id, "end for completed tool input ignored");
                    return Ok(self.state);
                }
                let tool_input = BlockKind::ToolInput {
                    tool_name: String::new(),
                };
                let block = self.take_block(id, &tool_input, &part)?;
                self.close_block(id, block)?;
            }
            StreamPart::ToolCall(call) => self.backend_tool_call(call.clone())?,
            StreamPart::ToolResult(result) => {
                self.callbacks.emit_tool_result(result)?;
                self.slots.push(Some(Content::ToolResult(result.clone())));
            }
            StreamPart::Source(source) => {
                self.callbacks.emit_source(source)?;
                self.slots.push(Some(Content::Source(source.clone())));
            }
            StreamPart::Finish {
                usage,
                finish_reason,
                provider_metadata,
            } => {
                self.close_all()?;
                self.usage = *usage;
                self.finish_reason = *finish_reason;
                self.provider_metadata = provider_metadata.clone();
                self.callbacks.emit_stream_finish(usage, *finish_reason)?;
                self.state = AggregatorState::Finished;
            }
            StreamPart::Error { error } => {
                tracing::debug!(open_blocks = self.open.len(), "stream error, discarding open blocks");
                return Err(StreamError::Model(error.clone()));
            }
        }
        Ok(self.state)
    }

    /// Build the response.
    ///
    /// Fails if no finish event was seen.
    pub fn into_response(self) -> StreamResult<Response> {
        if !self.is_finished() {
            return Err(ModelError::invalid_response("stream ended without a finish event").into());
        }
        let content = self.slots.into_iter().flatten().collect();
        let mut response = Response::new(content)
            .with_finish_reason(self.finish_reason)
            .with_usage(self.usage)
            .with_provider_metadata(self.provider_metadata);
        response.warnings = self.warnings;
        Ok(response)
    }

    fn open_block(
        &mut self,
        id: &str,
        kind: BlockKind,
        provider_metadata: ProviderMetadata,
        part: &StreamPart,
    ) -> StreamResult<()> {
        if self.open.contains_key(id) {
            return Err(StreamError::invalid_response(
                format!("block '{id}' is already open"),
                format!("{part:?}"),
            ));
        }
        tracing::debug!(id = %id, kind = kind.as_str(), "block opened");
        let slot = self.slots.len();
        self.slots.push(None);
        self.open.insert(
            id.to_string(),
            OpenBlock {
                kind,
                buffer: String::new(),
                provider_metadata,
                slot,
            },
        );
        Ok(())
    }

    fn block_mut(&mut self, id: &str, kind: &BlockKind, part: &StreamPart) -> StreamResult<&mut OpenBlock> {
        match self.open.get_mut(id) {
            Some(block) if block.kind.same_kind(kind) => Ok(block),
            Some(block) => Err(StreamError::invalid_response(
                format!("block '{id}' is a {} block", block.kind.as_str()),
                format!("{part:?}"),
            )),
            None => Err(StreamError::invalid_response(
                format!("no open {} block '{id}'", kind.as_str()),
                format!("{part:?}"),
            )),
        }
    }

    fn append(&mut self, id: &str, kind: &BlockKind, delta: &str, part: &StreamPart) -> StreamResult<()> {
        self.block_mut(id, kind, part)?.buffer.push_str(delta);
        Ok(())
    }

    fn take_block(&mut self, id: &str, kind: &BlockKind, part: &StreamPart) -> StreamResult<OpenBlock> {
        self.block_mut(id, kind, part)?;
        self.open
            .shift_remove(id)
            .ok_or_else(|| StreamError::invalid_response(format!("no open block '{id}'"), format!("{part:?}")))
    }

    /// Close a block and materialize its content.
    fn close_block(&mut self, id: &str, block: OpenBlock) -> StreamResult<()> {
        tracing::debug!(id = %id, kind = block.kind.as_str(), "block closed");
        match block.kind {
            BlockKind::Text => {
                self.callbacks.emit_text_end(id)?;
                if !block.buffer.is_empty() {
                    self.slots[block.slot] = Some(Content::Text(TextContent {
                        text: block.buffer,
                        provider_metadata: block.provider_metadata,
                    }));
                }
            }
            BlockKind::Reasoning => {
                self.callbacks.emit_reasoning_end(id)?;
                if !block.buffer.is_empty() {
                    self.slots[block.slot] = Some(Content::Reasoning(ReasoningContent {
                        text: block.buffer,
                        provider_metadata: block.provider_metadata,
                    }));
                }
            }
            BlockKind::ToolInput { tool_name } => {
                self.callbacks.emit_tool_input_end(id)?;
                self.awaiting_call.insert(
                    id.to_string(),
                    AwaitingCall {
                        tool_name,
                        input: block.buffer,
                        slot: block.slot,
                    },
                );
            }
        }
        Ok(())
    }

    fn infer_tool_input_end(&mut self, id: &str) -> StreamResult<()> {
        let complete = self
            .open
            .get(id)
            .is_some_and(|b| serde_json::from_str::<serde_json::Value>(&b.buffer).is_ok());
        if !complete {
            return Ok(());
        }
        let Some(block) = self.open.shift_remove(id) else {
            return Ok(());
        };
        let BlockKind::ToolInput { tool_name } = block.kind else {
            return Ok(());
        };
        tracing::warn!(id = %id, tool = %tool_name, "tool input completed by inference");

        self.inferred.insert(id.to_string(), block.slot);
        self.callbacks.emit_tool_input_end(id)?;
        let call = ToolCallContent::new(id, tool_name, block.buffer);
        self.materialize_call(block.slot, call)
    }

    fn backend_tool_call(&mut self, call: ToolCallContent) -> StreamResult<()> {
        let id = call.tool_call_id.clone();
        if let Some(&slot) = self.inferred.get(&id) {
            // The backend's call supersedes the inferred one but was already announced.
            tracing::debug!(id = %id, "inferred tool call replaced by backend call");
            self.slots[slot] = Some(Content::ToolCall(call));
            return Ok(());
        }
        if self.emitted_calls.contains(&id) {
            tracing::debug!(id = %id, "duplicate tool call ignored");
            return Ok(());
        }
        if let Some(awaiting) = self.awaiting_call.shift_remove(&id) {
            return self.materialize_call(awaiting.slot, call);
        }
        if let Some(block) = self.open.shift_remove(&id) {
            // A tool call without a preceding end closes its input block.
            self.callbacks.emit_tool_input_end(&id)?;
            return self.materialize_call(block.slot, call);
        }
        let slot = self.slots.len();
        self.slots.push(None);
        self.materialize_call(slot, call)
    }

    fn materialize_call(&mut self, slot: usize, call: ToolCallContent) -> StreamResult<()> {
        self.emitted_calls.insert(call.tool_call_id.clone());
        self.callbacks.emit_tool_call(&call)?;
        self.slots[slot] = Some(Content::ToolCall(call));
        Ok(())
    }

    /// Treat every open block as implicitly ended.
    fn close_all(&mut self) -> StreamResult<()> {
        let open: Vec<(String, OpenBlock)> = self.open.drain(..).collect();
        for (id, block) in open {
            self.close_block(&id, block)?;
        }
        let awaiting: Vec<(String, AwaitingCall)> = self.awaiting_call.drain(..).collect();
        for (id, pending) in awaiting {
            let call = ToolCallContent::new(id, pending.tool_name, pending.input);
            self.materialize_call(pending.slot, call)?;
        }
        Ok(())
    }
}

/// Drive a stream to completion.
///
/// Consumption stops at the finish event, at the first error, or when `ctx`
/// is cancelled; the stream is dropped in every case, releasing the
/// producer.
pub async fn aggregate(
    mut stream: StreamResponse,
    ctx: &CallContext,
    callbacks: StreamCallbacks,
) -> StreamResult<Response> {
    let mut aggregator = StreamAggregator::new(callbacks);
    loop {
        let next = tokio::select! {
            biased;
            () = ctx.cancelled() => {
                tracing::debug!("stream cancelled");
                return Err(ModelError::Cancelled.into());
            }
            next = stream.next() => next,
        };
        let Some(part) = next else {
            break;
        };
        if aggregator.process(part)? == AggregatorState::Finished {
            break;
        }
    }
    drop(stream);
    aggregator.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use unillm_core::{ContentSliceExt, SourceContent};
    use unillm_models::stream_from_parts;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording() -> (StreamCallbacks, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let callbacks = StreamCallbacks::new()
            .on_warnings({
                let log = log.clone();
                move |w| {
                    log.lock().push(format!("warnings:{}", w.len()));
                    Ok(())
                }
            })
            .on_text_start({
                let log = log.clone();
                move |id| {
                    log.lock().push(format!("text-start:{id}"));
                    Ok(())
                }
            })
            .on_text_delta({
                let log = log.clone();
                move |id, d| {
                    log.lock().push(format!("text-delta:{id}:{d}"));
                    Ok(())
                }
            })
            .on_text_end({
                let log = log.clone();
                move |id| {
                    log.lock().push(format!("text-end:{id}"));
                    Ok(())
                }
            })
            .on_tool_input_start({
                let log = log.clone();
                move |id, name| {
                    log.lock().push(format!("tool-input-start:{id}:{name}"));
                    Ok(())
                }
            })
            .on_tool_input_delta({
                let log = log.clone();
                move |id, d| {
                    log.lock().push(format!("tool-input-delta:{id}:{d}"));
                    Ok(())
                }
            })
            .on_tool_input_end({
                let log = log.clone();
                move |id| {
                    log.lock().push(format!("tool-input-end:{id}"));
                    Ok(())
                }
            })
            .on_tool_call({
                let log = log.clone();
                move |c| {
                    log.lock().push(format!("tool-call:{}:{}", c.tool_call_id, c.input));
                    Ok(())
                }
            })
            .on_source({
                let log = log.clone();
                move |s| {
                    log.lock().push(format!("source:{}", s.id));
                    Ok(())
                }
            })
            .on_stream_finish({
                let log = log.clone();
                move |u, r| {
                    log.lock().push(format!("finish:{}:{r}", u.total_tokens));
                    Ok(())
                }
            });
        (callbacks, log)
    }

    fn finish(input: u64, output: u64) -> StreamPart {
        StreamPart::finish(Usage::new(input, output), FinishReason::Stop)
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// The parts, then a stream that never ends; flags when dropped.
    fn endless(parts: Vec<StreamPart>, dropped: Arc<AtomicBool>) -> StreamResponse {
        let guard = DropFlag(dropped);
        Box::pin(
            stream::iter(parts)
                .chain(stream::pending::<StreamPart>())
                .map(move |p| {
                    let _keep = &guard;
                    p
                }),
        )
    }

    #[tokio::test]
    async fn test_hello_world() {
        let (callbacks, log) = recording();
        let parts = vec![
            StreamPart::text_start("1"),
            StreamPart::text_delta("1", "Hello"),
            StreamPart::text_delta("1", ", world!"),
            StreamPart::text_end("1"),
            finish(3, 10),
        ];
        let response = aggregate(stream_from_parts(parts), &CallContext::new(), callbacks)
            .await
            .unwrap();

        assert_eq!(response.content.text(), "Hello, world!");
        assert_eq!(response.usage.total_tokens, 13);
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(
            *log.lock(),
            vec![
                "text-start:1",
                "text-delta:1:Hello",
                "text-delta:1:, world!",
                "text-end:1",
                "finish:13:stop",
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_input_completion_is_inferred() {
        let (callbacks, log) = recording();
        let parts = vec![
            StreamPart::tool_input_start("call_1", "echo"),
            StreamPart::tool_input_delta("call_1", r#"{"message""#),
            StreamPart::tool_input_delta("call_1", r#": "test"}"#),
            StreamPart::tool_input_delta("call_1", "   "),
            StreamPart::tool_input_end("call_1"),
            StreamPart::tool_call("call_1", "echo", r#"{"message": "test"}"#),
            StreamPart::finish(Usage::new(1, 1), FinishReason::ToolCalls),
        ];
        let response = aggregate(stream_from_parts(parts), &CallContext::new(), callbacks)
            .await
            .unwrap();

        let calls = response.content.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, r#"{"message": "test"}"#);
        assert_eq!(calls[0].tool_name, "echo");

        let log = log.lock();
        let ends = log.iter().filter(|e| e.starts_with("tool-input-end")).count();
        let tool_calls = log.iter().filter(|e| e.starts_with("tool-call")).count();
        assert_eq!(ends, 1);
        assert_eq!(tool_calls, 1);
        let end_pos = log.iter().position(|e| e == "tool-input-end:call_1").unwrap();
        assert_eq!(log[end_pos + 1], r#"tool-call:call_1:{"message": "test"}"#);
        // The whitespace delta arrived after inference and was dropped.
        assert!(!log.iter().any(|e| e == "tool-input-delta:call_1:   "));
    }

    #[test]
    fn test_explicit_end_waits_for_backend_call() {
        let (callbacks, log) = recording();
        let mut aggregator = StreamAggregator::new(callbacks);
        aggregator.process(StreamPart::tool_input_start("c1", "ping")).unwrap();
        aggregator.process(StreamPart::tool_input_end("c1")).unwrap();
        assert_eq!(aggregator.content().count(), 0);

        let mut call = ToolCallContent::new("c1", "ping", "{}");
        call.provider_executed = true;
        aggregator.process(StreamPart::ToolCall(call)).unwrap();
        aggregator.process(StreamPart::tool_call("c1", "ping", "{}")).unwrap();
        aggregator.process(finish(1, 1)).unwrap();

        let response = aggregator.into_response().unwrap();
        let calls = response.content.tool_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].provider_executed);
        assert_eq!(log.lock().iter().filter(|e| e.starts_with("tool-call")).count(), 1);
    }

    #[test]
    fn test_backend_call_replaces_inferred_call() {
        let (callbacks, log) = recording();
        let mut aggregator = StreamAggregator::new(callbacks);
        aggregator.process(StreamPart::tool_input_start("ws", "web_search")).unwrap();
        aggregator.process(StreamPart::tool_input_delta("ws", r#"{"q": "rust"}"#)).unwrap();

        let mut call = ToolCallContent::new("ws", "web_search", r#"{"q": "rust"}"#);
        call.provider_executed = true;
        aggregator.process(StreamPart::ToolCall(call)).unwrap();
        aggregator.process(StreamPart::tool_input_delta("ws", " ")).unwrap();
        aggregator.process(finish(1, 1)).unwrap();

        let response = aggregator.into_response().unwrap();
        let calls = response.content.tool_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].provider_executed);
        assert_eq!(calls[0].input, r#"{"q": "rust"}"#);
        assert_eq!(log.lock().iter().filter(|e| e.starts_with("tool-call")).count(), 1);
    }

    #[test]
    fn test_finish_closes_open_blocks() {
        let (callbacks, log) = recording();
        let mut aggregator = StreamAggregator::new(callbacks);
        for part in [
            StreamPart::text_start("t"),
            StreamPart::text_delta("t", "partial"),
            StreamPart::tool_input_start("c", "search"),
            StreamPart::tool_input_delta("c", r#"{"q": "ru"#),
        ] {
            aggregator.process(part).unwrap();
        }
        assert_eq!(aggregator.process(finish(2, 2)).unwrap(), AggregatorState::Finished);

        let response = aggregator.into_response().unwrap();
        assert_eq!(response.text_content(), "partial");
        assert_eq!(response.content.tool_calls()[0].input, r#"{"q": "ru"#);
        let log = log.lock();
        assert!(log.contains(&"text-end:t".to_string()));
        assert!(log.contains(&"tool-input-end:c".to_string()));
    }

    #[tokio::test]
    async fn test_error_event_propagates() {
        let parts = vec![
            StreamPart::text_start("1"),
            StreamPart::text_delta("1", "Hel"),
            StreamPart::error(ModelError::other("overloaded")),
            finish(1, 1),
        ];
        let err = aggregate(stream_from_parts(parts), &CallContext::new(), StreamCallbacks::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Model(ModelError::Other(ref m)) if m == "overloaded"));
    }

    #[tokio::test]
    async fn test_missing_finish_is_invalid_response() {
        let parts = vec![StreamPart::text_start("1"), StreamPart::text_end("1")];
        let err = aggregate(stream_from_parts(parts), &CallContext::new(), StreamCallbacks::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Model(ModelError::InvalidResponseData(_))));
    }

    #[test]
    fn test_delta_for_unknown_block() {
        let mut aggregator = StreamAggregator::default();
        let err = aggregator.process(StreamPart::text_delta("9", "x")).unwrap_err();
        match err {
            StreamError::Model(ModelError::InvalidResponseData(e)) => {
                assert!(e.raw.unwrap().contains("TextDelta"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_kind_mismatch() {
        let mut aggregator = StreamAggregator::default();
        aggregator.process(StreamPart::reasoning_start("r")).unwrap();
        assert!(aggregator.process(StreamPart::text_delta("r", "x")).is_err());
    }

    #[tokio::test]
    async fn test_callback_error_aborts() {
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let callbacks = StreamCallbacks::new().on_text_delta(move |_, _| {
            let mut n = counter.lock();
            *n += 1;
            if *n == 2 {
                anyhow::bail!("sink closed");
            }
            Ok(())
        });
        let parts = vec![
            StreamPart::text_start("1"),
            StreamPart::text_delta("1", "a"),
            StreamPart::text_delta("1", "b"),
            StreamPart::text_delta("1", "c"),
            finish(1, 1),
        ];
        let err = aggregate(stream_from_parts(parts), &CallContext::new(), callbacks)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Callback { callback: "on_text_delta", .. }));
        assert_eq!(*seen.lock(), 2);
    }

    #[tokio::test]
    async fn test_finish_stops_consumption_and_drops_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let parts = vec![StreamPart::text_start("1"), StreamPart::text_delta("1", "ok"), finish(1, 1)];
        let response = aggregate(endless(parts, dropped.clone()), &CallContext::new(), StreamCallbacks::new())
            .await
            .unwrap();
        assert_eq!(response.text_content(), "ok");
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancellation_releases_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let parts = vec![StreamPart::text_start("1"), StreamPart::text_delta("1", "never finishes")];
        let err = aggregate(endless(parts, dropped.clone()), &ctx, StreamCallbacks::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_sources_warnings_and_reasoning() {
        let (callbacks, log) = recording();
        let mut aggregator = StreamAggregator::new(callbacks);
        for part in [
            StreamPart::Warnings {
                warnings: vec![CallWarning::unsupported_setting("top_k", None)],
            },
            StreamPart::reasoning_start("r"),
            StreamPart::reasoning_delta("r", "think"),
            StreamPart::reasoning_end("r"),
            StreamPart::Source(SourceContent::url("s1", "https://example.com")),
            finish(1, 2),
        ] {
            aggregator.process(part).unwrap();
        }
        let response = aggregator.into_response().unwrap();
        assert_eq!(response.warnings.len(), 1);
        assert_eq!(response.reasoning_text(), "think");
        assert_eq!(response.content.sources().len(), 1);
        assert_eq!(log.lock()[0], "warnings:1");
    }

    #[test]
    fn test_content_keeps_open_order() {
        let mut aggregator = StreamAggregator::default();
        for part in [
            StreamPart::text_start("a"),
            StreamPart::text_start("b"),
            StreamPart::text_delta("b", "second"),
            StreamPart::text_delta("a", "first"),
            StreamPart::text_end("b"),
            StreamPart::text_end("a"),
            finish(1, 1),
        ] {
            aggregator.process(part).unwrap();
        }
        let texts: Vec<_> = aggregator.content().filter_map(Content::as_text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
