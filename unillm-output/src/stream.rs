//! Streaming structured generation.
//!
//! [`stream_object`] opens a model stream and feeds it to a background
//! driver. The driver accumulates the payload deltas, runs
//! [`parse_partial_json`] after each one and emits every schema-valid
//! candidate that differs from the last emitted one.
//!
//! Dropping the [`ObjectStream`] stops the driver, which drops the model
//! stream and with it the backend transport.

use futures::{Stream, StreamExt};
use serde_json::Value as JsonValue;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use unillm_core::{CallContext, CallWarning, FinishReason, ModelError, Usage};
use unillm_models::{LanguageModel, StreamPart, StreamResponse};
use unillm_streaming::{AggregatorState, StreamAggregator, StreamCallbacks};

use crate::call::ObjectCall;
use crate::error::{NoObjectGeneratedError, ObjectError};
use crate::generate::{parse_object, repair_and_parse};
use crate::mode::ObjectMode;
use crate::parser::json_start;
use crate::partial::{parse_partial_json, PartialParse};
use crate::repair::RepairHook;
use crate::schema::ObjectSchema;

const CHANNEL_CAPACITY: usize = 32;

/// Events of an object stream.
#[derive(Debug, Clone)]
pub enum ObjectStreamPart {
    /// A new schema-valid candidate, deeply different from the previous one.
    Partial(JsonValue),
    /// Raw payload text as it arrived.
    TextDelta(String),
    /// The model finished and an object was produced.
    Finish {
        /// Token usage.
        usage: Usage,
        /// Why the model stopped.
        finish_reason: FinishReason,
        /// Non-fatal backend warnings.
        warnings: Vec<CallWarning>,
    },
    /// The stream failed; nothing follows.
    Error(ObjectError),
}

/// Stream of [`ObjectStreamPart`]s.
///
/// Ends after exactly one `Finish` or `Error`.
#[derive(Debug)]
pub struct ObjectStream {
    rx: mpsc::Receiver<ObjectStreamPart>,
    mode: ObjectMode,
}

impl ObjectStream {
    /// Strategy actually used.
    #[must_use]
    pub fn mode(&self) -> ObjectMode {
        self.mode
    }

    /// Drain the stream and return the last partial object.
    pub async fn final_object(mut self) -> Result<JsonValue, ObjectError> {
        let mut last = None;
        while let Some(part) = self.next().await {
            match part {
                ObjectStreamPart::Partial(value) => last = Some(value),
                ObjectStreamPart::Error(e) => return Err(e),
                ObjectStreamPart::Finish { .. } => break,
                ObjectStreamPart::TextDelta(_) => {}
            }
        }
        last.ok_or_else(|| ModelError::invalid_response("object stream closed early").into())
    }
}

impl Stream for ObjectStream {
    type Item = ObjectStreamPart;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Stream an object conforming to the request's schema.
///
/// Fails up front only when the request cannot be lowered or the model
/// refuses to open a stream; later failures arrive as
/// [`ObjectStreamPart::Error`]. Must be called inside a Tokio runtime.
///
/// # Example
///
/// ```rust
/// use futures::StreamExt;
/// use serde_json::json;
/// use unillm_core::{CallContext, FinishReason, Message, Usage};
/// use unillm_models::{MockModel, StreamPart};
/// use unillm_output::{stream_object, ObjectCall, ObjectMode, ObjectSchema, ObjectStreamPart};
///
/// # tokio_test::block_on(async {
/// let model = MockModel::new("mock").with_stream(vec![
///     StreamPart::text_start("t"),
///     StreamPart::text_delta("t", r#"{"name": "Lasa"#),
///     StreamPart::text_delta("t", r#"gna"}"#),
///     StreamPart::text_end("t"),
///     StreamPart::finish(Usage::new(3, 5), FinishReason::Stop),
/// ]);
/// let schema = ObjectSchema::new(json!({
///     "type": "object",
///     "properties": {"name": {"type": "string"}},
///     "required": ["name"]
/// }))
/// .unwrap();
/// let call = ObjectCall::new(vec![Message::user("A dish?")], schema).with_mode(ObjectMode::Text);
///
/// let mut stream = stream_object(&model, &CallContext::new(), &call).await.unwrap();
/// while let Some(part) = stream.next().await {
///     if let ObjectStreamPart::Partial(object) = part {
///         assert_eq!(object["name"], "Lasagna");
///     }
/// }
/// # });
/// ```
pub async fn stream_object<M>(
    model: &M,
    ctx: &CallContext,
    call: &ObjectCall,
) -> Result<ObjectStream, ObjectError>
where
    M: LanguageModel + ?Sized,
{
    let mode = call.mode.resolve(&model.profile(), &call.schema);
    let model_call = call.to_call(mode)?;
    tracing::debug!(
        mode = %mode,
        model = %model.identifier(),
        schema = call.schema.name(),
        "streaming object"
    );

    let upstream = model.stream(ctx, &model_call).await?;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    let driver = Driver {
        upstream,
        ctx: ctx.clone(),
        tx,
        aggregator: StreamAggregator::new(StreamCallbacks::default()),
        schema: call.schema.clone(),
        mode,
        repair: call.repair.clone(),
        buffer: String::new(),
        tool_block: None,
        last: None,
    };
    tokio::spawn(driver.run());

    Ok(ObjectStream { rx, mode })
}

struct Driver {
    upstream: StreamResponse,
    ctx: CallContext,
    tx: mpsc::Sender<ObjectStreamPart>,
    aggregator: StreamAggregator,
    schema: ObjectSchema,
    mode: ObjectMode,
    repair: Option<RepairHook>,
    /// Accumulated payload text.
    buffer: String,
    /// Block ID of the object tool's input, in tool mode.
    tool_block: Option<String>,
    /// Last emitted candidate.
    last: Option<JsonValue>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let next = tokio::select! {
                biased;
                () = self.ctx.cancelled() => {
                    tracing::debug!("object stream cancelled");
                    self.fail(ModelError::Cancelled.into()).await;
                    return;
                }
                () = self.tx.closed() => {
                    tracing::debug!("object stream dropped by consumer");
                    return;
                }
                next = self.upstream.next() => next,
            };
            let Some(part) = next else {
                let error = ModelError::invalid_response("stream ended without a finish event");
                self.fail(error.into()).await;
                return;
            };

            let delta = self.payload_delta(&part);
            let state = match self.aggregator.process(part) {
                Ok(state) => state,
                Err(e) => {
                    self.fail(e.into()).await;
                    return;
                }
            };
            if let Some(delta) = delta {
                if !self.on_delta(delta).await {
                    return;
                }
            }
            if state == AggregatorState::Finished {
                self.finish().await;
                return;
            }
        }
    }

    /// The slice of payload an event carries, if any.
    fn payload_delta(&mut self, part: &StreamPart) -> Option<String> {
        match (self.mode, part) {
            (ObjectMode::Tool, StreamPart::ToolInputStart { id, tool_name }) => {
                if self.tool_block.is_none() && tool_name == self.schema.name() {
                    self.tool_block = Some(id.clone());
                }
                None
            }
            (ObjectMode::Tool, StreamPart::ToolInputDelta { id, delta }) => {
                // The aggregator ignores input after inferring completion.
                (self.tool_block.as_ref() == Some(id) && !self.aggregator.is_tool_input_complete(id))
                    .then(|| delta.clone())
            }
            // Backends that send the whole call at once.
            (ObjectMode::Tool, StreamPart::ToolCall(call)) => (self.buffer.is_empty()
                && call.tool_name == self.schema.name())
            .then(|| call.input.clone()),
            (ObjectMode::Tool, _) => None,
            (_, StreamPart::TextDelta { delta, .. }) => Some(delta.clone()),
            _ => None,
        }
    }

    /// Returns `false` once the consumer is gone.
    async fn on_delta(&mut self, delta: String) -> bool {
        if delta.is_empty() {
            return true;
        }
        if self.tx.send(ObjectStreamPart::TextDelta(delta.clone())).await.is_err() {
            return false;
        }
        self.buffer.push_str(&delta);

        let candidate = match self.mode {
            ObjectMode::Tool => Some(self.buffer.as_str()),
            _ => json_start(&self.buffer, self.schema.is_object()),
        };
        let Some(candidate) = candidate else {
            return true;
        };

        match parse_partial_json(candidate) {
            PartialParse::Successful(value) | PartialParse::Repaired(value) => self.offer(value).await,
            PartialParse::Failed(message) => {
                let Some(hook) = self.repair.clone() else {
                    return true;
                };
                let fixed = hook.repair(&self.buffer, &ObjectError::parse(message)).await;
                match fixed.and_then(|text| parse_partial_json(&text).into_value()) {
                    Some(value) => self.offer(value).await,
                    None => true,
                }
            }
        }
    }

    /// Emit a candidate if valid and new. Returns `false` once the consumer is gone.
    async fn offer(&mut self, value: JsonValue) -> bool {
        if self.last.as_ref() == Some(&value) || !self.schema.is_valid(&value) {
            return true;
        }
        self.last = Some(value.clone());
        self.tx.send(ObjectStreamPart::Partial(value)).await.is_ok()
    }

    async fn finish(mut self) {
        // The complete payload may be extractable where a prefix was not,
        // e.g. JSON followed by prose.
        let cause = match parse_object(&self.buffer, self.mode, &self.schema) {
            Ok(value) => {
                self.offer(value).await;
                None
            }
            Err(_) if self.last.is_some() => None,
            Err(error) => {
                let repaired = repair_and_parse(
                    self.repair.as_ref(),
                    &self.buffer,
                    error,
                    self.mode,
                    &self.schema,
                )
                .await;
                match repaired {
                    Ok((_, value)) => {
                        self.offer(value).await;
                        None
                    }
                    Err(error) => Some(error),
                }
            }
        };

        let Self {
            aggregator,
            tx,
            buffer,
            last,
            ..
        } = self;
        let response = match aggregator.into_response() {
            Ok(response) => response,
            Err(e) => {
                let _ = tx.send(ObjectStreamPart::Error(e.into())).await;
                return;
            }
        };

        let event = match (last, cause) {
            (Some(_), _) => ObjectStreamPart::Finish {
                usage: response.usage,
                finish_reason: response.finish_reason,
                warnings: response.warnings,
            },
            (None, cause) => {
                let cause = cause.unwrap_or_else(|| ObjectError::parse("no object in output"));
                tracing::warn!(error = %cause, "no object generated");
                ObjectStreamPart::Error(
                    NoObjectGeneratedError::new(buffer, cause)
                        .with_usage(response.usage)
                        .with_finish_reason(response.finish_reason)
                        .into(),
                )
            }
        };
        let _ = tx.send(event).await;
    }

    async fn fail(&mut self, error: ObjectError) {
        tracing::debug!(error = %error, "object stream failed");
        let _ = self.tx.send(ObjectStreamPart::Error(error)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use unillm_core::Message;
    use unillm_models::MockModel;

    fn dish_call(mode: ObjectMode) -> ObjectCall {
        let schema = ObjectSchema::new(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "minutes": {"type": "integer"}
            },
            "required": ["name"]
        }))
        .unwrap()
        .with_name("dish");
        ObjectCall::new(vec![Message::user("Suggest a dish")], schema).with_mode(mode)
    }

    fn text_stream(deltas: &[&str]) -> Vec<StreamPart> {
        let mut parts = vec![StreamPart::text_start("t")];
        parts.extend(deltas.iter().map(|d| StreamPart::text_delta("t", *d)));
        parts.push(StreamPart::text_end("t"));
        parts.push(StreamPart::finish(Usage::new(3, 5), FinishReason::Stop));
        parts
    }

    async fn collect(model: &MockModel, call: &ObjectCall) -> Vec<ObjectStreamPart> {
        stream_object(model, &CallContext::new(), call)
            .await
            .unwrap()
            .collect()
            .await
    }

    fn partials(parts: &[ObjectStreamPart]) -> Vec<JsonValue> {
        parts
            .iter()
            .filter_map(|p| match p {
                ObjectStreamPart::Partial(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_split_string_emits_once() {
        let model = MockModel::new("m").with_stream(text_stream(&[r#"{"name": "Lasa"#, r#"gna"}"#]));
        let parts = collect(&model, &dish_call(ObjectMode::Text)).await;

        assert_eq!(partials(&parts), vec![json!({"name": "Lasagna"})]);
        assert_eq!(parts.len(), 4);
        match parts.last() {
            Some(ObjectStreamPart::Finish { usage, finish_reason, .. }) => {
                assert_eq!(usage.total_tokens, 8);
                assert_eq!(*finish_reason, FinishReason::Stop);
            }
            other => panic!("unexpected last part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_text_deltas_are_forwarded() {
        let model = MockModel::new("m").with_stream(text_stream(&["Sure: ", r#"{"name": "Pho"}"#]));
        let parts = collect(&model, &dish_call(ObjectMode::Text)).await;
        let deltas: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                ObjectStreamPart::TextDelta(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["Sure: ", r#"{"name": "Pho"}"#]);
        assert_eq!(partials(&parts), vec![json!({"name": "Pho"})]);
    }

    #[tokio::test]
    async fn test_tool_mode_follows_tool_input() {
        let model = MockModel::new("m").with_stream(vec![
            StreamPart::tool_input_start("c1", "dish"),
            StreamPart::tool_input_delta("c1", r#"{"name": "#),
            StreamPart::tool_input_delta("c1", r#""Pho", "minutes": 3"#),
            StreamPart::tool_input_delta("c1", "0}"),
            StreamPart::finish(Usage::new(4, 6), FinishReason::ToolCalls),
        ]);
        let parts = collect(&model, &dish_call(ObjectMode::Tool)).await;

        // `3` is held back until the number is terminated.
        assert_eq!(partials(&parts), vec![json!({"name": "Pho", "minutes": 30})]);
        assert!(matches!(parts.last(), Some(ObjectStreamPart::Finish { .. })));
    }

    #[tokio::test]
    async fn test_tool_mode_ignores_input_after_completion() {
        let model = MockModel::new("m").with_stream(vec![
            StreamPart::tool_input_start("c1", "dish"),
            StreamPart::tool_input_delta("c1", r#"{"name": "Pho"}"#),
            StreamPart::tool_input_delta("c1", r#", "minutes": 9}"#),
            StreamPart::finish(Usage::new(4, 6), FinishReason::ToolCalls),
        ]);
        let parts = collect(&model, &dish_call(ObjectMode::Tool)).await;

        let deltas: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                ObjectStreamPart::TextDelta(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec![r#"{"name": "Pho"}"#]);
        assert_eq!(partials(&parts), vec![json!({"name": "Pho"})]);
        assert!(matches!(parts.last(), Some(ObjectStreamPart::Finish { .. })));
    }

    #[tokio::test]
    async fn test_text_mode_skips_bracketed_prose() {
        let model = MockModel::new("m").with_stream(text_stream(&[
            "See [1]: ",
            r#"{"name": "Pho""#,
            r#", "minutes": 5"#,
            "}",
        ]));
        let parts = collect(&model, &dish_call(ObjectMode::Text)).await;

        assert_eq!(
            partials(&parts),
            vec![json!({"name": "Pho"}), json!({"name": "Pho", "minutes": 5})]
        );
        assert!(matches!(parts.last(), Some(ObjectStreamPart::Finish { .. })));
    }

    #[tokio::test]
    async fn test_tool_mode_accepts_whole_tool_call() {
        let model = MockModel::new("m").with_tool_call("c1", "dish", json!({"name": "Curry"}));
        let stream = stream_object(&model, &CallContext::new(), &dish_call(ObjectMode::Tool))
            .await
            .unwrap();
        assert_eq!(stream.mode(), ObjectMode::Tool);
        assert_eq!(stream.final_object().await.unwrap(), json!({"name": "Curry"}));
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let model = MockModel::new("m").with_stream(vec![
            StreamPart::text_start("t"),
            StreamPart::text_delta("t", r#"{"na"#),
            StreamPart::error(ModelError::other("connection reset")),
        ]);
        let parts = collect(&model, &dish_call(ObjectMode::Text)).await;
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[1], ObjectStreamPart::Error(ObjectError::Model(_))));
    }

    #[tokio::test]
    async fn test_stream_without_finish() {
        let model = MockModel::new("m").with_stream(vec![
            StreamPart::text_start("t"),
            StreamPart::text_delta("t", r#"{"name": "Soup"}"#),
        ]);
        let parts = collect(&model, &dish_call(ObjectMode::Text)).await;
        assert!(matches!(parts.last(), Some(ObjectStreamPart::Error(ObjectError::Model(_)))));
    }

    #[tokio::test]
    async fn test_no_object_ends_with_error() {
        let model = MockModel::new("m").with_stream(text_stream(&["I can't help with that."]));
        let parts = collect(&model, &dish_call(ObjectMode::Text)).await;
        assert!(partials(&parts).is_empty());
        match parts.last() {
            Some(ObjectStreamPart::Error(ObjectError::NoObjectGenerated(e))) => {
                assert_eq!(e.raw_text, "I can't help with that.");
                assert_eq!(e.usage.total_tokens, 8);
                assert_eq!(e.finish_reason, Some(FinishReason::Stop));
            }
            other => panic!("unexpected last part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repair_hook_during_stream() {
        let model = MockModel::new("m").with_stream(text_stream(&["{'name': 'Soup'}"]));
        let call = dish_call(ObjectMode::Text)
            .with_repair(RepairHook::new(|raw, _| async move { Some(raw.replace('\'', "\"")) }));
        let parts = collect(&model, &call).await;
        assert_eq!(partials(&parts), vec![json!({"name": "Soup"})]);
        assert!(matches!(parts.last(), Some(ObjectStreamPart::Finish { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_open() {
        let ctx = CallContext::new();
        ctx.cancel();
        let model = MockModel::new("m").with_stream(text_stream(&["{}"]));
        let err = stream_object(&model, &ctx, &dish_call(ObjectMode::Text)).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
