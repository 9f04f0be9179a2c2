//! One-shot structured generation.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use unillm_core::{CallContext, CallWarning, FinishReason, Response, Usage};
use unillm_models::LanguageModel;

use crate::call::ObjectCall;
use crate::error::{NoObjectGeneratedError, ObjectError};
use crate::mode::ObjectMode;
use crate::parser::parse_json_from_text_with;
use crate::repair::RepairHook;
use crate::schema::ObjectSchema;

/// A validated object and the round that produced it.
#[derive(Debug, Clone)]
pub struct ObjectResult<T = JsonValue> {
    /// The object.
    pub object: T,
    /// Text the object was parsed from, after repair if repair ran.
    pub raw_text: String,
    /// Strategy actually used.
    pub mode: ObjectMode,
    /// Token usage.
    pub usage: Usage,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
    /// Non-fatal backend warnings.
    pub warnings: Vec<CallWarning>,
    /// The full model response.
    pub response: Response,
}

impl<T> ObjectResult<T> {
    /// Convert the object, keeping the metadata.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<ObjectResult<U>, E> {
        Ok(ObjectResult {
            object: f(self.object)?,
            raw_text: self.raw_text,
            mode: self.mode,
            usage: self.usage,
            finish_reason: self.finish_reason,
            warnings: self.warnings,
            response: self.response,
        })
    }
}

/// Generate one object conforming to the request's schema.
///
/// The raw payload is the forced tool's input in tool mode and the reply
/// text otherwise. It is parsed and validated; on failure the repair hook,
/// if any, gets one attempt. A payload that still fails yields
/// [`ObjectError::NoObjectGenerated`].
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use unillm_core::{CallContext, Message};
/// use unillm_models::MockModel;
/// use unillm_output::{generate_object, ObjectCall, ObjectSchema};
///
/// # tokio_test::block_on(async {
/// let schema = ObjectSchema::new(json!({
///     "type": "object",
///     "properties": {"city": {"type": "string"}},
///     "required": ["city"]
/// }))
/// .unwrap()
/// .with_name("place");
///
/// let model = MockModel::new("mock").with_tool_call("call_1", "place", json!({"city": "Paris"}));
/// let call = ObjectCall::new(vec![Message::user("Where is the Louvre?")], schema);
///
/// let result = generate_object(&model, &CallContext::new(), &call).await.unwrap();
/// assert_eq!(result.object, json!({"city": "Paris"}));
/// # });
/// ```
pub async fn generate_object<M>(
    model: &M,
    ctx: &CallContext,
    call: &ObjectCall,
) -> Result<ObjectResult, ObjectError>
where
    M: LanguageModel + ?Sized,
{
    let mode = call.mode.resolve(&model.profile(), &call.schema);
    let model_call = call.to_call(mode)?;
    tracing::debug!(
        mode = %mode,
        model = %model.identifier(),
        schema = call.schema.name(),
        "generating object"
    );

    let response = model.generate(ctx, &model_call).await?;

    let (raw, first_attempt) = match raw_output(&response, mode, call.schema.name()) {
        Ok(raw) => {
            let parsed = parse_object(&raw, mode, &call.schema);
            (raw, parsed)
        }
        Err(e) => (response.text_content(), Err(e)),
    };

    let outcome = match first_attempt {
        Ok(object) => Ok((raw.clone(), object)),
        Err(error) => {
            tracing::debug!(error = %error, "object rejected");
            repair_and_parse(call.repair.as_ref(), &raw, error, mode, &call.schema).await
        }
    };

    match outcome {
        Ok((raw_text, object)) => Ok(ObjectResult {
            object,
            raw_text,
            mode,
            usage: response.usage,
            finish_reason: response.finish_reason,
            warnings: response.warnings.clone(),
            response,
        }),
        Err(cause) => {
            tracing::warn!(error = %cause, "no object generated");
            Err(NoObjectGeneratedError::new(raw, cause)
                .with_usage(response.usage)
                .with_finish_reason(response.finish_reason)
                .into())
        }
    }
}

/// Generate one object and deserialize it into `T`.
///
/// Validation runs against the request's schema first, so `T` should match
/// it; [`ObjectSchema::of`] derives one from `T`.
pub async fn generate_object_as<T, M>(
    model: &M,
    ctx: &CallContext,
    call: &ObjectCall,
) -> Result<ObjectResult<T>, ObjectError>
where
    T: DeserializeOwned,
    M: LanguageModel + ?Sized,
{
    generate_object(model, ctx, call)
        .await?
        .try_map(|value| serde_json::from_value(value).map_err(|e| ObjectError::Deserialize(e.to_string())))
}

/// The raw payload of a response for a mode.
fn raw_output(response: &Response, mode: ObjectMode, tool_name: &str) -> Result<String, ObjectError> {
    match mode {
        ObjectMode::Tool => response
            .tool_call_contents()
            .into_iter()
            .find(|call| call.tool_name == tool_name)
            .map(|call| call.input.clone())
            .ok_or_else(|| ObjectError::MissingToolCall(tool_name.to_string())),
        _ => Ok(response.text_content()),
    }
}

/// Parse and validate a payload.
///
/// Tool input is strict JSON, empty meaning `{}`. Text may wrap the JSON in
/// prose or a fence.
pub(crate) fn parse_object(
    raw: &str,
    mode: ObjectMode,
    schema: &ObjectSchema,
) -> Result<JsonValue, ObjectError> {
    let value = match mode {
        ObjectMode::Tool if raw.trim().is_empty() => JsonValue::Object(serde_json::Map::new()),
        ObjectMode::Tool => {
            serde_json::from_str(raw.trim()).map_err(|e| ObjectError::parse(e.to_string()))?
        }
        // Prose may carry bracketed runs ahead of the payload.
        _ => return parse_json_from_text_with(raw, |value| schema.validate(value)),
    };
    schema.validate(&value)?;
    Ok(value)
}

/// Give the hook its one attempt; the original error stands if it declines.
pub(crate) async fn repair_and_parse(
    hook: Option<&RepairHook>,
    raw: &str,
    error: ObjectError,
    mode: ObjectMode,
    schema: &ObjectSchema,
) -> Result<(String, JsonValue), ObjectError> {
    let Some(hook) = hook else {
        return Err(error);
    };
    let Some(fixed) = hook.repair(raw, &error).await else {
        return Err(error);
    };
    let object = parse_object(&fixed, mode, schema)?;
    Ok((fixed, object))
}
