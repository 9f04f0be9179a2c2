//! Structured generation requests.
//!
//! An [`ObjectCall`] is the structured counterpart of a model
//! [`Call`]: a prompt plus the target schema. Each [`ObjectMode`] lowers it
//! to a plain call differently.

use unillm_core::{CallSettings, Message, MessagePart, Prompt, ProviderOptions, Role};
use unillm_models::{Call, ResponseFormat, ToolChoice};

use crate::error::ObjectError;
use crate::mode::ObjectMode;
use crate::repair::RepairHook;
use crate::schema::ObjectSchema;

/// A request for one schema-conforming object.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use unillm_core::Message;
/// use unillm_output::{ObjectCall, ObjectMode, ObjectSchema};
///
/// let schema = ObjectSchema::new(json!({
///     "type": "object",
///     "properties": {"name": {"type": "string"}},
///     "required": ["name"]
/// }))
/// .unwrap()
/// .with_name("recipe");
///
/// let call = ObjectCall::new(vec![Message::user("Suggest a dish")], schema)
///     .with_mode(ObjectMode::Tool)
///     .with_temperature(0.0);
/// assert_eq!(call.mode, ObjectMode::Tool);
/// ```
#[derive(Debug, Clone)]
pub struct ObjectCall {
    /// Conversation so far.
    pub prompt: Prompt,
    /// Target schema.
    pub schema: ObjectSchema,
    /// Generation strategy.
    pub mode: ObjectMode,
    /// Sampling settings.
    pub settings: CallSettings,
    /// Backend-specific options.
    pub provider_options: ProviderOptions,
    /// One-shot repair of unparseable output.
    pub repair: Option<RepairHook>,
}

impl ObjectCall {
    /// Create a request with the automatic mode.
    #[must_use]
    pub fn new(prompt: Prompt, schema: ObjectSchema) -> Self {
        Self {
            prompt,
            schema,
            mode: ObjectMode::Auto,
            settings: CallSettings::default(),
            provider_options: ProviderOptions::new(),
            repair: None,
        }
    }

    /// Set the generation strategy.
    #[must_use]
    pub fn with_mode(mut self, mode: ObjectMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set sampling settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.settings = self.settings.temperature(temperature);
        self
    }

    /// Set backend-specific options.
    #[must_use]
    pub fn with_provider_options(mut self, options: ProviderOptions) -> Self {
        self.provider_options = options;
        self
    }

    /// Set the repair hook.
    #[must_use]
    pub fn with_repair(mut self, hook: RepairHook) -> Self {
        self.repair = Some(hook);
        self
    }

    /// Lower to a model call for a resolved mode.
    pub(crate) fn to_call(&self, mode: ObjectMode) -> Result<Call, ObjectError> {
        let base = |prompt: Prompt| {
            Call::new(prompt)
                .with_settings(self.settings.clone())
                .with_provider_options(self.provider_options.clone())
        };

        let call = match mode {
            ObjectMode::Tool => {
                let tool = self.schema.tool_descriptor()?;
                let name = tool.name.clone();
                base(self.prompt.clone())
                    .with_tool(tool)
                    .with_tool_choice(ToolChoice::tool(name))
            }
            ObjectMode::Native => base(self.prompt.clone()).with_response_format(ResponseFormat::Json {
                schema: Some(self.schema.schema().clone()),
                name: Some(self.schema.name().to_string()),
                description: self.schema.description().map(str::to_string),
            }),
            ObjectMode::Text | ObjectMode::Auto => base(self.prompt_with_instructions()),
        };
        Ok(call)
    }

    /// The prompt with the schema instruction in the system message.
    fn prompt_with_instructions(&self) -> Prompt {
        let instruction = format!(
            "Respond only with a JSON value that conforms to this JSON schema, \
             without any other text:\n{}",
            self.schema.schema()
        );
        let mut prompt = self.prompt.clone();
        match prompt.iter_mut().find(|m| m.role == Role::System) {
            Some(system) => system.parts.push(MessagePart::text(format!("\n\n{instruction}"))),
            None => prompt.insert(0, Message::system(instruction)),
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(prompt: Prompt) -> ObjectCall {
        let schema = ObjectSchema::new(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }))
        .unwrap()
        .with_name("dish")
        .with_description("A dish");
        ObjectCall::new(prompt, schema)
    }

    #[test]
    fn test_tool_mode_forces_the_object_tool() {
        let call = request(vec![Message::user("hi")]).to_call(ObjectMode::Tool).unwrap();
        assert_eq!(call.tools.len(), 1);
        assert_eq!(call.tools[0].name, "dish");
        assert_eq!(call.tool_choice, Some(ToolChoice::tool("dish")));
        assert!(call.validate().is_ok());
    }

    #[test]
    fn test_native_mode_sets_response_format() {
        let call = request(vec![Message::user("hi")])
            .to_call(ObjectMode::Native)
            .unwrap();
        match call.response_format {
            ResponseFormat::Json { schema, name, description } => {
                assert_eq!(schema.unwrap()["required"], json!(["name"]));
                assert_eq!(name.as_deref(), Some("dish"));
                assert_eq!(description.as_deref(), Some("A dish"));
            }
            other => panic!("unexpected format: {other:?}"),
        }
        assert!(call.tools.is_empty());
    }

    #[test]
    fn test_text_mode_inserts_system_message() {
        let call = request(vec![Message::user("hi")]).to_call(ObjectMode::Text).unwrap();
        assert_eq!(call.prompt.len(), 2);
        assert_eq!(call.prompt[0].role, Role::System);
        assert!(call.prompt[0].text().contains("\"required\""));
        assert_eq!(call.prompt[1].text(), "hi");
    }

    #[test]
    fn test_text_mode_extends_existing_system_message() {
        let call = request(vec![Message::system("Be brief."), Message::user("hi")])
            .to_call(ObjectMode::Text)
            .unwrap();
        assert_eq!(call.prompt.len(), 2);
        let system = call.prompt[0].text();
        assert!(system.starts_with("Be brief."));
        assert!(system.contains("JSON schema"));
    }

    #[test]
    fn test_tool_mode_rejects_array_schema() {
        let mut req = request(vec![Message::user("hi")]);
        req.schema = ObjectSchema::new(json!({"type": "array"})).unwrap();
        assert!(matches!(
            req.to_call(ObjectMode::Tool),
            Err(ObjectError::InvalidSchema(_))
        ));
    }
}
