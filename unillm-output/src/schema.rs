//! Target schemas for generated objects.
//!
//! An [`ObjectSchema`] pairs a JSON Schema document with its compiled
//! validator, so repeated validation during streaming does not recompile.

use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use unillm_tools::{ObjectJsonSchema, ToolDescriptor};

use crate::error::ObjectError;

/// Default name of the object, used for the synthesized tool.
pub const DEFAULT_OBJECT_NAME: &str = "json";

/// A JSON schema plus its compiled validator.
#[derive(Clone)]
pub struct ObjectSchema {
    schema: JsonValue,
    name: String,
    description: Option<String>,
    validator: Arc<JSONSchema>,
}

impl ObjectSchema {
    /// Compile a schema document.
    pub fn new(schema: JsonValue) -> Result<Self, ObjectError> {
        let validator = JSONSchema::compile(&schema)
            .map_err(|e| ObjectError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            schema,
            name: DEFAULT_OBJECT_NAME.to_string(),
            description: None,
            validator: Arc::new(validator),
        })
    }

    /// Derive the schema from a Rust type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemars::JsonSchema;
    /// use unillm_output::ObjectSchema;
    ///
    /// #[derive(JsonSchema)]
    /// struct Recipe {
    ///     name: String,
    ///     minutes: u32,
    /// }
    ///
    /// let schema = ObjectSchema::of::<Recipe>().unwrap();
    /// assert_eq!(schema.name(), "Recipe");
    /// assert!(schema.is_valid(&serde_json::json!({"name": "Lasagna", "minutes": 90})));
    /// assert!(!schema.is_valid(&serde_json::json!({"name": "Lasagna"})));
    /// ```
    pub fn of<T: JsonSchema>() -> Result<Self, ObjectError> {
        let root = schemars::schema_for!(T);
        let value =
            serde_json::to_value(root).map_err(|e| ObjectError::InvalidSchema(e.to_string()))?;
        Ok(Self::new(value)?.with_name(T::schema_name()))
    }

    /// Set the object name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the object description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The schema document.
    #[must_use]
    pub fn schema(&self) -> &JsonValue {
        &self.schema
    }

    /// The object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The object description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the schema describes a JSON object at its root.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.schema.get("type").and_then(JsonValue::as_str) == Some("object")
    }

    /// Check a value, collecting every violation.
    pub fn validate(&self, value: &JsonValue) -> Result<(), ObjectError> {
        self.validator.validate(value).map_err(|errors| {
            ObjectError::Validation(errors.map(|e| e.to_string()).collect())
        })
    }

    /// Whether a value satisfies the schema.
    #[must_use]
    pub fn is_valid(&self, value: &JsonValue) -> bool {
        self.validator.is_valid(value)
    }

    /// Descriptor of the tool whose input is this object.
    pub fn tool_descriptor(&self) -> Result<ToolDescriptor, ObjectError> {
        if !self.is_object() {
            return Err(ObjectError::InvalidSchema(
                "tool mode requires a schema with an object root".to_string(),
            ));
        }
        let parameters = ObjectJsonSchema::try_from(self.schema.clone())
            .map_err(|e| ObjectError::InvalidSchema(e.to_string()))?;
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| format!("Respond with the {} object", self.name));
        Ok(ToolDescriptor::new(&self.name, description).with_parameters(parameters))
    }
}

impl fmt::Debug for ObjectSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person() -> ObjectSchema {
        ObjectSchema::new(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0}
            },
            "required": ["name"]
        }))
        .unwrap()
        .with_name("person")
    }

    #[test]
    fn test_validate_collects_errors() {
        let schema = person();
        assert!(schema.validate(&json!({"name": "Ada", "age": 36})).is_ok());
        match schema.validate(&json!({"age": -1})) {
            Err(ObjectError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_schema() {
        let err = ObjectSchema::new(json!({"type": 12})).unwrap_err();
        assert!(matches!(err, ObjectError::InvalidSchema(_)));
    }

    #[test]
    fn test_tool_descriptor() {
        let tool = person().with_description("A person").tool_descriptor().unwrap();
        assert_eq!(tool.name, "person");
        assert_eq!(tool.description, "A person");
        assert_eq!(tool.required(), ["name".to_string()]);
        assert!(tool.parameters.properties.contains_key("age"));
    }

    #[test]
    fn test_tool_descriptor_needs_object_root() {
        let schema = ObjectSchema::new(json!({"type": "array"})).unwrap();
        assert!(schema.tool_descriptor().is_err());
    }
}
