//! Tool descriptors sent to models.
//!
//! A [`ToolDescriptor`] carries everything a backend needs to expose a tool:
//! its name, a description and a JSON Schema object describing the input.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// JSON Schema for an object type (tool parameters).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectJsonSchema {
    /// The schema type (always "object" for tool parameters).
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,

    /// Property definitions.
    #[serde(default)]
    pub properties: IndexMap<String, JsonValue>,

    /// List of required property names.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,

    /// Description of the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether additional properties are allowed.
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,

    /// Extra schema keywords (`definitions`, `$schema`, ...).
    #[serde(flatten)]
    pub extra: HashMap<String, JsonValue>,
}

fn object_type() -> String {
    "object".to_string()
}

impl ObjectJsonSchema {
    /// Create a new empty object schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_type: object_type(),
            properties: IndexMap::new(),
            required: Vec::new(),
            description: None,
            additional_properties: None,
            extra: HashMap::new(),
        }
    }

    /// Add a property to the schema.
    #[must_use]
    pub fn with_property(mut self, name: &str, schema: JsonValue, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required && !self.is_required(name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Set whether additional properties are allowed.
    #[must_use]
    pub fn with_additional_properties(mut self, allowed: bool) -> Self {
        self.additional_properties = Some(allowed);
        self
    }

    /// Check if a property is required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Get a property schema.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Default for ObjectJsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<JsonValue> for ObjectJsonSchema {
    type Error = serde_json::Error;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

/// Complete tool description sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name (must be a valid identifier).
    pub name: String,

    /// Human-readable description of what the tool does.
    pub description: String,

    /// JSON Schema for the tool's input.
    pub parameters: ObjectJsonSchema,
}

impl ToolDescriptor {
    /// Create a descriptor with an empty parameter object.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ObjectJsonSchema::new(),
        }
    }

    /// Set the parameters schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: ObjectJsonSchema) -> Self {
        self.parameters = schema;
        self
    }

    /// Required fields of the input.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.parameters.required
    }

    /// The parameters as a JSON value.
    #[must_use]
    pub fn parameters_json(&self) -> JsonValue {
        self.parameters.to_json().unwrap_or(JsonValue::Null)
    }

    /// Validate an input value against the parameter schema.
    #[cfg(feature = "schema-validation")]
    pub fn validate_input(&self, input: &JsonValue) -> Result<(), crate::ToolError> {
        let schema = self.parameters_json();
        let compiled = jsonschema::JSONSchema::compile(&schema)
            .map_err(|e| crate::ToolError::invalid_args(format!("invalid tool schema: {e}")))?;
        let result = compiled.validate(input);
        if let Err(errors) = result {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(crate::ToolError::invalid_args(messages.join("; ")));
        }
        Ok(())
    }
}
