//! JSON schema construction for tool inputs.
//!
//! Two ways to get a parameter schema: build one by hand with
//! [`SchemaBuilder`], or derive it from a Rust type with [`schema_for_type`].

use indexmap::IndexMap;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value as JsonValue;

use crate::definition::ObjectJsonSchema;

/// Schema builder for manual schema construction.
///
/// # Example
///
/// ```rust
/// use unillm_tools::SchemaBuilder;
///
/// let schema = SchemaBuilder::new()
///     .string("name", "The user's name", true)
///     .integer("age", "The user's age", false)
///     .enum_values("status", "User status", &["active", "inactive"], true)
///     .description("User information")
///     .build();
/// assert_eq!(schema.required, vec!["name".to_string(), "status".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    properties: IndexMap<String, JsonValue>,
    required: Vec<String>,
    description: Option<String>,
}

impl SchemaBuilder {
    /// Create a new empty schema builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn typed(self, name: &str, type_name: &str, desc: &str, required: bool) -> Self {
        self.raw(
            name,
            serde_json::json!({
                "type": type_name,
                "description": desc
            }),
            required,
        )
    }

    /// Add a string property.
    #[must_use]
    pub fn string(self, name: &str, desc: &str, required: bool) -> Self {
        self.typed(name, "string", desc, required)
    }

    /// Add an integer property.
    #[must_use]
    pub fn integer(self, name: &str, desc: &str, required: bool) -> Self {
        self.typed(name, "integer", desc, required)
    }

    /// Add a number (float) property.
    #[must_use]
    pub fn number(self, name: &str, desc: &str, required: bool) -> Self {
        self.typed(name, "number", desc, required)
    }

    /// Add a boolean property.
    #[must_use]
    pub fn boolean(self, name: &str, desc: &str, required: bool) -> Self {
        self.typed(name, "boolean", desc, required)
    }

    /// Add an array property.
    #[must_use]
    pub fn array(self, name: &str, desc: &str, items: JsonValue, required: bool) -> Self {
        self.raw(
            name,
            serde_json::json!({
                "type": "array",
                "description": desc,
                "items": items
            }),
            required,
        )
    }

    /// Add an enum property (string values).
    #[must_use]
    pub fn enum_values(self, name: &str, desc: &str, values: &[&str], required: bool) -> Self {
        self.raw(
            name,
            serde_json::json!({
                "type": "string",
                "description": desc,
                "enum": values
            }),
            required,
        )
    }

    /// Add a raw JSON property.
    #[must_use]
    pub fn raw(mut self, name: &str, schema: JsonValue, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// Set the schema description.
    #[must_use]
    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Build the object schema.
    #[must_use]
    pub fn build(self) -> ObjectJsonSchema {
        ObjectJsonSchema {
            properties: self.properties,
            required: self.required,
            description: self.description,
            ..ObjectJsonSchema::new()
        }
    }
}

/// Generate a JSON schema for a Rust type, with subschemas inlined.
///
/// The `$schema` keyword is dropped; backends reject it in tool schemas.
#[must_use]
pub fn json_schema_for<T: JsonSchema>() -> JsonValue {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Generate a tool parameter schema for a Rust type.
///
/// Fails if `T` does not describe a JSON object.
pub fn schema_for_type<T: JsonSchema>() -> Result<ObjectJsonSchema, serde_json::Error> {
    let value = json_schema_for::<T>();
    if value.get("type").and_then(JsonValue::as_str) != Some("object") {
        return Err(serde::de::Error::custom(format!(
            "schema for {} is not an object",
            T::schema_name()
        )));
    }
    ObjectJsonSchema::try_from(value)
}
