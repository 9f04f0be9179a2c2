//! Object generation strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unillm_models::ModelProfile;

use crate::schema::ObjectSchema;

/// How the model is asked to produce the object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectMode {
    /// Native when the model supports it, otherwise tool, otherwise text.
    #[default]
    Auto,
    /// Force a call to a synthesized tool whose input schema is the target.
    Tool,
    /// Ask the backend for schema-constrained output.
    Native,
    /// Put the schema in the system prompt and parse the reply text.
    Text,
}

impl ObjectMode {
    /// The concrete strategy for a model and schema.
    ///
    /// `Auto` only picks `Tool` for object-rooted schemas, since tool inputs
    /// are always objects.
    #[must_use]
    pub fn resolve(self, profile: &ModelProfile, schema: &ObjectSchema) -> ObjectMode {
        match self {
            ObjectMode::Auto if profile.supports_native_structured_output => ObjectMode::Native,
            ObjectMode::Auto if profile.supports_tools && schema.is_object() => ObjectMode::Tool,
            ObjectMode::Auto => ObjectMode::Text,
            other => other,
        }
    }

    /// The kebab-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectMode::Auto => "auto",
            ObjectMode::Tool => "tool",
            ObjectMode::Native => "native",
            ObjectMode::Text => "text",
        }
    }
}

impl fmt::Display for ObjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ObjectMode::Auto),
            "tool" => Ok(ObjectMode::Tool),
            "native" => Ok(ObjectMode::Native),
            "text" => Ok(ObjectMode::Text),
            other => Err(format!("unknown object mode '{other}'")),
        }
    }
}
