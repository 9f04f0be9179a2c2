//! Backend-specific options and metadata.
//!
//! Every backend can attach its own payloads to calls, message parts and
//! responses without the core knowing their shape. A payload type implements
//! [`ProviderDataType`] with a globally unique type id (conventionally
//! `"<backend>.<kind>"`) and registers itself once with
//! [`register_provider_data`]. On the wire each entry of a [`ProviderMap`]
//! becomes an envelope:
//!
//! ```json
//! { "acme": { "type": "acme.options", "data": { "reasoning_effort": "high" } } }
//! ```
//!
//! Decoding looks the `type` up in the process-wide registry and defers to
//! the payload's own `Deserialize` impl.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use unillm_core::provider::{register_provider_data, ProviderDataType, ProviderOptions};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct AcmeOptions {
//!     reasoning_effort: String,
//! }
//!
//! impl ProviderDataType for AcmeOptions {
//!     const TYPE_ID: &'static str = "acme.options";
//! }
//!
//! register_provider_data::<AcmeOptions>();
//!
//! let mut options = ProviderOptions::new();
//! options.insert("acme", AcmeOptions { reasoning_effort: "high".into() });
//!
//! let wire = serde_json::to_value(&options).unwrap();
//! let decoded: ProviderOptions = serde_json::from_value(wire).unwrap();
//! assert_eq!(decoded, options);
//! ```

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::errors::{InvalidArgumentError, ModelError, UnknownProviderDataTypeError};

/// A concrete, registrable payload type.
pub trait ProviderDataType:
    Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
    /// Globally unique type id, e.g. `"acme.options"`.
    const TYPE_ID: &'static str;
}

/// Type-erased view of a payload.
pub trait ProviderData: Any + fmt::Debug + Send + Sync {
    /// The registered type id.
    fn data_type(&self) -> &'static str;

    /// Serialize the payload body.
    fn to_json(&self) -> Result<JsonValue, serde_json::Error>;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

impl<T: ProviderDataType> ProviderData for T {
    fn data_type(&self) -> &'static str {
        T::TYPE_ID
    }

    fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type DecodeFn = fn(JsonValue) -> Result<Arc<dyn ProviderData>, serde_json::Error>;

fn decode_as<T: ProviderDataType>(data: JsonValue) -> Result<Arc<dyn ProviderData>, serde_json::Error> {
    let value: T = serde_json::from_value(data)?;
    Ok(Arc::new(value))
}

/// Table of payload decoders keyed by type id.
#[derive(Default)]
pub struct ProviderDataRegistry {
    decoders: RwLock<HashMap<String, DecodeFn>>,
}

impl ProviderDataRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payload type. Registering the same type twice is a no-op.
    pub fn register<T: ProviderDataType>(&self) {
        let mut decoders = self.decoders.write();
        if decoders.contains_key(T::TYPE_ID) {
            return;
        }
        decoders.insert(T::TYPE_ID.to_string(), decode_as::<T> as DecodeFn);
        #[cfg(feature = "tracing-integration")]
        tracing::debug!(type_id = T::TYPE_ID, "registered provider data type");
    }

    /// Check whether a type id is registered.
    #[must_use]
    pub fn contains(&self, type_id: &str) -> bool {
        self.decoders.read().contains_key(type_id)
    }

    /// Decode a payload body for the given type id.
    pub fn decode(&self, type_id: &str, data: JsonValue) -> Result<Arc<dyn ProviderData>, ModelError> {
        let decoder = self
            .decoders
            .read()
            .get(type_id)
            .copied()
            .ok_or_else(|| UnknownProviderDataTypeError::new(type_id))?;
        Ok(decoder(data)?)
    }

    /// List registered type ids.
    #[must_use]
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.decoders.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for ProviderDataRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDataRegistry")
            .field("type_ids", &self.type_ids())
            .finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<ProviderDataRegistry> = OnceLock::new();

/// The process-wide registry.
pub fn global_registry() -> &'static ProviderDataRegistry {
    GLOBAL_REGISTRY.get_or_init(ProviderDataRegistry::new)
}

/// Register a payload type with the process-wide registry.
///
/// Backends call this once at initialization for every payload kind they own.
pub fn register_provider_data<T: ProviderDataType>() {
    global_registry().register::<T>();
}

/// Decode a payload through the process-wide registry.
pub fn decode_provider_data(type_id: &str, data: JsonValue) -> Result<Arc<dyn ProviderData>, ModelError> {
    global_registry().decode(type_id, data)
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    type_id: String,
    data: JsonValue,
}

/// Backend-name keyed payload map.
///
/// Used both for options flowing into a call and metadata flowing out of a
/// response; see the [`ProviderOptions`] and [`ProviderMetadata`] aliases.
#[derive(Debug, Clone, Default)]
pub struct ProviderMap {
    entries: IndexMap<String, Arc<dyn ProviderData>>,
}

/// Options passed to backends, keyed by backend name.
pub type ProviderOptions = ProviderMap;

/// Metadata returned by backends, keyed by backend name.
pub type ProviderMetadata = ProviderMap;

impl ProviderMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a payload for a backend.
    pub fn insert<T: ProviderDataType>(&mut self, backend: impl Into<String>, value: T) {
        self.entries.insert(backend.into(), Arc::new(value));
    }

    /// Insert a payload and return self.
    #[must_use]
    pub fn with<T: ProviderDataType>(mut self, backend: impl Into<String>, value: T) -> Self {
        self.insert(backend, value);
        self
    }

    /// Insert an already type-erased payload.
    pub fn insert_dyn(&mut self, backend: impl Into<String>, value: Arc<dyn ProviderData>) {
        self.entries.insert(backend.into(), value);
    }

    /// Get the payload for a backend if it has the expected type.
    #[must_use]
    pub fn get<T: ProviderDataType>(&self, backend: &str) -> Option<&T> {
        self.entries
            .get(backend)
            .and_then(|v| v.as_any().downcast_ref::<T>())
    }

    /// Get the payload for a backend, failing if it is present with the wrong type.
    ///
    /// Backends use this to fail fast before any network call.
    pub fn require<T: ProviderDataType>(&self, backend: &str) -> Result<Option<&T>, InvalidArgumentError> {
        match self.entries.get(backend) {
            None => Ok(None),
            Some(value) => value.as_any().downcast_ref::<T>().map(Some).ok_or_else(|| {
                InvalidArgumentError::new(
                    "provider_options",
                    format!(
                        "expected {} for backend '{}', got {}",
                        T::TYPE_ID,
                        backend,
                        value.data_type()
                    ),
                )
            }),
        }
    }

    /// Get the type-erased payload for a backend.
    #[must_use]
    pub fn get_dyn(&self, backend: &str) -> Option<&Arc<dyn ProviderData>> {
        self.entries.get(backend)
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ProviderData>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another map into this one (other wins).
    pub fn extend(&mut self, other: &ProviderMap) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), Arc::clone(v));
        }
    }

    /// Encode into the wire envelope form.
    pub fn to_json(&self) -> Result<JsonValue, ModelError> {
        let mut out = serde_json::Map::new();
        for (backend, value) in &self.entries {
            let envelope = Envelope {
                type_id: value.data_type().to_string(),
                data: value.to_json()?,
            };
            out.insert(backend.clone(), serde_json::to_value(envelope)?);
        }
        Ok(JsonValue::Object(out))
    }

    /// Decode from the wire envelope form.
    ///
    /// Unlike the `Deserialize` impl this keeps the typed
    /// [`UnknownProviderDataTypeError`].
    pub fn from_json(value: JsonValue) -> Result<Self, ModelError> {
        let raw: IndexMap<String, Envelope> = serde_json::from_value(value)?;
        let mut map = Self::new();
        for (backend, envelope) in raw {
            let decoded = decode_provider_data(&envelope.type_id, envelope.data)?;
            map.entries.insert(backend, decoded);
        }
        Ok(map)
    }
}

impl PartialEq for ProviderMap {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(k, a)| {
            other.entries.get(k).is_some_and(|b| {
                a.data_type() == b.data_type()
                    && matches!((a.to_json(), b.to_json()), (Ok(x), Ok(y)) if x == y)
            })
        })
    }
}

impl Serialize for ProviderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (backend, value) in &self.entries {
            let envelope = Envelope {
                type_id: value.data_type().to_string(),
                data: value.to_json().map_err(S::Error::custom)?,
            };
            map.serialize_entry(backend, &envelope)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProviderMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Envelope>::deserialize(deserializer)?;
        let mut map = Self::new();
        for (backend, envelope) in raw {
            let decoded =
                decode_provider_data(&envelope.type_id, envelope.data).map_err(D::Error::custom)?;
            map.entries.insert(backend, decoded);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct AcmeOptions {
        reasoning_effort: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    }

    impl ProviderDataType for AcmeOptions {
        const TYPE_ID: &'static str = "acme.options";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct AcmeMetadata {
        cached: bool,
    }

    impl ProviderDataType for AcmeMetadata {
        const TYPE_ID: &'static str = "acme.metadata";
    }

    fn setup() {
        register_provider_data::<AcmeOptions>();
        register_provider_data::<AcmeMetadata>();
    }

    #[test]
    fn test_wire_shape() {
        setup();
        let options = ProviderOptions::new().with(
            "acme",
            AcmeOptions {
                reasoning_effort: "high".into(),
                user: None,
            },
        );
        let wire = serde_json::to_value(&options).unwrap();
        assert_eq!(
            wire,
            json!({"acme": {"type": "acme.options", "data": {"reasoning_effort": "high"}}})
        );
    }

    #[test]
    fn test_decode_encode_is_idempotent() {
        setup();
        let wire = json!({
            "acme": {"type": "acme.options", "data": {"reasoning_effort": "low", "user": "u1"}},
            "acme-cache": {"type": "acme.metadata", "data": {"cached": true}}
        });
        let decoded = ProviderMap::from_json(wire.clone()).unwrap();
        assert_eq!(decoded.to_json().unwrap(), wire);

        let again: ProviderMap = serde_json::from_value(serde_json::to_value(&decoded).unwrap()).unwrap();
        assert_eq!(again, decoded);
        assert_eq!(again.get::<AcmeMetadata>("acme-cache"), Some(&AcmeMetadata { cached: true }));
    }

    #[test]
    fn test_unknown_type_is_typed_error() {
        setup();
        let wire = json!({"other": {"type": "other.options", "data": {}}});
        let err = ProviderMap::from_json(wire.clone()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownProviderDataType(ref e) if e.type_id == "other.options"
        ));
        assert!(serde_json::from_value::<ProviderMap>(wire).is_err());
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ProviderDataRegistry::new();
        registry.register::<AcmeOptions>();
        registry.register::<AcmeOptions>();
        assert_eq!(registry.type_ids(), vec!["acme.options".to_string()]);
        assert!(registry.contains("acme.options"));
    }

    #[test]
    fn test_require_wrong_type() {
        let map = ProviderOptions::new().with("acme", AcmeMetadata { cached: false });
        let err = map.require::<AcmeOptions>("acme").unwrap_err();
        assert_eq!(err.argument, "provider_options");
        assert!(map.require::<AcmeOptions>("missing").unwrap().is_none());
        assert!(map.require::<AcmeMetadata>("acme").unwrap().is_some());
    }

    #[test]
    fn test_bad_payload_body() {
        setup();
        let wire = json!({"acme": {"type": "acme.options", "data": {"reasoning_effort": 5}}});
        let err = ProviderMap::from_json(wire).unwrap_err();
        assert!(matches!(err, ModelError::Serialization(_)));
    }
}
