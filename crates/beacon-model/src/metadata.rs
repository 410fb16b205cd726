//! Notification metadata
//!
//! Servers attach an arbitrary payload to each notification. Some send it as
//! a JSON object, some as a JSON-encoded string. [`Metadata::decode`] is the
//! single place where either form is accepted.

use crate::error::MetadataError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Decoded metadata payload
///
/// `Value::Null` means "no metadata". Serialization is the inverse of
/// [`Metadata::decode`]: a string payload is written JSON-encoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata(Value);

impl Metadata {
    /// Empty metadata
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Null)
    }

    /// Decode a raw payload as received on the wire or read from storage
    ///
    /// # Errors
    /// - `MetadataError::Malformed` if a string payload is not valid JSON
    pub fn decode(raw: Value) -> Result<Self, MetadataError> {
        match raw {
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(Self::empty());
                }
                serde_json::from_str(text)
                    .map(Self)
                    .map_err(MetadataError::Malformed)
            }
            other => Ok(Self(other)),
        }
    }

    /// Decode into a typed structure
    ///
    /// # Errors
    /// - `MetadataError::Shape` if the payload does not match `T`
    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T, MetadataError> {
        T::deserialize(&self.0).map_err(MetadataError::Shape)
    }

    /// Look up a top-level key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check whether there is no metadata
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Borrow the raw JSON value
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Value::String(_) => {
                let encoded = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&encoded)
            }
            other => other.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::decode(raw).map_err(serde::de::Error::custom)
    }
}

impl From<Value> for Metadata {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TaskRef {
        task_id: u64,
    }

    #[test]
    fn structured_payload_passes_through() {
        let meta = Metadata::decode(json!({ "task_id": 7 })).unwrap();
        assert_eq!(meta.get("task_id"), Some(&json!(7)));
    }

    #[test]
    fn string_payload_is_decoded() {
        let meta = Metadata::decode(json!("{\"task_id\": 7}")).unwrap();
        assert_eq!(meta.decode_as::<TaskRef>().unwrap(), TaskRef { task_id: 7 });
    }

    #[test]
    fn blank_string_is_empty() {
        assert!(Metadata::decode(json!("   ")).unwrap().is_empty());
        assert!(Metadata::decode(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn malformed_string_is_an_error() {
        let err = Metadata::decode(json!("{not json")).unwrap_err();
        assert!(matches!(err, MetadataError::Malformed(_)));
    }

    #[test]
    fn string_scalar_survives_serialization() {
        let meta = Metadata::decode(json!("\"call back\"")).unwrap();
        assert_eq!(meta.as_value(), &json!("call back"));

        let written = serde_json::to_value(&meta).unwrap();
        assert_eq!(written, json!("\"call back\""));
        assert_eq!(Metadata::decode(written).unwrap(), meta);
        assert_eq!(serde_json::from_str::<Metadata>("\"\\\"call back\\\"\"").unwrap(), meta);
    }

    #[test]
    fn structured_payload_serializes_as_is() {
        let meta = Metadata::from(json!({ "task_id": 7 }));
        assert_eq!(serde_json::to_value(&meta).unwrap(), json!({ "task_id": 7 }));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let meta = Metadata::decode(json!({ "task_id": "x" })).unwrap();
        assert!(matches!(
            meta.decode_as::<TaskRef>(),
            Err(MetadataError::Shape(_))
        ));
    }
}
