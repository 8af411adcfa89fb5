//! Opaque JSON column.

use crate::error::{Error, Result};
use crate::value::{FromValue, ToValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KIND: &str = "jsonb";

/// Arbitrary JSON stored as-is.
///
/// The wrapper is invisible on the wire: it serializes as the wrapped value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jsonb(pub serde_json::Value);

impl Jsonb {
    /// Parse the storage representation, as either text or raw bytes.
    pub fn from_storage(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map(Self)
            .map_err(|e| Error::malformed_scalar(KIND, e.to_string()))
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Jsonb {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for Jsonb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Jsonb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_storage(s.as_bytes())
    }
}

impl ToValue for Jsonb {
    fn to_value(&self) -> Value {
        Value::Json(self.0.clone())
    }
}

impl FromValue for Jsonb {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(Self(v)),
            Value::Text(text) => text.parse(),
            Value::Bytes(bytes) => Self::from_storage(&bytes),
            other => Err(Error::malformed_scalar(
                KIND,
                format!("cannot scan {} into json", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_structure_passes_through() {
        let stored = r#"{"tags":["core",{"rack":7}],"active":true,"note":null}"#;
        let j = Jsonb::from_value(Value::Text(stored.into())).unwrap();
        assert_eq!(
            j.0,
            json!({"tags": ["core", {"rack": 7}], "active": true, "note": null})
        );
        assert_eq!(Jsonb::from_value(j.to_value()).unwrap(), j);
    }

    #[test]
    fn invalid_storage_is_malformed() {
        let err = Jsonb::from_value(Value::Bytes(b"{not json".to_vec())).unwrap_err();
        assert!(matches!(err, Error::MalformedScalar { kind: "jsonb", .. }));
    }

    #[test]
    fn wrapper_is_transparent_on_the_wire() {
        let j = Jsonb(json!([1, 2, 3]));
        assert_eq!(serde_json::to_string(&j).unwrap(), "[1,2,3]");
        let back: Jsonb = serde_json::from_str(r#"{"a":1}"#).unwrap();
        assert_eq!(back.0, json!({"a": 1}));
    }
}
