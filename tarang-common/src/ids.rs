//! Canonical asset identifiers
//!
//! The remote document store serializes its file identifiers inconsistently
//! across endpoints: sometimes a plain string, sometimes an extended-JSON
//! wrapper (`{"$oid": "..."}`), sometimes an opaque object whose text form is
//! the 24-character hex id. Every comparison between assets (fetch, play,
//! delete) goes through [`canonical_id`] / [`AssetId`]; raw identifiers are
//! never compared structurally.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Length of a document-store object id in hex characters
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Extended-JSON key carrying the embedded object id text
const EXTENDED_JSON_OID: &str = "$oid";

/// Wrapper keys some endpoints nest the identifier under
const WRAPPER_KEYS: [&str; 2] = ["_id", "id"];

/// True if `s` is exactly 24 hexadecimal characters (either case)
pub fn is_object_id_hex(s: &str) -> bool {
    s.len() == OBJECT_ID_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Normalize a wire identifier to its canonical string form
///
/// Ordered, first match wins:
/// 1. a JSON string is returned unchanged
/// 2. an object with an embedded `$oid` yields the embedded text
///    (single-key `_id` / `id` wrappers around such an object are unwrapped)
/// 3. a text form matching the 24-hex pattern is returned as-is
/// 4. otherwise the best-effort text form of the value
///
/// Pure and total: never fails.
pub fn canonical_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            if let Some(embedded) = map.get(EXTENDED_JSON_OID) {
                return canonical_id(embedded);
            }
            if map.len() == 1 {
                for key in WRAPPER_KEYS {
                    if let Some(inner) = map.get(key) {
                        return canonical_id(inner);
                    }
                }
            }
            value.to_string()
        }
        other => canonical_from_display(other),
    }
}

/// Normalize an opaque identifier that only exposes a text conversion
///
/// Covers steps 3 and 4 of [`canonical_id`] for in-process values such as a
/// driver's object-id type. Both steps yield the text form; the hex check only
/// decides whether the result is a real object id (see [`AssetId::is_object_id`]).
pub fn canonical_from_display<T: fmt::Display + ?Sized>(value: &T) -> String {
    value.to_string()
}

/// Canonical identifier of an audio asset
///
/// Deserializes from any supported wire representation, so every id that
/// crosses the service boundary is already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    /// Build from an already-canonical string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build from a raw wire value
    pub fn from_value(value: &Value) -> Self {
        Self(canonical_id(value))
    }

    /// Build from an opaque identifier exposing only `Display`
    pub fn from_display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        Self(canonical_from_display(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the canonical text looks like a document-store object id
    pub fn is_object_id(&self) -> bool {
        is_object_id_hex(&self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Value> for AssetId {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}
