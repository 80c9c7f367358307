//! Audio asset listing records

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tarang_common::AssetId;

/// An uploaded or generated audio file owned by the user
///
/// Never mutated in place: a refresh replaces the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    /// Canonical identifier (normalized on deserialization)
    #[serde(rename = "gridfs_id", alias = "_id", alias = "file_id")]
    pub id: AssetId,

    /// Display name; not guaranteed unique
    pub filename: String,

    /// Upload timestamp, display only
    #[serde(default)]
    pub uploaded_at: UploadedAt,

    /// MIME hint
    #[serde(default)]
    pub content_type: Option<String>,
}

impl AudioAsset {
    /// Medium-style date for list rows (e.g. "Mar 12, 2024")
    pub fn display_date(&self) -> String {
        self.uploaded_at.display()
    }
}

/// Upload timestamp as sent by the server plus its parsed form, if any
///
/// The listing endpoints emit HTTP-date strings, ISO-8601 strings or
/// extended-JSON `{"$date": ...}` objects depending on the serializer in use.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadedAt {
    pub raw: String,
    pub parsed: Option<DateTime<Utc>>,
}

impl UploadedAt {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self {
                raw: s.clone(),
                parsed: parse_timestamp(s),
            },
            Value::Number(n) => Self {
                raw: n.to_string(),
                parsed: n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            },
            Value::Object(map) => match map.get("$date") {
                Some(inner) => Self::from_value(inner),
                None => Self {
                    raw: value.to_string(),
                    parsed: None,
                },
            },
            Value::Null => Self::default(),
            other => Self {
                raw: other.to_string(),
                parsed: None,
            },
        }
    }

    pub fn display(&self) -> String {
        match self.parsed {
            Some(ts) => ts.format("%b %-d, %Y").to_string(),
            None => self.raw.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for UploadedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
