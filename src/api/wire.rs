//! Wire-level helpers shared by the exchange clients.
//!
//! Exchanges are inconsistent about key casing and about whether numbers
//! arrive as JSON strings or JSON numbers. Response bodies are therefore
//! decoded in two steps: keys are lower-cased recursively, then the typed
//! structs (whose renames are all lower-case) are deserialized. Numeric
//! fields use [`WireValue`], which keeps the raw text and parses leniently.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Decode a response body, matching object keys case-insensitively.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    serde_json::from_value(lowercase_keys(value))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut lowered = Map::with_capacity(map.len());
            for (key, inner) in map {
                lowered.insert(key.to_ascii_lowercase(), lowercase_keys(inner));
            }
            Value::Object(lowered)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Shorten a body for log output
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// A scalar wire field kept as text.
///
/// Accepts strings, numbers, booleans and null. Parsing helpers never fail:
/// malformed text such as `"abc"`, `""` or `"null"` becomes zero (or `None`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireValue(Option<String>);

impl WireValue {
    pub fn from_text(text: &str) -> Self {
        Self(Some(text.to_string()))
    }

    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn as_opt_f64(&self) -> Option<f64> {
        self.raw()
            .map(str::trim)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    pub fn as_f64_or_zero(&self) -> f64 {
        self.as_opt_f64().unwrap_or(0.0)
    }

    /// Millisecond timestamps and other integers; fractional text is truncated.
    pub fn as_i64_or_zero(&self) -> i64 {
        let Some(text) = self.raw().map(str::trim) else {
            return 0;
        };
        text.parse::<i64>()
            .ok()
            .or_else(|| text.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
            .unwrap_or(0)
    }

    pub fn as_opt_bool(&self) -> Option<bool> {
        match self.raw().map(str::trim) {
            Some(text) if text.eq_ignore_ascii_case("true") => Some(true),
            Some(text) if text.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Text content, or empty when absent or literally "null"
    pub fn as_string(&self) -> String {
        self.as_opt_string().unwrap_or_default()
    }

    pub fn as_opt_string(&self) -> Option<String> {
        self.raw()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(str::to_string)
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => WireValue(None),
            Value::String(s) => WireValue(Some(s)),
            Value::Number(n) => WireValue(Some(n.to_string())),
            Value::Bool(b) => WireValue(Some(b.to_string())),
            // Nested structures are not scalars; keep them visible for diagnostics
            other => WireValue(Some(other.to_string())),
        })
    }
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Some endpoints return either a single object or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}
