//! Metadata/codec layer (§4.I): maps portal logical types to canonical
//! runtime values and back.
//!
//! Grounded on the `HashMap<Key, Box<dyn Trait>>` capability-table pattern
//! used for per-key dynamic behavior in
//! `modules/nodes_registry/src/domain/node_storage.rs`'s `syscap_custom`
//! field.

use crate::model::LogicalType;
use serde_json::Value;
use std::collections::HashMap;

/// A canonical, decoded value. `Location`/`Unknown` carry raw JSON since
/// they are not required to round-trip bit-exactly (§8 invariant 9).
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Number(f64),
    Bool(bool),
    Text(String),
    DateTime(chrono::DateTime<chrono::Utc>),
    Json(Value),
}

/// `{parse(raw) -> canonical, format(canonical) -> raw}` (§4.I).
pub trait Codec: Send + Sync {
    fn parse(&self, raw: &Value) -> CanonicalValue;
    fn format(&self, canonical: &CanonicalValue) -> Value;
}

struct NumberCodec;
impl Codec for NumberCodec {
    fn parse(&self, raw: &Value) -> CanonicalValue {
        let candidate = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match candidate {
            Some(n) if n.is_finite() => CanonicalValue::Number(n),
            _ => CanonicalValue::Null,
        }
    }

    fn format(&self, canonical: &CanonicalValue) -> Value {
        match canonical {
            CanonicalValue::Number(n) => {
                serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
            }
            _ => Value::Null,
        }
    }
}

struct CheckboxCodec;
impl Codec for CheckboxCodec {
    fn parse(&self, raw: &Value) -> CanonicalValue {
        let truthy = match raw {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        truthy.map_or(CanonicalValue::Null, CanonicalValue::Bool)
    }

    fn format(&self, canonical: &CanonicalValue) -> Value {
        match canonical {
            CanonicalValue::Bool(b) => Value::Bool(*b),
            _ => Value::Null,
        }
    }
}

struct DateTimeCodec;
impl Codec for DateTimeCodec {
    fn parse(&self, raw: &Value) -> CanonicalValue {
        let parsed = match raw {
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
            _ => None,
        };
        parsed.map_or(CanonicalValue::Null, CanonicalValue::DateTime)
    }

    fn format(&self, canonical: &CanonicalValue) -> Value {
        match canonical {
            CanonicalValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            _ => Value::Null,
        }
    }
}

struct GeoCodec;
impl Codec for GeoCodec {
    fn parse(&self, raw: &Value) -> CanonicalValue {
        match raw {
            Value::Object(map) if map.contains_key("type") && map.contains_key("coordinates") => {
                CanonicalValue::Json(raw.clone())
            }
            Value::Null => CanonicalValue::Null,
            _ => CanonicalValue::Null,
        }
    }

    fn format(&self, canonical: &CanonicalValue) -> Value {
        match canonical {
            CanonicalValue::Json(v) => v.clone(),
            _ => Value::Null,
        }
    }
}

struct PassThroughCodec;
impl Codec for PassThroughCodec {
    fn parse(&self, raw: &Value) -> CanonicalValue {
        CanonicalValue::Json(raw.clone())
    }

    fn format(&self, canonical: &CanonicalValue) -> Value {
        match canonical {
            CanonicalValue::Json(v) => v.clone(),
            CanonicalValue::Text(s) => Value::String(s.clone()),
            CanonicalValue::Null => Value::Null,
            CanonicalValue::Number(n) => {
                serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
            }
            CanonicalValue::Bool(b) => Value::Bool(*b),
            CanonicalValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
        }
    }
}

struct TextCodec;
impl Codec for TextCodec {
    fn parse(&self, raw: &Value) -> CanonicalValue {
        match raw {
            Value::String(s) => CanonicalValue::Text(s.clone()),
            Value::Null => CanonicalValue::Null,
            other => CanonicalValue::Text(other.to_string()),
        }
    }

    fn format(&self, canonical: &CanonicalValue) -> Value {
        match canonical {
            CanonicalValue::Text(s) => Value::String(s.clone()),
            _ => Value::Null,
        }
    }
}

/// Registry of codecs keyed by `LogicalType`. Every `LogicalType` variant has
/// an entry; unmapped raw types collapse to `Unknown` before lookup (§4.C.5).
pub struct CodecRegistry {
    codecs: HashMap<LogicalType, Box<dyn Codec>>,
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut codecs: HashMap<LogicalType, Box<dyn Codec>> = HashMap::new();
        codecs.insert(LogicalType::Number, Box::new(NumberCodec));
        codecs.insert(LogicalType::Money, Box::new(NumberCodec));
        codecs.insert(LogicalType::Percent, Box::new(NumberCodec));
        codecs.insert(LogicalType::Checkbox, Box::new(CheckboxCodec));
        codecs.insert(LogicalType::Date, Box::new(DateTimeCodec));
        codecs.insert(LogicalType::Datetime, Box::new(DateTimeCodec));
        codecs.insert(LogicalType::Location, Box::new(GeoCodec));
        codecs.insert(LogicalType::Point, Box::new(GeoCodec));
        codecs.insert(LogicalType::Polygon, Box::new(GeoCodec));
        codecs.insert(LogicalType::Json, Box::new(PassThroughCodec));
        codecs.insert(LogicalType::Unknown, Box::new(PassThroughCodec));
        codecs.insert(LogicalType::Text, Box::new(TextCodec));
        codecs.insert(LogicalType::Url, Box::new(TextCodec));
        codecs.insert(LogicalType::Email, Box::new(TextCodec));
        codecs.insert(LogicalType::Phone, Box::new(TextCodec));
        Self { codecs }
    }

    #[must_use]
    pub fn parse(&self, logical_type: LogicalType, raw: &Value) -> CanonicalValue {
        self.codecs
            .get(&logical_type)
            .map_or(CanonicalValue::Null, |c| c.parse(raw))
    }

    #[must_use]
    pub fn format(&self, logical_type: LogicalType, canonical: &CanonicalValue) -> Value {
        self.codecs
            .get(&logical_type)
            .map_or(Value::Null, |c| c.format(canonical))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_codec_rejects_non_finite() {
        let registry = CodecRegistry::new();
        assert_eq!(
            registry.parse(LogicalType::Number, &json!("42.5")),
            CanonicalValue::Number(42.5)
        );
        assert_eq!(
            registry.parse(LogicalType::Number, &json!("not-a-number")),
            CanonicalValue::Null
        );
    }

    #[test]
    fn checkbox_codec_accepts_yes_no_variants() {
        let registry = CodecRegistry::new();
        for truthy in ["true", "yes", "y", "1"] {
            assert_eq!(
                registry.parse(LogicalType::Checkbox, &json!(truthy)),
                CanonicalValue::Bool(true)
            );
        }
        for falsy in ["false", "no", "n", "0"] {
            assert_eq!(
                registry.parse(LogicalType::Checkbox, &json!(falsy)),
                CanonicalValue::Bool(false)
            );
        }
        assert_eq!(
            registry.parse(LogicalType::Checkbox, &json!("maybe")),
            CanonicalValue::Null
        );
    }

    #[test]
    fn datetime_round_trips_through_format() {
        let registry = CodecRegistry::new();
        let parsed = registry.parse(LogicalType::Datetime, &json!("2024-01-15T10:30:00Z"));
        let formatted = registry.format(LogicalType::Datetime, &parsed);
        let reparsed = registry.parse(LogicalType::Datetime, &formatted);
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn json_and_unknown_pass_through() {
        let registry = CodecRegistry::new();
        let raw = json!({"anything": [1, 2, 3]});
        let parsed = registry.parse(LogicalType::Json, &raw);
        assert_eq!(parsed, CanonicalValue::Json(raw));
    }
}
