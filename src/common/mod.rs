//! Shared types used across the engines: the open property-value model,
//! id aliases, and timestamp helpers.
//!
//! CIs and relationships both carry an open property bag on top of their
//! typed fields (spec §3). `PropertyValue` is the value type for that bag;
//! it is also what the Graph Gateway (`crate::gateway`) normalizes graph-
//! native values into.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Globally-unique CI identifier (spec §3: `id`, primary key, immutable).
pub type CiId = String;

/// Graph-native relationship identity, stringified (see `SPEC_FULL.md` §C.1).
pub type EdgeId = String;

/// A value in an open property bag: CI properties, edge properties, or a
/// single graph gateway result cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropertyValue::Integer(i)
                } else {
                    PropertyValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(a) => {
                PropertyValue::Array(a.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(o) => PropertyValue::Map(
                o.into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// An open property bag, keyed by property name (spec §3).
pub type PropertyBag = HashMap<String, PropertyValue>;

/// A single row returned by the graph gateway: return-alias -> value.
pub type Record = HashMap<String, PropertyValue>;

/// Wall-clock timestamp, milliseconds since the epoch — the representation
/// used throughout the core for `createdAt`/`updatedAt`/`validFrom`/etc.
pub type Timestamp = i64;

/// Current wall-clock time as a millisecond timestamp.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Component health, reported by `/health` and used internally by the
/// evaluator/worker lifecycle logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_value_from_json_roundtrip() {
        let json = serde_json::json!({"a": 1, "b": [1, 2.5, "x"], "c": null});
        let pv = PropertyValue::from(json);
        match pv {
            PropertyValue::Map(m) => {
                assert_eq!(m.get("a").unwrap().as_i64(), Some(1));
                assert!(m.get("c").unwrap().is_null());
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn as_f64_coerces_integers() {
        assert_eq!(PropertyValue::Integer(5).as_f64(), Some(5.0));
        assert_eq!(PropertyValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(PropertyValue::String("x".into()).as_f64(), None);
    }
}
