//! Relationship engines: weighted (C3), temporal (C4), and conditional (C5).
//!
//! These three share the data model of spec §3 (a typed edge between two
//! CIs carrying a numeric property bag) and the query fabric of
//! [`crate::gateway`]. Each submodule owns one engine; shared wire types
//! live here.

pub mod conditional;
pub mod temporal;
pub mod weighted;

use crate::common::{now_millis, PropertyValue, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The weight-related property bag carried by weighted and temporal edges
/// (spec §3 "Relationship (Edge)").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightProperties {
    pub weight: Option<f64>,
    pub criticality_score: Option<f64>,
    pub load_factor: Option<f64>,
    pub latency_ms: Option<f64>,
    pub redundancy_level: Option<f64>,
    pub bandwidth_mbps: Option<f64>,
    pub cost_per_hour: Option<f64>,
    pub confidence: Option<f64>,
    pub source: Option<String>,
    pub last_updated: Option<Timestamp>,
}

impl WeightProperties {
    /// Merge into a property map suitable for a Cypher `SET` clause,
    /// overwriting only the fields that are `Some`.
    pub fn to_params(&self) -> HashMap<String, PropertyValue> {
        let mut map = HashMap::new();
        macro_rules! put_f64 {
            ($field:ident, $key:literal) => {
                if let Some(v) = self.$field {
                    map.insert($key.to_string(), PropertyValue::Float(v));
                }
            };
        }
        put_f64!(weight, "weight");
        put_f64!(criticality_score, "criticalityScore");
        put_f64!(load_factor, "loadFactor");
        put_f64!(latency_ms, "latencyMs");
        put_f64!(redundancy_level, "redundancyLevel");
        put_f64!(bandwidth_mbps, "bandwidthMbps");
        put_f64!(cost_per_hour, "costPerHour");
        put_f64!(confidence, "confidence");
        if let Some(source) = &self.source {
            map.insert("source".to_string(), PropertyValue::String(source.clone()));
        }
        map.insert(
            "lastUpdated".to_string(),
            PropertyValue::Integer(self.last_updated.unwrap_or_else(now_millis)),
        );
        map
    }

    pub fn from_record(record: &HashMap<String, PropertyValue>) -> Self {
        Self {
            weight: record.get("weight").and_then(PropertyValue::as_f64),
            criticality_score: record.get("criticalityScore").and_then(PropertyValue::as_f64),
            load_factor: record.get("loadFactor").and_then(PropertyValue::as_f64),
            latency_ms: record.get("latencyMs").and_then(PropertyValue::as_f64),
            redundancy_level: record.get("redundancyLevel").and_then(PropertyValue::as_f64),
            bandwidth_mbps: record.get("bandwidthMbps").and_then(PropertyValue::as_f64),
            cost_per_hour: record.get("costPerHour").and_then(PropertyValue::as_f64),
            confidence: record.get("confidence").and_then(PropertyValue::as_f64),
            source: record.get("source").and_then(PropertyValue::as_str).map(String::from),
            last_updated: record.get("lastUpdated").and_then(PropertyValue::as_i64),
        }
    }
}

/// A single hop in a returned path: the edge type and its weight-related
/// properties (spec §4.3 "Shortest weighted path"/"All weighted paths").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEdge {
    pub from: String,
    pub to: String,
    pub rel_type: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathResult {
    pub nodes: Vec<String>,
    pub edges: Vec<PathEdge>,
    pub total_weight: f64,
    pub hop_count: usize,
}

/// A single entry in `weightHistory` (spec §3 "weightHistory").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightHistoryEntry {
    pub timestamp: Timestamp,
    pub weight: Option<f64>,
    pub criticality_score: Option<f64>,
    pub load_factor: Option<f64>,
    pub source: String,
}
