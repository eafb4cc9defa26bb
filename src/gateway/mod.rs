//! # Graph Gateway (C1)
//!
//! A thin, single-writer-per-request abstraction over the property graph
//! store: acquire a session, run one parameterized query, convert every
//! returned value into a plain [`PropertyValue`], release the session
//! unconditionally. This is the only place in the core that talks Cypher
//! or touches a `neo4rs::Graph` directly — every other service goes
//! through [`GraphGateway::query`].
//!
//! Grounded on `dashflow-neo4j`'s `Neo4jGraph` (connection setup, the
//! `Long`/`Double` type-name normalization idea), generalized into a
//! `BoltType -> PropertyValue` conversion so callers never see graph-
//! native integer/datetime representations (spec §4.1, REDESIGN FLAGS).

use crate::common::{PropertyValue, Record};
use crate::error::{CmdbError, Result};
use neo4rs::{BoltType, Graph, Query};
use std::collections::HashMap;

/// Parameterized query execution over the graph store.
pub struct GraphGateway {
    graph: Graph,
}

impl GraphGateway {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| CmdbError::QueryFailure(format!("failed to connect to graph store: {e}")))?;
        Ok(Self { graph })
    }

    /// Execute `cypher` with the given parameters and return every row,
    /// each row a mapping from RETURN alias to a normalized value.
    ///
    /// A session is acquired for the call and released when this future
    /// resolves, on both the success and error paths — there is no
    /// exclusive resource held across a suspension point beyond the single
    /// in-flight query (spec §5 "Suspension points").
    pub async fn query(
        &self,
        cypher: &str,
        params: HashMap<String, PropertyValue>,
    ) -> Result<Vec<Record>> {
        let mut query = Query::new(cypher.to_string());
        for (key, value) in params {
            query = query.param(&key, to_bolt(&value));
        }

        let mut stream = self
            .graph
            .execute(query)
            .await
            .map_err(|e| CmdbError::QueryFailure(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| CmdbError::QueryFailure(e.to_string()))?
        {
            let mut record = Record::new();
            for key in row.keys() {
                if let Ok(bolt) = row.get::<BoltType>(key) {
                    record.insert(key.to_string(), from_bolt(bolt));
                }
            }
            rows.push(record);
        }

        Ok(rows)
    }

    /// Execute a query that is expected to return at most one row.
    pub async fn query_one(
        &self,
        cypher: &str,
        params: HashMap<String, PropertyValue>,
    ) -> Result<Option<Record>> {
        Ok(self.query(cypher, params).await?.into_iter().next())
    }
}

/// Convert a graph-native value into the core's plain property value,
/// centralizing the numeric/datetime normalization the rest of the core
/// must never do ad hoc (spec §4.1, REDESIGN FLAGS "Numeric representation
/// mismatch").
fn from_bolt(bolt: BoltType) -> PropertyValue {
    match bolt {
        BoltType::Null(_) => PropertyValue::Null,
        BoltType::Boolean(b) => PropertyValue::Bool(b.value),
        BoltType::Integer(i) => PropertyValue::Integer(i.value),
        BoltType::Float(f) => PropertyValue::Float(f.value),
        BoltType::String(s) => PropertyValue::String(s.value),
        BoltType::List(list) => {
            PropertyValue::Array(list.value.into_iter().map(from_bolt).collect())
        }
        BoltType::Map(map) => PropertyValue::Map(
            map.value
                .into_iter()
                .map(|(k, v)| (k.value, from_bolt(v)))
                .collect(),
        ),
        BoltType::Node(node) => {
            let mut m: HashMap<String, PropertyValue> = node
                .properties
                .value
                .into_iter()
                .map(|(k, v)| (k.value, from_bolt(v)))
                .collect();
            m.insert("__id".to_string(), PropertyValue::Integer(node.id.value));
            m.insert(
                "__labels".to_string(),
                PropertyValue::Array(
                    node.labels
                        .value
                        .into_iter()
                        .map(|l| PropertyValue::String(l.value))
                        .collect(),
                ),
            );
            PropertyValue::Map(m)
        }
        BoltType::Relation(rel) => {
            let mut m: HashMap<String, PropertyValue> = rel
                .properties
                .value
                .into_iter()
                .map(|(k, v)| (k.value, from_bolt(v)))
                .collect();
            m.insert("__id".to_string(), PropertyValue::Integer(rel.id.value));
            m.insert("__type".to_string(), PropertyValue::String(rel.typ.value));
            PropertyValue::Map(m)
        }
        // Temporal bolt types (DateTime, Date, Duration, ...) are returned
        // by the store as an ISO-8601 string; callers parse it with
        // `chrono` into a `Timestamp`, same normalization point as integers.
        other => PropertyValue::String(format!("{other:?}")),
    }
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Null => BoltType::Null(neo4rs::BoltNull::default()),
        PropertyValue::Bool(b) => BoltType::Boolean(neo4rs::BoltBoolean::new(*b)),
        PropertyValue::Integer(i) => BoltType::Integer(neo4rs::BoltInteger::new(*i)),
        PropertyValue::Float(f) => BoltType::Float(neo4rs::BoltFloat::new(*f)),
        PropertyValue::String(s) => BoltType::String(neo4rs::BoltString::new(s)),
        PropertyValue::Array(items) => {
            BoltType::List(neo4rs::BoltList::from(items.iter().map(to_bolt).collect::<Vec<_>>()))
        }
        PropertyValue::Map(map) => {
            let mut bolt_map = neo4rs::BoltMap::default();
            for (k, v) in map {
                bolt_map.put(neo4rs::BoltString::new(k), to_bolt(v));
            }
            BoltType::Map(bolt_map)
        }
    }
}

/// Closed allow-list of relationship types that may ever be spliced into a
/// Cypher template (REDESIGN FLAGS: never interpolate user-supplied data).
pub const ALLOWED_RELATIONSHIP_TYPES: &[&str] = &[
    "DEPENDS_ON",
    "RUNS_ON",
    "HOSTED_IN",
    "SUPPORTS",
    "CONNECTS_TO",
    "REPLICATES_TO",
    "BALANCES_TO",
    "ROUTES_TO",
    "MONITORS",
    "USES",
    "INTEGRATES_WITH",
    "LOCATED_IN",
    "MUST_COMPLY_WITH",
    "FAILS_OVER_TO",
    "SCALES_TO",
    "DELEGATES_TO",
];

/// Edge types the weighted-path traversal allow-list follows (spec §4.3).
pub const TRAVERSAL_ALLOWLIST: &[&str] = &["DEPENDS_ON", "RUNS_ON", "SUPPORTS", "USES"];

/// Validate a relationship type against the closed allow-list before it is
/// ever placed into a query template.
pub fn validate_relationship_type(rel_type: &str) -> Result<()> {
    if ALLOWED_RELATIONSHIP_TYPES.contains(&rel_type) {
        Ok(())
    } else {
        Err(CmdbError::InvalidRelationshipType(rel_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_known_relationship_types() {
        assert!(validate_relationship_type("DEPENDS_ON").is_ok());
        assert!(validate_relationship_type("DROP_TABLE_STUDENTS").is_err());
    }

    #[test]
    fn bolt_roundtrip_preserves_primitives() {
        let original = PropertyValue::Map(HashMap::from([
            ("n".to_string(), PropertyValue::Integer(42)),
            ("f".to_string(), PropertyValue::Float(1.5)),
            ("s".to_string(), PropertyValue::String("hi".to_string())),
        ]));
        let bolt = to_bolt(&original);
        let back = from_bolt(bolt);
        assert_eq!(back, original);
    }
}
