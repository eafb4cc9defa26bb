//! Configuration Item management: CRUD, adjacency summary, topology
//! subgraphs, impact analysis, paginated browse, and aggregate stats
//! (spec §3 "Configuration Item", §6 item routes). Everything here goes
//! through [`crate::gateway::GraphGateway`]; no module outside
//! `gateway` touches Cypher directly.

use crate::common::{now_millis, CiId, PropertyValue, Timestamp};
use crate::error::{CmdbError, Result};
use crate::gateway::{validate_relationship_type, GraphGateway};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub id: CiId,
    pub name: String,
    #[serde(rename = "type")]
    pub ci_type: String,
    pub status: String,
    pub criticality: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjacencySummary {
    pub item: ConfigurationItem,
    pub inbound_by_type: HashMap<String, u64>,
    pub outbound_by_type: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCiInput {
    pub name: String,
    #[serde(rename = "type")]
    pub ci_type: String,
    pub properties: Option<HashMap<String, PropertyValue>>,
}

pub struct CmdbService {
    gateway: Arc<GraphGateway>,
}

impl CmdbService {
    pub fn new(gateway: Arc<GraphGateway>) -> Self {
        Self { gateway }
    }

    /// 400 if `name`/`type` are missing (spec §6 "Create").
    pub async fn create(&self, input: CreateCiInput) -> Result<ConfigurationItem> {
        if input.name.trim().is_empty() {
            return Err(CmdbError::ValidationFailure("name is required".to_string()));
        }
        if input.ci_type.trim().is_empty() {
            return Err(CmdbError::ValidationFailure("type is required".to_string()));
        }

        let now = now_millis();
        let id = uuid::Uuid::new_v4().to_string();
        let mut props = input.properties.unwrap_or_default();
        props.entry("status".to_string()).or_insert(PropertyValue::String("OPERATIONAL".to_string()));
        props.entry("criticality".to_string()).or_insert(PropertyValue::String("MEDIUM".to_string()));

        let cypher = "CREATE (c:CI {id: $id, name: $name, type: $type, createdAt: $now, updatedAt: $now}) \
             SET c += $props \
             RETURN c";
        let mut params = HashMap::new();
        params.insert("id".to_string(), PropertyValue::String(id.clone()));
        params.insert("name".to_string(), PropertyValue::String(input.name));
        params.insert("type".to_string(), PropertyValue::String(input.ci_type));
        params.insert("now".to_string(), PropertyValue::Integer(now));
        params.insert("props".to_string(), PropertyValue::Map(props));

        let row = self.gateway.query_one(cypher, params).await?;
        row.map(|r| record_to_ci(&r)).ok_or_else(|| CmdbError::Internal("create returned no row".to_string()))
    }

    pub async fn get(&self, id: &str) -> Result<Option<ConfigurationItem>> {
        let cypher = "MATCH (c:CI {id: $id}) RETURN c";
        let mut params = HashMap::new();
        params.insert("id".to_string(), PropertyValue::String(id.to_string()));
        let row = self.gateway.query_one(cypher, params).await?;
        Ok(row.map(|r| record_to_ci(&r)))
    }

    /// CI plus inbound/outbound relationship counts by type (spec §6,
    /// `SPEC_FULL.md` §B "CI adjacency summary").
    pub async fn get_with_adjacency(&self, id: &str) -> Result<Option<AdjacencySummary>> {
        let Some(item) = self.get(id).await? else {
            return Ok(None);
        };

        let cypher = "MATCH (c:CI {id: $id}) \
             OPTIONAL MATCH (c)<-[inbound]-() \
             WITH c, type(inbound) AS inboundType, count(inbound) AS inboundCount \
             WITH c, collect({type: inboundType, count: inboundCount}) AS inboundCounts \
             OPTIONAL MATCH (c)-[outbound]->() \
             WITH c, inboundCounts, type(outbound) AS outboundType, count(outbound) AS outboundCount \
             RETURN inboundCounts, collect({type: outboundType, count: outboundCount}) AS outboundCounts";
        let mut params = HashMap::new();
        params.insert("id".to_string(), PropertyValue::String(id.to_string()));
        let row = self.gateway.query_one(cypher, params).await?.unwrap_or_default();

        Ok(Some(AdjacencySummary {
            item,
            inbound_by_type: counts_by_type(row.get("inboundCounts")),
            outbound_by_type: counts_by_type(row.get("outboundCounts")),
        }))
    }

    pub async fn list(&self, ci_type: Option<&str>, limit: usize) -> Result<Vec<ConfigurationItem>> {
        let (cypher, mut params) = match ci_type {
            Some(t) => (
                "MATCH (c:CI {type: $type}) RETURN c LIMIT $limit".to_string(),
                HashMap::from([("type".to_string(), PropertyValue::String(t.to_string()))]),
            ),
            None => ("MATCH (c:CI) RETURN c LIMIT $limit".to_string(), HashMap::new()),
        };
        params.insert("limit".to_string(), PropertyValue::Integer(limit as i64));

        let rows = self.gateway.query(&cypher, params).await?;
        Ok(rows.iter().map(record_to_ci).collect())
    }

    pub async fn count(&self, ci_type: Option<&str>) -> Result<u64> {
        let (cypher, params) = match ci_type {
            Some(t) => (
                "MATCH (c:CI {type: $type}) RETURN count(c) AS total".to_string(),
                HashMap::from([("type".to_string(), PropertyValue::String(t.to_string()))]),
            ),
            None => ("MATCH (c:CI) RETURN count(c) AS total".to_string(), HashMap::new()),
        };
        let row = self.gateway.query_one(&cypher, params).await?;
        Ok(row.and_then(|r| r.get("total").and_then(PropertyValue::as_i64)).unwrap_or(0) as u64)
    }

    /// 404 if missing (spec §6 "Update").
    pub async fn update(&self, id: &str, properties: HashMap<String, PropertyValue>) -> Result<ConfigurationItem> {
        let cypher = "MATCH (c:CI {id: $id}) SET c += $props, c.updatedAt = $now RETURN c";
        let mut params = HashMap::new();
        params.insert("id".to_string(), PropertyValue::String(id.to_string()));
        params.insert("props".to_string(), PropertyValue::Map(properties));
        params.insert("now".to_string(), PropertyValue::Integer(now_millis()));

        let row = self.gateway.query_one(cypher, params).await?;
        row.map(|r| record_to_ci(&r)).ok_or_else(|| CmdbError::CINotFound(id.to_string()))
    }

    /// Detach-delete: 404 if missing (spec §6 "Delete").
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.get(id).await?.is_none() {
            return Err(CmdbError::CINotFound(id.to_string()));
        }
        let cypher = "MATCH (c:CI {id: $id}) DETACH DELETE c";
        let mut params = HashMap::new();
        params.insert("id".to_string(), PropertyValue::String(id.to_string()));
        self.gateway.query(cypher, params).await?;
        Ok(())
    }

    /// Subgraph reachable within `depth` hops of `start_node` (default
    /// depth 3, capped at 500 nodes) (spec §6 "Topology").
    pub async fn topology(
        &self,
        start_node: &str,
        depth: usize,
        rel_type: Option<&str>,
        limit: usize,
    ) -> Result<Topology> {
        let depth = depth.min(10);
        let limit = limit.min(500);
        let type_filter = match rel_type {
            Some(t) => {
                validate_relationship_type(t)?;
                format!(":{t}")
            }
            None => String::new(),
        };

        let cypher = format!(
            "MATCH (s:CI {{id: $start}}) \
             CALL {{ WITH s MATCH p = (s)-[{type_filter}*0..{depth}]-(n:CI) RETURN n LIMIT {limit} }} \
             RETURN collect(DISTINCT n) AS nodes"
        );
        let mut params = HashMap::new();
        params.insert("start".to_string(), PropertyValue::String(start_node.to_string()));

        let row = self.gateway.query_one(&cypher, params).await?;
        let nodes = match row.and_then(|r| r.get("nodes").cloned()) {
            Some(PropertyValue::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    PropertyValue::Map(m) => Some(record_to_ci(m)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Topology { nodes })
    }

    /// CIs reachable upstream/downstream/both from `id`, with hop
    /// distance (spec §6 "Impact").
    pub async fn impact(&self, id: &str, direction: ImpactDirection, depth: usize) -> Result<Vec<ImpactedCi>> {
        let depth = depth.min(10);
        let pattern = match direction {
            ImpactDirection::Upstream => format!("(c:CI {{id: $id}})<-[*1..{depth}]-(n:CI)"),
            ImpactDirection::Downstream => format!("(c:CI {{id: $id}})-[*1..{depth}]->(n:CI)"),
            ImpactDirection::Both => format!("(c:CI {{id: $id}})-[*1..{depth}]-(n:CI)"),
        };

        let cypher = format!(
            "MATCH path = {pattern} RETURN DISTINCT n.id AS id, n.name AS name, min(length(path)) AS hopDistance"
        );
        let mut params = HashMap::new();
        params.insert("id".to_string(), PropertyValue::String(id.to_string()));

        let rows = self.gateway.query(&cypher, params).await?;
        Ok(rows
            .into_iter()
            .map(|r| ImpactedCi {
                id: r.get("id").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                name: r.get("name").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                hop_distance: r.get("hopDistance").and_then(PropertyValue::as_i64).unwrap_or(0),
            })
            .collect())
    }

    /// Paginated search with relationship counts (spec §6 "Browse").
    /// `limit` capped at 500.
    pub async fn browse(&self, params: BrowseParams) -> Result<BrowsePage> {
        let limit = params.limit.min(500);
        let offset = params.page.saturating_sub(1) * limit;
        let sort_field = match params.sort.as_deref() {
            Some("type") => "type",
            Some("status") => "status",
            Some("updatedAt") => "updatedAt",
            Some("createdAt") => "createdAt",
            _ => "name",
        };
        let order = if params.order.as_deref() == Some("desc") { "DESC" } else { "ASC" };

        let mut where_clauses = Vec::new();
        let mut query_params = HashMap::new();
        if let Some(search) = &params.search {
            where_clauses.push("toLower(c.name) CONTAINS toLower($search)".to_string());
            query_params.insert("search".to_string(), PropertyValue::String(search.clone()));
        }
        if let Some(ci_type) = &params.ci_type {
            where_clauses.push("c.type = $type".to_string());
            query_params.insert("type".to_string(), PropertyValue::String(ci_type.clone()));
        }
        let where_clause = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let cypher = format!(
            "MATCH (c:CI) {where_clause} \
             OPTIONAL MATCH (c)-[rel]-() \
             WITH c, count(rel) AS relationshipCount \
             RETURN c, relationshipCount \
             ORDER BY c.{sort_field} {order} \
             SKIP $offset LIMIT $limit"
        );
        query_params.insert("offset".to_string(), PropertyValue::Integer(offset as i64));
        query_params.insert("limit".to_string(), PropertyValue::Integer(limit as i64));

        let rows = self.gateway.query(&cypher, query_params).await?;
        let items = rows
            .iter()
            .map(|r| BrowseItem {
                item: record_to_ci(r),
                relationship_count: r.get("relationshipCount").and_then(PropertyValue::as_i64).unwrap_or(0) as u64,
            })
            .collect();

        Ok(BrowsePage { items, page: params.page, limit })
    }

    /// Aggregate counts of CIs by type/status/criticality and edges by
    /// type (`SPEC_FULL.md` §B "Database stats").
    pub async fn database_stats(&self) -> Result<DatabaseStats> {
        let ci_cypher = "MATCH (c:CI) RETURN c.type AS type, c.status AS status, c.criticality AS criticality";
        let ci_rows = self.gateway.query(ci_cypher, HashMap::new()).await?;

        let mut by_type = HashMap::new();
        let mut by_status = HashMap::new();
        let mut by_criticality = HashMap::new();
        for row in &ci_rows {
            *by_type.entry(field(row, "type")).or_insert(0u64) += 1;
            *by_status.entry(field(row, "status")).or_insert(0u64) += 1;
            *by_criticality.entry(field(row, "criticality")).or_insert(0u64) += 1;
        }

        let edge_cypher = "MATCH ()-[r]->() RETURN type(r) AS type, count(r) AS total";
        let edge_rows = self.gateway.query(edge_cypher, HashMap::new()).await?;
        let edges_by_type = edge_rows
            .into_iter()
            .map(|r| {
                (
                    r.get("type").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                    r.get("total").and_then(PropertyValue::as_i64).unwrap_or(0) as u64,
                )
            })
            .collect();

        Ok(DatabaseStats {
            total_cis: ci_rows.len() as u64,
            cis_by_type: by_type,
            cis_by_status: by_status,
            cis_by_criticality: by_criticality,
            edges_by_type,
        })
    }

    /// Destructive: deletes every node (spec §6 "Clear").
    pub async fn clear(&self) -> Result<()> {
        self.gateway.query("MATCH (n) DETACH DELETE n", HashMap::new()).await?;
        Ok(())
    }
}

fn field(row: &HashMap<String, PropertyValue>, key: &str) -> String {
    row.get(key).and_then(PropertyValue::as_str).unwrap_or("unknown").to_string()
}

fn counts_by_type(value: Option<&PropertyValue>) -> HashMap<String, u64> {
    match value {
        Some(PropertyValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                PropertyValue::Map(m) => {
                    let ty = m.get("type").and_then(PropertyValue::as_str)?;
                    if ty.is_empty() {
                        return None;
                    }
                    let count = m.get("count").and_then(PropertyValue::as_i64).unwrap_or(0) as u64;
                    Some((ty.to_string(), count))
                }
                _ => None,
            })
            .collect(),
        _ => HashMap::new(),
    }
}

/// Fields already surfaced as typed struct members; excluded from the
/// flattened open property bag so serialization never emits duplicate
/// JSON keys (spec §3 CI fields vs. "open property bag").
const CI_TYPED_FIELDS: &[&str] = &["id", "name", "type", "status", "criticality", "createdAt", "updatedAt", "__id", "__labels"];

fn record_to_ci(record: &HashMap<String, PropertyValue>) -> ConfigurationItem {
    let props = match record.get("c") {
        Some(PropertyValue::Map(m)) => m.clone(),
        _ => record.clone(),
    };

    let open_properties = props
        .iter()
        .filter(|(k, _)| !CI_TYPED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    ConfigurationItem {
        id: props.get("id").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        name: props.get("name").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        ci_type: props.get("type").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        status: props.get("status").and_then(PropertyValue::as_str).unwrap_or("OPERATIONAL").to_string(),
        criticality: props.get("criticality").and_then(PropertyValue::as_str).unwrap_or("MEDIUM").to_string(),
        created_at: props.get("createdAt").and_then(PropertyValue::as_i64).unwrap_or(0),
        updated_at: props.get("updatedAt").and_then(PropertyValue::as_i64).unwrap_or(0),
        properties: open_properties,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactDirection {
    Upstream,
    Downstream,
    Both,
}

impl ImpactDirection {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("upstream") => ImpactDirection::Upstream,
            Some("downstream") => ImpactDirection::Downstream,
            _ => ImpactDirection::Both,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub nodes: Vec<ConfigurationItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactedCi {
    pub id: String,
    pub name: String,
    pub hop_distance: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseParams {
    pub search: Option<String>,
    pub ci_type: Option<String>,
    pub page: usize,
    pub limit: usize,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowseItem {
    pub item: ConfigurationItem,
    pub relationship_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowsePage {
    pub items: Vec<BrowseItem>,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_cis: u64,
    pub cis_by_type: HashMap<String, u64>,
    pub cis_by_status: HashMap<String, u64>,
    pub cis_by_criticality: HashMap<String, u64>,
    pub edges_by_type: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_direction_parses_known_values_and_defaults_to_both() {
        assert_eq!(ImpactDirection::parse(Some("upstream")), ImpactDirection::Upstream);
        assert_eq!(ImpactDirection::parse(Some("downstream")), ImpactDirection::Downstream);
        assert_eq!(ImpactDirection::parse(Some("sideways")), ImpactDirection::Both);
        assert_eq!(ImpactDirection::parse(None), ImpactDirection::Both);
    }

    #[test]
    fn record_to_ci_falls_back_to_defaults_for_missing_fields() {
        let mut record = HashMap::new();
        record.insert("c".to_string(), PropertyValue::Map(HashMap::from([
            ("id".to_string(), PropertyValue::String("ci-1".to_string())),
            ("name".to_string(), PropertyValue::String("web-1".to_string())),
        ])));
        let ci = record_to_ci(&record);
        assert_eq!(ci.id, "ci-1");
        assert_eq!(ci.status, "OPERATIONAL");
        assert_eq!(ci.criticality, "MEDIUM");
    }
}
