//! # Weighted Relationship Service (C3)
//!
//! Persists and retrieves weighted edges; shortest/all-paths over weighted
//! edges; criticality ranking; auto-calculation of weights from endpoint
//! criticality (spec §4.3).

use super::{PathEdge, PathResult, WeightProperties};
use crate::common::{now_millis, PropertyValue};
use crate::error::{CmdbError, Result};
use crate::gateway::{validate_relationship_type, GraphGateway, TRAVERSAL_ALLOWLIST};
use crate::weight::{criticality_score, criticality_to_score, CriticalityInputs};
use std::collections::HashMap;
use std::sync::Arc;

pub struct WeightedRelationshipService {
    gateway: Arc<GraphGateway>,
}

impl WeightedRelationshipService {
    pub fn new(gateway: Arc<GraphGateway>) -> Self {
        Self { gateway }
    }

    /// Merge an edge of `rel_type` between `from` and `to`, setting every
    /// weight-related property plus `lastUpdated`. Fails with `CINotFound`
    /// if either endpoint is missing (spec §4.3 "Create/upsert").
    pub async fn upsert(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
        properties: WeightProperties,
    ) -> Result<()> {
        validate_relationship_type(rel_type)?;
        self.assert_cis_exist(from, to).await?;

        let cypher = format!(
            "MATCH (a:CI {{id: $from}}), (b:CI {{id: $to}}) \
             MERGE (a)-[r:{rel_type}]->(b) \
             SET r += $props \
             RETURN r"
        );

        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));
        params.insert(
            "props".to_string(),
            PropertyValue::Map(properties.to_params()),
        );

        self.gateway.query(&cypher, params).await?;
        Ok(())
    }

    /// Fetch the weight property bag for one `(from, to, type)` triple;
    /// `None` if no such edge exists (spec §4.3 "Fetch").
    pub async fn get(&self, from: &str, to: &str, rel_type: &str) -> Result<Option<WeightProperties>> {
        validate_relationship_type(rel_type)?;

        let cypher = format!(
            "MATCH (a:CI {{id: $from}})-[r:{rel_type}]->(b:CI {{id: $to}}) RETURN r"
        );
        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));

        let row = self.gateway.query_one(&cypher, params).await?;
        Ok(row.and_then(|r| r.get("r").map(|v| match v {
            PropertyValue::Map(m) => WeightProperties::from_record(m),
            _ => WeightProperties::default(),
        })))
    }

    /// One shortest path by hop count from `start` to `end`, plus the sum
    /// of `weight_property` along its edges. Bounded by `max_depth`
    /// (default 10) (spec §4.3 "Shortest weighted path").
    pub async fn shortest_weighted_path(
        &self,
        start: &str,
        end: &str,
        weight_property: &str,
        max_depth: Option<usize>,
    ) -> Result<Option<PathResult>> {
        let max_depth = max_depth.unwrap_or(10);
        let rel_types = TRAVERSAL_ALLOWLIST.join("|");

        let cypher = format!(
            "MATCH p = shortestPath((a:CI {{id: $start}})-[:{rel_types}*1..{max_depth}]->(b:CI {{id: $end}})) \
             RETURN [n in nodes(p) | n.id] AS nodeIds, \
                    [r in relationships(p) | {{type: type(r), from: startNode(r).id, to: endNode(r).id, weight: coalesce(r.{weight_property}, 0.0)}}] AS edges"
        );

        let mut params = HashMap::new();
        params.insert("start".to_string(), PropertyValue::String(start.to_string()));
        params.insert("end".to_string(), PropertyValue::String(end.to_string()));

        let row = self.gateway.query_one(&cypher, params).await?;
        Ok(row.map(|r| record_to_path(&r)))
    }

    /// Up to `limit` paths up to `max_depth` edges, ordered by descending
    /// total weight, ties broken by ascending hop count. Only edge types
    /// in [`TRAVERSAL_ALLOWLIST`] are followed (spec §4.3 "All weighted
    /// paths").
    pub async fn all_weighted_paths(
        &self,
        start: &str,
        end: &str,
        weight_property: &str,
        max_depth: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<PathResult>> {
        let max_depth = max_depth.unwrap_or(10);
        let limit = limit.unwrap_or(10);
        let rel_types = TRAVERSAL_ALLOWLIST.join("|");

        let cypher = format!(
            "MATCH p = (a:CI {{id: $start}})-[:{rel_types}*1..{max_depth}]->(b:CI {{id: $end}}) \
             WITH p, reduce(total = 0.0, r in relationships(p) | total + coalesce(r.{weight_property}, 0.0)) AS totalWeight \
             RETURN [n in nodes(p) | n.id] AS nodeIds, \
                    [r in relationships(p) | {{type: type(r), from: startNode(r).id, to: endNode(r).id, weight: coalesce(r.{weight_property}, 0.0)}}] AS edges, \
                    totalWeight \
             ORDER BY totalWeight DESC, length(p) ASC \
             LIMIT {limit}"
        );

        let mut params = HashMap::new();
        params.insert("start".to_string(), PropertyValue::String(start.to_string()));
        params.insert("end".to_string(), PropertyValue::String(end.to_string()));

        let rows = self.gateway.query(&cypher, params).await?;
        Ok(rows.iter().map(record_to_path).collect())
    }

    /// Score each CI as `inboundCount*avgInboundWeight*0.6 +
    /// outboundCount*avgOutboundWeight*0.4`, return the top `limit` by
    /// descending score (spec §4.3 "Criticality ranking").
    pub async fn criticality_ranking(&self, limit: usize) -> Result<Vec<CriticalityRank>> {
        let cypher = "MATCH (c:CI) \
             OPTIONAL MATCH (c)<-[inbound]-() \
             WITH c, count(inbound) AS inboundCount, avg(coalesce(inbound.weight, 0.0)) AS avgInbound \
             OPTIONAL MATCH (c)-[outbound]->() \
             WITH c, inboundCount, coalesce(avgInbound, 0.0) AS avgInbound, count(outbound) AS outboundCount, avg(coalesce(outbound.weight, 0.0)) AS avgOutbound \
             WITH c, inboundCount, avgInbound, outboundCount, coalesce(avgOutbound, 0.0) AS avgOutbound, \
                  (toFloat(inboundCount) * coalesce(avgInbound, 0.0) * 0.6 + toFloat(outboundCount) * coalesce(avgOutbound, 0.0) * 0.4) AS score \
             RETURN c.id AS id, c.name AS name, score \
             ORDER BY score DESC \
             LIMIT $limit";

        let mut params = HashMap::new();
        params.insert("limit".to_string(), PropertyValue::Integer(limit as i64));

        let rows = self.gateway.query(cypher, params).await?;
        Ok(rows
            .into_iter()
            .map(|r| CriticalityRank {
                ci_id: r.get("id").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                name: r.get("name").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                score: r.get("score").and_then(PropertyValue::as_f64).unwrap_or(0.0),
            })
            .collect())
    }

    /// For every edge of `rel_type` where `weight` is null or
    /// `source='automated'`, recompute `criticalityScore`/`weight` from
    /// endpoint criticality, set `source='automated'`, `confidence=0.8`
    /// (spec §4.3 "Auto-calculate weights"). Returns the count updated.
    pub async fn auto_calculate_weights(&self, rel_type: &str) -> Result<usize> {
        validate_relationship_type(rel_type)?;

        let select_cypher = format!(
            "MATCH (a:CI)-[r:{rel_type}]->(b:CI) \
             WHERE r.weight IS NULL OR r.source = 'automated' \
             RETURN a.id AS fromId, b.id AS toId, a.criticality AS sourceCrit, b.criticality AS targetCrit"
        );
        let rows = self.gateway.query(&select_cypher, HashMap::new()).await?;

        let mut updated = 0usize;
        for row in rows {
            let from_id = row.get("fromId").and_then(PropertyValue::as_str).unwrap_or_default().to_string();
            let to_id = row.get("toId").and_then(PropertyValue::as_str).unwrap_or_default().to_string();
            let source_crit = row
                .get("sourceCrit")
                .and_then(PropertyValue::as_str)
                .map(criticality_to_score)
                .unwrap_or(0.5);
            let target_crit = row
                .get("targetCrit")
                .and_then(PropertyValue::as_str)
                .map(criticality_to_score)
                .unwrap_or(0.5);

            let score = criticality_score(CriticalityInputs {
                source_criticality: source_crit,
                target_criticality: target_crit,
                business_impact: 0.5,
                redundancy_level: 1.0,
                historical_failures: 0.0,
                recovery_complexity: 0.5,
            });

            let props = WeightProperties {
                weight: Some(score),
                criticality_score: Some(score),
                source: Some("automated".to_string()),
                confidence: Some(0.8),
                last_updated: Some(now_millis()),
                ..Default::default()
            };

            let update_cypher = format!(
                "MATCH (a:CI {{id: $from}})-[r:{rel_type}]->(b:CI {{id: $to}}) SET r += $props"
            );
            let mut params = HashMap::new();
            params.insert("from".to_string(), PropertyValue::String(from_id));
            params.insert("to".to_string(), PropertyValue::String(to_id));
            params.insert("props".to_string(), PropertyValue::Map(props.to_params()));
            self.gateway.query(&update_cypher, params).await?;
            updated += 1;
        }

        Ok(updated)
    }

    async fn assert_cis_exist(&self, from: &str, to: &str) -> Result<()> {
        let cypher = "MATCH (a:CI {id: $from}), (b:CI {id: $to}) RETURN a.id AS a, b.id AS b";
        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));

        match self.gateway.query_one(cypher, params).await? {
            Some(_) => Ok(()),
            None => Err(CmdbError::CINotFound(format!("{from} or {to}"))),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CriticalityRank {
    pub ci_id: String,
    pub name: String,
    pub score: f64,
}

fn record_to_path(record: &HashMap<String, PropertyValue>) -> PathResult {
    let nodes: Vec<String> = record
        .get("nodeIds")
        .and_then(|v| match v {
            PropertyValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(PropertyValue::as_str)
                    .map(String::from)
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default();

    let edges: Vec<PathEdge> = record
        .get("edges")
        .and_then(|v| match v {
            PropertyValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| match item {
                        PropertyValue::Map(m) => Some(PathEdge {
                            from: m.get("from").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                            to: m.get("to").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                            rel_type: m.get("type").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                            weight: m.get("weight").and_then(PropertyValue::as_f64).unwrap_or(0.0),
                        }),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default();

    let total_weight: f64 = record
        .get("totalWeight")
        .and_then(PropertyValue::as_f64)
        .unwrap_or_else(|| edges.iter().map(|e| e.weight).sum());
    let hop_count = edges.len();

    PathResult {
        nodes,
        edges,
        total_weight,
        hop_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_to_path_sums_weight_when_not_projected() {
        let mut record = HashMap::new();
        record.insert(
            "nodeIds".to_string(),
            PropertyValue::Array(vec![PropertyValue::String("a".into()), PropertyValue::String("b".into())]),
        );
        record.insert(
            "edges".to_string(),
            PropertyValue::Array(vec![PropertyValue::Map(HashMap::from([
                ("from".to_string(), PropertyValue::String("a".into())),
                ("to".to_string(), PropertyValue::String("b".into())),
                ("type".to_string(), PropertyValue::String("DEPENDS_ON".into())),
                ("weight".to_string(), PropertyValue::Float(0.4)),
            ]))]),
        );

        let path = record_to_path(&record);
        assert_eq!(path.hop_count, 1);
        assert_eq!(path.total_weight, 0.4);
        assert_eq!(path.nodes, vec!["a".to_string(), "b".to_string()]);
    }
}
