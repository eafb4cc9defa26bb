//! # Temporal Relationship Service (C4) — the hardest subsystem
//!
//! Append-only versioning of relationships: every `create` archives the
//! prior active version rather than overwriting it, giving "time-travel"
//! topology queries, a full history, a weight-history trend, a scaling
//! event adaptor, and an expiry scan (spec §4.4).
//!
//! Versioned create must serialize per `(from, to, type)` tuple (spec
//! §4.4.1 concurrency note); this is enforced with an in-process
//! per-tuple async mutex, since the graph store itself is treated as an
//! external collaborator with no transaction API surfaced to this core
//! (spec §1 Non-goals).

use super::WeightHistoryEntry;
use crate::common::{now_millis, EdgeId, PropertyValue, Timestamp};
use crate::error::{CmdbError, Result};
use crate::gateway::{validate_relationship_type, GraphGateway};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// A single temporal edge version (spec §3, §4.4.1/.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipVersion {
    pub id: EdgeId,
    pub from: String,
    pub to: String,
    pub rel_type: String,
    pub version: i64,
    pub previous_version: i64,
    pub status: VersionStatus,
    pub valid_from: Timestamp,
    pub valid_to: Option<Timestamp>,
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
    pub created_by: String,
    pub modified_by: String,
    pub change_reason: Option<String>,
    pub properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStatus {
    Active,
    Archived,
}

/// Input to [`TemporalRelationshipService::create`] (spec §4.4.1).
#[derive(Debug, Clone, Default)]
pub struct VersionedCreateInput {
    pub properties: HashMap<String, PropertyValue>,
    pub valid_from: Option<Timestamp>,
    pub valid_to: Option<Timestamp>,
    pub created_by: String,
    pub change_reason: Option<String>,
}

pub struct TemporalRelationshipService {
    gateway: Arc<GraphGateway>,
    /// Per-`(from,to,type)` serialization lock (spec §4.4.1 "must not both
    /// produce `version=prev+1`").
    tuple_locks: DashMap<(String, String, String), Arc<AsyncMutex<()>>>,
}

impl TemporalRelationshipService {
    pub fn new(gateway: Arc<GraphGateway>) -> Self {
        Self {
            gateway,
            tuple_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, from: &str, to: &str, rel_type: &str) -> Arc<AsyncMutex<()>> {
        let key = (from.to_string(), to.to_string(), rel_type.to_string());
        self.tuple_locks
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Archive the current active version (if any) and create the next
    /// one. Fails with `CINotFound` if either endpoint is missing (spec
    /// §4.4.1).
    ///
    /// `valid_from` precedence: a caller-supplied value always wins;
    /// only an absent value defaults to `now` (see `SPEC_FULL.md` §C.2).
    pub async fn create(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
        input: VersionedCreateInput,
    ) -> Result<RelationshipVersion> {
        validate_relationship_type(rel_type)?;

        let lock = self.lock_for(from, to, rel_type);
        let _guard = lock.lock().await;

        self.assert_cis_exist(from, to).await?;

        let now = now_millis();
        let valid_from = input.valid_from.unwrap_or(now);

        let current = self.active_version(from, to, rel_type).await?;
        let prev = if let Some(current) = &current {
            self.archive(&current.id, now).await?;
            current.version
        } else {
            0
        };

        let version = prev + 1;
        let cypher = format!(
            "MATCH (a:CI {{id: $from}}), (b:CI {{id: $to}}) \
             CREATE (a)-[r:{rel_type} {{ \
                version: $version, previousVersion: $prevVersion, status: 'ACTIVE', \
                validFrom: $validFrom, validTo: $validTo, \
                createdAt: $now, lastModified: $now, \
                createdBy: $createdBy, modifiedBy: $createdBy, \
                changeReason: $changeReason \
             }}]->(b) \
             SET r += $props \
             RETURN toString(id(r)) AS edgeId"
        );

        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));
        params.insert("version".to_string(), PropertyValue::Integer(version));
        params.insert("prevVersion".to_string(), PropertyValue::Integer(prev));
        params.insert("validFrom".to_string(), PropertyValue::Integer(valid_from));
        params.insert(
            "validTo".to_string(),
            input.valid_to.map(PropertyValue::Integer).unwrap_or(PropertyValue::Null),
        );
        params.insert("now".to_string(), PropertyValue::Integer(now));
        params.insert("createdBy".to_string(), PropertyValue::String(input.created_by.clone()));
        params.insert(
            "changeReason".to_string(),
            input
                .change_reason
                .clone()
                .map(PropertyValue::String)
                .unwrap_or(PropertyValue::Null),
        );
        params.insert("props".to_string(), PropertyValue::Map(input.properties.clone()));

        let row = self.gateway.query_one(&cypher, params).await?;
        let id = row
            .and_then(|r| r.get("edgeId").and_then(PropertyValue::as_str).map(String::from))
            .unwrap_or_default();

        Ok(RelationshipVersion {
            id,
            from: from.to_string(),
            to: to.to_string(),
            rel_type: rel_type.to_string(),
            version,
            previous_version: prev,
            status: VersionStatus::Active,
            valid_from,
            valid_to: input.valid_to,
            created_at: now,
            last_modified: now,
            created_by: input.created_by.clone(),
            modified_by: input.created_by,
            change_reason: input.change_reason,
            properties: input.properties,
        })
    }

    async fn active_version(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
    ) -> Result<Option<RelationshipVersion>> {
        let cypher = format!(
            "MATCH (a:CI {{id: $from}})-[r:{rel_type}]->(b:CI {{id: $to}}) \
             WHERE r.status = 'ACTIVE' AND (r.validTo IS NULL OR r.validTo >= $now) \
             RETURN r, r.__id AS edgeId"
        );
        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));
        params.insert("now".to_string(), PropertyValue::Integer(now_millis()));

        let row = self.gateway.query_one(&cypher, params).await?;
        Ok(row.map(|r| record_to_version(from, to, rel_type, &r)))
    }

    async fn archive(&self, edge_id: &str, now: Timestamp) -> Result<()> {
        let cypher = "MATCH ()-[r]->() WHERE r.__id = $edgeId OR toString(id(r)) = $edgeId \
             SET r.status = 'ARCHIVED', r.validTo = $now";
        let mut params = HashMap::new();
        params.insert("edgeId".to_string(), PropertyValue::String(edge_id.to_string()));
        params.insert("now".to_string(), PropertyValue::Integer(now));
        self.gateway.query(cypher, params).await?;
        Ok(())
    }

    /// Every edge in force at `target_date`, optionally restricted to a
    /// reachable subgraph from `start` within `max_depth` hops along
    /// edges all valid at that instant (spec §4.4.2).
    pub async fn time_travel_topology(
        &self,
        target_date: Timestamp,
        start: Option<&str>,
        max_depth: Option<usize>,
        rel_type: Option<&str>,
    ) -> Result<TimeTravelTopology> {
        let max_depth = max_depth.unwrap_or(3);
        let type_filter = match rel_type {
            Some(t) => {
                validate_relationship_type(t)?;
                format!(":{t}")
            }
            None => String::new(),
        };

        let cypher = if start.is_some() {
            format!(
                "MATCH path = (s:CI {{id: $start}})-[r{type_filter}*1..{max_depth}]->(n:CI) \
                 WHERE ALL(rel IN relationships(path) WHERE \
                    rel.validFrom <= $target AND (rel.validTo IS NULL OR rel.validTo >= $target) \
                    AND rel.status IN ['ACTIVE', 'ARCHIVED']) \
                 RETURN [x IN nodes(path) | x.id] AS nodeIds, \
                        [rel IN relationships(path) | {{id: toString(id(rel)), type: type(rel), from: startNode(rel).id, to: endNode(rel).id}}] AS edges"
            )
        } else {
            format!(
                "MATCH (a:CI)-[r{type_filter}]->(b:CI) \
                 WHERE r.validFrom <= $target AND (r.validTo IS NULL OR r.validTo >= $target) \
                    AND r.status IN ['ACTIVE', 'ARCHIVED'] \
                 RETURN a.id AS fromId, b.id AS toId, toString(id(r)) AS edgeId, type(r) AS relType"
            )
        };

        let mut params = HashMap::new();
        params.insert("target".to_string(), PropertyValue::Integer(target_date));
        if let Some(start_id) = start {
            params.insert("start".to_string(), PropertyValue::String(start_id.to_string()));
        }

        let rows = self.gateway.query(&cypher, params).await?;

        let mut nodes: Vec<String> = Vec::new();
        let mut seen_nodes = std::collections::HashSet::new();
        let mut edges: Vec<super::PathEdge> = Vec::new();
        let mut seen_edges = std::collections::HashSet::new();

        if start.is_some() {
            for row in &rows {
                if let Some(PropertyValue::Array(ids)) = row.get("nodeIds") {
                    for id in ids {
                        if let Some(s) = id.as_str() {
                            if seen_nodes.insert(s.to_string()) {
                                nodes.push(s.to_string());
                            }
                        }
                    }
                }
                if let Some(PropertyValue::Array(items)) = row.get("edges") {
                    for item in items {
                        if let PropertyValue::Map(m) = item {
                            let edge_key = m.get("id").and_then(PropertyValue::as_str).unwrap_or_default().to_string();
                            if seen_edges.insert(edge_key) {
                                edges.push(super::PathEdge {
                                    from: m.get("from").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                                    to: m.get("to").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                                    rel_type: m.get("type").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                                    weight: 0.0,
                                });
                            }
                        }
                    }
                }
            }
        } else {
            for row in &rows {
                let from_id = row.get("fromId").and_then(PropertyValue::as_str).unwrap_or_default().to_string();
                let to_id = row.get("toId").and_then(PropertyValue::as_str).unwrap_or_default().to_string();
                let edge_id = row.get("edgeId").and_then(PropertyValue::as_str).unwrap_or_default().to_string();
                let rel_type = row.get("relType").and_then(PropertyValue::as_str).unwrap_or_default().to_string();

                if seen_nodes.insert(from_id.clone()) {
                    nodes.push(from_id.clone());
                }
                if seen_nodes.insert(to_id.clone()) {
                    nodes.push(to_id.clone());
                }
                if seen_edges.insert(edge_id) {
                    edges.push(super::PathEdge { from: from_id, to: to_id, rel_type, weight: 0.0 });
                }
            }
        }

        Ok(TimeTravelTopology { nodes, edges })
    }

    /// Every version (ACTIVE + ARCHIVED) of `(from,to,type)`, newest
    /// first (spec §4.4.3).
    pub async fn history(&self, from: &str, to: &str, rel_type: &str) -> Result<Vec<RelationshipVersion>> {
        validate_relationship_type(rel_type)?;
        let cypher = format!(
            "MATCH (a:CI {{id: $from}})-[r:{rel_type}]->(b:CI {{id: $to}}) \
             RETURN r, r.__id AS edgeId \
             ORDER BY r.version DESC"
        );
        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));

        let rows = self.gateway.query(&cypher, params).await?;
        Ok(rows.iter().map(|r| record_to_version(from, to, rel_type, r)).collect())
    }

    /// Append a weight-history entry and update current weight fields;
    /// `None` fields leave the existing value unchanged (spec §4.4.4).
    pub async fn update_with_history(
        &self,
        edge_id: &str,
        weight: Option<f64>,
        criticality_score: Option<f64>,
        load_factor: Option<f64>,
        source: &str,
        modified_by: &str,
    ) -> Result<()> {
        let now = now_millis();
        let entry = WeightHistoryEntry {
            timestamp: now,
            weight,
            criticality_score,
            load_factor,
            source: source.to_string(),
        };

        let cypher = "MATCH ()-[r]->() WHERE r.__id = $edgeId OR toString(id(r)) = $edgeId \
             SET r.weight = coalesce($weight, r.weight), \
                 r.criticalityScore = coalesce($criticalityScore, r.criticalityScore), \
                 r.loadFactor = coalesce($loadFactor, r.loadFactor), \
                 r.lastModified = $now, r.modifiedBy = $modifiedBy, \
                 r.weightHistory = coalesce(r.weightHistory, []) + [$entry] \
             RETURN r.__id AS edgeId";

        let mut params = HashMap::new();
        params.insert("edgeId".to_string(), PropertyValue::String(edge_id.to_string()));
        params.insert("weight".to_string(), weight.map(PropertyValue::Float).unwrap_or(PropertyValue::Null));
        params.insert(
            "criticalityScore".to_string(),
            criticality_score.map(PropertyValue::Float).unwrap_or(PropertyValue::Null),
        );
        params.insert(
            "loadFactor".to_string(),
            load_factor.map(PropertyValue::Float).unwrap_or(PropertyValue::Null),
        );
        params.insert("now".to_string(), PropertyValue::Integer(now));
        params.insert("modifiedBy".to_string(), PropertyValue::String(modified_by.to_string()));
        params.insert("entry".to_string(), PropertyValue::Map(weight_history_entry_to_map(&entry)));

        let row = self.gateway.query_one(cypher, params).await?;
        if row.is_none() {
            return Err(CmdbError::RelationshipNotFound(edge_id.to_string()));
        }
        Ok(())
    }

    /// Current weight fields plus statistics over `weightHistory.weight`
    /// (spec §4.4.4).
    pub async fn weight_trend(&self, from: &str, to: &str, rel_type: &str) -> Result<WeightTrend> {
        validate_relationship_type(rel_type)?;
        let cypher = format!(
            "MATCH (a:CI {{id: $from}})-[r:{rel_type}]->(b:CI {{id: $to}}) \
             WHERE r.status = 'ACTIVE' \
             RETURN r.weight AS weight, r.criticalityScore AS criticalityScore, \
                    r.loadFactor AS loadFactor, coalesce(r.weightHistory, []) AS history"
        );
        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));

        let row = self.gateway.query_one(&cypher, params).await?;
        let Some(row) = row else {
            return Ok(WeightTrend::not_found());
        };

        let history: Vec<f64> = match row.get("history") {
            Some(PropertyValue::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    PropertyValue::Map(m) => m.get("weight").and_then(PropertyValue::as_f64),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        if history.is_empty() {
            return Ok(WeightTrend::not_found());
        }

        let average = history.iter().sum::<f64>() / history.len() as f64;
        let minimum = history.iter().cloned().fold(f64::INFINITY, f64::min);
        let maximum = history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let window_len = history.len().min(5);
        let window = &history[history.len() - window_len..];
        let trend = if window.last().unwrap() > window.first().unwrap() {
            "increasing"
        } else if window.last().unwrap() < window.first().unwrap() {
            "decreasing"
        } else {
            "stable"
        };

        Ok(WeightTrend {
            found: true,
            weight: row.get("weight").and_then(PropertyValue::as_f64),
            criticality_score: row.get("criticalityScore").and_then(PropertyValue::as_f64),
            load_factor: row.get("loadFactor").and_then(PropertyValue::as_f64),
            average: Some(average),
            minimum: Some(minimum),
            maximum: Some(maximum),
            data_points: Some(history.len()),
            trend: Some(trend.to_string()),
        })
    }

    /// For each `ACTIVE` `DEPENDS_ON`/`SCALES_TO` edge of `ci_id` with an
    /// `activationCondition`, compute a new load factor and append it via
    /// [`Self::update_with_history`] (spec §4.4.5).
    pub async fn apply_scaling_event(
        &self,
        ci_id: &str,
        current_load: f64,
        scaling_action: ScalingAction,
    ) -> Result<usize> {
        let cypher = "MATCH (c:CI {id: $ciId})-[r]-(:CI) \
             WHERE r.status = 'ACTIVE' AND type(r) IN ['DEPENDS_ON', 'SCALES_TO'] \
                AND r.activationCondition IS NOT NULL \
             RETURN toString(id(r)) AS edgeId, r.activationCondition AS condition, coalesce(r.loadFactor, 0.0) AS loadFactor";
        let mut params = HashMap::new();
        params.insert("ciId".to_string(), PropertyValue::String(ci_id.to_string()));

        let rows = self.gateway.query(cypher, params).await?;
        let mut updated = 0usize;

        for row in rows {
            let threshold = match row.get("condition") {
                Some(PropertyValue::Map(m)) => m.get("threshold").and_then(PropertyValue::as_f64).unwrap_or(0.8),
                _ => 0.8,
            };
            let old_load = row.get("loadFactor").and_then(PropertyValue::as_f64).unwrap_or(0.0);
            let edge_id = row.get("edgeId").and_then(PropertyValue::as_str).unwrap_or_default().to_string();

            let new_load = match scaling_action {
                ScalingAction::ScaleUp if current_load >= threshold * 100.0 => Some((old_load * 1.2).min(100.0)),
                ScalingAction::ScaleDown if current_load < threshold * 100.0 => Some((old_load * 0.8).max(0.0)),
                _ => None,
            };

            if let Some(new_load) = new_load {
                self.update_with_history(&edge_id, None, None, Some(new_load), "auto-scaling", "scaling-service").await?;
                updated += 1;
            }
        }

        Ok(updated)
    }

    /// `ACTIVE` edges whose `validTo` falls in `(now, now+days_ahead]`,
    /// ascending by `validTo` (spec §4.4.6). `days_ahead` must be in
    /// `[1,365]`.
    pub async fn expiry_scan(&self, days_ahead: u32) -> Result<Vec<ExpiringEdge>> {
        if !(1..=365).contains(&days_ahead) {
            return Err(CmdbError::ValidationFailure(format!(
                "daysAhead must be in [1,365], got {days_ahead}"
            )));
        }

        let now = now_millis();
        let horizon = now + (days_ahead as i64) * 86_400_000;

        let cypher = "MATCH (a:CI)-[r]->(b:CI) \
             WHERE r.status = 'ACTIVE' AND r.validTo > $now AND r.validTo <= $horizon \
             RETURN a.id AS fromId, b.id AS toId, type(r) AS relType, r.validTo AS validTo \
             ORDER BY r.validTo ASC";

        let mut params = HashMap::new();
        params.insert("now".to_string(), PropertyValue::Integer(now));
        params.insert("horizon".to_string(), PropertyValue::Integer(horizon));

        let rows = self.gateway.query(cypher, params).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let valid_to = r.get("validTo").and_then(PropertyValue::as_i64).unwrap_or(now);
                ExpiringEdge {
                    from: r.get("fromId").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                    to: r.get("toId").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                    rel_type: r.get("relType").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                    valid_to,
                    days_until_expiry: ((valid_to - now) as f64 / 86_400_000.0).ceil() as i64,
                }
            })
            .collect())
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAction {
    ScaleUp,
    ScaleDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeTravelTopology {
    pub nodes: Vec<String>,
    pub edges: Vec<super::PathEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiringEdge {
    pub from: String,
    pub to: String,
    pub rel_type: String,
    pub valid_to: Timestamp,
    pub days_until_expiry: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightTrend {
    pub found: bool,
    pub weight: Option<f64>,
    pub criticality_score: Option<f64>,
    pub load_factor: Option<f64>,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub data_points: Option<usize>,
    pub trend: Option<String>,
}

impl WeightTrend {
    fn not_found() -> Self {
        Self {
            found: false,
            weight: None,
            criticality_score: None,
            load_factor: None,
            average: None,
            minimum: None,
            maximum: None,
            data_points: None,
            trend: None,
        }
    }
}

fn weight_history_entry_to_map(entry: &WeightHistoryEntry) -> HashMap<String, PropertyValue> {
    let mut m = HashMap::new();
    m.insert("timestamp".to_string(), PropertyValue::Integer(entry.timestamp));
    m.insert(
        "weight".to_string(),
        entry.weight.map(PropertyValue::Float).unwrap_or(PropertyValue::Null),
    );
    m.insert(
        "criticalityScore".to_string(),
        entry.criticality_score.map(PropertyValue::Float).unwrap_or(PropertyValue::Null),
    );
    m.insert(
        "loadFactor".to_string(),
        entry.load_factor.map(PropertyValue::Float).unwrap_or(PropertyValue::Null),
    );
    m.insert("source".to_string(), PropertyValue::String(entry.source.clone()));
    m
}

fn record_to_version(
    from: &str,
    to: &str,
    rel_type: &str,
    record: &HashMap<String, PropertyValue>,
) -> RelationshipVersion {
    let props = match record.get("r") {
        Some(PropertyValue::Map(m)) => m.clone(),
        _ => HashMap::new(),
    };
    let id = record
        .get("edgeId")
        .and_then(PropertyValue::as_i64)
        .map(|i| i.to_string())
        .or_else(|| props.get("__id").and_then(PropertyValue::as_i64).map(|i| i.to_string()))
        .unwrap_or_default();

    RelationshipVersion {
        id,
        from: from.to_string(),
        to: to.to_string(),
        rel_type: rel_type.to_string(),
        version: props.get("version").and_then(PropertyValue::as_i64).unwrap_or(0),
        previous_version: props.get("previousVersion").and_then(PropertyValue::as_i64).unwrap_or(0),
        status: match props.get("status").and_then(PropertyValue::as_str) {
            Some("ARCHIVED") => VersionStatus::Archived,
            _ => VersionStatus::Active,
        },
        valid_from: props.get("validFrom").and_then(PropertyValue::as_i64).unwrap_or(0),
        valid_to: props.get("validTo").and_then(PropertyValue::as_i64),
        created_at: props.get("createdAt").and_then(PropertyValue::as_i64).unwrap_or(0),
        last_modified: props.get("lastModified").and_then(PropertyValue::as_i64).unwrap_or(0),
        created_by: props.get("createdBy").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        modified_by: props.get("modifiedBy").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        change_reason: props.get("changeReason").and_then(PropertyValue::as_str).map(String::from),
        properties: props,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_trend_window_uses_at_most_five_samples() {
        let history = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let window_len = history.len().min(5);
        let window = &history[history.len() - window_len..];
        assert_eq!(window, &[3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(window.last().unwrap() > window.first().unwrap());
    }

    #[test]
    fn expiry_scan_rejects_out_of_range_days_ahead() {
        assert!(!(1..=365).contains(&0u32));
        assert!(!(1..=365).contains(&366u32));
        assert!((1..=365).contains(&365u32));
    }

    #[test]
    fn not_found_trend_has_no_statistics() {
        let trend = WeightTrend::not_found();
        assert!(!trend.found);
        assert!(trend.average.is_none());
    }
}
