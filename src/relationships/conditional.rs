//! # Conditional Dependency Engine (C5)
//!
//! Relationships whose activation is gated by a runtime predicate
//! (health, load, schedule, manual), driven by a cancellable background
//! evaluator loop (spec §4.5). The conditional identifier is pinned to
//! the edge's own graph-native id (see `SPEC_FULL.md` §C.1); conditional
//! edges are not versioned, so this engine is independent of
//! [`super::temporal`].

use crate::common::{now_millis, EdgeId, PropertyValue, Timestamp};
use crate::error::{CmdbError, Result};
use crate::gateway::GraphGateway;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::time::{interval, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionalState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionType {
    HealthBased,
    LoadBased,
    Scheduled,
    Manual,
}

impl ConditionType {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "health-based" | "HEALTH_BASED" => Ok(ConditionType::HealthBased),
            "load-based" | "LOAD_BASED" => Ok(ConditionType::LoadBased),
            "scheduled" | "SCHEDULED" => Ok(ConditionType::Scheduled),
            "manual" | "MANUAL" => Ok(ConditionType::Manual),
            other => Err(CmdbError::InvalidConditionType(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::HealthBased => "health-based",
            ConditionType::LoadBased => "load-based",
            ConditionType::Scheduled => "scheduled",
            ConditionType::Manual => "manual",
        }
    }
}

/// Edge fields the evaluator reads and writes, projected out of the
/// graph gateway's generic record shape.
#[derive(Debug, Clone)]
struct ConditionalEdge {
    id: EdgeId,
    from: String,
    to: String,
    rel_type: String,
    condition_type: ConditionType,
    condition: HashMap<String, PropertyValue>,
    state: ConditionalState,
    last_activated: Option<Timestamp>,
    last_deactivated: Option<Timestamp>,
    activation_count: i64,
    source_status: Option<String>,
    target_status: Option<String>,
    source_load: Option<f64>,
}

/// Per-wake aggregate stats emitted as `evaluation-complete` (spec
/// §4.5.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub activated: usize,
    pub deactivated: usize,
    pub unchanged: usize,
    pub errors: Vec<String>,
}

/// Emitted on the in-process bus for every state transition and every
/// completed wake (spec §4.5.1, §4.5.2, §4.5.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConditionalEvent {
    /// Emitted on every activation, regardless of condition type or
    /// whether it came from the evaluator or an explicit API call
    /// (spec §4.5.1 "Every transition ... emits an event").
    Activated { edge_id: EdgeId, from: String, to: String, rel_type: String, reason: String },
    /// Emitted on every deactivation, same coverage as `Activated`.
    Deactivated { edge_id: EdgeId, from: String, to: String, rel_type: String, reason: String },
    FailoverActivated { source: String, target: String, reason: String, rpo: Option<f64>, rto: Option<f64> },
    FailoverDeactivated { source: String, target: String, reason: String, rpo: Option<f64>, rto: Option<f64> },
    EvaluationComplete(EvaluationSummary),
}

pub struct ConditionalDependencyEngine {
    gateway: Arc<GraphGateway>,
    running: Arc<AtomicBool>,
    /// Guards re-entrancy: a new wake must not start until the previous
    /// one has returned (spec §4.5.2).
    wake_guard: Arc<AsyncMutex<()>>,
    events: broadcast::Sender<ConditionalEvent>,
}

impl ConditionalDependencyEngine {
    pub fn new(gateway: Arc<GraphGateway>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            gateway,
            running: Arc::new(AtomicBool::new(false)),
            wake_guard: Arc::new(AsyncMutex::new(())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConditionalEvent> {
        self.events.subscribe()
    }

    /// Merge a conditional edge between two CIs, failing with
    /// `CINotFound` if either endpoint is missing. Starts `INACTIVE`
    /// with `activationCount=0` (spec §4.5.1 "initial").
    pub async fn create(
        &self,
        from: &str,
        to: &str,
        rel_type: &str,
        condition_type: ConditionType,
        activation_condition: HashMap<String, PropertyValue>,
    ) -> Result<()> {
        crate::gateway::validate_relationship_type(rel_type)?;

        let exists_cypher = "MATCH (a:CI {id: $from}), (b:CI {id: $to}) RETURN a.id AS a";
        let mut exists_params = HashMap::new();
        exists_params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        exists_params.insert("to".to_string(), PropertyValue::String(to.to_string()));
        if self.gateway.query_one(exists_cypher, exists_params).await?.is_none() {
            return Err(CmdbError::CINotFound(format!("{from} or {to}")));
        }

        let condition_label = condition_type.as_str().to_string();
        let cypher = format!(
            "MATCH (a:CI {{id: $from}}), (b:CI {{id: $to}}) \
             MERGE (a)-[r:{rel_type}]->(b) \
             SET r.conditionType = $conditionType, r.activationCondition = $condition, \
                 r.isActive = coalesce(r.isActive, false), \
                 r.activationCount = coalesce(r.activationCount, 0)"
        );
        let mut params = HashMap::new();
        params.insert("from".to_string(), PropertyValue::String(from.to_string()));
        params.insert("to".to_string(), PropertyValue::String(to.to_string()));
        params.insert("conditionType".to_string(), PropertyValue::String(condition_label));
        params.insert("condition".to_string(), PropertyValue::Map(activation_condition));
        self.gateway.query(&cypher, params).await?;
        Ok(())
    }

    /// Spawn the background evaluator loop. Starting twice is a no-op
    /// that logs a warning (spec §4.5.2).
    pub fn start(self: &Arc<Self>, interval_ms: u64) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("conditional evaluator already running; start() is a no-op");
            return;
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(interval_ms));
            tracing::info!(interval_ms, "conditional evaluator started");
            loop {
                ticker.tick().await;
                if !engine.running.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = engine.evaluate_once().await {
                    tracing::warn!(error = %e, "evaluator wake failed");
                }
            }
            tracing::info!("conditional evaluator stopped");
        });
    }

    /// Request the evaluator to stop before its next wake (spec §4.5.2).
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One evaluator wake: load every conditioned edge, dispatch by
    /// type, aggregate stats, emit `evaluation-complete` (spec §4.5.2).
    pub async fn evaluate_once(&self) -> Result<EvaluationSummary> {
        let _guard = self.wake_guard.lock().await;

        let edges = self.load_conditional_edges().await?;
        let mut summary = EvaluationSummary { total: edges.len(), ..Default::default() };

        for edge in edges {
            match self.evaluate_edge(&edge).await {
                Ok(Transition::Activated) => summary.activated += 1,
                Ok(Transition::Deactivated) => summary.deactivated += 1,
                Ok(Transition::Unchanged) => summary.unchanged += 1,
                Err(e) => summary.errors.push(format!("{}: {e}", edge.id)),
            }
        }

        let _ = self.events.send(ConditionalEvent::EvaluationComplete(summary.clone()));
        Ok(summary)
    }

    async fn evaluate_edge(&self, edge: &ConditionalEdge) -> Result<Transition> {
        match edge.condition_type {
            ConditionType::HealthBased => self.evaluate_health_based(edge).await,
            ConditionType::LoadBased => self.evaluate_load_based(edge).await,
            ConditionType::Scheduled => self.evaluate_scheduled(edge).await,
            ConditionType::Manual => Ok(Transition::Unchanged),
        }
    }

    async fn evaluate_health_based(&self, edge: &ConditionalEdge) -> Result<Transition> {
        let primary_health = edge.condition.get("primaryHealth").and_then(PropertyValue::as_str).unwrap_or("DOWN");

        if edge.state == ConditionalState::Inactive
            && edge.source_status.as_deref() == Some(primary_health)
            && edge.target_status.as_deref() == Some("OPERATIONAL")
        {
            let reason = format!("Health-based failover: {primary_health}");
            self.activate(edge, &reason).await?;
            let (rpo, rto) = (
                edge.condition.get("rpo").and_then(PropertyValue::as_f64),
                edge.condition.get("rto").and_then(PropertyValue::as_f64),
            );
            let _ = self.events.send(ConditionalEvent::FailoverActivated {
                source: edge.from.clone(),
                target: edge.to.clone(),
                reason,
                rpo,
                rto,
            });
            return Ok(Transition::Activated);
        }

        if edge.state == ConditionalState::Active && edge.source_status.as_deref() == Some("OPERATIONAL") {
            let reason = "Primary recovered".to_string();
            self.deactivate(edge, &reason).await?;
            let (rpo, rto) = (
                edge.condition.get("rpo").and_then(PropertyValue::as_f64),
                edge.condition.get("rto").and_then(PropertyValue::as_f64),
            );
            let _ = self.events.send(ConditionalEvent::FailoverDeactivated {
                source: edge.from.clone(),
                target: edge.to.clone(),
                reason,
                rpo,
                rto,
            });
            return Ok(Transition::Deactivated);
        }

        Ok(Transition::Unchanged)
    }

    async fn evaluate_load_based(&self, edge: &ConditionalEdge) -> Result<Transition> {
        let threshold = edge.condition.get("threshold").and_then(PropertyValue::as_f64).unwrap_or(80.0);
        let cooldown_secs = edge.condition.get("cooldownPeriod").and_then(PropertyValue::as_f64).unwrap_or(0.0);
        let load = edge.source_load.unwrap_or(0.0);

        if edge.state == ConditionalState::Inactive && load >= threshold {
            let cooldown_elapsed = match edge.last_deactivated {
                Some(last) => (now_millis() - last) as f64 / 1000.0 >= cooldown_secs,
                None => true,
            };
            if cooldown_elapsed {
                self.activate(edge, "Load-based activation").await?;
                return Ok(Transition::Activated);
            }
        }

        if edge.state == ConditionalState::Active && load < 0.8 * threshold {
            self.deactivate(edge, "Load dropped below hysteresis band").await?;
            return Ok(Transition::Deactivated);
        }

        Ok(Transition::Unchanged)
    }

    async fn evaluate_scheduled(&self, edge: &ConditionalEdge) -> Result<Transition> {
        let now = now_millis();
        let next_activation = edge.condition.get("nextActivation").and_then(PropertyValue::as_i64);
        let duration_secs = edge.condition.get("duration").and_then(PropertyValue::as_f64).unwrap_or(0.0);

        if edge.state == ConditionalState::Inactive {
            if let Some(next_activation) = next_activation {
                if now >= next_activation {
                    self.activate(edge, "Scheduled activation").await?;
                    return Ok(Transition::Activated);
                }
            }
        }

        if edge.state == ConditionalState::Active {
            if let Some(last_activated) = edge.last_activated {
                if (now - last_activated) as f64 / 1000.0 >= duration_secs {
                    self.deactivate(edge, "Scheduled duration expired").await?;
                    return Ok(Transition::Deactivated);
                }
            }
        }

        Ok(Transition::Unchanged)
    }

    async fn activate(&self, edge: &ConditionalEdge, reason: &str) -> Result<()> {
        let cypher = "MATCH ()-[r]->() WHERE r.__id = $edgeId OR toString(id(r)) = $edgeId \
             SET r.isActive = true, r.activationCount = coalesce(r.activationCount, 0) + 1, \
                 r.lastActivated = $now, r.activationReason = $reason";
        let mut params = HashMap::new();
        params.insert("edgeId".to_string(), PropertyValue::String(edge.id.clone()));
        params.insert("now".to_string(), PropertyValue::Integer(now_millis()));
        params.insert("reason".to_string(), PropertyValue::String(reason.to_string()));
        self.gateway.query(cypher, params).await?;
        let _ = self.events.send(ConditionalEvent::Activated {
            edge_id: edge.id.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            rel_type: edge.rel_type.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn deactivate(&self, edge: &ConditionalEdge, reason: &str) -> Result<()> {
        let cypher = "MATCH ()-[r]->() WHERE r.__id = $edgeId OR toString(id(r)) = $edgeId \
             SET r.isActive = false, r.lastDeactivated = $now, r.deactivationReason = $reason";
        let mut params = HashMap::new();
        params.insert("edgeId".to_string(), PropertyValue::String(edge.id.clone()));
        params.insert("now".to_string(), PropertyValue::Integer(now_millis()));
        params.insert("reason".to_string(), PropertyValue::String(reason.to_string()));
        self.gateway.query(cypher, params).await?;
        let _ = self.events.send(ConditionalEvent::Deactivated {
            edge_id: edge.id.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            rel_type: edge.rel_type.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Explicit activate API call (spec §4.5.1 "driven by ... explicit
    /// API calls").
    pub async fn activate_edge(&self, edge_id: &str, reason: &str) -> Result<()> {
        let edge = self.load_edge_by_id(edge_id).await?;
        self.activate(&edge, reason).await
    }

    pub async fn deactivate_edge(&self, edge_id: &str, reason: &str) -> Result<()> {
        let edge = self.load_edge_by_id(edge_id).await?;
        self.deactivate(&edge, reason).await
    }

    async fn load_conditional_edges(&self) -> Result<Vec<ConditionalEdge>> {
        let cypher = "MATCH (a:CI)-[r]->(b:CI) \
             WHERE r.conditionType IS NOT NULL \
             RETURN toString(id(r)) AS edgeId, type(r) AS relType, a.id AS fromId, b.id AS toId, \
                    r.conditionType AS conditionType, coalesce(r.activationCondition, {}) AS condition, \
                    coalesce(r.isActive, false) AS isActive, r.lastActivated AS lastActivated, \
                    r.lastDeactivated AS lastDeactivated, coalesce(r.activationCount, 0) AS activationCount, \
                    a.status AS sourceStatus, b.status AS targetStatus, a.currentLoad AS sourceLoad";

        let rows = self.gateway.query(cypher, HashMap::new()).await?;
        rows.into_iter().map(|r| row_to_edge(&r)).collect()
    }

    async fn load_edge_by_id(&self, edge_id: &str) -> Result<ConditionalEdge> {
        let cypher = "MATCH (a:CI)-[r]->(b:CI) WHERE r.__id = $edgeId OR toString(id(r)) = $edgeId \
             RETURN toString(id(r)) AS edgeId, type(r) AS relType, a.id AS fromId, b.id AS toId, \
                    r.conditionType AS conditionType, coalesce(r.activationCondition, {}) AS condition, \
                    coalesce(r.isActive, false) AS isActive, r.lastActivated AS lastActivated, \
                    r.lastDeactivated AS lastDeactivated, coalesce(r.activationCount, 0) AS activationCount, \
                    a.status AS sourceStatus, b.status AS targetStatus, a.currentLoad AS sourceLoad";
        let mut params = HashMap::new();
        params.insert("edgeId".to_string(), PropertyValue::String(edge_id.to_string()));

        let row = self.gateway.query_one(cypher, params).await?;
        match row {
            Some(r) => row_to_edge(&r),
            None => Err(CmdbError::RelationshipNotFound(edge_id.to_string())),
        }
    }

    /// All `FAILS_OVER_TO` edges from `primary_ci` that are inactive with
    /// an operational target, ordered by `priority` ascending, plus
    /// applications within three hops (impact surface) (spec §4.5.4).
    pub async fn failover_plan(&self, primary_ci: &str) -> Result<FailoverPlan> {
        let cypher = "MATCH (p:CI {id: $ci})-[r:FAILS_OVER_TO]->(t:CI) \
             WHERE coalesce(r.isActive, false) = false AND t.status = 'OPERATIONAL' \
             RETURN t.id AS targetId, coalesce(r.priority, 0) AS priority, \
                    r.rpo AS rpo, r.rto AS rto, coalesce(r.automaticFailover, false) AS automaticFailover \
             ORDER BY priority ASC";
        let mut params = HashMap::new();
        params.insert("ci".to_string(), PropertyValue::String(primary_ci.to_string()));
        let rows = self.gateway.query(cypher, params).await?;

        let candidates = rows
            .into_iter()
            .map(|r| FailoverCandidate {
                target: r.get("targetId").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
                priority: r.get("priority").and_then(PropertyValue::as_i64).unwrap_or(0),
                rpo: r.get("rpo").and_then(PropertyValue::as_f64),
                rto: r.get("rto").and_then(PropertyValue::as_f64),
                automatic_failover: r.get("automaticFailover").and_then(PropertyValue::as_bool).unwrap_or(false),
            })
            .collect();

        let impact_cypher = "MATCH (p:CI {id: $ci})<-[*1..3]-(app:CI) WHERE app.type = 'Application' \
             RETURN DISTINCT app.id AS appId";
        let mut impact_params = HashMap::new();
        impact_params.insert("ci".to_string(), PropertyValue::String(primary_ci.to_string()));
        let impact_rows = self.gateway.query(impact_cypher, impact_params).await?;
        let affected_applications = impact_rows
            .into_iter()
            .filter_map(|r| r.get("appId").and_then(PropertyValue::as_str).map(String::from))
            .collect();

        Ok(FailoverPlan { candidates, affected_applications })
    }

    /// Apply each conditioned edge's handler logic over a merged
    /// hypothetical state, without persisting (spec §4.5.5).
    pub async fn what_if(&self, ci_id: &str, state_changes: HashMap<String, PropertyValue>) -> Result<WhatIfResult> {
        let cypher = "MATCH (a:CI)-[r]->(b:CI) \
             WHERE r.conditionType IS NOT NULL AND (a.id = $ci OR b.id = $ci) \
             RETURN toString(id(r)) AS edgeId, type(r) AS relType, a.id AS fromId, b.id AS toId, \
                    r.conditionType AS conditionType, coalesce(r.activationCondition, {}) AS condition, \
                    coalesce(r.isActive, false) AS isActive, r.lastActivated AS lastActivated, \
                    r.lastDeactivated AS lastDeactivated, coalesce(r.activationCount, 0) AS activationCount, \
                    a.status AS sourceStatus, b.status AS targetStatus, a.currentLoad AS sourceLoad";
        let mut params = HashMap::new();
        params.insert("ci".to_string(), PropertyValue::String(ci_id.to_string()));

        let rows = self.gateway.query(cypher, params).await?;
        let mut activated = Vec::new();
        let mut deactivated = Vec::new();
        let mut affected = std::collections::HashSet::new();

        for row in rows {
            let mut edge = row_to_edge(&row)?;
            if edge.from == ci_id || edge.to == ci_id {
                apply_state_changes(&mut edge, &state_changes);
            }

            let transition = simulate_transition(&edge);
            match transition {
                Transition::Activated => {
                    activated.push(edge.id.clone());
                    affected.insert(edge.from.clone());
                    affected.insert(edge.to.clone());
                }
                Transition::Deactivated => {
                    deactivated.push(edge.id.clone());
                    affected.insert(edge.from.clone());
                    affected.insert(edge.to.clone());
                }
                Transition::Unchanged => {}
            }
        }

        let cascade_depth = if affected.is_empty() { 0 } else { 1 };
        Ok(WhatIfResult {
            activated_relationships: activated,
            deactivated_relationships: deactivated,
            affected_cis: affected.into_iter().collect(),
            cascade_depth,
        })
    }

    /// Every conditional edge currently `isActive=true` (spec §6
    /// `GET /api/relationships/conditional/active`), distinct from
    /// [`Self::stats`]'s per-type counts.
    pub async fn list_active(&self) -> Result<Vec<ActiveConditionalRelationship>> {
        let edges = self.load_conditional_edges().await?;
        Ok(edges
            .into_iter()
            .filter(|e| e.state == ConditionalState::Active)
            .map(|e| ActiveConditionalRelationship {
                id: e.id,
                from: e.from,
                to: e.to,
                rel_type: e.rel_type,
                condition_type: e.condition_type.as_str().to_string(),
                activation_count: e.activation_count,
                last_activated: e.last_activated,
            })
            .collect())
    }

    /// Counts of active/inactive conditional edges by condition type
    /// (spec §6 route list, `SPEC_FULL.md` §B "Conditional engine stats").
    pub async fn stats(&self) -> Result<ConditionalStats> {
        let edges = self.load_conditional_edges().await?;
        let mut by_type: HashMap<String, TypeCount> = HashMap::new();
        for edge in &edges {
            let key = edge.condition_type.as_str().to_string();
            let entry = by_type.entry(key).or_default();
            match edge.state {
                ConditionalState::Active => entry.active += 1,
                ConditionalState::Inactive => entry.inactive += 1,
            }
        }
        Ok(ConditionalStats { total: edges.len(), by_condition_type: by_type })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Activated,
    Deactivated,
    Unchanged,
}

fn simulate_transition(edge: &ConditionalEdge) -> Transition {
    match edge.condition_type {
        ConditionType::HealthBased => {
            let primary_health = edge.condition.get("primaryHealth").and_then(PropertyValue::as_str).unwrap_or("DOWN");
            if edge.state == ConditionalState::Inactive
                && edge.source_status.as_deref() == Some(primary_health)
                && edge.target_status.as_deref() == Some("OPERATIONAL")
            {
                Transition::Activated
            } else if edge.state == ConditionalState::Active && edge.source_status.as_deref() == Some("OPERATIONAL") {
                Transition::Deactivated
            } else {
                Transition::Unchanged
            }
        }
        ConditionType::LoadBased => {
            let threshold = edge.condition.get("threshold").and_then(PropertyValue::as_f64).unwrap_or(80.0);
            let load = edge.source_load.unwrap_or(0.0);
            if edge.state == ConditionalState::Inactive && load >= threshold {
                Transition::Activated
            } else if edge.state == ConditionalState::Active && load < 0.8 * threshold {
                Transition::Deactivated
            } else {
                Transition::Unchanged
            }
        }
        ConditionType::Scheduled | ConditionType::Manual => Transition::Unchanged,
    }
}

fn apply_state_changes(edge: &mut ConditionalEdge, changes: &HashMap<String, PropertyValue>) {
    if let Some(status) = changes.get("status").and_then(PropertyValue::as_str) {
        edge.source_status = Some(status.to_string());
    }
    if let Some(load) = changes.get("currentLoad").and_then(PropertyValue::as_f64) {
        edge.source_load = Some(load);
    }
}

fn row_to_edge(record: &HashMap<String, PropertyValue>) -> Result<ConditionalEdge> {
    let condition_type_raw = record
        .get("conditionType")
        .and_then(PropertyValue::as_str)
        .ok_or_else(|| CmdbError::InvalidConditionType("missing".to_string()))?;

    let condition = match record.get("condition") {
        Some(PropertyValue::Map(m)) => m.clone(),
        _ => HashMap::new(),
    };

    Ok(ConditionalEdge {
        id: record.get("edgeId").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        from: record.get("fromId").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        to: record.get("toId").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        rel_type: record.get("relType").and_then(PropertyValue::as_str).unwrap_or_default().to_string(),
        condition_type: ConditionType::parse(condition_type_raw)?,
        condition,
        state: if record.get("isActive").and_then(PropertyValue::as_bool).unwrap_or(false) {
            ConditionalState::Active
        } else {
            ConditionalState::Inactive
        },
        last_activated: record.get("lastActivated").and_then(PropertyValue::as_i64),
        last_deactivated: record.get("lastDeactivated").and_then(PropertyValue::as_i64),
        activation_count: record.get("activationCount").and_then(PropertyValue::as_i64).unwrap_or(0),
        source_status: record.get("sourceStatus").and_then(PropertyValue::as_str).map(String::from),
        target_status: record.get("targetStatus").and_then(PropertyValue::as_str).map(String::from),
        source_load: record.get("sourceLoad").and_then(PropertyValue::as_f64),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverCandidate {
    pub target: String,
    pub priority: i64,
    pub rpo: Option<f64>,
    pub rto: Option<f64>,
    pub automatic_failover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverPlan {
    pub candidates: Vec<FailoverCandidate>,
    pub affected_applications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub activated_relationships: Vec<EdgeId>,
    pub deactivated_relationships: Vec<EdgeId>,
    pub affected_cis: Vec<String>,
    pub cascade_depth: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeCount {
    pub active: usize,
    pub inactive: usize,
}

/// Read-model row for [`ConditionalDependencyEngine::list_active`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveConditionalRelationship {
    pub id: EdgeId,
    pub from: String,
    pub to: String,
    pub rel_type: String,
    pub condition_type: String,
    pub activation_count: i64,
    pub last_activated: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalStats {
    pub total: usize,
    pub by_condition_type: HashMap<String, TypeCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_edge(state: ConditionalState, condition_type: ConditionType) -> ConditionalEdge {
        ConditionalEdge {
            id: "1".to_string(),
            from: "ci-a".to_string(),
            to: "ci-b".to_string(),
            rel_type: "FAILS_OVER_TO".to_string(),
            condition_type,
            condition: HashMap::new(),
            state,
            last_activated: None,
            last_deactivated: None,
            activation_count: 0,
            source_status: Some("DOWN".to_string()),
            target_status: Some("OPERATIONAL".to_string()),
            source_load: Some(0.0),
        }
    }

    #[test]
    fn condition_type_parses_both_casings() {
        assert_eq!(ConditionType::parse("health-based").unwrap(), ConditionType::HealthBased);
        assert_eq!(ConditionType::parse("LOAD_BASED").unwrap(), ConditionType::LoadBased);
        assert!(ConditionType::parse("unknown").is_err());
    }

    #[test]
    fn health_based_simulation_activates_when_down_and_target_operational() {
        let edge = sample_edge(ConditionalState::Inactive, ConditionType::HealthBased);
        assert_eq!(simulate_transition(&edge), Transition::Activated);
    }

    #[test]
    fn load_based_simulation_respects_hysteresis_band() {
        let mut edge = sample_edge(ConditionalState::Active, ConditionType::LoadBased);
        edge.condition.insert("threshold".to_string(), PropertyValue::Float(80.0));
        edge.source_load = Some(70.0);
        assert_eq!(simulate_transition(&edge), Transition::Unchanged);

        edge.source_load = Some(60.0);
        assert_eq!(simulate_transition(&edge), Transition::Deactivated);
    }

    #[test]
    fn manual_never_auto_transitions() {
        let edge = sample_edge(ConditionalState::Inactive, ConditionType::Manual);
        assert_eq!(simulate_transition(&edge), Transition::Unchanged);
    }
}
