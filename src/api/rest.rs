//! Route wiring and handlers for the REST surface (spec §6). Each
//! handler validates/logs at `debug`, calls one service method, and
//! lets `?` convert `CmdbError` into the standardized JSON error
//! payload via its `IntoResponse` impl — the same validation-then-query
//! handler shape the teacher's `rest_api.rs` uses throughout.

use super::AppState;
use crate::cmdb::{BrowseParams, CreateCiInput, ImpactDirection};
use crate::common::PropertyValue;
use crate::error::{CmdbError, Result as CmdbResult};
use crate::jobs::JobSubmission;
use crate::relationships::conditional::ConditionType;
use crate::relationships::temporal::{ScalingAction, VersionedCreateInput};
use crate::relationships::WeightProperties;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        // CI management
        .route("/api/cmdb/items", get(list_items).post(create_item))
        .route("/api/cmdb/items/count", get(count_items))
        .route("/api/cmdb/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .route("/api/cmdb/items/{id}/relationships", get(item_relationships))
        .route("/api/cmdb/topology", get(topology))
        .route("/api/cmdb/topology/temporal", get(temporal_topology))
        .route("/api/cmdb/impact/{id}", get(impact))
        .route("/api/cmdb/browse", get(browse))
        .route("/api/cmdb/database/stats", get(database_stats))
        .route("/api/cmdb/database/clear", delete(clear_database))
        .route("/api/cmdb/failover-plan/{ci_id}", get(failover_plan))
        // Weighted relationships (C3)
        .route("/api/relationships", post(create_relationship))
        .route("/api/relationships/weighted", post(create_weighted))
        .route("/api/relationships/weighted/{from}/{to}/{rel_type}", get(get_weighted))
        .route("/api/relationships/calculate-weight", post(calculate_weight))
        .route("/api/relationships/auto-calculate-weights", post(auto_calculate_weights))
        .route("/api/relationships/shortest-path/{start}/{end}", get(shortest_path))
        .route("/api/relationships/all-paths/{start}/{end}", get(all_paths))
        .route("/api/relationships/criticality-rankings", get(criticality_rankings))
        // Temporal relationships (C4)
        .route("/api/relationships/temporal", post(create_temporal))
        .route("/api/relationships/temporal/{from}/{to}/{rel_type}/history", get(temporal_history))
        .route("/api/relationships/temporal/{from}/{to}/{rel_type}/trend", get(temporal_trend))
        .route("/api/relationships/temporal/expiring", get(temporal_expiring))
        .route("/api/relationships/temporal/scaling-event", post(scaling_event))
        .route("/api/relationships/temporal/{id}/update", put(update_temporal))
        // Conditional dependencies (C5)
        .route("/api/relationships/conditional", post(create_conditional))
        .route("/api/relationships/conditional/active", get(active_conditional))
        .route("/api/relationships/conditional/simulate", post(simulate_conditional))
        .route("/api/relationships/conditional/{id}/activate", post(activate_conditional))
        .route("/api/relationships/conditional/{id}/deactivate", post(deactivate_conditional))
        .route("/api/relationships/conditional/evaluate", post(evaluate_conditional))
        .route("/api/relationships/conditional/stats", get(conditional_stats))
        .route("/api/relationships/conditional/engine/start", post(start_engine))
        .route("/api/relationships/conditional/engine/stop", post(stop_engine))
        // Job/queue fabric (C6)
        .route("/api/jobs", get(list_jobs).post(submit_job))
        .route("/api/jobs/{job_id}", get(get_job).delete(cancel_job))
        .route("/api/queue/scales", get(queue_scales))
        .route("/api/queue/stats", get(queue_stats))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "OPERATIONAL"}))
}

// ---- CI management --------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListItemsQuery {
    #[serde(rename = "type")]
    ci_type: Option<String>,
    limit: Option<usize>,
}

async fn list_items(State(state): State<Arc<AppState>>, Query(q): Query<ListItemsQuery>) -> CmdbResult<Response> {
    let items = state.cmdb.list(q.ci_type.as_deref(), q.limit.unwrap_or(100)).await?;
    Ok(Json(items).into_response())
}

async fn count_items(State(state): State<Arc<AppState>>, Query(q): Query<ListItemsQuery>) -> CmdbResult<Response> {
    let total = state.cmdb.count(q.ci_type.as_deref()).await?;
    Ok(Json(json!({"count": total})).into_response())
}

async fn create_item(State(state): State<Arc<AppState>>, Json(input): Json<CreateCiInput>) -> CmdbResult<Response> {
    let item = state.cmdb.create(input).await?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

async fn get_item(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> CmdbResult<Response> {
    match state.cmdb.get_with_adjacency(&id).await? {
        Some(summary) => Ok(Json(summary).into_response()),
        None => Err(CmdbError::CINotFound(id)),
    }
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(properties): Json<HashMap<String, PropertyValue>>,
) -> CmdbResult<Response> {
    let item = state.cmdb.update(&id, properties).await?;
    Ok(Json(item).into_response())
}

async fn delete_item(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> CmdbResult<Response> {
    state.cmdb.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn item_relationships(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> CmdbResult<Response> {
    let summary = state.cmdb.get_with_adjacency(&id).await?.ok_or(CmdbError::CINotFound(id))?;
    Ok(Json(json!({
        "inbound": summary.inbound_by_type,
        "outbound": summary.outbound_by_type,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct TopologyQuery {
    #[serde(rename = "startNode")]
    start_node: String,
    depth: Option<usize>,
    #[serde(rename = "type")]
    rel_type: Option<String>,
    limit: Option<usize>,
}

async fn topology(State(state): State<Arc<AppState>>, Query(q): Query<TopologyQuery>) -> CmdbResult<Response> {
    let topo = state
        .cmdb
        .topology(&q.start_node, q.depth.unwrap_or(3), q.rel_type.as_deref(), q.limit.unwrap_or(500))
        .await?;
    Ok(Json(topo).into_response())
}

#[derive(Debug, Deserialize)]
struct TemporalTopologyQuery {
    date: i64,
    #[serde(rename = "ciId")]
    ci_id: Option<String>,
    #[serde(rename = "maxDepth")]
    max_depth: Option<usize>,
    #[serde(rename = "relationshipTypes")]
    relationship_types: Option<String>,
}

async fn temporal_topology(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TemporalTopologyQuery>,
) -> CmdbResult<Response> {
    let rel_type = q.relationship_types.as_deref().and_then(|s| s.split(',').next());
    let topo = state
        .temporal
        .time_travel_topology(q.date, q.ci_id.as_deref(), q.max_depth, rel_type)
        .await?;
    Ok(Json(topo).into_response())
}

#[derive(Debug, Deserialize)]
struct ImpactQuery {
    direction: Option<String>,
    depth: Option<usize>,
}

async fn impact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ImpactQuery>,
) -> CmdbResult<Response> {
    let direction = ImpactDirection::parse(q.direction.as_deref());
    let result = state.cmdb.impact(&id, direction, q.depth.unwrap_or(3)).await?;
    Ok(Json(result).into_response())
}

async fn browse(State(state): State<Arc<AppState>>, Query(q): Query<BrowseQueryParams>) -> CmdbResult<Response> {
    let params = BrowseParams {
        search: q.search,
        ci_type: q.ci_type,
        page: q.page.unwrap_or(1),
        limit: q.limit.unwrap_or(50),
        sort: q.sort,
        order: q.order,
    };
    let page = state.cmdb.browse(params).await?;
    Ok(Json(page).into_response())
}

#[derive(Debug, Deserialize)]
struct BrowseQueryParams {
    search: Option<String>,
    #[serde(rename = "type")]
    ci_type: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
    sort: Option<String>,
    order: Option<String>,
}

async fn database_stats(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    Ok(Json(state.cmdb.database_stats().await?).into_response())
}

async fn clear_database(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    state.cmdb.clear().await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn failover_plan(State(state): State<Arc<AppState>>, Path(ci_id): Path<String>) -> CmdbResult<Response> {
    Ok(Json(state.conditional.failover_plan(&ci_id).await?).into_response())
}

// ---- Weighted relationships (C3) ------------------------------------

#[derive(Debug, Deserialize)]
struct RelationshipInput {
    from: String,
    to: String,
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(flatten)]
    weight: WeightPropsInput,
}

#[derive(Debug, Default, Deserialize)]
struct WeightPropsInput {
    weight: Option<f64>,
    #[serde(rename = "criticalityScore")]
    criticality_score: Option<f64>,
    #[serde(rename = "loadFactor")]
    load_factor: Option<f64>,
    #[serde(rename = "latencyMs")]
    latency_ms: Option<f64>,
    #[serde(rename = "redundancyLevel")]
    redundancy_level: Option<f64>,
    source: Option<String>,
}

impl From<WeightPropsInput> for WeightProperties {
    fn from(input: WeightPropsInput) -> Self {
        WeightProperties {
            weight: input.weight,
            criticality_score: input.criticality_score,
            load_factor: input.load_factor,
            latency_ms: input.latency_ms,
            redundancy_level: input.redundancy_level,
            source: input.source,
            ..Default::default()
        }
    }
}

async fn create_relationship(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RelationshipInput>,
) -> CmdbResult<Response> {
    state.weighted.upsert(&input.from, &input.to, &input.rel_type, input.weight.into()).await?;
    Ok(StatusCode::CREATED.into_response())
}

async fn create_weighted(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RelationshipInput>,
) -> CmdbResult<Response> {
    create_relationship(State(state), Json(input)).await
}

async fn get_weighted(
    State(state): State<Arc<AppState>>,
    Path((from, to, rel_type)): Path<(String, String, String)>,
) -> CmdbResult<Response> {
    match state.weighted.get(&from, &to, &rel_type).await? {
        Some(props) => Ok(Json(props).into_response()),
        None => Ok(Json(json!({"found": false})).into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct CalculateWeightInput {
    #[serde(rename = "criticalityScore")]
    criticality_score: f64,
    #[serde(rename = "loadFactor")]
    load_factor: f64,
    #[serde(rename = "latencyMs")]
    latency_ms: f64,
    #[serde(rename = "maxLatencyMs")]
    max_latency_ms: f64,
    #[serde(rename = "redundancyLevel")]
    redundancy_level: f64,
}

async fn calculate_weight(Json(input): Json<CalculateWeightInput>) -> CmdbResult<Response> {
    let weight = crate::weight::overall_weight(crate::weight::WeightInputs {
        criticality_score: input.criticality_score,
        load_factor: input.load_factor,
        latency_ms: input.latency_ms,
        max_latency_ms: input.max_latency_ms,
        redundancy_level: input.redundancy_level,
    });
    Ok(Json(json!({"weight": weight})).into_response())
}

#[derive(Debug, Deserialize)]
struct AutoCalculateInput {
    #[serde(rename = "type")]
    rel_type: String,
}

async fn auto_calculate_weights(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AutoCalculateInput>,
) -> CmdbResult<Response> {
    let updated = state.weighted.auto_calculate_weights(&input.rel_type).await?;
    Ok(Json(json!({"updated": updated})).into_response())
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(rename = "weightProperty")]
    weight_property: Option<String>,
    #[serde(rename = "maxDepth")]
    max_depth: Option<usize>,
    limit: Option<usize>,
}

async fn shortest_path(
    State(state): State<Arc<AppState>>,
    Path((start, end)): Path<(String, String)>,
    Query(q): Query<PathQuery>,
) -> CmdbResult<Response> {
    let weight_property = q.weight_property.unwrap_or_else(|| "weight".to_string());
    match state.weighted.shortest_weighted_path(&start, &end, &weight_property, q.max_depth).await? {
        Some(path) => Ok(Json(path).into_response()),
        None => Ok(Json(json!({"found": false})).into_response()),
    }
}

async fn all_paths(
    State(state): State<Arc<AppState>>,
    Path((start, end)): Path<(String, String)>,
    Query(q): Query<PathQuery>,
) -> CmdbResult<Response> {
    let weight_property = q.weight_property.unwrap_or_else(|| "weight".to_string());
    let paths = state
        .weighted
        .all_weighted_paths(&start, &end, &weight_property, q.max_depth, q.limit)
        .await?;
    Ok(Json(paths).into_response())
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn criticality_rankings(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> CmdbResult<Response> {
    let rankings = state.weighted.criticality_ranking(q.limit.unwrap_or(10)).await?;
    Ok(Json(rankings).into_response())
}

// ---- Temporal relationships (C4) ------------------------------------

#[derive(Debug, Deserialize)]
struct TemporalCreateInput {
    from: String,
    to: String,
    #[serde(rename = "type")]
    rel_type: String,
    properties: Option<HashMap<String, PropertyValue>>,
    #[serde(rename = "validFrom")]
    valid_from: Option<i64>,
    #[serde(rename = "validTo")]
    valid_to: Option<i64>,
    #[serde(rename = "createdBy")]
    created_by: Option<String>,
    #[serde(rename = "changeReason")]
    change_reason: Option<String>,
}

async fn create_temporal(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TemporalCreateInput>,
) -> CmdbResult<Response> {
    let version = state
        .temporal
        .create(
            &input.from,
            &input.to,
            &input.rel_type,
            VersionedCreateInput {
                properties: input.properties.unwrap_or_default(),
                valid_from: input.valid_from,
                valid_to: input.valid_to,
                created_by: input.created_by.unwrap_or_else(|| "system".to_string()),
                change_reason: input.change_reason,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(version)).into_response())
}

async fn temporal_history(
    State(state): State<Arc<AppState>>,
    Path((from, to, rel_type)): Path<(String, String, String)>,
) -> CmdbResult<Response> {
    let history = state.temporal.history(&from, &to, &rel_type).await?;
    Ok(Json(history).into_response())
}

async fn temporal_trend(
    State(state): State<Arc<AppState>>,
    Path((from, to, rel_type)): Path<(String, String, String)>,
) -> CmdbResult<Response> {
    let trend = state.temporal.weight_trend(&from, &to, &rel_type).await?;
    Ok(Json(trend).into_response())
}

#[derive(Debug, Deserialize)]
struct ExpiringQuery {
    #[serde(rename = "daysAhead")]
    days_ahead: u32,
}

async fn temporal_expiring(State(state): State<Arc<AppState>>, Query(q): Query<ExpiringQuery>) -> CmdbResult<Response> {
    let edges = state.temporal.expiry_scan(q.days_ahead).await?;
    Ok(Json(edges).into_response())
}

#[derive(Debug, Deserialize)]
struct ScalingEventInput {
    #[serde(rename = "ciId")]
    ci_id: String,
    #[serde(rename = "currentLoad")]
    current_load: f64,
    #[serde(rename = "scalingAction")]
    scaling_action: String,
}

async fn scaling_event(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ScalingEventInput>,
) -> CmdbResult<Response> {
    let action = match input.scaling_action.as_str() {
        "scale-up" => ScalingAction::ScaleUp,
        "scale-down" => ScalingAction::ScaleDown,
        other => return Err(CmdbError::ValidationFailure(format!("unknown scalingAction {other}"))),
    };
    let updated = state.temporal.apply_scaling_event(&input.ci_id, input.current_load, action).await?;
    Ok(Json(json!({"updated": updated})).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateTemporalInput {
    weight: Option<f64>,
    #[serde(rename = "criticalityScore")]
    criticality_score: Option<f64>,
    #[serde(rename = "loadFactor")]
    load_factor: Option<f64>,
    source: String,
    #[serde(rename = "modifiedBy")]
    modified_by: String,
}

async fn update_temporal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTemporalInput>,
) -> CmdbResult<Response> {
    state
        .temporal
        .update_with_history(&id, input.weight, input.criticality_score, input.load_factor, &input.source, &input.modified_by)
        .await?;
    Ok(StatusCode::OK.into_response())
}

// ---- Conditional dependencies (C5) -----------------------------------

#[derive(Debug, Deserialize)]
struct ConditionalCreateInput {
    from: String,
    to: String,
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(rename = "conditionType")]
    condition_type: String,
    #[serde(rename = "activationCondition")]
    activation_condition: HashMap<String, PropertyValue>,
}

async fn create_conditional(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ConditionalCreateInput>,
) -> CmdbResult<Response> {
    let condition_type = ConditionType::parse(&input.condition_type)?;
    state
        .conditional
        .create(&input.from, &input.to, &input.rel_type, condition_type, input.activation_condition)
        .await?;
    Ok(StatusCode::CREATED.into_response())
}

async fn active_conditional(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    let active = state.conditional.list_active().await?;
    Ok(Json(active).into_response())
}

#[derive(Debug, Deserialize)]
struct SimulateInput {
    #[serde(rename = "ciId")]
    ci_id: String,
    #[serde(rename = "stateChanges")]
    state_changes: HashMap<String, PropertyValue>,
}

async fn simulate_conditional(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SimulateInput>,
) -> CmdbResult<Response> {
    let result = state.conditional.what_if(&input.ci_id, input.state_changes).await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize, Default)]
struct ReasonInput {
    reason: Option<String>,
}

async fn activate_conditional(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<ReasonInput>,
) -> CmdbResult<Response> {
    state.conditional.activate_edge(&id, input.reason.as_deref().unwrap_or("Manual activation")).await?;
    Ok(StatusCode::OK.into_response())
}

async fn deactivate_conditional(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<ReasonInput>,
) -> CmdbResult<Response> {
    state.conditional.deactivate_edge(&id, input.reason.as_deref().unwrap_or("Manual deactivation")).await?;
    Ok(StatusCode::OK.into_response())
}

async fn evaluate_conditional(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    let summary = state.conditional.evaluate_once().await?;
    Ok(Json(summary).into_response())
}

async fn conditional_stats(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    Ok(Json(state.conditional.stats().await?).into_response())
}

async fn start_engine(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    state.conditional.start(state.evaluator_interval_ms);
    Ok(Json(json!({"running": state.conditional.is_running()})).into_response())
}

async fn stop_engine(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    state.conditional.stop();
    Ok(Json(json!({"running": state.conditional.is_running()})).into_response())
}

// ---- Job/queue fabric (C6) -------------------------------------------

#[derive(Debug, Deserialize)]
struct SubmitJobInput {
    scale: String,
    #[serde(rename = "customConfig")]
    custom_config: Option<serde_json::Value>,
}

async fn submit_job(State(state): State<Arc<AppState>>, Json(input): Json<SubmitJobInput>) -> CmdbResult<Response> {
    let scale = crate::jobs::Scale::parse(&input.scale)?;
    let metadata = state.jobs.submit(JobSubmission { scale, custom_config: input.custom_config }).await?;
    Ok((StatusCode::CREATED, Json(metadata)).into_response())
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    let jobs = state.jobs.list().await?;
    Ok(Json(jobs).into_response())
}

async fn get_job(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> CmdbResult<Response> {
    match state.jobs.get(&job_id).await? {
        Some(job) => Ok(Json(job).into_response()),
        None => Err(CmdbError::JobNotFound(job_id)),
    }
}

async fn cancel_job(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> CmdbResult<Response> {
    state.jobs.cancel(&job_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn queue_scales() -> impl IntoResponse {
    let presets: Vec<_> = crate::jobs::ALL_PRESETS.iter().map(|s| s.preset()).collect();
    Json(presets)
}

async fn queue_stats(State(state): State<Arc<AppState>>) -> CmdbResult<Response> {
    let reaped = state.jobs.reap_expired().await.unwrap_or(0);
    Ok(Json(json!({"reapedLastRun": reaped})).into_response())
}
