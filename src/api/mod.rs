//! HTTP surface: the REST API (spec §6) and the progress duplex channel
//! (spec §6 "Progress channel", §4.8). Grounded on the teacher's
//! `RestApiServer`/`ApiState`/`build_router` shape in `api/rest_api.rs`,
//! generalized from a single-process DB server to the CMDB's service
//! set.

pub mod middleware;
pub mod rest;
pub mod ws;

use crate::cmdb::CmdbService;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::GraphGateway;
use crate::jobs::JobQueue;
use crate::progress::ProgressStore;
use crate::pubsub::ProgressBus;
use crate::ratelimit::RateLimiter;
use crate::relationships::conditional::ConditionalDependencyEngine;
use crate::relationships::temporal::TemporalRelationshipService;
use crate::relationships::weighted::WeightedRelationshipService;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Everything a handler needs, `Arc`-wrapped once at startup and shared
/// across every request (mirrors the teacher's `ApiState`).
pub struct AppState {
    pub cmdb: CmdbService,
    pub weighted: WeightedRelationshipService,
    pub temporal: TemporalRelationshipService,
    pub conditional: Arc<ConditionalDependencyEngine>,
    pub jobs: Arc<JobQueue>,
    pub progress: Arc<ProgressStore>,
    pub bus: Arc<ProgressBus>,
    pub rate_limiter: RateLimiter,
    pub evaluator_interval_ms: u64,
}

pub struct ApiServer {
    config: Config,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: Config, gateway: Arc<GraphGateway>, state: AppState) -> Self {
        let _ = &gateway;
        Self { config, state: Arc::new(state) }
    }

    pub fn build_router(&self) -> Router {
        rest::routes()
            .merge(ws::routes())
            .layer(axum::middleware::from_fn_with_state(self.state.clone(), middleware::rate_limit))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(30)))
            .layer(CorsLayer::permissive())
    }

    pub async fn run(&self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::error::CmdbError::Internal(format!("failed to bind {addr}: {e}")))?;
        tracing::info!(%addr, "REST API listening");
        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| crate::error::CmdbError::Internal(format!("server error: {e}")))?;
        Ok(())
    }
}
