//! CMDB server entry point: loads configuration, connects the graph
//! gateway, spawns the conditional evaluator and the job worker, then
//! runs the REST + progress-channel server.

use cmdb_core::api::{ApiServer, AppState};
use cmdb_core::cmdb::CmdbService;
use cmdb_core::config::Config;
use cmdb_core::gateway::GraphGateway;
use cmdb_core::jobs::{worker, JobQueue};
use cmdb_core::progress::ProgressStore;
use cmdb_core::pubsub::ProgressBus;
use cmdb_core::ratelimit::RateLimiter;
use cmdb_core::relationships::conditional::ConditionalDependencyEngine;
use cmdb_core::relationships::temporal::TemporalRelationshipService;
use cmdb_core::relationships::weighted::WeightedRelationshipService;
use cmdb_core::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn print_banner() {
    println!(
        r#"
  ____ __  __ ____  ____       ____
 / ___|  \/  |  _ \| __ )     / ___|___  _ __ ___
| |   | |\/| | | | |  _ \____| |   / _ \| '__/ _ \
| |___| |  | | |_| | |_) |__ | |__| (_) | | |  __/
 \____|_|  |_|____/|____/     \____\___/|_|  \___|
"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    print_banner();

    let config = Config::from_env()?;
    info!(port = config.port, graph_uri = %config.graph_uri, "starting cmdb-server");

    let gateway = Arc::new(GraphGateway::connect(&config.graph_uri, &config.graph_user, &config.graph_password).await?);
    info!("connected to graph store");

    let progress = Arc::new(ProgressStore::new(config.progress_ttl_secs));
    let bus = Arc::new(ProgressBus::new());
    let jobs = Arc::new(JobQueue::connect(&config.queue_url, progress.clone(), bus.clone()).await?);
    info!("connected to job queue broker");

    let conditional = Arc::new(ConditionalDependencyEngine::new(gateway.clone()));
    conditional.start(config.evaluator_interval_ms);
    info!(interval_ms = config.evaluator_interval_ms, "conditional evaluator started");

    let worker_jobs = jobs.clone();
    tokio::spawn(async move {
        worker::run(worker_jobs, Duration::from_millis(500)).await;
    });
    info!("job worker started");

    let state = AppState {
        cmdb: CmdbService::new(gateway.clone()),
        weighted: WeightedRelationshipService::new(gateway.clone()),
        temporal: TemporalRelationshipService::new(gateway.clone()),
        conditional: conditional.clone(),
        jobs: jobs.clone(),
        progress,
        bus,
        rate_limiter: RateLimiter::new(config.rate_limit_window_secs),
        evaluator_interval_ms: config.evaluator_interval_ms,
    };

    let server = ApiServer::new(config, gateway, state);
    server.run().await
}
