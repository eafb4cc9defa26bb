//! # Job/Queue Fabric (C6)
//!
//! Synthetic-topology generation jobs: scale presets, a durable Redis-
//! backed queue contract (submit/retry/retention/cancel), and a worker
//! that drives the generator through its stage progression while
//! writing progress records and publishing lifecycle events (spec
//! §4.6). `redis` is the broker here the way `harborgrid-justin-caddy`
//! uses it for its own background task queue.

pub mod worker;

use crate::common::now_millis;
use crate::error::{CmdbError, Result};
use crate::progress::{ProgressRecord, ProgressStore};
use crate::pubsub::{JobEvent, ProgressBus};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Small,
    Medium,
    Large,
    Enterprise,
}

impl Scale {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "small" => Ok(Scale::Small),
            "medium" => Ok(Scale::Medium),
            "large" => Ok(Scale::Large),
            "enterprise" => Ok(Scale::Enterprise),
            other => Err(CmdbError::ValidationFailure(format!("unknown scale {other}"))),
        }
    }

    /// Priority assignment by scale (spec §4.6 "Submit").
    pub fn priority(self) -> i32 {
        match self {
            Scale::Enterprise => 10,
            Scale::Large => 5,
            Scale::Medium | Scale::Small => 1,
        }
    }

    pub fn preset(self) -> ScalePreset {
        match self {
            Scale::Small => ScalePreset {
                scale: self,
                total_cis: 1_000,
                regions: 2,
                dcs_per_region: 2,
                servers_per_dc: 50,
                apps: 200,
                dbs: 20,
                events: 500,
            },
            Scale::Medium => ScalePreset {
                scale: self,
                total_cis: 10_000,
                regions: 3,
                dcs_per_region: 3,
                servers_per_dc: 200,
                apps: 2_000,
                dbs: 200,
                events: 2_000,
            },
            Scale::Large => ScalePreset {
                scale: self,
                total_cis: 100_000,
                regions: 5,
                dcs_per_region: 4,
                servers_per_dc: 1_000,
                apps: 20_000,
                dbs: 2_000,
                events: 10_000,
            },
            Scale::Enterprise => ScalePreset {
                scale: self,
                total_cis: 500_000,
                regions: 8,
                dcs_per_region: 5,
                servers_per_dc: 2_500,
                apps: 100_000,
                dbs: 10_000,
                events: 50_000,
            },
        }
    }
}

/// Exact scale preset table (spec §4.6), every field overridable per job
/// via `customConfig`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalePreset {
    pub scale: Scale,
    pub total_cis: u64,
    pub regions: u32,
    pub dcs_per_region: u32,
    pub servers_per_dc: u32,
    pub apps: u64,
    pub dbs: u64,
    pub events: u64,
}

pub const ALL_PRESETS: [Scale; 4] = [Scale::Small, Scale::Medium, Scale::Large, Scale::Enterprise];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    pub scale: Scale,
    pub custom_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_id: String,
    pub scale: Scale,
    pub priority: i32,
    pub status: JobStatus,
    pub custom_config: Option<serde_json::Value>,
    pub created_at: i64,
    pub error: Option<String>,
}

const QUEUE_KEY: &str = "cmdb:jobs:queue";
const JOB_HASH_PREFIX: &str = "cmdb:jobs:job:";
const COMPLETED_LIST: &str = "cmdb:jobs:completed";
const FAILED_LIST: &str = "cmdb:jobs:failed";
const ALL_JOBS_SET: &str = "cmdb:jobs:all";

const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_SECS: u64 = 5;
const RETAIN_COMPLETED: isize = 10;
const RETAIN_FAILED: isize = 5;
const RETENTION_MAX_AGE_SECS: i64 = 24 * 3600;

pub struct JobQueue {
    conn: ConnectionManager,
    progress: Arc<ProgressStore>,
    bus: Arc<ProgressBus>,
}

impl JobQueue {
    pub async fn connect(queue_url: &str, progress: Arc<ProgressStore>, bus: Arc<ProgressBus>) -> Result<Self> {
        let client = redis::Client::open(queue_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, progress, bus })
    }

    /// Allocate a fresh `jobId`, push it onto the queue, write the
    /// initial `{stage:'queued', percentage:0}` progress record with
    /// TTL 3600s, and emit `job-created` (spec §4.6 "Submit").
    pub async fn submit(&self, submission: JobSubmission) -> Result<JobMetadata> {
        let job_id = Uuid::new_v4().to_string();
        let metadata = JobMetadata {
            job_id: job_id.clone(),
            scale: submission.scale,
            priority: submission.scale.priority(),
            status: JobStatus::Queued,
            custom_config: submission.custom_config,
            created_at: now_millis(),
            error: None,
        };

        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&metadata)?;
        conn.hset::<_, _, _, ()>(format!("{JOB_HASH_PREFIX}{job_id}"), "metadata", &payload)
            .await?;
        // Higher priority jobs are pushed to the front; ZADD-by-priority would
        // be the production-grade structure but the single-worker model (spec
        // §5) only needs FIFO-within-priority, so a priority-scored sorted set
        // is used instead of a plain list.
        conn.zadd::<_, _, _, ()>(QUEUE_KEY, &job_id, -(metadata.priority as f64))
            .await?;
        conn.sadd::<_, _, ()>(ALL_JOBS_SET, &job_id).await?;

        self.progress.set(ProgressRecord::new(&job_id, "queued", 0, None)).await;
        self.bus.publish(JobEvent::JobCreated { job_id: job_id.clone() }).await;

        Ok(metadata)
    }

    /// Pop the highest-priority queued job, if any (single generator
    /// slot, spec §5).
    pub async fn dequeue(&self) -> Result<Option<JobMetadata>> {
        let mut conn = self.conn.clone();
        let popped: Vec<String> = conn.zpopmin(QUEUE_KEY, 1).await?;
        let Some(job_id) = popped.into_iter().next() else {
            return Ok(None);
        };
        self.get(&job_id).await
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<JobMetadata>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.hget(format!("{JOB_HASH_PREFIX}{job_id}"), "metadata").await?;
        Ok(payload.map(|p| serde_json::from_str(&p)).transpose()?)
    }

    /// Every known job (any state), newest first (spec §6 `GET /api/jobs`).
    pub async fn list(&self) -> Result<Vec<JobMetadata>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(ALL_JOBS_SET).await?;
        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(metadata) = self.get(&id).await? {
                jobs.push(metadata);
            }
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn save(&self, metadata: &JobMetadata) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(metadata)?;
        conn.hset::<_, _, _, ()>(format!("{JOB_HASH_PREFIX}{}", metadata.job_id), "metadata", &payload)
            .await?;
        Ok(())
    }

    /// Remove from queue if not started. If the worker has already
    /// picked the job up, the status flip to `Cancelled` here is the
    /// cancel flag itself: the worker polls it via
    /// [`worker::job_was_cancelled`] at the next checkpoint and exits
    /// cleanly there, emitting `job-cancelled` only once it has actually
    /// stopped (spec §4.6 "Cancel", §5 "Cancellation").
    pub async fn cancel(&self, job_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.zrem(QUEUE_KEY, job_id).await?;

        if let Some(mut metadata) = self.get(job_id).await? {
            if matches!(metadata.status, JobStatus::Queued | JobStatus::Running) {
                let was_queued = metadata.status == JobStatus::Queued;
                metadata.status = JobStatus::Cancelled;
                self.save(&metadata).await?;
                if was_queued {
                    self.progress.remove(job_id).await;
                    self.bus.publish(JobEvent::JobCancelled { job_id: job_id.to_string() }).await;
                }
            }
        }
        Ok(())
    }

    /// Flip a dequeued job to `Running` before the worker starts its
    /// stage progression, so `GET /api/jobs/:jobId` reflects reality
    /// instead of showing `queued` for the whole run.
    pub async fn mark_running(&self, job_id: &str) -> Result<()> {
        if let Some(mut metadata) = self.get(job_id).await? {
            metadata.status = JobStatus::Running;
            self.save(&metadata).await?;
        }
        Ok(())
    }

    pub async fn mark_completed(&self, job_id: &str) -> Result<()> {
        if let Some(mut metadata) = self.get(job_id).await? {
            metadata.status = JobStatus::Completed;
            self.save(&metadata).await?;
        }
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(COMPLETED_LIST, job_id).await?;
        conn.ltrim::<_, ()>(COMPLETED_LIST, 0, RETAIN_COMPLETED - 1).await?;
        self.bus.publish(JobEvent::JobCompleted { job_id: job_id.to_string() }).await;
        Ok(())
    }

    pub async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()> {
        if let Some(mut metadata) = self.get(job_id).await? {
            metadata.status = JobStatus::Failed;
            metadata.error = Some(error.to_string());
            self.save(&metadata).await?;
        }
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(FAILED_LIST, job_id).await?;
        conn.ltrim::<_, ()>(FAILED_LIST, 0, RETAIN_FAILED - 1).await?;
        self.bus
            .publish(JobEvent::JobFailed { job_id: job_id.to_string(), error: error.to_string() })
            .await;
        Ok(())
    }

    /// Reap completed/failed job hashes older than 24h, run hourly
    /// (spec §4.6 "Retention").
    pub async fn reap_expired(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let mut reaped = 0usize;
        for list in [COMPLETED_LIST, FAILED_LIST] {
            let ids: Vec<String> = conn.lrange(list, 0, -1).await?;
            for id in ids {
                if let Some(metadata) = self.get(&id).await? {
                    let age_secs = (now_millis() - metadata.created_at) / 1000;
                    if age_secs > RETENTION_MAX_AGE_SECS {
                        conn.del::<_, ()>(format!("{JOB_HASH_PREFIX}{id}")).await?;
                        conn.lrem::<_, _, ()>(list, 0, &id).await?;
                        conn.srem::<_, _, ()>(ALL_JOBS_SET, &id).await?;
                        reaped += 1;
                    }
                }
            }
        }
        Ok(reaped)
    }
}

/// Retry a fallible stage with exponential backoff, base 5s, up to 3
/// attempts (spec §4.6 "Retry").
pub async fn retry_with_backoff<F, Fut, T>(mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt_no in 0..MAX_RETRY_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                let delay = RETRY_BASE_DELAY_SECS * 2u64.pow(attempt_no);
                tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
            }
        }
    }
    Err(last_err.unwrap_or(CmdbError::Internal("retry exhausted with no recorded error".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_priorities_match_the_preset_table() {
        assert_eq!(Scale::Enterprise.priority(), 10);
        assert_eq!(Scale::Large.priority(), 5);
        assert_eq!(Scale::Medium.priority(), 1);
        assert_eq!(Scale::Small.priority(), 1);
    }

    #[test]
    fn presets_match_the_spec_table_exactly() {
        let small = Scale::Small.preset();
        assert_eq!(small.total_cis, 1_000);
        assert_eq!(small.regions, 2);
        assert_eq!(small.events, 500);

        let enterprise = Scale::Enterprise.preset();
        assert_eq!(enterprise.total_cis, 500_000);
        assert_eq!(enterprise.apps, 100_000);
    }

    #[test]
    fn scale_parses_known_labels_only() {
        assert!(Scale::parse("large").is_ok());
        assert!(Scale::parse("gigantic").is_err());
    }
}
