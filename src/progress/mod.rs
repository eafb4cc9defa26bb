//! TTL-backed progress record store, keyed `progress:<jobId>` (spec §6
//! "Persisted state", §4.6 "Submit"). Backed by `moka`'s async cache the
//! way `harborgrid-justin-caddy` backs its own short-lived lookup tables.

use crate::common::{now_millis, Timestamp};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub job_id: String,
    pub stage: String,
    pub percentage: u8,
    pub message: Option<String>,
    pub last_updated: Timestamp,
}

impl ProgressRecord {
    pub fn new(job_id: &str, stage: &str, percentage: u8, message: Option<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
            percentage,
            message,
            last_updated: now_millis(),
        }
    }
}

/// Progress records expire automatically (default TTL 3600s, spec §4.6).
pub struct ProgressStore {
    cache: Cache<String, ProgressRecord>,
}

impl ProgressStore {
    pub fn new(ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { cache }
    }

    fn key(job_id: &str) -> String {
        format!("progress:{job_id}")
    }

    pub async fn set(&self, record: ProgressRecord) {
        self.cache.insert(Self::key(&record.job_id), record).await;
    }

    pub async fn get(&self, job_id: &str) -> Option<ProgressRecord> {
        self.cache.get(&Self::key(job_id)).await
    }

    /// Cancellation deletes the progress record outright (spec §4.6
    /// "Cancel").
    pub async fn remove(&self, job_id: &str) {
        self.cache.invalidate(&Self::key(job_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_the_same_record() {
        let store = ProgressStore::new(3600);
        store
            .set(ProgressRecord::new("job-1", "queued", 0, None))
            .await;

        let record = store.get("job-1").await.unwrap();
        assert_eq!(record.stage, "queued");
        assert_eq!(record.percentage, 0);
    }

    #[tokio::test]
    async fn remove_deletes_the_record() {
        let store = ProgressStore::new(3600);
        store
            .set(ProgressRecord::new("job-2", "queued", 0, None))
            .await;
        store.remove("job-2").await;
        assert!(store.get("job-2").await.is_none());
    }
}
