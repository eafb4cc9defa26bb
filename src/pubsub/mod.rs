//! # Progress Pub/Sub (C8)
//!
//! Per-`jobId` fan-out of progress records and lifecycle events to every
//! subscribed client, strict FIFO per job, best-effort/at-most-once
//! delivery (spec §4.8). Built on a registry of `tokio::sync::mpsc`
//! senders rather than a single shared `broadcast` channel so a slow
//! subscriber cannot make a fast one drop events bound for the same job
//! (the teacher's websocket connection pool followed the same
//! per-client-channel shape).

use crate::progress::ProgressRecord;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum JobEvent {
    JobCreated { job_id: String },
    JobProgress(ProgressRecord),
    JobCompleted { job_id: String },
    JobFailed { job_id: String, error: String },
    JobCancelled { job_id: String },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::JobCreated { job_id } => job_id,
            JobEvent::JobProgress(record) => &record.job_id,
            JobEvent::JobCompleted { job_id } => job_id,
            JobEvent::JobFailed { job_id, .. } => job_id,
            JobEvent::JobCancelled { job_id } => job_id,
        }
    }
}

pub type SubscriberId = u64;

/// Registry of subscriber channels, one `mpsc::Sender<JobEvent>` per
/// `(jobId, subscriberId)`. Fan-out iterates subscribers for a job in
/// insertion order and sends sequentially, which is what gives strict
/// per-job FIFO (spec §4.8 "Ordering").
pub struct ProgressBus {
    subscribers: DashMap<String, Vec<(SubscriberId, mpsc::Sender<JobEvent>)>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Subscribe a client to `job_id`; clients joining mid-run see only
    /// subsequent events (spec §4.8 "Delivery").
    pub fn subscribe(&self, job_id: &str, buffer: usize) -> (SubscriberId, mpsc::Receiver<JobEvent>) {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(buffer);
        self.subscribers.entry(job_id.to_string()).or_default().push((id, tx));
        (id, rx)
    }

    /// Unsubscribe drops the client; a client disconnect is treated
    /// identically (spec §4.8 "Unsubscribe").
    pub fn unsubscribe(&self, job_id: &str, subscriber_id: SubscriberId) {
        if let Some(mut entry) = self.subscribers.get_mut(job_id) {
            entry.retain(|(id, _)| *id != subscriber_id);
        }
    }

    /// Push `event` to every current subscriber of its `jobId`, in
    /// order. A subscriber whose channel is closed or full is dropped
    /// silently (best-effort, at-most-once).
    pub async fn publish(&self, event: JobEvent) {
        let job_id = event.job_id().to_string();
        let Some(mut subs) = self.subscribers.get_mut(&job_id) else {
            return;
        };

        let mut dead = Vec::new();
        for (id, tx) in subs.iter() {
            if tx.send(event.clone()).await.is_err() {
                dead.push(*id);
            }
        }
        if !dead.is_empty() {
            subs.retain(|(id, _)| !dead.contains(id));
        }
    }

    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.subscribers.get(job_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_observes_events_in_fifo_order() {
        let bus = ProgressBus::new();
        let (_, mut rx) = bus.subscribe("job-1", 16);

        bus.publish(JobEvent::JobCreated { job_id: "job-1".to_string() }).await;
        bus.publish(JobEvent::JobProgress(ProgressRecord::new("job-1", "starting", 10, None))).await;
        bus.publish(JobEvent::JobCompleted { job_id: "job-1".to_string() }).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();

        assert!(matches!(first, JobEvent::JobCreated { .. }));
        assert!(matches!(second, JobEvent::JobProgress(_)));
        assert!(matches!(third, JobEvent::JobCompleted { .. }));
    }

    #[tokio::test]
    async fn unsubscribe_stops_further_delivery() {
        let bus = ProgressBus::new();
        let (id, mut rx) = bus.subscribe("job-2", 16);
        bus.unsubscribe("job-2", id);

        bus.publish(JobEvent::JobCreated { job_id: "job-2".to_string() }).await;
        assert_eq!(bus.subscriber_count("job-2"), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_for_other_jobs_do_not_cross_subscribers() {
        let bus = ProgressBus::new();
        let (_, mut rx_a) = bus.subscribe("job-a", 16);
        let (_, mut rx_b) = bus.subscribe("job-b", 16);

        bus.publish(JobEvent::JobCreated { job_id: "job-a".to_string() }).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
