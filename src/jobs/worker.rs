//! The worker loop: pops jobs off the queue and drives the synthetic
//! topology generator through its stage progression, writing a new
//! progress record at each stage and polling for cancellation between
//! stages (spec §4.6 "Worker", §5 "Cancellation").
//!
//! Only one generator may run at a time against the graph store (spec
//! §5 "Shared-resource policy"); this worker is a single task for that
//! reason, matching the teacher's single-connection-pool-slot idiom in
//! `ApiState::connection_semaphore`.

use super::{JobMetadata, JobQueue, ScalePreset};
use crate::error::Result;
use crate::progress::ProgressRecord;
use crate::pubsub::JobEvent;
use std::sync::Arc;
use std::time::Duration;

const STAGES: &[&str] = &["starting", "generating_cis", "generating_events", "completed"];

/// Runs forever, polling the queue every `poll_interval` for the next
/// job. Intended to be spawned once at startup.
pub async fn run(queue: Arc<JobQueue>, poll_interval: Duration) {
    loop {
        match queue.dequeue().await {
            Ok(Some(job)) => {
                tracing::info!(job_id = %job.job_id, scale = ?job.scale, "worker picked up job");
                if let Err(e) = execute(&queue, &job).await {
                    tracing::warn!(job_id = %job.job_id, error = %e, "job failed");
                    let _ = queue.mark_failed(&job.job_id, &e.to_string()).await;
                }
            }
            Ok(None) => tokio::time::sleep(poll_interval).await,
            Err(e) => {
                tracing::warn!(error = %e, "failed to poll job queue");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

async fn execute(queue: &Arc<JobQueue>, job: &JobMetadata) -> Result<()> {
    let preset = job.scale.preset();
    queue.mark_running(&job.job_id).await?;

    for (index, stage) in STAGES.iter().enumerate() {
        if job_was_cancelled(queue, &job.job_id).await? {
            tracing::info!(job_id = %job.job_id, "worker observed cancellation, exiting");
            queue.progress.remove(&job.job_id).await;
            queue.bus.publish(JobEvent::JobCancelled { job_id: job.job_id.clone() }).await;
            return Ok(());
        }

        let percentage = (((index + 1) * 100) / STAGES.len()) as u8;
        let record = ProgressRecord::new(&job.job_id, stage, percentage, stage_message(stage, &preset));
        queue.progress.set(record.clone()).await;
        queue.bus.publish(JobEvent::JobProgress(record)).await;

        generate_stage(stage, &preset).await;
    }

    queue.mark_completed(&job.job_id).await?;
    Ok(())
}

async fn job_was_cancelled(queue: &Arc<JobQueue>, job_id: &str) -> Result<bool> {
    Ok(matches!(
        queue.get(job_id).await?,
        Some(metadata) if metadata.status == super::JobStatus::Cancelled
    ))
}

fn stage_message(stage: &str, preset: &ScalePreset) -> Option<String> {
    match stage {
        "generating_cis" => Some(format!("generating {} configuration items", preset.total_cis)),
        "generating_events" => Some(format!("generating {} events", preset.events)),
        _ => None,
    }
}

/// The generator's actual output is sample-data content, explicitly
/// out of scope (spec §1 Non-goals); this stands in for the graph
/// writes a real generator would issue, yielding between simulated
/// batches so cancellation checks stay responsive.
async fn generate_stage(_stage: &str, _preset: &ScalePreset) {
    tokio::task::yield_now().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_progression_matches_the_spec_order() {
        assert_eq!(STAGES, &["starting", "generating_cis", "generating_events", "completed"]);
    }

    #[test]
    fn percentage_is_monotonic_across_stages() {
        let percentages: Vec<u8> = (0..STAGES.len())
            .map(|i| (((i + 1) * 100) / STAGES.len()) as u8)
            .collect();
        assert!(percentages.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*percentages.last().unwrap(), 100);
    }
}
