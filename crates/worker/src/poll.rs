//! Status polling for submitted jobs.

use std::time::Duration;

use cruxvision_core::job::{Job, JobStatus};
use cruxvision_core::types::JobId;
use cruxvision_pipeline::{JobStore, JobStoreError};

/// Poll `store` every `interval` until job `id` is terminal.
///
/// Fails only when the job is not in the store.
pub async fn wait_for_terminal(
    store: &JobStore,
    id: &JobId,
    interval: Duration,
) -> Result<Job, JobStoreError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let job = store.get(id)?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        tracing::debug!(job_id = %id, "Job still processing");
    }
}

/// Number of jobs that ended in error.
pub fn failed_count(jobs: &[Job]) -> usize {
    jobs.iter().filter(|j| j.status == JobStatus::Error).count()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn returns_once_job_settles() {
        let store = Arc::new(JobStore::new());
        let ticket = store.create(uuid::Uuid::new_v4()).unwrap();
        let id = ticket.id();

        let settle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ticket.fail_with("Source video unreadable: no video stream").unwrap();
        });

        let job = wait_for_terminal(&store, &id, Duration::from_millis(5))
            .await
            .unwrap();
        settle.await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(failed_count(&[job]), 1);
    }

    #[tokio::test]
    async fn unknown_job_is_an_error() {
        let store = JobStore::new();
        let id = uuid::Uuid::new_v4();
        let result = wait_for_terminal(&store, &id, Duration::from_millis(1)).await;
        assert_matches!(result, Err(JobStoreError::NotFound(missing)) if missing == id);
    }

    #[test]
    fn failed_count_ignores_other_statuses() {
        let created_at = chrono::Utc::now();
        let job = |status| Job {
            id: uuid::Uuid::new_v4(),
            status,
            created_at,
            metrics: None,
            feedback: None,
            video_url: None,
            error_message: None,
        };
        let jobs = [job(JobStatus::Complete), job(JobStatus::Error), job(JobStatus::Processing)];
        assert_eq!(failed_count(&jobs), 1);
    }
}
