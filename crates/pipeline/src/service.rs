//! Job submission and admission control.
//!
//! [`AnalysisService::submit`] records the job and returns immediately;
//! the pipeline runs in a spawned task, waiting for an admission permit
//! first when a concurrency bound is configured.

use std::path::PathBuf;
use std::sync::Arc;

use cruxvision_core::job::{Job, JobStatus};
use cruxvision_core::types::JobId;
use cruxvision_events::bus::{
    EventBus, PipelineEvent, EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_STARTED,
    EVENT_JOB_SUBMITTED,
};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::error::JobStoreError;
use crate::estimator::PoseEstimator;
use crate::jobs::JobStore;
use crate::orchestrator::Pipeline;
use crate::video::VideoBackend;

/// A submitted job: its id plus the background task running it.
pub struct SubmittedJob {
    pub id: JobId,
    pub task: JoinHandle<Result<Job, JobStoreError>>,
}

pub struct AnalysisService {
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    events: Arc<EventBus>,
    admission: Option<Arc<Semaphore>>,
}

impl AnalysisService {
    pub fn new(
        pipeline: Pipeline,
        store: Arc<JobStore>,
        events: Arc<EventBus>,
        max_concurrent_jobs: Option<usize>,
    ) -> Self {
        Self {
            store,
            pipeline: Arc::new(pipeline),
            events,
            admission: max_concurrent_jobs.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Wire a service from configuration with a fresh job store.
    pub fn from_config(
        config: &PipelineConfig,
        backend: Arc<dyn VideoBackend>,
        estimator: Arc<dyn PoseEstimator>,
        events: Arc<EventBus>,
    ) -> Self {
        Self::new(
            Pipeline::new(config, backend, estimator),
            Arc::new(JobStore::new()),
            events,
            config.max_concurrent_jobs,
        )
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn status(&self, id: &JobId) -> Result<Job, JobStoreError> {
        self.store.get(id)
    }

    /// Record a processing job for `source` and start it in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, source: impl Into<PathBuf>) -> Result<SubmittedJob, JobStoreError> {
        let source = source.into();
        let ticket = self.store.create(uuid::Uuid::new_v4())?;
        let id = ticket.id();

        tracing::info!(job_id = %id, source = %source.display(), "Job submitted");
        self.events.publish(
            PipelineEvent::new(EVENT_JOB_SUBMITTED)
                .with_job(id)
                .with_payload(serde_json::json!({ "source": source.display().to_string() })),
        );

        let pipeline = Arc::clone(&self.pipeline);
        let events = Arc::clone(&self.events);
        let admission = self.admission.clone();

        let task = tokio::spawn(async move {
            let _permit = match admission {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        let job = ticket.fail_with("Analysis service is shutting down")?;
                        events.publish(failed_event(&job));
                        return Ok(job);
                    }
                },
                None => None,
            };

            events.publish(PipelineEvent::new(EVENT_JOB_STARTED).with_job(id));

            let job = pipeline.run(ticket, &source).await?;
            let event = match job.status {
                JobStatus::Complete => PipelineEvent::new(EVENT_JOB_COMPLETED)
                    .with_job(id)
                    .with_payload(serde_json::json!({
                        "video_url": job.video_url,
                        "metrics": job.metrics,
                    })),
                _ => failed_event(&job),
            };
            events.publish(event);
            Ok::<Job, JobStoreError>(job)
        });

        Ok(SubmittedJob { id, task })
    }

    /// Admission permits currently free, or `None` when unbounded.
    pub fn available_slots(&self) -> Option<usize> {
        self.admission.as_ref().map(|s| s.available_permits())
    }
}

fn failed_event(job: &Job) -> PipelineEvent {
    PipelineEvent::new(EVENT_JOB_FAILED)
        .with_job(job.id)
        .with_payload(serde_json::json!({ "error": job.error_message }))
}
