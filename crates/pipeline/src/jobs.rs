//! Job Store: in-memory job lifecycle records.
//!
//! [`JobStore::create`] records a job as processing and hands back the
//! job's only [`JobTicket`]. Settling the ticket consumes it, so a job is
//! completed or failed at most once; the store additionally refuses any
//! transition out of a terminal state. Records are swapped whole under the
//! write lock, so readers see either the processing record or the fully
//! populated terminal one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use cruxvision_core::analysis::Metrics;
use cruxvision_core::job::{Job, JobRecord, JobState, JobStatus};
use cruxvision_core::types::JobId;

use crate::error::JobStoreError;

/// Message recorded for a job whose ticket was dropped unsettled.
pub const ABANDONED_JOB_MESSAGE: &str = "Analysis stopped unexpectedly";

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new processing job and return its ticket.
    pub fn create(self: &Arc<Self>, id: JobId) -> Result<JobTicket, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&id) {
            return Err(JobStoreError::AlreadyExists(id));
        }
        jobs.insert(id, Arc::new(JobRecord::new(id)));
        Ok(JobTicket {
            id,
            store: Arc::clone(self),
            settled: false,
        })
    }

    pub fn get(&self, id: &JobId) -> Result<Job, JobStoreError> {
        self.record(id)
            .map(|record| record.to_job())
            .ok_or(JobStoreError::NotFound(*id))
    }

    /// Snapshot of the internal record.
    pub fn record(&self, id: &JobId) -> Option<Arc<JobRecord>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove terminal jobs created more than `age` ago. Processing jobs
    /// are kept. Returns the number removed.
    pub fn purge_older_than(&self, age: chrono::Duration) -> usize {
        let cutoff = chrono::Utc::now() - age;
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, record| !(record.status().is_terminal() && record.created_at < cutoff));
        let removed = before - jobs.len();
        if removed > 0 {
            tracing::info!(removed, remaining = jobs.len(), "Purged old jobs");
        }
        removed
    }

    /// Compare-and-set from `Processing` to a terminal state.
    fn settle(&self, id: JobId, state: JobState) -> Result<Job, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let current = jobs.get(&id).ok_or(JobStoreError::NotFound(id))?;
        let status = current.status();
        if status.is_terminal() {
            return Err(JobStoreError::AlreadyTerminal { id, status });
        }

        let record = Arc::new(JobRecord {
            id,
            created_at: current.created_at,
            state,
        });
        let job = record.to_job();
        jobs.insert(id, record);
        Ok(job)
    }
}

/// The right to settle one processing job.
#[derive(Debug)]
pub struct JobTicket {
    id: JobId,
    store: Arc<JobStore>,
    settled: bool,
}

impl JobTicket {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn complete_with(
        mut self,
        metrics: Metrics,
        feedback: Vec<String>,
        video_url: String,
    ) -> Result<Job, JobStoreError> {
        self.settled = true;
        self.store.settle(
            self.id,
            JobState::Complete {
                metrics,
                feedback,
                video_url,
            },
        )
    }

    pub fn fail_with(mut self, message: impl Into<String>) -> Result<Job, JobStoreError> {
        self.settled = true;
        self.store.settle(
            self.id,
            JobState::Error {
                message: message.into(),
            },
        )
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::error!(job_id = %self.id, "Job ticket dropped unsettled, failing job");
        let _ = self.store.settle(
            self.id,
            JobState::Error {
                message: ABANDONED_JOB_MESSAGE.to_string(),
            },
        );
    }
}
