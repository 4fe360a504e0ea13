use cruxvision_core::job::JobStatus;
use cruxvision_core::types::JobId;

/// Conditions that make a job as a whole meaningless.
///
/// The `Display` text becomes the job's `error_message`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Source video unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Failed to write overlay video: {0}")]
    OverlayWrite(String),

    #[error("Failed to write pose data: {0}")]
    PoseDataWrite(String),

    #[error("Pose estimator unavailable: {0}")]
    EstimatorUnavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {0} already exists")]
    AlreadyExists(JobId),

    #[error("Job {id} is already {status:?}")]
    AlreadyTerminal { id: JobId, status: JobStatus },
}
