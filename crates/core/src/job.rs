//! Analysis job lifecycle model.
//!
//! Internally a job is a [`JobRecord`] whose [`JobState`] makes the
//! terminal payloads unrepresentable outside their status. Polling
//! clients receive the flat [`Job`] wire record.

use serde::{Deserialize, Serialize};

use crate::analysis::Metrics;
use crate::types::{JobId, Timestamp};

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }
}

/// Lifecycle state with its status-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Processing,
    Complete {
        metrics: Metrics,
        feedback: Vec<String>,
        video_url: String,
    },
    Error {
        message: String,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Processing => JobStatus::Processing,
            JobState::Complete { .. } => JobStatus::Complete,
            JobState::Error { .. } => JobStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub created_at: Timestamp,
    pub state: JobState,
}

impl JobRecord {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            created_at: chrono::Utc::now(),
            state: JobState::Processing,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Flatten into the wire record.
    pub fn to_job(&self) -> Job {
        let mut job = Job {
            id: self.id,
            status: self.status(),
            created_at: self.created_at,
            metrics: None,
            feedback: None,
            video_url: None,
            error_message: None,
        };
        match &self.state {
            JobState::Processing => {}
            JobState::Complete {
                metrics,
                feedback,
                video_url,
            } => {
                job.metrics = Some(*metrics);
                job.feedback = Some(feedback.clone());
                job.video_url = Some(video_url.clone());
            }
            JobState::Error { message } => {
                job.error_message = Some(message.clone());
            }
        }
        job
    }
}

/// Job record as returned to status polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub metrics: Option<Metrics>,
    pub feedback: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
}
