//! Per-job pose data documents.
//!
//! Each job's classified pose sequence is written exactly once, as
//! `pose_data_{job_id}.json` in the output directory, and then only read.

use std::path::{Path, PathBuf};

use cruxvision_core::naming::pose_data_filename;
use cruxvision_core::pose::PoseFrame;
use cruxvision_core::types::JobId;
use cruxvision_core::video::SourceVideoDescriptor;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::PipelineError;
use crate::sampler::SamplingSummary;

/// Persisted pose data for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDocument {
    pub job_id: JobId,
    pub source: SourceVideoDescriptor,
    pub sample_stride: usize,
    pub summary: SamplingSummary,
    /// Ordered by `frame_index`.
    pub frames: Vec<PoseFrame>,
}

#[derive(Debug, Clone)]
pub struct PoseStore {
    dir: PathBuf,
}

impl PoseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(pose_data_filename(job_id))
    }

    /// Write a job's document. Fails if one already exists for the job.
    pub async fn write(&self, document: &PoseDocument) -> Result<PathBuf, PipelineError> {
        let path = self.path_for(&document.job_id);
        let write_err = |e: &dyn std::fmt::Display| {
            PipelineError::PoseDataWrite(format!("{}: {e}", path.display()))
        };

        let json = serde_json::to_vec_pretty(document).map_err(|e| write_err(&e))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| write_err(&e))?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| write_err(&e))?;
        file.write_all(&json).await.map_err(|e| write_err(&e))?;
        file.flush().await.map_err(|e| write_err(&e))?;

        tracing::debug!(
            job_id = %document.job_id,
            path = %path.display(),
            frames = document.frames.len(),
            "Pose data written",
        );
        Ok(path)
    }

    pub async fn load(&self, job_id: &JobId) -> std::io::Result<PoseDocument> {
        load_document(&self.path_for(job_id)).await
    }

    /// Remove a job's document. A missing document is not an error.
    pub async fn discard(&self, job_id: &JobId) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.path_for(job_id)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

pub async fn load_document(path: &Path) -> std::io::Result<PoseDocument> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
