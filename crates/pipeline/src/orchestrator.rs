//! Pipeline Orchestrator: runs every stage for one job and settles it.
//!
//! A job is either fully complete (metrics, feedback and overlay URL) or
//! failed with one message; nothing partial is ever recorded, and a
//! failed job leaves neither pose data nor overlay behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cruxvision_core::analysis::{analyze, AnalysisReport};
use cruxvision_core::confidence::ConfidenceClassifier;
use cruxvision_core::job::Job;
use cruxvision_core::naming::{overlay_filename, public_url};
use cruxvision_core::pose::PoseFrame;
use cruxvision_core::types::JobId;

use crate::config::PipelineConfig;
use crate::error::{JobStoreError, PipelineError};
use crate::estimator::{EstimatorError, PoseEstimator};
use crate::jobs::JobTicket;
use crate::overlay::{OverlayRenderer, RenderOutcome};
use crate::pose_store::{PoseDocument, PoseStore};
use crate::sampler::{FrameSampler, SamplerSettings, SamplingSummary};
use crate::video::VideoBackend;

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: AnalysisReport,
    pub summary: SamplingSummary,
    pub pose_data_path: PathBuf,
    pub overlay: RenderOutcome,
    pub video_url: String,
}

pub struct Pipeline {
    backend: Arc<dyn VideoBackend>,
    estimator: Arc<dyn PoseEstimator>,
    classifier: ConfidenceClassifier,
    pose_store: PoseStore,
    renderer: OverlayRenderer,
    settings: SamplerSettings,
    output_dir: PathBuf,
    public_url_prefix: String,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        backend: Arc<dyn VideoBackend>,
        estimator: Arc<dyn PoseEstimator>,
    ) -> Self {
        Self {
            renderer: OverlayRenderer::new(Arc::clone(&backend), config.trail_seconds),
            backend,
            estimator,
            classifier: ConfidenceClassifier::default(),
            pose_store: PoseStore::new(&config.output_dir),
            settings: SamplerSettings {
                max_frames: config.max_frames,
                sample_stride: config.sample_stride,
            },
            output_dir: config.output_dir.clone(),
            public_url_prefix: config.public_url_prefix.clone(),
        }
    }

    pub fn with_classifier(mut self, classifier: ConfidenceClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn pose_store(&self) -> &PoseStore {
        &self.pose_store
    }

    /// Run the job and record its terminal state through `ticket`.
    pub async fn run(&self, ticket: JobTicket, source: &Path) -> Result<Job, JobStoreError> {
        let job_id = ticket.id();
        tracing::info!(job_id = %job_id, source = %source.display(), "Job started");

        match self.execute(job_id, source).await {
            Ok(output) => {
                tracing::info!(
                    job_id = %job_id,
                    frames_analyzed = output.report.frames_analyzed,
                    frames_with_pose = output.report.frames_with_pose,
                    frames_written = output.overlay.frames_written,
                    video_url = %output.video_url,
                    "Job complete",
                );
                ticket.complete_with(output.report.metrics, output.report.feedback, output.video_url)
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Job failed");
                ticket.fail_with(e.to_string())
            }
        }
    }

    /// Run every stage without touching the job store.
    pub async fn execute(&self, job_id: JobId, source: &Path) -> Result<PipelineOutput, PipelineError> {
        let (document, summary) = self.extract_poses(job_id, source).await?;

        let pose_data_path = self.pose_store.write(&document).await?;

        let report = analyze(&document.frames);
        tracing::debug!(
            job_id = %job_id,
            metrics = ?report.metrics,
            feedback_items = report.feedback.len(),
            "Heuristics computed",
        );

        let filename = overlay_filename(source, &job_id);
        let output = self.output_dir.join(&filename);
        let overlay = match self
            .renderer
            .render(&document.source, &document.frames, &output)
            .await
        {
            Ok(overlay) => overlay,
            Err(e) => {
                // A failed job keeps no artifacts.
                if let Err(rm) = self.pose_store.discard(&job_id).await {
                    tracing::warn!(job_id = %job_id, error = %rm, "Failed to remove pose data of failed job");
                }
                return Err(e);
            }
        };

        Ok(PipelineOutput {
            report,
            summary,
            pose_data_path,
            overlay,
            video_url: public_url(&self.public_url_prefix, &filename),
        })
    }

    /// Sample the source and classify every sampled frame.
    async fn extract_poses(
        &self,
        job_id: JobId,
        source: &Path,
    ) -> Result<(PoseDocument, SamplingSummary), PipelineError> {
        let mut sampler = FrameSampler::open(self.backend.as_ref(), source, self.settings).await?;
        let mut frames: Vec<PoseFrame> = Vec::new();

        while let Some(frame) = sampler.next_frame().await {
            let raw = match self.estimator.estimate(&frame.image).await {
                Ok(raw) => raw,
                Err(EstimatorError::Frame(reason)) => {
                    tracing::warn!(job_id = %job_id, frame_index = frame.index, reason = %reason, "Pose estimation failed, recording no pose");
                    None
                }
                Err(EstimatorError::Unavailable(reason)) => {
                    return Err(PipelineError::EstimatorUnavailable(reason));
                }
            };
            frames.push(self.classifier.classify(frame.index, frame.timestamp_secs, raw.as_ref()));
        }

        let summary = sampler.summary().clone();
        tracing::info!(
            job_id = %job_id,
            frames_decoded = summary.frames_decoded,
            frames_sampled = summary.frames_sampled,
            truncated = summary.truncated,
            decode_gap_at = ?summary.decode_gap_at,
            "Pose extraction finished",
        );

        let document = PoseDocument {
            job_id,
            source: sampler.descriptor().clone(),
            sample_stride: self.settings.sample_stride.max(1),
            summary: summary.clone(),
            frames,
        };
        Ok((document, summary))
    }
}
