//! The CruxVision analysis pipeline.
//!
//! Stages run sequentially for one job inside a background task:
//!
//! 1. [`sampler::FrameSampler`] walks the decoded source video.
//! 2. A [`estimator::PoseEstimator`] turns each sampled frame into raw
//!    landmarks, classified by `cruxvision_core::confidence`.
//! 3. The pose sequence is persisted once by [`pose_store::PoseStore`].
//! 4. `cruxvision_core::analysis` computes metrics and feedback.
//! 5. [`overlay::OverlayRenderer`] re-walks every source frame and writes
//!    the skeleton overlay video.
//!
//! [`orchestrator::Pipeline`] runs the stages; [`service::AnalysisService`]
//! owns the [`jobs::JobStore`], admission control and lifecycle events.

pub mod config;
pub mod error;
pub mod estimator;
pub mod jobs;
pub mod orchestrator;
pub mod overlay;
pub mod pose_store;
pub mod sampler;
pub mod service;
pub mod video;

pub use config::PipelineConfig;
pub use error::{JobStoreError, PipelineError};
pub use jobs::{JobStore, JobTicket};
pub use orchestrator::Pipeline;
pub use service::{AnalysisService, SubmittedJob};
