//! Domain model for the CruxVision climbing-video analysis pipeline.
//!
//! Everything in this crate is pure: landmark topology, confidence
//! classification, biomechanical heuristics, the job record model and
//! the ffprobe / naming helpers shared by the pipeline and the worker.
//! No internal workspace dependencies.

pub mod analysis;
pub mod confidence;
pub mod ffmpeg;
pub mod job;
pub mod landmarks;
pub mod naming;
pub mod pose;
pub mod skeleton;
pub mod types;
pub mod video;
