//! Shared fixtures for pipeline integration tests: an in-memory video
//! backend and scripted pose estimators. Nothing here needs ffmpeg.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cruxvision_core::landmarks::LandmarkName;
use cruxvision_core::pose::{RawLandmark, RawPose};
use cruxvision_core::video::{FrameRate, SourceVideoDescriptor};
use cruxvision_events::EventBus;
use cruxvision_pipeline::estimator::{EstimatorError, PoseEstimator};
use cruxvision_pipeline::video::{
    check_frame_size, FrameDecodeError, FrameReader, FrameWriter, VideoBackend, VideoError,
};
use cruxvision_pipeline::{AnalysisService, PipelineConfig};
use image::{Rgb, RgbImage};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;
const BACKGROUND: [u8; 3] = [40, 40, 40];

// ---------------------------------------------------------------------------
// Synthetic video backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SyntheticVideo {
    pub frames: u64,
    /// Decoding frame `k` fails; the stream ends there.
    pub fail_at: Option<u64>,
    pub frame_rate: FrameRate,
}

impl SyntheticVideo {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            fail_at: None,
            frame_rate: FrameRate::new(30, 1),
        }
    }

    pub fn failing_at(frames: u64, fail_at: u64) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::new(frames)
        }
    }
}

/// Source frame `index`: flat grey with the index encoded in pixel (0, 0).
pub fn source_frame(index: u64) -> RgbImage {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(BACKGROUND));
    image.put_pixel(0, 0, Rgb([(index % 256) as u8, (index / 256) as u8, 7]));
    image
}

pub fn frame_index_of(image: &RgbImage) -> u64 {
    let px = image.get_pixel(0, 0).0;
    px[0] as u64 + px[1] as u64 * 256
}

#[derive(Default)]
pub struct SyntheticBackend {
    videos: Mutex<HashMap<PathBuf, SyntheticVideo>>,
    outputs: Arc<Mutex<HashMap<PathBuf, Vec<RgbImage>>>>,
    fail_write_at: Option<u64>,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(self, path: impl Into<PathBuf>, video: SyntheticVideo) -> Self {
        self.videos
            .lock()
            .unwrap()
            .insert(path.into(), video);
        self
    }

    /// Writing output frame `k` fails with an I/O error.
    pub fn with_write_failure_at(mut self, k: u64) -> Self {
        self.fail_write_at = Some(k);
        self
    }

    /// Frames of a finished output video.
    pub fn written(&self, path: &Path) -> Option<Vec<RgbImage>> {
        self.outputs.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl VideoBackend for SyntheticBackend {
    async fn probe(&self, path: &Path) -> Result<SourceVideoDescriptor, VideoError> {
        let video = self.videos.lock().unwrap().get(path).copied().ok_or_else(|| {
            VideoError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "moov atom not found",
            ))
        })?;
        Ok(SourceVideoDescriptor {
            path: path.to_path_buf(),
            width: WIDTH,
            height: HEIGHT,
            rotation: 0,
            frame_rate: video.frame_rate,
            total_frames: video.frames,
            codec: "synthetic".into(),
        })
    }

    async fn open_reader(
        &self,
        source: &SourceVideoDescriptor,
    ) -> Result<Box<dyn FrameReader>, VideoError> {
        let video = self
            .videos
            .lock()
            .unwrap()
            .get(&source.path)
            .copied()
            .ok_or_else(|| VideoError::Unsupported("unknown source".into()))?;
        Ok(Box::new(SyntheticReader { video, next: 0 }))
    }

    async fn open_writer(
        &self,
        output: &Path,
        like: &SourceVideoDescriptor,
    ) -> Result<Box<dyn FrameWriter>, VideoError> {
        std::fs::File::create(output)?;
        Ok(Box::new(SyntheticWriter {
            path: output.to_path_buf(),
            width: like.width,
            height: like.height,
            frames: Vec::new(),
            fail_at: self.fail_write_at,
            outputs: Arc::clone(&self.outputs),
        }))
    }
}

struct SyntheticReader {
    video: SyntheticVideo,
    next: u64,
}

#[async_trait]
impl FrameReader for SyntheticReader {
    async fn read_frame(&mut self) -> Result<Option<RgbImage>, FrameDecodeError> {
        if Some(self.next) == self.video.fail_at {
            return Err(FrameDecodeError {
                frame_index: self.next,
                reason: "invalid NAL unit".into(),
            });
        }
        if self.next >= self.video.frames {
            return Ok(None);
        }
        let frame = source_frame(self.next);
        self.next += 1;
        Ok(Some(frame))
    }
}

struct SyntheticWriter {
    path: PathBuf,
    width: u32,
    height: u32,
    frames: Vec<RgbImage>,
    fail_at: Option<u64>,
    outputs: Arc<Mutex<HashMap<PathBuf, Vec<RgbImage>>>>,
}

#[async_trait]
impl FrameWriter for SyntheticWriter {
    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        check_frame_size(frame, self.width, self.height)?;
        if Some(self.frames.len() as u64) == self.fail_at {
            return Err(VideoError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<u64, VideoError> {
        let count = self.frames.len() as u64;
        std::fs::write(&self.path, format!("synthetic overlay: {count} frames\n"))?;
        self.outputs.lock().unwrap().insert(self.path.clone(), self.frames);
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Poses
// ---------------------------------------------------------------------------

fn base_position(name: LandmarkName) -> (f64, f64) {
    use LandmarkName::*;
    match name {
        Nose => (0.50, 0.15),
        LeftShoulder => (0.42, 0.30),
        RightShoulder => (0.58, 0.30),
        LeftElbow => (0.34, 0.24),
        RightElbow => (0.66, 0.24),
        LeftWrist => (0.38, 0.10),
        RightWrist => (0.62, 0.10),
        LeftPinky | LeftIndex | LeftThumb => (0.38, 0.08),
        RightPinky | RightIndex | RightThumb => (0.62, 0.08),
        LeftHip => (0.44, 0.55),
        RightHip => (0.56, 0.55),
        LeftKnee => (0.34, 0.68),
        RightKnee => (0.66, 0.70),
        LeftAnkle => (0.40, 0.85),
        RightAnkle => (0.60, 0.86),
        LeftHeel => (0.41, 0.87),
        RightHeel => (0.59, 0.88),
        LeftFootIndex => (0.37, 0.88),
        RightFootIndex => (0.63, 0.89),
        // Eyes, ears and mouth cluster around the nose.
        _ => (0.50, 0.14),
    }
}

/// A full 33-landmark climber pose that sways slightly from frame to frame.
///
/// `torso` applies to the face, shoulders and hips, `limbs` to elbows and
/// knees, `extremities` to hands and feet.
pub fn climber_pose(frame_index: u64, torso: f64, limbs: f64, extremities: f64) -> RawPose {
    use cruxvision_core::landmarks::LandmarkGroup::*;
    let sway = 0.004 * (frame_index % 5) as f64;
    RawPose::new(
        LandmarkName::ALL
            .iter()
            .map(|&name| {
                let (x, y) = base_position(name);
                let confidence = match name.group() {
                    Some(Elbows | Knees) => limbs,
                    Some(Hands | Feet) => extremities,
                    _ => torso,
                };
                RawLandmark::new(name, x + sway, y, confidence)
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Scripted estimators
// ---------------------------------------------------------------------------

type Script = Box<dyn Fn(u64) -> Result<Option<RawPose>, EstimatorError> + Send + Sync>;

/// Estimator answering from a script keyed by source frame index.
///
/// Tracks how many calls overlap so tests can observe job concurrency.
pub struct ScriptedEstimator {
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedEstimator {
    pub fn new(
        script: impl Fn(u64) -> Result<Option<RawPose>, EstimatorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn full_confidence() -> Self {
        Self::new(|i| Ok(Some(climber_pose(i, 0.95, 0.95, 0.95))))
    }

    /// Torso well above 0.7, hands and feet always below 0.1.
    pub fn occluded_extremities() -> Self {
        Self::new(|i| Ok(Some(climber_pose(i, 0.9, 0.8, 0.05))))
    }

    pub fn no_pose() -> Self {
        Self::new(|_| Ok(None))
    }

    pub fn unavailable() -> Self {
        Self::new(|_| Err(EstimatorError::Unavailable("model server refused connection".into())))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoseEstimator for ScriptedEstimator {
    async fn estimate(&self, frame: &RgbImage) -> Result<Option<RawPose>, EstimatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.script)(frame_index_of(frame));

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn test_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.join("outputs"),
        ..PipelineConfig::default()
    }
}

pub fn service(
    config: &PipelineConfig,
    backend: Arc<SyntheticBackend>,
    estimator: Arc<ScriptedEstimator>,
) -> AnalysisService {
    AnalysisService::from_config(config, backend, estimator, Arc::new(EventBus::default()))
}

pub fn overlay_differs_from_source(frame: &RgbImage) -> bool {
    let source = source_frame(frame_index_of(frame));
    frame.as_raw() != source.as_raw()
}
