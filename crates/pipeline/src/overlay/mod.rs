//! Overlay Renderer: re-walks every source frame and writes the skeleton
//! overlay video.
//!
//! Frames with pose data get the skeleton and the motion trail; every
//! other frame is passed through unmodified, so output frame `i` always
//! corresponds to source frame `i`.

pub mod draw;
pub mod trail;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cruxvision_core::pose::{frame_at, PoseFrame};
use cruxvision_core::video::SourceVideoDescriptor;

use self::draw::{check_drawable, draw_skeleton};
use self::trail::MotionTracer;
use crate::error::PipelineError;
use crate::video::{FrameWriter, VideoBackend};

/// Interval (in frames) between progress log lines.
const PROGRESS_LOG_INTERVAL: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub frames_written: u64,
    pub frames_with_overlay: u64,
}

pub struct OverlayRenderer {
    backend: Arc<dyn VideoBackend>,
    trail_seconds: f64,
}

impl OverlayRenderer {
    pub fn new(backend: Arc<dyn VideoBackend>, trail_seconds: f64) -> Self {
        Self {
            backend,
            trail_seconds,
        }
    }

    /// Render `frames` over the source into `output`.
    ///
    /// A partially written output is removed when rendering fails.
    pub async fn render(
        &self,
        source: &SourceVideoDescriptor,
        frames: &[PoseFrame],
        output: &Path,
    ) -> Result<RenderOutcome, PipelineError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::OverlayWrite(format!("{}: {e}", parent.display())))?;
        }

        let writer = self.backend.open_writer(output, source).await.map_err(|e| {
            PipelineError::OverlayWrite(format!("{}: {e}", output.display()))
        })?;

        match self.render_into(writer, source, frames, output).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(output).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %output.display(), error = %rm, "Failed to remove partial overlay");
                    }
                }
                Err(e)
            }
        }
    }

    async fn render_into(
        &self,
        mut writer: Box<dyn FrameWriter>,
        source: &SourceVideoDescriptor,
        frames: &[PoseFrame],
        output: &Path,
    ) -> Result<RenderOutcome, PipelineError> {
        let write_err = |e: &dyn std::fmt::Display| {
            PipelineError::OverlayWrite(format!("{}: {e}", output.display()))
        };

        let mut reader = self.backend.open_reader(source).await.map_err(|e| {
            PipelineError::SourceUnreadable(format!("{}: {e}", source.path.display()))
        })?;

        let mut tracer = MotionTracer::new(source.frame_rate.as_f64(), self.trail_seconds);
        let mut index: u64 = 0;
        let mut with_overlay: u64 = 0;

        loop {
            let mut image = match reader.read_frame().await {
                Ok(Some(image)) => image,
                Ok(None) => break,
                Err(e) if index == 0 => {
                    return Err(PipelineError::SourceUnreadable(format!(
                        "{}: {e}",
                        source.path.display()
                    )));
                }
                Err(e) => {
                    tracing::warn!(frame_index = index, error = %e, "Decode gap while rendering, ending overlay");
                    break;
                }
            };

            if let Some(pose) = frame_at(frames, index).filter(|f| f.pose_detected()) {
                match check_drawable(&image, pose) {
                    Ok(()) => {
                        let (width, height) = image.dimensions();
                        tracer.observe(pose, width, height);
                        tracer.draw(&mut image, index);
                        if draw_skeleton(&mut image, pose).is_ok() {
                            with_overlay += 1;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(frame_index = index, error = %e, "Skeleton draw failed, passing frame through");
                    }
                }
            }

            writer.write_frame(&image).await.map_err(|e| write_err(&e))?;
            index += 1;

            if index % PROGRESS_LOG_INTERVAL == 0 {
                tracing::debug!(frames_written = index, total_frames = source.total_frames, "Overlay progress");
            }
        }

        let frames_written = writer.finish().await.map_err(|e| write_err(&e))?;

        if source.total_frames > 0 && frames_written != source.total_frames {
            tracing::warn!(
                frames_written,
                total_frames = source.total_frames,
                "Overlay frame count differs from probed source frame count",
            );
        }

        Ok(RenderOutcome {
            output_path: output.to_path_buf(),
            frames_written,
            frames_with_overlay: with_overlay,
        })
    }
}
