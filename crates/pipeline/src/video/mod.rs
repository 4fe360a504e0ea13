//! Video decode/encode seam.
//!
//! The pipeline only sees packed RGB frames through these traits.
//! [`ffmpeg::FfmpegBackend`] is the production implementation; tests
//! plug in synthetic in-memory backends.

pub mod ffmpeg;

use std::path::Path;

use async_trait::async_trait;
use cruxvision_core::ffmpeg::FfmpegError;
use cruxvision_core::video::SourceVideoDescriptor;
use image::RgbImage;

pub use self::ffmpeg::FfmpegBackend;

/// A single frame could not be decoded.
///
/// Mid-stream this ends the frame sequence; on the first frame it makes
/// the source unreadable.
#[derive(Debug, thiserror::Error)]
#[error("frame {frame_index} could not be decoded: {reason}")]
pub struct FrameDecodeError {
    pub frame_index: u64,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame is {actual_width}x{actual_height}, stream is {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("{0}")]
    Unsupported(String),
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Describe a source video without decoding it.
    async fn probe(&self, path: &Path) -> Result<SourceVideoDescriptor, VideoError>;

    /// Start a sequential, single-pass decode of every source frame.
    async fn open_reader(
        &self,
        source: &SourceVideoDescriptor,
    ) -> Result<Box<dyn FrameReader>, VideoError>;

    /// Start an encoder producing a video with the source's size and rate.
    async fn open_writer(
        &self,
        output: &Path,
        like: &SourceVideoDescriptor,
    ) -> Result<Box<dyn FrameWriter>, VideoError>;
}

#[async_trait]
pub trait FrameReader: Send {
    /// The next frame in index order, or `None` at end of stream.
    async fn read_frame(&mut self) -> Result<Option<RgbImage>, FrameDecodeError>;
}

#[async_trait]
pub trait FrameWriter: Send {
    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError>;

    /// Flush and close the output. Returns the number of frames written.
    async fn finish(self: Box<Self>) -> Result<u64, VideoError>;
}

/// Reject frames whose size differs from the stream's.
pub fn check_frame_size(
    frame: &RgbImage,
    width: u32,
    height: u32,
) -> Result<(), VideoError> {
    if frame.width() == width && frame.height() == height {
        Ok(())
    } else {
        Err(VideoError::FrameSize {
            width,
            height,
            actual_width: frame.width(),
            actual_height: frame.height(),
        })
    }
}
