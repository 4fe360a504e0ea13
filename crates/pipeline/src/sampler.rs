//! Frame Sampler: a finite, single-pass walk over a decoded source video.
//!
//! The sampler decodes every source frame in order, yields every
//! `sample_stride`-th one and stops at the frame-count ceiling. A decode
//! failure on the first frame makes the source unreadable; any later one
//! ends the sequence and everything sampled so far stays valid.

use std::path::Path;

use cruxvision_core::video::SourceVideoDescriptor;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::video::{FrameReader, VideoBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Maximum number of frames yielded.
    pub max_frames: usize,
    /// Yield every Nth decoded frame. Zero is treated as one.
    pub sample_stride: usize,
}

/// One sampled frame with its source index and presentation time.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub index: u64,
    pub timestamp_secs: f64,
    pub image: RgbImage,
}

/// What the sampler did, reported once the sequence ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingSummary {
    pub frames_decoded: u64,
    pub frames_sampled: u64,
    /// The ceiling was hit while more frames remained.
    pub truncated: bool,
    /// Source index of a mid-stream decode failure.
    pub decode_gap_at: Option<u64>,
}

pub struct FrameSampler {
    descriptor: SourceVideoDescriptor,
    reader: Box<dyn FrameReader>,
    settings: SamplerSettings,
    /// First frame, decoded eagerly by `open`.
    pending: Option<RgbImage>,
    next_index: u64,
    summary: SamplingSummary,
    finished: bool,
}

impl FrameSampler {
    /// Probe the source and decode its first frame.
    ///
    /// Fails with [`PipelineError::SourceUnreadable`] when the container
    /// cannot be opened or holds no decodable frame.
    pub async fn open(
        backend: &dyn VideoBackend,
        path: &Path,
        settings: SamplerSettings,
    ) -> Result<Self, PipelineError> {
        let unreadable = |e: &dyn std::fmt::Display| {
            PipelineError::SourceUnreadable(format!("{}: {e}", path.display()))
        };

        let descriptor = backend.probe(path).await.map_err(|e| unreadable(&e))?;
        let mut reader = backend
            .open_reader(&descriptor)
            .await
            .map_err(|e| unreadable(&e))?;

        let first = match reader.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err(unreadable(&"no decodable frames")),
            Err(e) => return Err(unreadable(&e)),
        };

        tracing::debug!(
            path = %path.display(),
            width = descriptor.width,
            height = descriptor.height,
            frame_rate = %descriptor.frame_rate,
            total_frames = descriptor.total_frames,
            codec = %descriptor.codec,
            "Source opened",
        );

        Ok(Self {
            descriptor,
            reader,
            settings: SamplerSettings {
                max_frames: settings.max_frames,
                sample_stride: settings.sample_stride.max(1),
            },
            pending: Some(first),
            next_index: 0,
            summary: SamplingSummary::default(),
            finished: false,
        })
    }

    pub fn descriptor(&self) -> &SourceVideoDescriptor {
        &self.descriptor
    }

    pub fn summary(&self) -> &SamplingSummary {
        &self.summary
    }

    /// Decode up to and including the next sampled frame.
    ///
    /// Returns `None` once the stream ends, a decode gap occurs or the
    /// ceiling is reached; every later call also returns `None`.
    pub async fn next_frame(&mut self) -> Option<SampledFrame> {
        if self.finished {
            return None;
        }

        if self.summary.frames_sampled as usize >= self.settings.max_frames {
            self.finish_at_ceiling().await;
            return None;
        }

        loop {
            let index = self.next_index;
            let image = self.decode_next().await?;
            if index % self.settings.sample_stride as u64 != 0 {
                continue;
            }
            self.summary.frames_sampled += 1;
            return Some(SampledFrame {
                index,
                timestamp_secs: self.descriptor.frame_rate.timestamp_of(index),
                image,
            });
        }
    }

    async fn decode_next(&mut self) -> Option<RgbImage> {
        let decoded = match self.pending.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.reader.read_frame().await,
        };

        match decoded {
            Ok(Some(frame)) => {
                self.next_index += 1;
                self.summary.frames_decoded += 1;
                Some(frame)
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                tracing::warn!(
                    frame_index = self.next_index,
                    error = %e,
                    "Decode gap, ending frame sequence",
                );
                self.summary.decode_gap_at = Some(self.next_index);
                self.finished = true;
                None
            }
        }
    }

    /// Stop at the ceiling, flagging truncation if another sampled frame exists.
    async fn finish_at_ceiling(&mut self) {
        self.finished = true;
        loop {
            let index = self.next_index;
            match self.reader.read_frame().await {
                Ok(Some(_)) => {
                    self.next_index += 1;
                    if index % self.settings.sample_stride as u64 == 0 {
                        self.summary.truncated = true;
                        tracing::warn!(
                            max_frames = self.settings.max_frames,
                            frame_index = index,
                            "Frame ceiling reached, truncating",
                        );
                        return;
                    }
                }
                Ok(None) | Err(_) => return,
            }
        }
    }
}
