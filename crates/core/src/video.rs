//! Source video description shared by the sampler and the renderer.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Exact frame rate as a rational, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Whether this rate can time a stream (both terms non-zero).
    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// Presentation time of a frame index, in seconds.
    pub fn timestamp_of(&self, frame_index: u64) -> f64 {
        if self.is_valid() {
            frame_index as f64 * self.denominator as f64 / self.numerator as f64
        } else {
            0.0
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Properties of a source video, derived once when it is opened.
///
/// `width` and `height` are the display size, i.e. what an autorotating
/// decoder emits; for a 90/270 rotation they are the coded size swapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVideoDescriptor {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Clockwise display rotation from container metadata: 0, 90, 180 or 270.
    #[serde(default)]
    pub rotation: u32,
    pub frame_rate: FrameRate,
    /// Container-reported or estimated frame count; may be 0 when unknown.
    pub total_frames: u64,
    pub codec: String,
}

impl SourceVideoDescriptor {
    /// Bytes in one packed RGB24 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_rate() {
        let rate = FrameRate::new(30000, 1001);
        assert!((rate.as_f64() - 29.97).abs() < 0.01);
        assert_eq!(rate.to_string(), "30000/1001");
    }

    #[test]
    fn timestamp_of_frame() {
        let rate = FrameRate::new(25, 1);
        assert!((rate.timestamp_of(50) - 2.0).abs() < 1e-12);
        assert_eq!(FrameRate::new(0, 1).timestamp_of(10), 0.0);
    }

    #[test]
    fn frame_bytes_is_rgb24() {
        let d = SourceVideoDescriptor {
            path: PathBuf::from("a.mp4"),
            width: 4,
            height: 2,
            rotation: 0,
            frame_rate: FrameRate::new(30, 1),
            total_frames: 10,
            codec: "h264".into(),
        };
        assert_eq!(d.frame_bytes(), 24);
    }
}
