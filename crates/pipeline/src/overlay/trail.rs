//! Motion trail of the hip midpoint.
//!
//! Positions persist for a fixed number of source frames derived from the
//! frame rate, fading linearly with age.

use std::collections::VecDeque;

use cruxvision_core::landmarks::LandmarkName;
use cruxvision_core::pose::PoseFrame;
use cruxvision_core::skeleton::{TRAIL_COLOR, TRAIL_THICKNESS};
use image::RgbImage;

use super::draw::{draw_line, to_pixel};

/// Minimum confidence of both hips for the midpoint to be tracked.
pub const TRAIL_MIN_HIP_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrailPoint {
    x: i32,
    y: i32,
    frame_index: u64,
}

#[derive(Debug)]
pub struct MotionTracer {
    max_age_frames: u64,
    history: VecDeque<TrailPoint>,
}

impl MotionTracer {
    pub fn new(fps: f64, persistence_seconds: f64) -> Self {
        let frames = (fps * persistence_seconds).floor();
        let max_age_frames = if frames.is_finite() && frames >= 1.0 {
            frames as u64
        } else {
            1
        };
        Self {
            max_age_frames,
            history: VecDeque::new(),
        }
    }

    pub fn max_age_frames(&self) -> u64 {
        self.max_age_frames
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Pixel position of the hip midpoint, if both hips are confident
    /// enough and the midpoint lies inside the frame.
    pub fn hip_anchor(frame: &PoseFrame, width: u32, height: u32) -> Option<(i32, i32)> {
        let landmarks = frame.landmarks()?;
        let left = landmarks.get(&LandmarkName::LeftHip)?;
        let right = landmarks.get(&LandmarkName::RightHip)?;
        if left.confidence < TRAIL_MIN_HIP_CONFIDENCE || right.confidence < TRAIL_MIN_HIP_CONFIDENCE {
            return None;
        }
        to_pixel(left.point().midpoint(right.point()), width, height)
    }

    /// Record the anchor of `frame` (if any) and drop expired positions.
    pub fn observe(&mut self, frame: &PoseFrame, width: u32, height: u32) {
        if let Some((x, y)) = Self::hip_anchor(frame, width, height) {
            self.history.push_back(TrailPoint {
                x,
                y,
                frame_index: frame.frame_index,
            });
        }
        self.expire(frame.frame_index);
    }

    fn expire(&mut self, current: u64) {
        while let Some(oldest) = self.history.front() {
            if current.saturating_sub(oldest.frame_index) > self.max_age_frames {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Opacity for a position `age` frames old: 1.0 when new, 0.0 at the
    /// end of the persistence window.
    pub fn fade_opacity(&self, age: u64) -> f64 {
        if age >= self.max_age_frames {
            return 0.0;
        }
        1.0 - age as f64 / self.max_age_frames as f64
    }

    /// Draw the active trail as faded segments. Returns segments drawn.
    pub fn draw(&self, image: &mut RgbImage, current_frame: u64) -> usize {
        let mut drawn = 0;
        let points: Vec<&TrailPoint> = self.history.iter().collect();
        for pair in points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let opacity = self.fade_opacity(current_frame.saturating_sub(to.frame_index));
            if opacity <= 0.0 {
                continue;
            }
            draw_line(
                image,
                (from.x, from.y),
                (to.x, to.y),
                TRAIL_COLOR,
                TRAIL_THICKNESS,
                opacity,
            );
            drawn += 1;
        }
        drawn
    }
}
