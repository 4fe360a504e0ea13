//! Pose data as produced by an estimator and as persisted per job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::landmarks::{LandmarkGroup, LandmarkName};

// ---------------------------------------------------------------------------
// Estimator output
// ---------------------------------------------------------------------------

/// One landmark exactly as the pose estimator reported it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLandmark {
    pub name: LandmarkName,
    /// Normalised horizontal position (0.0 = left edge, 1.0 = right edge).
    pub x: f64,
    /// Normalised vertical position (0.0 = top edge, 1.0 = bottom edge).
    pub y: f64,
    pub z: Option<f64>,
    pub confidence: f64,
}

impl RawLandmark {
    pub fn new(name: LandmarkName, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            name,
            x,
            y,
            z: None,
            confidence,
        }
    }
}

/// The landmark set for a single detected person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPose {
    pub landmarks: Vec<RawLandmark>,
}

impl RawPose {
    pub fn new(landmarks: Vec<RawLandmark>) -> Self {
        Self { landmarks }
    }
}

// ---------------------------------------------------------------------------
// Classified pose
// ---------------------------------------------------------------------------

/// Coarse confidence bucket. Depends on the confidence value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Medium,
    High,
}

/// A classified landmark. Never dropped, whatever its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub confidence: f64,
    pub tier: Tier,
    /// Whether the confidence meets the threshold of the landmark's group.
    /// Only reliable landmarks count as present for the heuristics.
    pub reliable: bool,
}

impl Landmark {
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Landmarks of one frame keyed (and ordered) by name.
pub type LandmarkMap = BTreeMap<LandmarkName, Landmark>;

/// Per-group confidence summary of a detected pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupConfidence {
    pub mean_confidence: f64,
    pub tier: Tier,
    pub meets_threshold: bool,
}

/// Outcome of pose estimation for one frame.
///
/// `NoPose` is a valid result for an empty or occluded frame, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    NoPose,
    Pose {
        landmarks: LandmarkMap,
        groups: BTreeMap<LandmarkGroup, GroupConfidence>,
    },
}

/// Pose data for one sampled source frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub frame_index: u64,
    pub timestamp_secs: f64,
    pub detection: Detection,
}

impl PoseFrame {
    pub fn no_pose(frame_index: u64, timestamp_secs: f64) -> Self {
        Self {
            frame_index,
            timestamp_secs,
            detection: Detection::NoPose,
        }
    }

    pub fn pose_detected(&self) -> bool {
        matches!(self.detection, Detection::Pose { .. })
    }

    pub fn landmarks(&self) -> Option<&LandmarkMap> {
        match &self.detection {
            Detection::Pose { landmarks, .. } => Some(landmarks),
            Detection::NoPose => None,
        }
    }

    /// A landmark that is both detected and reliable for its group.
    pub fn present(&self, name: LandmarkName) -> Option<&Landmark> {
        self.landmarks()?.get(&name).filter(|lm| lm.reliable)
    }
}

/// Find the pose frame for a source frame index in an index-ordered sequence.
pub fn frame_at(frames: &[PoseFrame], frame_index: u64) -> Option<&PoseFrame> {
    frames
        .binary_search_by_key(&frame_index, |f| f.frame_index)
        .ok()
        .map(|i| &frames[i])
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in normalised image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}
