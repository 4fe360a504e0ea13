//! Heuristic analyzer: aggregate joint angles, a stability score and
//! coaching feedback over a job's full pose sequence.

pub mod angles;
pub mod feedback;
pub mod stability;

use serde::{Deserialize, Serialize};

use self::angles::{mean_angle, ELBOW_TRIPLETS, HIP_TRIPLETS, KNEE_TRIPLETS};
use self::feedback::generate_feedback;
use self::stability::stability_score;
use crate::pose::PoseFrame;

/// Aggregate metrics for one job.
///
/// Every field is nullable: a joint never seen with all three landmarks
/// present has no mean rather than a zero or NaN one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub avg_hip_angle: Option<f64>,
    pub avg_knee_angle: Option<f64>,
    pub avg_elbow_angle: Option<f64>,
    pub stability_score: Option<f64>,
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metrics: Metrics,
    pub feedback: Vec<String>,
    pub frames_analyzed: usize,
    pub frames_with_pose: usize,
}

impl AnalysisReport {
    /// Fraction of analysed frames with a detected pose.
    pub fn pose_coverage(&self) -> Option<f64> {
        (self.frames_analyzed > 0).then(|| self.frames_with_pose as f64 / self.frames_analyzed as f64)
    }
}

/// Compute metrics and feedback over an index-ordered pose sequence.
pub fn analyze(frames: &[PoseFrame]) -> AnalysisReport {
    let metrics = Metrics {
        avg_hip_angle: mean_angle(frames, &HIP_TRIPLETS),
        avg_knee_angle: mean_angle(frames, &KNEE_TRIPLETS),
        avg_elbow_angle: mean_angle(frames, &ELBOW_TRIPLETS),
        stability_score: stability_score(frames),
    };

    let frames_with_pose = frames.iter().filter(|f| f.pose_detected()).count();
    let mut report = AnalysisReport {
        metrics,
        feedback: Vec::new(),
        frames_analyzed: frames.len(),
        frames_with_pose,
    };
    report.feedback = generate_feedback(&report.metrics, report.pose_coverage());
    report
}
