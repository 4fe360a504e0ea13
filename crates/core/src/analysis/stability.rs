//! Torso stability from centroid positional variance.

use crate::landmarks::LandmarkName;
use crate::pose::{Point2, PoseFrame};

/// Landmarks whose centroid tracks the climber's core.
pub const STABILITY_LANDMARKS: [LandmarkName; 4] = [
    LandmarkName::LeftShoulder,
    LandmarkName::RightShoulder,
    LandmarkName::LeftHip,
    LandmarkName::RightHip,
];

/// Centroid variance (normalised units squared) at which the score is 0.5.
pub const STABILITY_REFERENCE_VARIANCE: f64 = 0.01;

/// Core centroid for one frame; `None` unless all four landmarks are present.
pub fn torso_centroid(frame: &PoseFrame) -> Option<Point2> {
    let mut sx = 0.0;
    let mut sy = 0.0;
    for name in STABILITY_LANDMARKS {
        let lm = frame.present(name)?;
        sx += lm.x;
        sy += lm.y;
    }
    let n = STABILITY_LANDMARKS.len() as f64;
    let centroid = Point2::new(sx / n, sy / n);
    (centroid.x.is_finite() && centroid.y.is_finite()).then_some(centroid)
}

/// Summed population variance of x and y.
pub fn positional_variance(points: &[Point2]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;
    let var = points
        .iter()
        .map(|p| (p.x - mean_x).powi(2) + (p.y - mean_y).powi(2))
        .sum::<f64>()
        / n;
    Some(var)
}

/// Stability score in `(0.0, 1.0]`; higher variance gives a lower score.
///
/// `None` when no frame has a complete torso.
pub fn stability_score(frames: &[PoseFrame]) -> Option<f64> {
    let centroids: Vec<Point2> = frames.iter().filter_map(torso_centroid).collect();
    let variance = positional_variance(&centroids)?;
    Some(1.0 / (1.0 + variance / STABILITY_REFERENCE_VARIANCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_has_zero_variance() {
        assert_eq!(positional_variance(&[Point2::new(0.4, 0.6)]), Some(0.0));
    }

    #[test]
    fn variance_of_two_points() {
        let var = positional_variance(&[Point2::new(0.0, 0.0), Point2::new(0.2, 0.0)]).unwrap();
        assert!((var - 0.01).abs() < 1e-12);
    }

    #[test]
    fn empty_sequence_has_no_score() {
        assert_eq!(stability_score(&[]), None);
        assert_eq!(stability_score(&[PoseFrame::no_pose(0, 0.0)]), None);
    }
}
