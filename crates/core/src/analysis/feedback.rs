//! Deterministic coaching feedback from aggregate metrics.
//!
//! Rules are plain threshold comparisons evaluated in a fixed order, so
//! identical inputs always give the same list. Three lines are always
//! produced (hips, legs, stability); arm and coverage lines are added
//! only when they apply, which keeps the list between 2 and 5 entries.

use super::Metrics;

/// Below this average hip angle the hips are sagging away from the wall.
pub const HIP_DRIFT_BOUND_DEG: f64 = 150.0;

/// Below this average knee angle the climber is crouched most of the time.
pub const KNEE_DEEP_BEND_DEG: f64 = 100.0;

/// Above this average knee angle the legs barely contribute.
pub const KNEE_STRAIGHT_DEG: f64 = 160.0;

/// Below this average elbow angle the climber hangs on bent arms.
pub const ELBOW_BENT_DEG: f64 = 90.0;

pub const STABILITY_LOW: f64 = 0.5;
pub const STABILITY_HIGH: f64 = 0.8;

/// Pose coverage under which filming advice is added.
pub const MIN_POSE_COVERAGE: f64 = 0.5;

pub const MIN_FEEDBACK_ITEMS: usize = 2;
pub const MAX_FEEDBACK_ITEMS: usize = 5;

/// Build the feedback list.
///
/// `coverage` is the fraction of analysed frames in which a pose was
/// detected, or `None` when no frame was analysed.
pub fn generate_feedback(metrics: &Metrics, coverage: Option<f64>) -> Vec<String> {
    let mut feedback = Vec::with_capacity(MAX_FEEDBACK_ITEMS);

    feedback.push(match metrics.avg_hip_angle {
        None => "Hip position could not be assessed. Make sure your shoulders, hips and knees stay in frame.".to_string(),
        Some(a) if a < HIP_DRIFT_BOUND_DEG => format!(
            "Your hips are drifting away from the wall (average hip angle {a:.0}°). Keep them close to the wall to stay over your feet."
        ),
        Some(a) => format!(
            "Good hip positioning: your hips stay close to the wall (average hip angle {a:.0}°)."
        ),
    });

    feedback.push(match metrics.avg_knee_angle {
        None => "Leg technique could not be assessed. Your hips, knees and ankles were not visible together.".to_string(),
        Some(a) if a < KNEE_DEEP_BEND_DEG => format!(
            "Your knees stay deeply bent (average knee angle {a:.0}°). Push through your legs to extend and save your arms."
        ),
        Some(a) if a > KNEE_STRAIGHT_DEG => format!(
            "Your legs stay mostly straight (average knee angle {a:.0}°). Bend your knees more to drive upward from your feet."
        ),
        Some(a) => format!(
            "Good leg engagement: your knees flex and extend through the moves (average knee angle {a:.0}°)."
        ),
    });

    feedback.push(match metrics.stability_score {
        None => "Body stability could not be assessed. Your torso was not clearly visible.".to_string(),
        Some(s) if s < STABILITY_LOW => format!(
            "Your centre of mass moves around a lot (stability {s:.2}). Focus on smooth, controlled weight shifts."
        ),
        Some(s) if s < STABILITY_HIGH => format!(
            "Moderate stability (stability {s:.2}). Pause briefly to settle your weight between moves."
        ),
        Some(s) => format!(
            "Very stable body position (stability {s:.2}). Your weight shifts are smooth and controlled."
        ),
    });

    if let Some(a) = metrics.avg_elbow_angle.filter(|a| *a < ELBOW_BENT_DEG) {
        feedback.push(format!(
            "You climb on bent arms much of the time (average elbow angle {a:.0}°). Hang on straight arms when resting to save energy."
        ));
    }

    if let Some(c) = coverage.filter(|c| *c < MIN_POSE_COVERAGE) {
        feedback.push(format!(
            "A pose was detected in only {:.0}% of analysed frames. Film from further back with your whole body in view for more accurate feedback.",
            c * 100.0
        ));
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(hip: Option<f64>, knee: Option<f64>, elbow: Option<f64>, stability: Option<f64>) -> Metrics {
        Metrics {
            avg_hip_angle: hip,
            avg_knee_angle: knee,
            avg_elbow_angle: elbow,
            stability_score: stability,
        }
    }

    #[test]
    fn always_between_two_and_five_items() {
        let cases = [
            (metrics(None, None, None, None), None),
            (metrics(None, None, None, None), Some(0.0)),
            (metrics(Some(120.0), Some(80.0), Some(60.0), Some(0.2)), Some(0.1)),
            (metrics(Some(170.0), Some(170.0), Some(170.0), Some(0.95)), Some(1.0)),
        ];
        for (m, coverage) in cases {
            let len = generate_feedback(&m, coverage).len();
            assert!((MIN_FEEDBACK_ITEMS..=MAX_FEEDBACK_ITEMS).contains(&len), "len {len}");
        }
    }

    #[test]
    fn hip_drift_triggers_message() {
        let feedback = generate_feedback(&metrics(Some(130.0), Some(130.0), None, Some(0.9)), Some(1.0));
        assert!(feedback[0].contains("drifting"));
    }

    #[test]
    fn identical_metrics_give_identical_feedback() {
        let m = metrics(Some(142.3), Some(97.1), Some(85.0), Some(0.61));
        assert_eq!(generate_feedback(&m, Some(0.4)), generate_feedback(&m, Some(0.4)));
    }

    #[test]
    fn optional_lines_follow_the_core_three() {
        let feedback = generate_feedback(&metrics(Some(170.0), Some(120.0), Some(70.0), Some(0.9)), Some(0.2));
        assert_eq!(feedback.len(), 5);
        assert!(feedback[3].contains("bent arms"));
        assert!(feedback[4].contains("20%"));
    }
}
