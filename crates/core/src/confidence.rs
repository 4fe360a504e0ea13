//! Confidence tiers, per-group thresholds, and the pose-frame classifier.
//!
//! Classification is total: every landmark the estimator reports is kept,
//! whatever its confidence. Occlusion of hands and feet against the wall
//! is routine, so those groups carry the lowest thresholds; the torso
//! groups drive the stability heuristic and carry the highest.

use std::collections::BTreeMap;

use crate::landmarks::{LandmarkGroup, LandmarkName};
use crate::pose::{Detection, GroupConfidence, Landmark, LandmarkMap, PoseFrame, RawPose, Tier};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Confidence at or above which a landmark is tiered `High`.
pub const TIER_HIGH_CUTOFF: f64 = 0.7;

/// Confidence at or above which a landmark is tiered `Medium`.
pub const TIER_MEDIUM_CUTOFF: f64 = 0.3;

/// Nominal floor of the `Low` tier. Landmarks below it are still recorded.
pub const TIER_LOW_CUTOFF: f64 = 0.1;

pub const SHOULDERS_THRESHOLD: f64 = 0.5;
pub const HIPS_THRESHOLD: f64 = 0.5;
pub const ELBOWS_THRESHOLD: f64 = 0.3;
pub const KNEES_THRESHOLD: f64 = 0.3;
pub const HANDS_THRESHOLD: f64 = 0.1;
pub const FEET_THRESHOLD: f64 = 0.1;

/// Threshold for landmarks outside the six groups (face points).
pub const UNGROUPED_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// Tiering
// ---------------------------------------------------------------------------

/// Assign a tier from the confidence value alone.
///
/// - `High`  : confidence >= 0.7
/// - `Medium`: confidence >= 0.3
/// - `Low`   : everything else, including values under 0.1
pub fn tier_for(confidence: f64) -> Tier {
    if confidence >= TIER_HIGH_CUTOFF {
        Tier::High
    } else if confidence >= TIER_MEDIUM_CUTOFF {
        Tier::Medium
    } else {
        Tier::Low
    }
}

/// Clamp an estimator confidence into `0.0..=1.0`. NaN becomes 0.
pub fn sanitize_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Static mapping from landmark group to its confidence cutoff.
///
/// Used to mark landmarks as reliable for analysis and for display;
/// never used to discard anything.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkGroupThresholds {
    groups: BTreeMap<LandmarkGroup, f64>,
    ungrouped: f64,
}

impl Default for LandmarkGroupThresholds {
    fn default() -> Self {
        let groups = BTreeMap::from([
            (LandmarkGroup::Shoulders, SHOULDERS_THRESHOLD),
            (LandmarkGroup::Hips, HIPS_THRESHOLD),
            (LandmarkGroup::Elbows, ELBOWS_THRESHOLD),
            (LandmarkGroup::Knees, KNEES_THRESHOLD),
            (LandmarkGroup::Hands, HANDS_THRESHOLD),
            (LandmarkGroup::Feet, FEET_THRESHOLD),
        ]);
        Self {
            groups,
            ungrouped: UNGROUPED_THRESHOLD,
        }
    }
}

impl LandmarkGroupThresholds {
    pub fn for_group(&self, group: LandmarkGroup) -> f64 {
        self.groups.get(&group).copied().unwrap_or(self.ungrouped)
    }

    pub fn for_landmark(&self, name: LandmarkName) -> f64 {
        name.group()
            .map(|g| self.for_group(g))
            .unwrap_or(self.ungrouped)
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Turns raw estimator output into a [`PoseFrame`].
#[derive(Debug, Clone, Default)]
pub struct ConfidenceClassifier {
    thresholds: LandmarkGroupThresholds,
}

impl ConfidenceClassifier {
    pub fn new(thresholds: LandmarkGroupThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &LandmarkGroupThresholds {
        &self.thresholds
    }

    /// Classify the estimator output for one frame.
    ///
    /// `None` (or a pose with no landmarks) yields an explicit no-pose frame.
    /// If the estimator repeats a landmark name, the last report wins.
    pub fn classify(&self, frame_index: u64, timestamp_secs: f64, raw: Option<&RawPose>) -> PoseFrame {
        let raw = match raw {
            Some(raw) if !raw.landmarks.is_empty() => raw,
            _ => return PoseFrame::no_pose(frame_index, timestamp_secs),
        };

        let mut landmarks = LandmarkMap::new();
        for lm in &raw.landmarks {
            let confidence = sanitize_confidence(lm.confidence);
            landmarks.insert(
                lm.name,
                Landmark {
                    x: lm.x,
                    y: lm.y,
                    z: lm.z,
                    confidence,
                    tier: tier_for(confidence),
                    reliable: confidence >= self.thresholds.for_landmark(lm.name),
                },
            );
        }

        let groups = self.summarize_groups(&landmarks);

        PoseFrame {
            frame_index,
            timestamp_secs,
            detection: Detection::Pose { landmarks, groups },
        }
    }

    fn summarize_groups(&self, landmarks: &LandmarkMap) -> BTreeMap<LandmarkGroup, GroupConfidence> {
        let mut summary = BTreeMap::new();
        for group in LandmarkGroup::ALL {
            let confidences: Vec<f64> = group
                .members()
                .filter_map(|name| landmarks.get(&name).map(|lm| lm.confidence))
                .collect();
            if confidences.is_empty() {
                continue;
            }
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            summary.insert(
                group,
                GroupConfidence {
                    mean_confidence: mean,
                    tier: tier_for(mean),
                    meets_threshold: mean >= self.thresholds.for_group(group),
                },
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::RawLandmark;

    fn single(name: LandmarkName, confidence: f64) -> RawPose {
        RawPose::new(vec![RawLandmark::new(name, 0.5, 0.5, confidence)])
    }

    #[test]
    fn tiers_depend_on_confidence_only() {
        let classifier = ConfidenceClassifier::default();
        for name in [
            LandmarkName::LeftShoulder,
            LandmarkName::LeftElbow,
            LandmarkName::LeftWrist,
            LandmarkName::LeftHip,
            LandmarkName::LeftKnee,
            LandmarkName::LeftAnkle,
            LandmarkName::Nose,
        ] {
            for (c, expected) in [
                (1.0, Tier::High),
                (0.7, Tier::High),
                (0.69, Tier::Medium),
                (0.3, Tier::Medium),
                (0.29, Tier::Low),
                (0.1, Tier::Low),
                (0.0, Tier::Low),
            ] {
                let frame = classifier.classify(0, 0.0, Some(&single(name, c)));
                let lm = frame.landmarks().unwrap()[&name];
                assert_eq!(lm.tier, expected, "{name:?} at {c}");
            }
        }
    }

    #[test]
    fn low_confidence_hand_is_retained_and_reliable() {
        let classifier = ConfidenceClassifier::default();
        let frame = classifier.classify(4, 0.2, Some(&single(LandmarkName::RightWrist, 0.15)));
        let lm = frame.landmarks().unwrap()[&LandmarkName::RightWrist];
        assert_eq!(lm.tier, Tier::Low);
        assert!(lm.reliable);
    }

    #[test]
    fn group_thresholds_differ_per_group() {
        let classifier = ConfidenceClassifier::default();
        // 0.4 clears elbows/knees/hands/feet but not shoulders/hips.
        let cases = [
            (LandmarkName::LeftShoulder, false),
            (LandmarkName::LeftHip, false),
            (LandmarkName::LeftElbow, true),
            (LandmarkName::LeftKnee, true),
            (LandmarkName::LeftWrist, true),
            (LandmarkName::LeftHeel, true),
        ];
        for (name, reliable) in cases {
            let frame = classifier.classify(0, 0.0, Some(&single(name, 0.4)));
            assert_eq!(frame.landmarks().unwrap()[&name].reliable, reliable, "{name:?}");
        }
    }

    #[test]
    fn below_low_cutoff_is_still_recorded() {
        let classifier = ConfidenceClassifier::default();
        let frame = classifier.classify(0, 0.0, Some(&single(LandmarkName::LeftAnkle, 0.02)));
        let lm = frame.landmarks().unwrap()[&LandmarkName::LeftAnkle];
        assert_eq!(lm.tier, Tier::Low);
        assert!(!lm.reliable);
    }

    #[test]
    fn missing_or_empty_pose_is_no_pose() {
        let classifier = ConfidenceClassifier::default();
        assert!(!classifier.classify(0, 0.0, None).pose_detected());
        assert!(!classifier.classify(0, 0.0, Some(&RawPose::default())).pose_detected());
    }

    #[test]
    fn nan_and_out_of_range_confidences_are_clamped() {
        let classifier = ConfidenceClassifier::default();
        let raw = RawPose::new(vec![
            RawLandmark::new(LandmarkName::LeftHip, 0.5, 0.5, f64::NAN),
            RawLandmark::new(LandmarkName::RightHip, 0.5, 0.5, 1.7),
        ]);
        let frame = classifier.classify(0, 0.0, Some(&raw));
        let landmarks = frame.landmarks().unwrap();
        assert_eq!(landmarks[&LandmarkName::LeftHip].confidence, 0.0);
        assert_eq!(landmarks[&LandmarkName::RightHip].confidence, 1.0);
    }

    #[test]
    fn group_summary_uses_mean_confidence() {
        let classifier = ConfidenceClassifier::default();
        let raw = RawPose::new(vec![
            RawLandmark::new(LandmarkName::LeftHip, 0.4, 0.6, 0.9),
            RawLandmark::new(LandmarkName::RightHip, 0.6, 0.6, 0.5),
        ]);
        let frame = classifier.classify(0, 0.0, Some(&raw));
        let Detection::Pose { groups, .. } = &frame.detection else {
            panic!("expected a pose");
        };
        let hips = groups[&LandmarkGroup::Hips];
        assert!((hips.mean_confidence - 0.7).abs() < 1e-9);
        assert_eq!(hips.tier, Tier::High);
        assert!(hips.meets_threshold);
        assert!(!groups.contains_key(&LandmarkGroup::Hands));
    }
}
