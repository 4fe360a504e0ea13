//! Joint angles from landmark triplets.

use crate::landmarks::LandmarkName;
use crate::pose::{Point2, PoseFrame};

/// Vectors shorter than this are treated as degenerate.
const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// Angle at `vertex` between the rays towards `a` and `c`, in degrees.
///
/// Returns a value in `0.0..=180.0`, or `None` when either ray has
/// zero length (coincident points) or a coordinate is not finite.
pub fn joint_angle(a: Point2, vertex: Point2, c: Point2) -> Option<f64> {
    let (v1x, v1y) = (a.x - vertex.x, a.y - vertex.y);
    let (v2x, v2y) = (c.x - vertex.x, c.y - vertex.y);

    let m1 = v1x.hypot(v1y);
    let m2 = v2x.hypot(v2y);
    if !(m1.is_finite() && m2.is_finite()) || m1 < MIN_SEGMENT_LENGTH || m2 < MIN_SEGMENT_LENGTH {
        return None;
    }

    let cos = ((v1x * v2x + v1y * v2y) / (m1 * m2)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// An anatomical triplet whose middle landmark is the joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointTriplet {
    pub proximal: LandmarkName,
    pub joint: LandmarkName,
    pub distal: LandmarkName,
}

impl JointTriplet {
    const fn new(proximal: LandmarkName, joint: LandmarkName, distal: LandmarkName) -> Self {
        Self {
            proximal,
            joint,
            distal,
        }
    }

    /// The angle for this triplet in one frame, if all three are present.
    pub fn angle_in(&self, frame: &PoseFrame) -> Option<f64> {
        let a = frame.present(self.proximal)?;
        let b = frame.present(self.joint)?;
        let c = frame.present(self.distal)?;
        joint_angle(a.point(), b.point(), c.point())
    }
}

/// Shoulder–hip–knee: torso-to-thigh alignment at the hip.
pub const HIP_TRIPLETS: [JointTriplet; 2] = [
    JointTriplet::new(LandmarkName::LeftShoulder, LandmarkName::LeftHip, LandmarkName::LeftKnee),
    JointTriplet::new(LandmarkName::RightShoulder, LandmarkName::RightHip, LandmarkName::RightKnee),
];

/// Hip–knee–ankle.
pub const KNEE_TRIPLETS: [JointTriplet; 2] = [
    JointTriplet::new(LandmarkName::LeftHip, LandmarkName::LeftKnee, LandmarkName::LeftAnkle),
    JointTriplet::new(LandmarkName::RightHip, LandmarkName::RightKnee, LandmarkName::RightAnkle),
];

/// Shoulder–elbow–wrist.
pub const ELBOW_TRIPLETS: [JointTriplet; 2] = [
    JointTriplet::new(LandmarkName::LeftShoulder, LandmarkName::LeftElbow, LandmarkName::LeftWrist),
    JointTriplet::new(LandmarkName::RightShoulder, LandmarkName::RightElbow, LandmarkName::RightWrist),
];

/// Mean angle over every (frame, side) sample with a complete triplet.
///
/// `None` when no frame qualifies, never NaN.
pub fn mean_angle(frames: &[PoseFrame], triplets: &[JointTriplet]) -> Option<f64> {
    let samples: Vec<f64> = frames
        .iter()
        .flat_map(|frame| triplets.iter().filter_map(move |t| t.angle_in(frame)))
        .collect();

    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}
