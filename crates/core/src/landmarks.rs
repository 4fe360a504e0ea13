//! Body landmark topology (MediaPipe 33-point layout) and the six
//! landmark groups used for confidence classification.

use serde::{Deserialize, Serialize};

/// A named anatomical point, in MediaPipe index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum LandmarkName {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkName {
    pub const COUNT: usize = 33;

    /// Every landmark, in index order.
    pub const ALL: [LandmarkName; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The confidence group this landmark belongs to, if any.
    ///
    /// Face landmarks (eyes, ears, mouth, nose) are ungrouped.
    pub fn group(self) -> Option<LandmarkGroup> {
        use LandmarkName::*;
        match self {
            LeftShoulder | RightShoulder => Some(LandmarkGroup::Shoulders),
            LeftElbow | RightElbow => Some(LandmarkGroup::Elbows),
            LeftWrist | RightWrist | LeftPinky | RightPinky | LeftIndex | RightIndex
            | LeftThumb | RightThumb => Some(LandmarkGroup::Hands),
            LeftHip | RightHip => Some(LandmarkGroup::Hips),
            LeftKnee | RightKnee => Some(LandmarkGroup::Knees),
            LeftAnkle | RightAnkle | LeftHeel | RightHeel | LeftFootIndex | RightFootIndex => {
                Some(LandmarkGroup::Feet)
            }
            _ => None,
        }
    }

    /// Face detail points that the overlay does not draw.
    pub fn is_face_detail(self) -> bool {
        (1..=10).contains(&self.index())
    }
}

/// Landmark groups with their own confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkGroup {
    Shoulders,
    Elbows,
    Hands,
    Hips,
    Knees,
    Feet,
}

impl LandmarkGroup {
    pub const ALL: [LandmarkGroup; 6] = [
        Self::Shoulders,
        Self::Elbows,
        Self::Hands,
        Self::Hips,
        Self::Knees,
        Self::Feet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shoulders => "shoulders",
            Self::Elbows => "elbows",
            Self::Hands => "hands",
            Self::Hips => "hips",
            Self::Knees => "knees",
            Self::Feet => "feet",
        }
    }

    /// Landmarks belonging to this group.
    pub fn members(self) -> impl Iterator<Item = LandmarkName> {
        LandmarkName::ALL
            .into_iter()
            .filter(move |name| name.group() == Some(self))
    }
}
