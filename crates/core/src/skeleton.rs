//! Skeleton topology and styling for the overlay renderer.
//!
//! Simplified for climbing: no face mesh, just a nose-to-shoulders head
//! indicator, the limbs, and a closed loop per hand.

use crate::landmarks::LandmarkName;
use crate::landmarks::LandmarkName::*;
use crate::pose::Tier;

/// Line segments drawn between landmark pairs.
pub const SKELETON_CONNECTIONS: [(LandmarkName, LandmarkName); 28] = [
    // Head indicator
    (Nose, LeftShoulder),
    (Nose, RightShoulder),
    // Arms
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (RightShoulder, RightElbow),
    (LeftElbow, LeftWrist),
    (RightElbow, RightWrist),
    // Torso
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    // Legs
    (LeftHip, RightHip),
    (LeftHip, LeftKnee),
    (RightHip, RightKnee),
    (LeftKnee, LeftAnkle),
    (RightKnee, RightAnkle),
    // Feet
    (LeftAnkle, LeftHeel),
    (RightAnkle, RightHeel),
    (LeftHeel, LeftFootIndex),
    (RightHeel, RightFootIndex),
    // Left hand
    (LeftWrist, LeftPinky),
    (LeftPinky, LeftIndex),
    (LeftIndex, LeftThumb),
    (LeftThumb, LeftWrist),
    // Right hand
    (RightWrist, RightPinky),
    (RightPinky, RightIndex),
    (RightIndex, RightThumb),
    (RightThumb, RightWrist),
    // Ankle to toe closes the foot triangle
    (LeftAnkle, LeftFootIndex),
    (RightAnkle, RightFootIndex),
];

/// RGB colour.
pub type Rgb = [u8; 3];

pub const CONNECTION_COLOR: Rgb = [255, 255, 255];
pub const CONNECTION_THICKNESS: u32 = 2;
pub const LANDMARK_RADIUS: i32 = 4;
pub const TRAIL_COLOR: Rgb = [0, 200, 255];
pub const TRAIL_THICKNESS: u32 = 3;

/// Joint colour by confidence tier.
pub fn tier_color(tier: Tier) -> Rgb {
    match tier {
        Tier::High => [0, 255, 0],
        Tier::Medium => [255, 255, 0],
        Tier::Low => [255, 0, 0],
    }
}

/// Whether a landmark gets a joint marker on the overlay.
pub fn draws_marker(name: LandmarkName) -> bool {
    !name.is_face_detail()
}
