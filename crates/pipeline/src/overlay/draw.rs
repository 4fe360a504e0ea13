//! Raster drawing of skeletons onto RGB frames.

use cruxvision_core::landmarks::LandmarkName;
use cruxvision_core::pose::{Point2, PoseFrame};
use cruxvision_core::skeleton::{
    draws_marker, tier_color, Rgb, CONNECTION_COLOR, CONNECTION_THICKNESS, LANDMARK_RADIUS,
    SKELETON_CONNECTIONS,
};
use image::{Rgb as Pixel, RgbImage};

/// A frame the skeleton could not be drawn on. The frame is passed
/// through unmodified.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("landmark {0:?} has a non-finite coordinate")]
    NonFiniteCoordinate(LandmarkName),

    #[error("frame buffer is empty")]
    EmptyFrame,
}

/// Map a normalised point to pixel coordinates, `None` outside the frame.
pub fn to_pixel(point: Point2, width: u32, height: u32) -> Option<(i32, i32)> {
    if !point.x.is_finite() || !point.y.is_finite() {
        return None;
    }
    let x = (point.x * width as f64).floor();
    let y = (point.y * height as f64).floor();
    if x >= 0.0 && x < width as f64 && y >= 0.0 && y < height as f64 {
        Some((x as i32, y as i32))
    } else {
        None
    }
}

/// Check that a frame's pose can be drawn on `image` without touching it.
pub fn check_drawable(image: &RgbImage, frame: &PoseFrame) -> Result<(), DrawError> {
    let Some(landmarks) = frame.landmarks() else {
        return Ok(());
    };
    if image.width() == 0 || image.height() == 0 {
        return Err(DrawError::EmptyFrame);
    }
    match landmarks
        .iter()
        .find(|(_, lm)| !lm.x.is_finite() || !lm.y.is_finite())
    {
        Some((name, _)) => Err(DrawError::NonFiniteCoordinate(*name)),
        None => Ok(()),
    }
}

/// Draw connections and joint markers for a frame's detected pose.
///
/// Coordinates are validated before the first pixel is touched, so an
/// error leaves `image` unmodified. Returns the number of markers drawn.
pub fn draw_skeleton(image: &mut RgbImage, frame: &PoseFrame) -> Result<usize, DrawError> {
    check_drawable(image, frame)?;
    let Some(landmarks) = frame.landmarks() else {
        return Ok(0);
    };

    let (width, height) = image.dimensions();
    let pixel = |name: LandmarkName| {
        landmarks
            .get(&name)
            .and_then(|lm| to_pixel(lm.point(), width, height))
    };

    for (a, b) in SKELETON_CONNECTIONS {
        if let (Some(p), Some(q)) = (pixel(a), pixel(b)) {
            draw_line(image, p, q, CONNECTION_COLOR, CONNECTION_THICKNESS, 1.0);
        }
    }

    let mut markers = 0;
    for (&name, lm) in landmarks {
        if !draws_marker(name) {
            continue;
        }
        if let Some(center) = pixel(name) {
            fill_circle(image, center, LANDMARK_RADIUS, tier_color(lm.tier), 1.0);
            markers += 1;
        }
    }
    Ok(markers)
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Bresenham line; thickness > 1 stamps a disc at every step.
pub fn draw_line(
    image: &mut RgbImage,
    from: (i32, i32),
    to: (i32, i32),
    color: Rgb,
    thickness: u32,
    opacity: f64,
) {
    let (x1, y1) = to;
    let (mut x, mut y) = from;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness / 2) as i32;

    loop {
        if radius == 0 {
            blend_pixel(image, x, y, color, opacity);
        } else {
            fill_circle(image, (x, y), radius, color, opacity);
        }

        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

pub fn fill_circle(image: &mut RgbImage, center: (i32, i32), radius: i32, color: Rgb, opacity: f64) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                blend_pixel(image, cx + dx, cy + dy, color, opacity);
            }
        }
    }
}

/// Alpha-blend `color` over a pixel; out-of-bounds writes are ignored.
pub fn blend_pixel(image: &mut RgbImage, x: i32, y: i32, color: Rgb, opacity: f64) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let alpha = opacity.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    if alpha >= 1.0 {
        *pixel = Pixel(color);
        return;
    }
    for (channel, &target) in pixel.0.iter_mut().zip(color.iter()) {
        let blended = *channel as f64 * (1.0 - alpha) + target as f64 * alpha;
        *channel = blended.round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use cruxvision_core::confidence::ConfidenceClassifier;
    use cruxvision_core::pose::{RawLandmark, RawPose};

    use super::*;

    const BLACK: [u8; 3] = [0, 0, 0];
    const WHITE: [u8; 3] = [255, 255, 255];

    fn frame(landmarks: Vec<RawLandmark>) -> PoseFrame {
        ConfidenceClassifier::default().classify(0, 0.0, Some(&RawPose::new(landmarks)))
    }

    fn hips(confidence: f64) -> Vec<RawLandmark> {
        vec![
            RawLandmark::new(LandmarkName::LeftHip, 0.3, 0.5, confidence),
            RawLandmark::new(LandmarkName::RightHip, 0.7, 0.5, confidence),
        ]
    }

    #[test]
    fn to_pixel_truncates_and_bounds() {
        assert_eq!(to_pixel(Point2::new(0.5, 0.25), 100, 40), Some((50, 10)));
        assert_eq!(to_pixel(Point2::new(1.0, 0.5), 100, 40), None);
        assert_eq!(to_pixel(Point2::new(-0.01, 0.5), 100, 40), None);
        assert_eq!(to_pixel(Point2::new(f64::NAN, 0.5), 100, 40), None);
    }

    #[test]
    fn connection_is_white_and_markers_follow_tier() {
        let mut image = RgbImage::new(100, 100);
        let markers = draw_skeleton(&mut image, &frame(hips(0.9))).unwrap();
        assert_eq!(markers, 2);
        assert_eq!(image.get_pixel(50, 50).0, WHITE);
        assert_eq!(image.get_pixel(30, 50).0, tier_color(cruxvision_core::pose::Tier::High));
    }

    #[test]
    fn low_confidence_is_drawn_red_not_dropped() {
        let mut image = RgbImage::new(100, 100);
        draw_skeleton(&mut image, &frame(hips(0.05))).unwrap();
        assert_eq!(image.get_pixel(70, 50).0, [255, 0, 0]);
    }

    #[test]
    fn face_details_and_out_of_frame_points_are_skipped() {
        let mut image = RgbImage::new(100, 100);
        let markers = draw_skeleton(
            &mut image,
            &frame(vec![
                RawLandmark::new(LandmarkName::LeftEye, 0.2, 0.2, 0.9),
                RawLandmark::new(LandmarkName::Nose, 0.8, 0.2, 0.9),
                RawLandmark::new(LandmarkName::LeftKnee, 1.4, 0.5, 0.9),
            ]),
        )
        .unwrap();
        assert_eq!(markers, 1);
        assert_eq!(image.get_pixel(20, 20).0, BLACK);
        assert_ne!(image.get_pixel(80, 20).0, BLACK);
    }

    #[test]
    fn non_finite_coordinate_leaves_frame_untouched() {
        let mut landmarks = hips(0.9);
        landmarks.push(RawLandmark::new(LandmarkName::LeftKnee, f64::NAN, 0.7, 0.9));
        let mut image = RgbImage::new(100, 100);
        assert_matches!(
            draw_skeleton(&mut image, &frame(landmarks)),
            Err(DrawError::NonFiniteCoordinate(LandmarkName::LeftKnee))
        );
        assert!(image.pixels().all(|p| p.0 == BLACK));
    }

    #[test]
    fn no_pose_draws_nothing() {
        let mut image = RgbImage::new(10, 10);
        assert_eq!(draw_skeleton(&mut image, &PoseFrame::no_pose(3, 0.1)).unwrap(), 0);
        assert!(image.pixels().all(|p| p.0 == BLACK));
    }

    #[test]
    fn half_opacity_blends() {
        let mut image = RgbImage::new(1, 1);
        blend_pixel(&mut image, 0, 0, [200, 100, 0], 0.5);
        assert_eq!(image.get_pixel(0, 0).0, [100, 50, 0]);
        // Out of bounds is ignored.
        blend_pixel(&mut image, 5, -1, WHITE, 1.0);
    }
}
