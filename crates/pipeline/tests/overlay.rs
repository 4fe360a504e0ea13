//! Overlay renderer against the synthetic backend.

mod common;

use std::sync::Arc;

use cruxvision_core::confidence::ConfidenceClassifier;
use cruxvision_core::landmarks::LandmarkName;
use cruxvision_core::pose::PoseFrame;
use cruxvision_core::video::SourceVideoDescriptor;
use cruxvision_pipeline::overlay::OverlayRenderer;
use cruxvision_pipeline::video::VideoBackend;
use cruxvision_pipeline::PipelineError;

use assert_matches::assert_matches;
use common::{
    climber_pose, frame_index_of, overlay_differs_from_source, SyntheticBackend, SyntheticVideo,
};

async fn setup(
    frames: SyntheticVideo,
) -> (tempfile::TempDir, Arc<SyntheticBackend>, SourceVideoDescriptor) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("wall.mp4");
    let backend = Arc::new(SyntheticBackend::new().with_video(&source, frames));
    let descriptor = backend.probe(&source).await.unwrap();
    (dir, backend, descriptor)
}

fn pose_frames(indices: impl IntoIterator<Item = u64>) -> Vec<PoseFrame> {
    let classifier = ConfidenceClassifier::default();
    indices
        .into_iter()
        .map(|i| classifier.classify(i, i as f64 / 30.0, Some(&climber_pose(i, 0.9, 0.6, 0.2))))
        .collect()
}

// ---------------------------------------------------------------------------
// Frame correspondence
// ---------------------------------------------------------------------------

/// Output has one frame per source frame, in source order.
#[tokio::test]
async fn output_matches_source_frame_for_frame() {
    let (dir, backend, descriptor) = setup(SyntheticVideo::new(7)).await;
    let output = dir.path().join("out/overlay.mp4");
    let renderer = OverlayRenderer::new(backend.clone(), 2.0);

    let outcome = renderer
        .render(&descriptor, &pose_frames([0, 2, 4]), &output)
        .await
        .unwrap();

    assert_eq!(outcome.frames_written, 7);
    assert_eq!(outcome.frames_with_overlay, 3);
    let written = backend.written(&output).unwrap();
    let order: Vec<u64> = written.iter().map(frame_index_of).collect();
    assert_eq!(order, (0..7).collect::<Vec<_>>());
    let drawn: Vec<bool> = written.iter().map(overlay_differs_from_source).collect();
    assert_eq!(drawn, vec![true, false, true, false, true, false, false]);
}

/// Pose frames past the end of the source are ignored.
#[tokio::test]
async fn pose_frames_beyond_source_are_ignored() {
    let (dir, backend, descriptor) = setup(SyntheticVideo::new(3)).await;
    let output = dir.path().join("overlay.mp4");
    let renderer = OverlayRenderer::new(backend.clone(), 2.0);

    let outcome = renderer
        .render(&descriptor, &pose_frames(0..6), &output)
        .await
        .unwrap();
    assert_eq!(outcome.frames_written, 3);
    assert_eq!(outcome.frames_with_overlay, 3);
}

// ---------------------------------------------------------------------------
// Degraded input
// ---------------------------------------------------------------------------

/// A frame with an undrawable coordinate is written unmodified.
#[tokio::test]
async fn undrawable_frame_passes_through() {
    let (dir, backend, descriptor) = setup(SyntheticVideo::new(2)).await;
    let output = dir.path().join("overlay.mp4");
    let renderer = OverlayRenderer::new(backend.clone(), 2.0);

    let classifier = ConfidenceClassifier::default();
    let mut broken = climber_pose(0, 0.9, 0.9, 0.9);
    for lm in broken.landmarks.iter_mut().filter(|lm| lm.name == LandmarkName::LeftKnee) {
        lm.x = f64::NAN;
    }
    let frames = vec![
        classifier.classify(0, 0.0, Some(&broken)),
        classifier.classify(1, 1.0 / 30.0, Some(&climber_pose(1, 0.9, 0.9, 0.9))),
    ];

    let outcome = renderer.render(&descriptor, &frames, &output).await.unwrap();
    assert_eq!(outcome.frames_written, 2);
    assert_eq!(outcome.frames_with_overlay, 1);
    let written = backend.written(&output).unwrap();
    assert!(!overlay_differs_from_source(&written[0]));
    assert!(overlay_differs_from_source(&written[1]));
}

/// Losing the first frame means the source cannot be read at all.
#[tokio::test]
async fn first_frame_failure_is_source_unreadable() {
    let (dir, backend, descriptor) = setup(SyntheticVideo::failing_at(4, 0)).await;
    let output = dir.path().join("overlay.mp4");
    let renderer = OverlayRenderer::new(backend.clone(), 2.0);

    let result = renderer.render(&descriptor, &[], &output).await;
    assert_matches!(result, Err(PipelineError::SourceUnreadable(_)));
    assert!(!output.exists());
}
