//! Pose estimation capability.
//!
//! The model itself is external. [`PoseEstimator`] is the narrow contract
//! the pipeline consumes; [`ProcessPoseEstimator`] adapts a long-lived
//! helper process speaking a line-oriented protocol:
//!
//! - request: one JSON header line `{"width":W,"height":H}` followed by
//!   `W*H*3` packed RGB bytes;
//! - response: one JSON line, either `null` (no pose) or an array of 33
//!   `{x, y, z, visibility}` objects in landmark index order.

use std::process::Stdio;

use async_trait::async_trait;
use cruxvision_core::landmarks::LandmarkName;
use cruxvision_core::pose::{RawLandmark, RawPose};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// This frame could not be estimated; it is recorded as no pose.
    #[error("pose estimation failed for frame: {0}")]
    Frame(String),

    /// The estimator cannot be reached at all.
    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PoseEstimator: Send + Sync {
    /// Landmarks of the single most prominent person, or `None`.
    async fn estimate(&self, frame: &RgbImage) -> Result<Option<RawPose>, EstimatorError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct WireLandmark {
    x: f64,
    y: f64,
    #[serde(default)]
    z: Option<f64>,
    #[serde(default)]
    visibility: f64,
}

/// Parse one response line from the estimator process.
pub fn parse_response(line: &str) -> Result<Option<RawPose>, EstimatorError> {
    let parsed: Option<Vec<WireLandmark>> = serde_json::from_str(line.trim())
        .map_err(|e| EstimatorError::Frame(format!("malformed response: {e}")))?;

    let Some(wire) = parsed else {
        return Ok(None);
    };
    if wire.len() != LandmarkName::COUNT {
        return Err(EstimatorError::Frame(format!(
            "expected {} landmarks, got {}",
            LandmarkName::COUNT,
            wire.len()
        )));
    }

    let landmarks = LandmarkName::ALL
        .iter()
        .zip(wire)
        .map(|(&name, lm)| RawLandmark {
            name,
            x: lm.x,
            y: lm.y,
            z: lm.z,
            confidence: lm.visibility,
        })
        .collect();
    Ok(Some(RawPose::new(landmarks)))
}

// ---------------------------------------------------------------------------
// ProcessPoseEstimator
// ---------------------------------------------------------------------------

struct EstimatorProcess {
    // Held so the process is killed when the estimator is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Pose estimator backed by an external helper process.
///
/// Requests are serialised; concurrent jobs share the one process.
pub struct ProcessPoseEstimator {
    command: String,
    process: Mutex<EstimatorProcess>,
}

impl ProcessPoseEstimator {
    /// Spawn the helper. `command` is split on whitespace into program
    /// and arguments.
    pub fn spawn(command: &str) -> Result<Self, EstimatorError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| EstimatorError::Unavailable("empty estimator command".into()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EstimatorError::Unavailable(format!("failed to start `{command}`: {e}")))?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                return Err(EstimatorError::Unavailable(
                    "estimator pipes were not captured".into(),
                ))
            }
        };

        tracing::info!(command = %command, "Pose estimator process started");

        Ok(Self {
            command: command.to_string(),
            process: Mutex::new(EstimatorProcess {
                _child: child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
        })
    }

    fn broken(&self, e: std::io::Error) -> EstimatorError {
        EstimatorError::Unavailable(format!("estimator `{}` pipe failed: {e}", self.command))
    }
}

#[async_trait]
impl PoseEstimator for ProcessPoseEstimator {
    async fn estimate(&self, frame: &RgbImage) -> Result<Option<RawPose>, EstimatorError> {
        let header = serde_json::to_string(&FrameHeader {
            width: frame.width(),
            height: frame.height(),
        })
        .map_err(|e| EstimatorError::Frame(e.to_string()))?;

        let mut process = self.process.lock().await;

        process
            .stdin
            .write_all(header.as_bytes())
            .await
            .map_err(|e| self.broken(e))?;
        process.stdin.write_all(b"\n").await.map_err(|e| self.broken(e))?;
        process
            .stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| self.broken(e))?;
        process.stdin.flush().await.map_err(|e| self.broken(e))?;

        let mut line = String::new();
        let read = process
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| self.broken(e))?;
        if read == 0 {
            return Err(EstimatorError::Unavailable(format!(
                "estimator `{}` exited",
                self.command
            )));
        }

        parse_response(&line)
    }
}
