//! FFprobe invocation and output parsing.
//!
//! Decoding and encoding pipes live in the pipeline crate; this module
//! only turns `ffprobe` JSON into a [`SourceVideoDescriptor`].

use std::path::Path;

use serde::Deserialize;

use crate::video::{FrameRate, SourceVideoDescriptor};

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("no video stream in {0}")]
    NoVideoStream(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
    /// Display matrix side data carries the rotation on newer ffprobe.
    #[serde(default)]
    pub side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    pub tags: FfprobeStreamTags,
}

/// One entry of a stream's `side_data_list`.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeSideData {
    pub side_data_type: Option<String>,
    /// Counter-clockwise degrees, e.g. `-90` for a portrait phone clip.
    pub rotation: Option<f64>,
}

/// Stream tags; older ffprobe reports rotation as `rotate`.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStreamTags {
    pub rotate: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(ffprobe_bin: &str, path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new(ffprobe_bin)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Build a descriptor from probe output.
///
/// Fails when there is no video stream or it has no usable size or rate.
pub fn describe(path: &Path, probe: &FfprobeOutput) -> Result<SourceVideoDescriptor, FfmpegError> {
    let display = path.to_string_lossy().to_string();
    if first_video_stream(probe).is_none() {
        return Err(FfmpegError::NoVideoStream(display));
    }

    let (coded_width, coded_height) = parse_resolution(probe);
    if coded_width == 0 || coded_height == 0 {
        return Err(FfmpegError::ParseError(format!(
            "video stream in {display} has no resolution"
        )));
    }

    let frame_rate = parse_frame_rate(probe);
    if !frame_rate.is_valid() {
        return Err(FfmpegError::ParseError(format!(
            "video stream in {display} has no frame rate"
        )));
    }

    // ffmpeg autorotates while decoding, so frames arrive at display size.
    let rotation = parse_rotation(probe);
    let (width, height) = if rotation % 180 == 90 {
        (coded_height, coded_width)
    } else {
        (coded_width, coded_height)
    };

    Ok(SourceVideoDescriptor {
        path: path.to_path_buf(),
        width,
        height,
        rotation,
        frame_rate,
        total_frames: parse_total_frames(probe),
        codec: parse_video_codec(probe),
    })
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(secs) = probe.format.duration.as_deref().and_then(|d| d.parse::<f64>().ok()) {
        return secs;
    }
    first_video_stream(probe)
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse the exact video frame rate from `r_frame_rate`.
pub fn parse_frame_rate(probe: &FfprobeOutput) -> FrameRate {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(FrameRate::new(0, 1))
}

/// Parse a fraction string like `"30/1"` (or a plain `"25"`).
fn parse_fraction(s: &str) -> FrameRate {
    match s.split_once('/') {
        Some((num, den)) => FrameRate::new(
            num.trim().parse().unwrap_or(0),
            den.trim().parse().unwrap_or(0),
        ),
        None => FrameRate::new(s.trim().parse().unwrap_or(0), 1),
    }
}

/// Count total frames from ffprobe output.
pub fn parse_total_frames(probe: &FfprobeOutput) -> u64 {
    if let Some(n) = first_video_stream(probe)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|nb| nb.parse::<u64>().ok())
    {
        return n;
    }
    // Estimate from duration * framerate.
    let duration = parse_duration(probe);
    let fps = parse_frame_rate(probe).as_f64();
    if duration > 0.0 && fps > 0.0 {
        return (duration * fps).round() as u64;
    }
    0
}

/// Find the first video stream's codec name.
pub fn parse_video_codec(probe: &FfprobeOutput) -> String {
    first_video_stream(probe)
        .and_then(|s| s.codec_name.clone())
        .unwrap_or_default()
}

/// Clockwise display rotation of the first video stream, snapped to
/// 0, 90, 180 or 270.
///
/// Display-matrix side data wins over the legacy `rotate` tag. The
/// side-data angle is counter-clockwise, the tag is clockwise.
pub fn parse_rotation(probe: &FfprobeOutput) -> u32 {
    let Some(stream) = first_video_stream(probe) else {
        return 0;
    };
    let degrees = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .map(|ccw| -ccw)
        .or_else(|| {
            stream
                .tags
                .rotate
                .as_deref()
                .and_then(|r| r.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0);
    normalize_rotation(degrees)
}

fn normalize_rotation(degrees: f64) -> u32 {
    if !degrees.is_finite() {
        return 0;
    }
    let quarter_turns = (degrees / 90.0).round() as i64;
    (quarter_turns.rem_euclid(4) * 90) as u32
}

/// Find the first video stream's coded resolution.
pub fn parse_resolution(probe: &FfprobeOutput) -> (u32, u32) {
    first_video_stream(probe)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}
