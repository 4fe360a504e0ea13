//! Pipeline configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use validator::Validate;

/// Default frame-count safety ceiling for pose extraction.
pub const DEFAULT_MAX_FRAMES: usize = 2000;
/// Default pose-extraction stride (every frame).
pub const DEFAULT_SAMPLE_STRIDE: usize = 1;
pub const DEFAULT_OUTPUT_DIR: &str = "static/outputs";
pub const DEFAULT_PUBLIC_URL_PREFIX: &str = "/static/outputs";
/// Default motion-trail persistence window in seconds.
pub const DEFAULT_TRAIL_SECONDS: f64 = 2.0;
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
pub const DEFAULT_FFPROBE_BIN: &str = "ffprobe";
/// MPEG-4 Part 2, the `mp4v` fourcc.
pub const DEFAULT_OUTPUT_CODEC: &str = "mpeg4";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid pipeline configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Validate)]
pub struct PipelineConfig {
    /// Maximum number of sampled frames per job.
    #[validate(range(min = 1))]
    pub max_frames: usize,

    /// Pose extraction processes every Nth source frame.
    #[validate(range(min = 1))]
    pub sample_stride: usize,

    /// Where pose documents and overlay videos are written.
    pub output_dir: PathBuf,

    /// Prefix joined with the overlay filename to build `video_url`.
    #[validate(length(min = 1))]
    pub public_url_prefix: String,

    /// Upper bound on jobs running at once; `None` admits every job.
    #[validate(range(min = 1))]
    pub max_concurrent_jobs: Option<usize>,

    #[validate(range(exclusive_min = 0.0))]
    pub trail_seconds: f64,

    #[validate(length(min = 1))]
    pub ffmpeg_bin: String,

    #[validate(length(min = 1))]
    pub ffprobe_bin: String,

    #[validate(length(min = 1))]
    pub output_codec: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            public_url_prefix: DEFAULT_PUBLIC_URL_PREFIX.to_string(),
            max_concurrent_jobs: None,
            trail_seconds: DEFAULT_TRAIL_SECONDS,
            ffmpeg_bin: DEFAULT_FFMPEG_BIN.to_string(),
            ffprobe_bin: DEFAULT_FFPROBE_BIN.to_string(),
            output_codec: DEFAULT_OUTPUT_CODEC.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default           |
    /// |----------------------------|-------------------|
    /// | `CRUX_MAX_FRAMES`          | `2000`            |
    /// | `CRUX_SAMPLE_STRIDE`       | `1`               |
    /// | `CRUX_OUTPUT_DIR`          | `static/outputs`  |
    /// | `CRUX_PUBLIC_URL_PREFIX`   | `/static/outputs` |
    /// | `CRUX_MAX_CONCURRENT_JOBS` | unset (unbounded) |
    /// | `CRUX_TRAIL_SECONDS`       | `2.0`             |
    /// | `CRUX_FFMPEG_BIN`          | `ffmpeg`          |
    /// | `CRUX_FFPROBE_BIN`         | `ffprobe`         |
    /// | `CRUX_OUTPUT_CODEC`        | `mpeg4`           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            max_frames: parse_or(get("CRUX_MAX_FRAMES"), "CRUX_MAX_FRAMES", defaults.max_frames)?,
            sample_stride: parse_or(
                get("CRUX_SAMPLE_STRIDE"),
                "CRUX_SAMPLE_STRIDE",
                defaults.sample_stride,
            )?,
            output_dir: get("CRUX_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_url_prefix: get("CRUX_PUBLIC_URL_PREFIX").unwrap_or(defaults.public_url_prefix),
            max_concurrent_jobs: match get("CRUX_MAX_CONCURRENT_JOBS") {
                Some(raw) => Some(parse_value(&raw, "CRUX_MAX_CONCURRENT_JOBS")?),
                None => None,
            },
            trail_seconds: parse_or(
                get("CRUX_TRAIL_SECONDS"),
                "CRUX_TRAIL_SECONDS",
                defaults.trail_seconds,
            )?,
            ffmpeg_bin: get("CRUX_FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: get("CRUX_FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            output_codec: get("CRUX_OUTPUT_CODEC").unwrap_or(defaults.output_codec),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(&raw, key),
        None => Ok(default),
    }
}

fn parse_value<T>(raw: &str, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
