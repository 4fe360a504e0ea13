//! Output file naming for per-job artifacts.

use std::path::Path;

use crate::types::JobId;

/// Number of job-id characters embedded in overlay filenames.
const JOB_ID_PREFIX_LEN: usize = 8;

/// Replace everything except ASCII alphanumerics, `-` and `_` with `_`.
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

fn job_prefix(job_id: &JobId) -> String {
    job_id.simple().to_string()[..JOB_ID_PREFIX_LEN].to_string()
}

/// Overlay video filename for a source video.
///
/// Convention: `overlay_{sanitised source stem}_{job id prefix}.mp4`
///
/// ```
/// use cruxvision_core::naming::overlay_filename;
/// use std::path::Path;
///
/// let id = uuid::Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
/// assert_eq!(overlay_filename(Path::new("uploads/Crux attempt.MOV"), &id), "overlay_Crux_attempt_1b4e28ba.mp4");
/// ```
pub fn overlay_filename(source: &Path, job_id: &JobId) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("overlay_{}_{}.mp4", sanitize_stem(&stem), job_prefix(job_id))
}

/// Pose data document filename: `pose_data_{job id}.json`.
pub fn pose_data_filename(job_id: &JobId) -> String {
    format!("pose_data_{job_id}.json")
}

/// Join a public URL prefix and a filename with exactly one slash.
pub fn public_url(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), filename)
}
