//! `cruxvision-worker` -- runs climbing videos through the analysis
//! pipeline from the command line.
//!
//! Usage: `cruxvision-worker <video>...`
//!
//! Every video is submitted to an in-process [`AnalysisService`]; each
//! job is polled until terminal and its record printed as JSON. The
//! process exits non-zero when any job failed.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default           | Description                                  |
//! |----------------------------|----------|-------------------|----------------------------------------------|
//! | `POSE_ESTIMATOR_CMD`       | yes      | --                | Command line of the pose-estimation helper   |
//! | `POLL_INTERVAL_MS`         | no       | `500`             | Milliseconds between job status polls        |
//! | `LOG_FORMAT`               | no       | `text`            | `json` for structured log lines              |
//! | `CRUX_*`                   | no       | see `PipelineConfig` | Pipeline tuning                           |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cruxvision_events::{EventBus, EventJournal};
use cruxvision_pipeline::estimator::ProcessPoseEstimator;
use cruxvision_pipeline::video::FfmpegBackend;
use cruxvision_pipeline::{AnalysisService, PipelineConfig};
use cruxvision_worker::poll;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default interval between job status polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let sources: Vec<String> = std::env::args().skip(1).collect();
    if sources.is_empty() {
        tracing::error!("Usage: cruxvision-worker <video>...");
        std::process::exit(2);
    }

    let estimator_cmd = std::env::var("POSE_ESTIMATOR_CMD").unwrap_or_else(|_| {
        tracing::error!("POSE_ESTIMATOR_CMD environment variable is required");
        std::process::exit(1);
    });

    let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;

    tracing::info!(
        videos = sources.len(),
        output_dir = %config.output_dir.display(),
        max_frames = config.max_frames,
        sample_stride = config.sample_stride,
        max_concurrent_jobs = ?config.max_concurrent_jobs,
        "Starting cruxvision-worker",
    );

    let backend = Arc::new(FfmpegBackend::new(
        config.ffmpeg_bin.clone(),
        config.ffprobe_bin.clone(),
        config.output_codec.clone(),
    ));
    let estimator = Arc::new(
        ProcessPoseEstimator::spawn(&estimator_cmd).context("failed to start pose estimator")?,
    );

    let events = Arc::new(EventBus::default());
    let journal = tokio::spawn(EventJournal::run(events.subscribe()));

    let service = AnalysisService::from_config(&config, backend, estimator, Arc::clone(&events));

    let mut submitted = Vec::with_capacity(sources.len());
    for source in &sources {
        let job = service
            .submit(source)
            .with_context(|| format!("failed to submit {source}"))?;
        submitted.push(job);
    }

    let interval = Duration::from_millis(poll_interval_ms);
    let mut jobs = Vec::with_capacity(submitted.len());
    for job in &submitted {
        let record = poll::wait_for_terminal(service.store(), &job.id, interval).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        jobs.push(record);
    }

    // Dropping the service and the last bus handle closes the journal.
    drop(service);
    drop(events);
    let recorded = journal.await.unwrap_or(0);

    let failed = poll::failed_count(&jobs);
    tracing::info!(jobs = jobs.len(), failed, events = recorded, "Worker finished");

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cruxvision_worker=info,cruxvision_pipeline=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
