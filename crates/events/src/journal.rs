//! Event journal: mirrors every bus event into the tracing log.
//!
//! Runs as a long-lived background task and stops when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{PipelineEvent, EVENT_JOB_FAILED};

pub struct EventJournal;

impl EventJournal {
    /// Consume events until the channel closes. Returns the number recorded.
    pub async fn run(mut receiver: broadcast::Receiver<PipelineEvent>) -> u64 {
        let mut recorded = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::record(&event);
                    recorded += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event journal lagged, some events were not recorded");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!(recorded, "Event bus closed, journal shutting down");
                    break;
                }
            }
        }
        recorded
    }

    fn record(event: &PipelineEvent) {
        let job_id = event.job_id.map(|id| id.to_string()).unwrap_or_default();
        if event.event_type == EVENT_JOB_FAILED {
            tracing::warn!(
                event_type = %event.event_type,
                job_id = %job_id,
                payload = %event.payload,
                "Pipeline event"
            );
        } else {
            tracing::info!(
                event_type = %event.event_type,
                job_id = %job_id,
                payload = %event.payload,
                "Pipeline event"
            );
        }
    }
}
