//! CruxVision job lifecycle events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: the event envelope published by the analysis service.
//! - [`EventJournal`]: background subscriber that writes every event to the
//!   tracing log.

pub mod bus;
pub mod journal;

pub use bus::{EventBus, PipelineEvent};
pub use journal::EventJournal;
