//! Telemetry for the EcoTrack ingestion engine.
//!
//! There is no metrics backend: counters and job health live in-process and
//! are written to the structured log by the metrics report job.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
