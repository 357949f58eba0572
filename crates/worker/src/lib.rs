//! Background jobs for the ingestion engine.
//!
//! - Ingestion (fetch, normalize, dedup, persist) per provider
//! - Retention (expired indicator deletion)
//! - Metrics report (periodic snapshot of counters and job health)
//! - Scheduler (periodic and daily cadences, graceful stop)

pub mod config;
pub mod dedup;
pub mod engine;
pub mod job;
pub mod report;
pub mod retention;
pub mod runner;
pub mod scheduler;

pub use config::{DailyTime, DedupConfig, ScheduleConfig, WorkerConfig};
pub use dedup::{DedupPolicy, Deduplicator};
pub use engine::{ingestion_job, register_engine_jobs};
pub use job::{Cadence, Job, JobReport, Schedule};
pub use report::MetricsReportJob;
pub use retention::RetentionJob;
pub use runner::{IngestionJob, JobRunner, RunOutcome};
pub use scheduler::{next_daily_run, Scheduler, ShutdownReport};
