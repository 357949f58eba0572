//! Job contract and cadences.

use async_trait::async_trait;
use engine_core::{Result, SchedulerError};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::runner::RunOutcome;

/// A unit of background work the scheduler runs on a cadence.
///
/// `execute` runs one iteration. The token is cancelled when the scheduler
/// stops; jobs may use it to cut short internal waits but are expected to
/// finish the iteration they are in.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, cancel: &CancellationToken) -> Result<JobReport>;
}

/// What one iteration accomplished.
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    Ingestion(RunOutcome),
    Retention { deleted: u64 },
    MetricsReport,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingestion(o) => write!(f, "created={} skipped={}", o.created, o.skipped),
            Self::Retention { deleted } => write!(f, "deleted={}", deleted),
            Self::MetricsReport => f.write_str("reported"),
        }
    }
}

/// When a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Execute, sleep `interval`, repeat.
    Periodic(Duration),
    /// Once a day at local `hour:minute`.
    Daily { hour: u32, minute: u32 },
}

impl Cadence {
    pub fn every_minutes(minutes: u64) -> Self {
        Self::Periodic(Duration::from_secs(minutes * 60))
    }

    pub fn validate(&self) -> std::result::Result<(), SchedulerError> {
        match *self {
            Self::Periodic(interval) if interval.is_zero() => Err(SchedulerError::InvalidSchedule(
                "periodic interval must be positive".into(),
            )),
            Self::Daily { hour, minute } if hour > 23 || minute > 59 => Err(
                SchedulerError::InvalidSchedule(format!("{:02}:{:02} is not a time of day", hour, minute)),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic(interval) => write!(f, "every {}s", interval.as_secs()),
            Self::Daily { hour, minute } => write!(f, "daily at {:02}:{:02}", hour, minute),
        }
    }
}

/// A cadence plus whether a daily job also runs once immediately at start.
///
/// Periodic jobs always execute as soon as they start, so the flag only
/// changes behavior for daily jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub cadence: Cadence,
    pub run_on_start: bool,
}

impl Schedule {
    pub fn periodic(interval: Duration) -> Self {
        Cadence::Periodic(interval).into()
    }

    pub fn daily(hour: u32, minute: u32) -> Self {
        Cadence::Daily { hour, minute }.into()
    }

    pub fn run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }
}

impl From<Cadence> for Schedule {
    fn from(cadence: Cadence) -> Self {
        Self {
            cadence,
            run_on_start: false,
        }
    }
}
