//! Per-job health tracking.
//!
//! The scheduler records the outcome of every iteration here. Because the
//! engine has no synchronous caller, this registry (and the log) is the only
//! place a persistently failing job becomes visible.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health status for a job or for the engine as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Consecutive failures after which a job counts as unhealthy.
pub const UNHEALTHY_AFTER_FAILURES: u32 = 3;

/// Recorded state of one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobHealth {
    pub runs: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl JobHealth {
    pub fn status(&self) -> HealthStatus {
        match self.consecutive_failures {
            0 => HealthStatus::Healthy,
            n if n < UNHEALTHY_AFTER_FAILURES => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        }
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub jobs: Vec<JobHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHealthReport {
    pub name: String,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Registry of job health keyed by job name.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    jobs: RwLock<BTreeMap<String, JobHealth>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a job visible in reports before its first run.
    pub fn register(&self, job: &str) {
        self.jobs.write().entry(job.to_string()).or_default();
    }

    pub fn record_success(&self, job: &str) {
        let mut jobs = self.jobs.write();
        let entry = jobs.entry(job.to_string()).or_default();
        entry.runs += 1;
        entry.consecutive_failures = 0;
        entry.last_success = Some(Utc::now());
    }

    pub fn record_failure(&self, job: &str, error: impl Into<String>) {
        let mut jobs = self.jobs.write();
        let entry = jobs.entry(job.to_string()).or_default();
        entry.runs += 1;
        entry.failures += 1;
        entry.consecutive_failures += 1;
        entry.last_failure = Some(Utc::now());
        entry.last_error = Some(error.into());
    }

    pub fn job(&self, job: &str) -> Option<JobHealth> {
        self.jobs.read().get(job).cloned()
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        let jobs: Vec<JobHealthReport> = self
            .jobs
            .read()
            .iter()
            .map(|(name, h)| JobHealthReport {
                name: name.clone(),
                status: h.status(),
                consecutive_failures: h.consecutive_failures,
                last_success: h.last_success,
                last_error: h.last_error.clone(),
            })
            .collect();

        let status = if jobs.iter().all(|j| j.status.is_healthy()) {
            HealthStatus::Healthy
        } else if jobs.iter().any(|j| j.status.is_healthy()) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, jobs }
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
