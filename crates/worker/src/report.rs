//! Periodic metrics and health report.

use async_trait::async_trait;
use engine_core::Result;
use telemetry::{health, metrics, HealthStatus, MetricsSnapshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::job::{Job, JobReport};

pub const METRICS_REPORT_JOB: &str = "metrics_report_job";

/// Fetch failure rate (percent) above which the report raises a warning.
pub const DEFAULT_FAILURE_RATE_THRESHOLD: f64 = 50.0;

/// Something in a snapshot worth a warning.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    HighFetchFailureRate { rate: f64, threshold: f64 },
    JobUnhealthy { job: String, consecutive_failures: u32, last_error: Option<String> },
}

pub struct MetricsReportJob {
    failure_rate_threshold: f64,
}

impl Default for MetricsReportJob {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReportJob {
    pub fn new() -> Self {
        Self {
            failure_rate_threshold: DEFAULT_FAILURE_RATE_THRESHOLD,
        }
    }

    pub fn with_failure_rate_threshold(mut self, threshold: f64) -> Self {
        self.failure_rate_threshold = threshold;
        self
    }

    /// Alerts raised by a snapshot plus the current health report.
    pub fn alerts(&self, snapshot: &MetricsSnapshot, report: &telemetry::HealthReport) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let rate = snapshot.fetch_failure_rate();
        if rate >= self.failure_rate_threshold {
            alerts.push(Alert::HighFetchFailureRate {
                rate,
                threshold: self.failure_rate_threshold,
            });
        }

        for job in &report.jobs {
            if job.status == HealthStatus::Unhealthy {
                alerts.push(Alert::JobUnhealthy {
                    job: job.name.clone(),
                    consecutive_failures: job.consecutive_failures,
                    last_error: job.last_error.clone(),
                });
            }
        }

        alerts
    }
}

#[async_trait]
impl Job for MetricsReportJob {
    fn name(&self) -> &str {
        METRICS_REPORT_JOB
    }

    async fn execute(&self, _cancel: &CancellationToken) -> Result<JobReport> {
        let snapshot = metrics().snapshot();
        let report = health().report();

        info!(
            fetch_attempts = snapshot.fetch_attempts,
            fetch_failures = snapshot.fetch_failures,
            fetch_latency_mean_ms = snapshot.fetch_latency_mean_ms,
            indicators_created = snapshot.indicators_created,
            duplicates_skipped = snapshot.duplicates_skipped,
            parse_errors = snapshot.parse_errors,
            store_errors = snapshot.store_errors,
            records_pruned = snapshot.records_pruned,
            job_runs = snapshot.job_runs,
            job_failures = snapshot.job_failures,
            job_panics = snapshot.job_panics,
            health = ?report.status,
            "Engine metrics"
        );

        for alert in self.alerts(&snapshot, &report) {
            match alert {
                Alert::HighFetchFailureRate { rate, threshold } => {
                    warn!(rate_percent = rate, threshold, "High provider fetch failure rate");
                }
                Alert::JobUnhealthy { job, consecutive_failures, last_error } => {
                    warn!(job = %job, consecutive_failures, last_error = ?last_error, "Job unhealthy");
                }
            }
        }

        Ok(JobReport::MetricsReport)
    }
}
