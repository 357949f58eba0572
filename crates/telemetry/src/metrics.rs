//! In-process engine metrics.
//!
//! Counters are updated by fetchers, the ingestion runner, and the
//! scheduler; the metrics report job logs a snapshot periodically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram with network-scale buckets.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s, +Inf
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [50, 100, 250, 500, 1000, 2500, 5000, 10_000, 30_000, 60_000, u64::MAX];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns (upper bound, count) per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the ingestion engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Fetchers
    pub fetch_attempts: Counter,
    pub fetch_failures: Counter,
    pub fetch_latency_ms: Histogram,

    // Pipeline
    pub parse_errors: Counter,
    pub indicators_created: Counter,
    pub duplicates_skipped: Counter,
    pub zones_unresolved: Counter,
    pub store_errors: Counter,

    // Retention
    pub records_pruned: Counter,

    // Scheduler
    pub job_runs: Counter,
    pub job_failures: Counter,
    pub job_panics: Counter,
    pub job_duration_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            fetch_attempts: self.fetch_attempts.get(),
            fetch_failures: self.fetch_failures.get(),
            fetch_latency_mean_ms: self.fetch_latency_ms.mean(),
            parse_errors: self.parse_errors.get(),
            indicators_created: self.indicators_created.get(),
            duplicates_skipped: self.duplicates_skipped.get(),
            zones_unresolved: self.zones_unresolved.get(),
            store_errors: self.store_errors.get(),
            records_pruned: self.records_pruned.get(),
            job_runs: self.job_runs.get(),
            job_failures: self.job_failures.get(),
            job_panics: self.job_panics.get(),
            job_duration_mean_ms: self.job_duration_ms.mean(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub fetch_attempts: u64,
    pub fetch_failures: u64,
    pub fetch_latency_mean_ms: f64,
    pub parse_errors: u64,
    pub indicators_created: u64,
    pub duplicates_skipped: u64,
    pub zones_unresolved: u64,
    pub store_errors: u64,
    pub records_pruned: u64,
    pub job_runs: u64,
    pub job_failures: u64,
    pub job_panics: u64,
    pub job_duration_mean_ms: f64,
}

impl MetricsSnapshot {
    /// Share of fetches that failed, in percent.
    pub fn fetch_failure_rate(&self) -> f64 {
        if self.fetch_attempts == 0 {
            0.0
        } else {
            self.fetch_failures as f64 / self.fetch_attempts as f64 * 100.0
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
