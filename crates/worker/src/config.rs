//! Worker configuration: cadences, dedup window, retention, shutdown.

use engine_core::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::job::{Cadence, Schedule};

/// Local wall-clock time of a daily job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DailyTime {
    #[validate(range(max = 23))]
    pub hour: u32,
    #[validate(range(max = 59))]
    pub minute: u32,
}

impl DailyTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn cadence(&self) -> Cadence {
        Cadence::Daily {
            hour: self.hour,
            minute: self.minute,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScheduleConfig {
    #[validate(range(min = 1))]
    pub weather_interval_mins: u64,
    #[validate(range(min = 1))]
    pub air_quality_interval_mins: u64,
    #[validate(nested)]
    pub energy_at: DailyTime,
    #[validate(nested)]
    pub retention_at: DailyTime,
    #[validate(range(min = 1))]
    pub metrics_report_interval_mins: u64,
    /// Run the daily energy job once immediately at startup.
    pub run_on_start: bool,
    /// Pause between zones of the air-quality job.
    pub air_quality_zone_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weather_interval_mins: 120,
            air_quality_interval_mins: 60,
            energy_at: DailyTime::new(6, 0),
            retention_at: DailyTime::new(2, 0),
            metrics_report_interval_mins: 15,
            run_on_start: true,
            air_quality_zone_delay_ms: 1000,
        }
    }
}

impl ScheduleConfig {
    pub fn weather(&self) -> Schedule {
        Cadence::every_minutes(self.weather_interval_mins).into()
    }

    pub fn air_quality(&self) -> Schedule {
        Cadence::every_minutes(self.air_quality_interval_mins).into()
    }

    pub fn energy(&self) -> Schedule {
        Schedule::from(self.energy_at.cadence()).run_on_start(self.run_on_start)
    }

    pub fn retention(&self) -> Schedule {
        self.retention_at.cadence().into()
    }

    pub fn metrics_report(&self) -> Schedule {
        Cadence::every_minutes(self.metrics_report_interval_mins).into()
    }

    pub fn air_quality_zone_delay(&self) -> Duration {
        Duration::from_millis(self.air_quality_zone_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DedupConfig {
    /// How long an air-quality reading keeps its zone "fresh".
    #[validate(range(min = 1))]
    pub freshness_window_mins: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            freshness_window_mins: 60,
        }
    }
}

impl DedupConfig {
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.freshness_window_mins)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorkerConfig {
    /// Owner stamped on every indicator the engine creates.
    pub owner_id: i64,
    #[validate(nested)]
    pub schedule: ScheduleConfig,
    #[validate(nested)]
    pub dedup: DedupConfig,
    pub retention: RetentionPolicy,
    /// Upper bound on waiting for jobs at shutdown.
    #[validate(range(min = 1, max = 300))]
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            owner_id: 1,
            schedule: ScheduleConfig::default(),
            dedup: DedupConfig::default(),
            retention: RetentionPolicy::default(),
            shutdown_timeout_secs: 5,
        }
    }
}

impl WorkerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
