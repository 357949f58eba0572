//! Retention policy definitions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default retention horizon for indicator records.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Retention policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum age of an indicator record, in days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

fn default_horizon_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl RetentionPolicy {
    pub fn with_horizon_days(horizon_days: u32) -> Self {
        Self { horizon_days }
    }

    pub fn horizon(&self) -> Duration {
        Duration::days(i64::from(self.horizon_days))
    }

    /// Records with a timestamp strictly before the cutoff are expired.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.horizon()
    }

    pub fn is_expired(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        timestamp < self.cutoff(now)
    }
}
