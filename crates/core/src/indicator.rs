//! Canonical indicator records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Indicator type tags written by the bundled providers.
pub mod types {
    pub const TEMPERATURE: &str = "temperature";
    pub const HUMIDITY: &str = "humidity";
    pub const WIND_SPEED: &str = "wind_speed";
    pub const PRESSURE: &str = "pressure";

    /// Common prefix of every air quality tag.
    pub const AIR_QUALITY_PREFIX: &str = "air_quality_";
    pub const AIR_QUALITY_PM25: &str = "air_quality_pm25";
    pub const AIR_QUALITY_PM10: &str = "air_quality_pm10";
    pub const AIR_QUALITY_NO2: &str = "air_quality_no2";

    pub const ENERGY_CONSUMPTION: &str = "energy_consumption";
    pub const CO2: &str = "co2";

    /// Tags gated together by the daily energy check.
    pub const ENERGY_SET: &[&str] = &[ENERGY_CONSUMPTION, CO2];
}

/// A normalized reading that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct IndicatorDraft {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64))]
    pub indicator_type: String,
    pub value: f64,
    #[validate(length(max = 32))]
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub zone_id: i64,
    pub source_id: i64,
    pub owner_id: i64,
    /// Provenance blob (JSON text). Never parsed by the engine.
    pub metadata: String,
}

impl IndicatorDraft {
    /// Logical identity of the reading: (type, zone, source, timestamp).
    pub fn key(&self) -> IndicatorKey<'_> {
        IndicatorKey {
            indicator_type: &self.indicator_type,
            zone_id: self.zone_id,
            source_id: self.source_id,
            timestamp: self.timestamp,
        }
    }
}

/// Borrowed identity tuple of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorKey<'a> {
    pub indicator_type: &'a str,
    pub zone_id: i64,
    pub source_id: i64,
    pub timestamp: DateTime<Utc>,
}

/// A persisted indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub indicator_type: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub zone_id: i64,
    pub source_id: i64,
    pub owner_id: i64,
    pub metadata: String,
}

impl Indicator {
    /// Assigns a fresh id to a draft.
    pub fn from_draft(draft: IndicatorDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            indicator_type: draft.indicator_type,
            value: draft.value,
            unit: draft.unit,
            timestamp: draft.timestamp,
            zone_id: draft.zone_id,
            source_id: draft.source_id,
            owner_id: draft.owner_id,
            metadata: draft.metadata,
        }
    }

    pub fn key(&self) -> IndicatorKey<'_> {
        IndicatorKey {
            indicator_type: &self.indicator_type,
            zone_id: self.zone_id,
            source_id: self.source_id,
            timestamp: self.timestamp,
        }
    }
}
