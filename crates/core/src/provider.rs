//! Provider identities.
//!
//! A [`ProviderKind`] is the identity of an external source. It selects the
//! fetcher, the normalizer, the dedup class, and the `sources` row the
//! readings are attributed to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How duplicates are detected for a provider's readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    /// Readings carry their own timestamp; exact (type, zone, source, ts) match.
    PointInTime,
    /// Readings are stamped at ingestion; any recent record gates the zone.
    FreshnessWindow,
    /// At most one batch per zone per calendar day.
    DailyCadence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Weather,
    AirQuality,
    Energy,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Weather, Self::AirQuality, Self::Energy];

    /// Name of the `sources` row.
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Weather => "OpenMeteo",
            Self::AirQuality => "WAQI",
            Self::Energy => "OpenData France",
        }
    }

    pub fn source_description(&self) -> &'static str {
        match self {
            Self::Weather => "Open-Meteo hourly weather forecasts and observations",
            Self::AirQuality => "World Air Quality Index real-time station data",
            Self::Energy => "French open data on energy consumption",
        }
    }

    pub fn source_url(&self) -> &'static str {
        match self {
            Self::Weather => "https://open-meteo.com",
            Self::AirQuality => "https://waqi.info",
            Self::Energy => "https://data.gouv.fr",
        }
    }

    /// Label written into indicator provenance.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Weather => "open-meteo",
            Self::AirQuality => "waqi",
            Self::Energy => "opendata",
        }
    }

    pub fn source_class(&self) -> SourceClass {
        match self {
            Self::Weather => SourceClass::PointInTime,
            Self::AirQuality => SourceClass::FreshnessWindow,
            Self::Energy => SourceClass::DailyCadence,
        }
    }

    /// Whether the upstream is queried by coordinates rather than zone name.
    pub fn needs_coordinates(&self) -> bool {
        match self {
            Self::Weather | Self::AirQuality => true,
            Self::Energy => false,
        }
    }

    /// Job name used by the scheduler and in logs.
    pub fn job_name(&self) -> &'static str {
        match self {
            Self::Weather => "weather_job",
            Self::AirQuality => "air_quality_job",
            Self::Energy => "energy_job",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
