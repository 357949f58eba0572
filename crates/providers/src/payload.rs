//! Raw provider payloads, one variant per provider.

use engine_core::ProviderKind;
use serde::{Deserialize, Serialize};

pub use crate::air_quality::AirQualityPayload;
pub use crate::energy::EnergyPayload;
pub use crate::weather::WeatherPayload;

/// A payload as returned by a fetcher, tagged by provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "payload", rename_all = "snake_case")]
pub enum ProviderPayload {
    Weather(WeatherPayload),
    AirQuality(AirQualityPayload),
    Energy(EnergyPayload),
}

impl ProviderPayload {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Weather(_) => ProviderKind::Weather,
            Self::AirQuality(_) => ProviderKind::AirQuality,
            Self::Energy(_) => ProviderKind::Energy,
        }
    }
}
