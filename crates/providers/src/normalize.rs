//! Payload → canonical indicator drafts.

use chrono::{DateTime, Utc};
use engine_core::{IndicatorDraft, ParseError, ZoneLocation};

use crate::payload::ProviderPayload;
use crate::{air_quality, energy, weather};

/// Attribution shared by every draft of one normalization call.
#[derive(Debug, Clone)]
pub struct NormalizeContext<'a> {
    pub location: &'a ZoneLocation,
    pub source_id: i64,
    pub owner_id: i64,
    /// Stamp for providers that do not timestamp their readings.
    pub now: DateTime<Utc>,
}

impl NormalizeContext<'_> {
    pub(crate) fn draft(
        &self,
        indicator_type: &str,
        value: f64,
        unit: &str,
        timestamp: DateTime<Utc>,
        metadata: &serde_json::Value,
    ) -> IndicatorDraft {
        IndicatorDraft {
            indicator_type: indicator_type.to_string(),
            value,
            unit: unit.to_string(),
            timestamp,
            zone_id: self.location.zone_id,
            source_id: self.source_id,
            owner_id: self.owner_id,
            metadata: metadata.to_string(),
        }
    }
}

/// Drafts produced from one payload, plus the records that failed to map.
#[derive(Debug, Default)]
pub struct Normalized {
    pub drafts: Vec<IndicatorDraft>,
    pub errors: Vec<ParseError>,
}

impl Normalized {
    pub(crate) fn push(&mut self, result: Result<IndicatorDraft, ParseError>) {
        match result {
            Ok(draft) => self.drafts.push(draft),
            Err(e) => self.errors.push(e),
        }
    }
}

/// Dispatches to the provider's normalizer.
pub fn normalize(payload: &ProviderPayload, ctx: &NormalizeContext<'_>) -> Normalized {
    match payload {
        ProviderPayload::Weather(p) => weather::normalize(p, ctx),
        ProviderPayload::AirQuality(p) => air_quality::normalize(p, ctx),
        ProviderPayload::Energy(p) => energy::normalize(p, ctx),
    }
}
