//! Duplicate suppression policies.
//!
//! Each provider class has its own notion of "already ingested":
//!
//! | Class            | Check                                                  |
//! |------------------|--------------------------------------------------------|
//! | point-in-time    | exact (zone, source, type, timestamp) per record       |
//! | freshness window | any `air_quality_*` row for the zone within the window |
//! | daily cadence    | any energy/co2 row for the zone since UTC midnight     |
//!
//! The two zone gates match any source.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use engine_core::{
    types, ExistsQuery, IndicatorDraft, ProviderKind, SourceClass, Store, StoreError, TimeMatch,
    TypeMatch,
};
use std::sync::Arc;

use crate::config::DedupConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum DedupPolicy {
    PointInTime,
    FreshnessWindow { type_prefix: String, window: Duration },
    DailyCadence { types: Vec<String> },
}

impl DedupPolicy {
    pub fn for_kind(kind: ProviderKind, config: &DedupConfig) -> Self {
        match kind.source_class() {
            SourceClass::PointInTime => Self::PointInTime,
            SourceClass::FreshnessWindow => Self::FreshnessWindow {
                type_prefix: types::AIR_QUALITY_PREFIX.to_string(),
                window: config.freshness_window(),
            },
            SourceClass::DailyCadence => Self::DailyCadence {
                types: types::ENERGY_SET.iter().map(|t| t.to_string()).collect(),
            },
        }
    }

    /// Query that, when it matches, skips the whole zone for this run.
    pub fn zone_gate(&self, zone_id: i64, now: DateTime<Utc>) -> Option<ExistsQuery> {
        match self {
            Self::PointInTime => None,
            Self::FreshnessWindow { type_prefix, window } => Some(ExistsQuery {
                types: TypeMatch::Prefix(type_prefix.clone()),
                zone_id,
                source_id: None,
                time: TimeMatch::Since(now - *window),
            }),
            Self::DailyCadence { types } => Some(ExistsQuery {
                types: TypeMatch::AnyOf(types.clone()),
                zone_id,
                source_id: None,
                time: TimeMatch::Since(start_of_utc_day(now)),
            }),
        }
    }

    /// Query that, when it matches, skips a single draft.
    pub fn record_check(&self, draft: &IndicatorDraft) -> Option<ExistsQuery> {
        match self {
            Self::PointInTime => Some(ExistsQuery {
                types: TypeMatch::Exact(draft.indicator_type.clone()),
                zone_id: draft.zone_id,
                source_id: Some(draft.source_id),
                time: TimeMatch::At(draft.timestamp),
            }),
            _ => None,
        }
    }
}

pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Applies a [`DedupPolicy`] against a store.
pub struct Deduplicator {
    store: Arc<dyn Store>,
    policy: DedupPolicy,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn Store>, policy: DedupPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &DedupPolicy {
        &self.policy
    }

    /// Whether the zone already has fresh data and should be skipped.
    pub async fn zone_is_current(&self, zone_id: i64, now: DateTime<Utc>) -> Result<bool, StoreError> {
        match self.policy.zone_gate(zone_id, now) {
            Some(query) => self.store.query_exists(&query).await,
            None => Ok(false),
        }
    }

    /// Whether this exact record already exists.
    pub async fn is_duplicate(&self, draft: &IndicatorDraft) -> Result<bool, StoreError> {
        match self.policy.record_check(draft) {
            Some(query) => self.store.query_exists(&query).await,
            None => Ok(false),
        }
    }
}
