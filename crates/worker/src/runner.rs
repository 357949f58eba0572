//! Shared fetch, normalize, dedup, persist loop for ingestion jobs.

use async_trait::async_trait;
use chrono::Utc;
use engine_core::{IndicatorDraft, ProviderKind, Result, Source, Store, Zone, ZoneLocation};
use providers::{normalize, Fetcher, NormalizeContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dedup::{DedupPolicy, Deduplicator};
use crate::job::{Job, JobReport};

/// Counters for one run over all zones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub created: u64,
    pub skipped: u64,
    pub zones_processed: u64,
    pub zones_failed: u64,
    pub zones_unresolved: u64,
    pub parse_errors: u64,
    pub store_errors: u64,
}

impl RunOutcome {
    fn merge(&mut self, other: &RunOutcome) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.zones_processed += other.zones_processed;
        self.zones_failed += other.zones_failed;
        self.zones_unresolved += other.zones_unresolved;
        self.parse_errors += other.parse_errors;
        self.store_errors += other.store_errors;
    }
}

/// Runs one provider over a list of zones.
///
/// Every failure below the run level is soft: it is logged, counted, and
/// the run moves on to the next record or zone.
pub struct JobRunner {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn Store>,
    dedup: Deduplicator,
    owner_id: i64,
    zone_delay: Duration,
}

impl JobRunner {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn Store>, policy: DedupPolicy, owner_id: i64) -> Self {
        Self {
            fetcher,
            dedup: Deduplicator::new(store.clone(), policy),
            store,
            owner_id,
            zone_delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive zones (provider rate limits).
    pub fn with_zone_delay(mut self, delay: Duration) -> Self {
        self.zone_delay = delay;
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.fetcher.kind()
    }

    pub async fn run(&self, source: &Source, zones: &[Zone]) -> RunOutcome {
        self.run_until_cancelled(source, zones, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run); a cancelled token only shortens the pauses
    /// between zones, every zone is still processed.
    pub async fn run_until_cancelled(
        &self,
        source: &Source,
        zones: &[Zone],
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let kind = self.kind();
        let mut outcome = RunOutcome::default();

        for (i, zone) in zones.iter().enumerate() {
            if i > 0 && !self.zone_delay.is_zero() && !cancel.is_cancelled() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.zone_delay) => {}
                }
            }

            let location = ZoneLocation::for_zone(zone);
            if kind.needs_coordinates() && location.coordinates.is_none() {
                warn!(provider = %kind, zone_id = zone.id, zone = %zone.name, "No coordinates for zone, skipping");
                metrics().zones_unresolved.inc();
                outcome.zones_unresolved += 1;
                continue;
            }

            let zone_outcome = self.process_zone(source, &location).await;
            outcome.merge(&zone_outcome);
        }

        if outcome.created == 0 {
            if outcome.zones_processed == 0 && outcome.zones_failed > 0 {
                warn!(provider = %kind, zones_failed = outcome.zones_failed, "No zone could be ingested");
            } else {
                info!(provider = %kind, skipped = outcome.skipped, "No new indicators, all zones up to date");
            }
        } else {
            info!(
                provider = %kind,
                created = outcome.created,
                skipped = outcome.skipped,
                zones_failed = outcome.zones_failed,
                "Ingestion run complete"
            );
        }

        outcome
    }

    async fn process_zone(&self, source: &Source, location: &ZoneLocation) -> RunOutcome {
        let kind = self.kind();
        let mut outcome = RunOutcome::default();

        let Some(payload) = self.fetcher.fetch(location).await else {
            outcome.zones_failed += 1;
            return outcome;
        };

        let now = Utc::now();
        let ctx = NormalizeContext {
            location,
            source_id: source.id,
            owner_id: self.owner_id,
            now,
        };
        let normalized = normalize(&payload, &ctx);

        for error in &normalized.errors {
            warn!(provider = %kind, zone_id = location.zone_id, code = error.code(), error = %error, "Record dropped");
        }
        metrics().parse_errors.inc_by(normalized.errors.len() as u64);
        outcome.parse_errors += normalized.errors.len() as u64;

        match self.dedup.zone_is_current(location.zone_id, now).await {
            Ok(true) => {
                debug!(provider = %kind, zone_id = location.zone_id, "Zone already current, skipping");
                metrics().duplicates_skipped.inc_by(normalized.drafts.len() as u64);
                outcome.skipped += normalized.drafts.len() as u64;
                outcome.zones_processed += 1;
                return outcome;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(provider = %kind, zone_id = location.zone_id, code = e.code(), error = %e, "Zone gate query failed, skipping zone");
                metrics().store_errors.inc();
                outcome.store_errors += 1;
                outcome.skipped += normalized.drafts.len() as u64;
                outcome.zones_failed += 1;
                return outcome;
            }
        }

        for draft in normalized.drafts {
            self.persist(draft, &mut outcome).await;
        }
        outcome.zones_processed += 1;

        debug!(
            provider = %kind,
            zone_id = location.zone_id,
            zone = %location.name,
            created = outcome.created,
            skipped = outcome.skipped,
            "Zone processed"
        );
        outcome
    }

    async fn persist(&self, draft: IndicatorDraft, outcome: &mut RunOutcome) {
        let kind = self.kind();

        match self.dedup.is_duplicate(&draft).await {
            Ok(true) => {
                metrics().duplicates_skipped.inc();
                outcome.skipped += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(provider = %kind, indicator_type = %draft.indicator_type, code = e.code(), error = %e, "Duplicate check failed, skipping record");
                metrics().store_errors.inc();
                outcome.store_errors += 1;
                outcome.skipped += 1;
                return;
            }
        }

        let indicator_type = draft.indicator_type.clone();
        match self.store.create_indicator(draft).await {
            Ok(_) => {
                metrics().indicators_created.inc();
                outcome.created += 1;
            }
            Err(e) => {
                warn!(provider = %kind, indicator_type = %indicator_type, code = e.code(), error = %e, "Failed to store indicator");
                metrics().store_errors.inc();
                outcome.store_errors += 1;
                outcome.skipped += 1;
            }
        }
    }
}

/// Scheduled wrapper around a [`JobRunner`]: resolves the provider's source
/// row and the zone list, then runs.
pub struct IngestionJob {
    runner: JobRunner,
    store: Arc<dyn Store>,
}

impl IngestionJob {
    pub fn new(runner: JobRunner, store: Arc<dyn Store>) -> Self {
        Self { runner, store }
    }
}

#[async_trait]
impl Job for IngestionJob {
    fn name(&self) -> &str {
        self.runner.kind().job_name()
    }

    async fn execute(&self, cancel: &CancellationToken) -> Result<JobReport> {
        let kind = self.runner.kind();
        let source = self
            .store
            .find_or_create_source(kind.source_name(), kind.source_description(), kind.source_url())
            .await?;
        let zones = self.store.list_zones().await?;
        if zones.is_empty() {
            info!(provider = %kind, "No zones configured");
        }

        let outcome = self.runner.run_until_cancelled(&source, &zones, cancel).await;
        Ok(JobReport::Ingestion(outcome))
    }
}
