//! Wires the standard job set into a scheduler.

use engine_core::{ProviderKind, SchedulerError, Store};
use providers::Fetcher;
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::dedup::DedupPolicy;
use crate::report::MetricsReportJob;
use crate::retention::RetentionJob;
use crate::runner::{IngestionJob, JobRunner};
use crate::scheduler::Scheduler;

/// Builds the ingestion job for one provider.
pub fn ingestion_job(
    kind: ProviderKind,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn Store>,
    config: &WorkerConfig,
) -> IngestionJob {
    let mut runner = JobRunner::new(
        fetcher,
        store.clone(),
        DedupPolicy::for_kind(kind, &config.dedup),
        config.owner_id,
    );
    if kind == ProviderKind::AirQuality {
        runner = runner.with_zone_delay(config.schedule.air_quality_zone_delay());
    }
    IngestionJob::new(runner, store)
}

/// Registers the three ingestion jobs, retention, and the metrics report.
///
/// `fetcher_for` supplies the fetcher of each provider, which lets tests
/// substitute scripted fetchers for the HTTP ones.
pub fn register_engine_jobs<F>(
    scheduler: &mut Scheduler,
    config: &WorkerConfig,
    store: Arc<dyn Store>,
    fetcher_for: F,
) -> Result<(), SchedulerError>
where
    F: Fn(ProviderKind) -> Arc<dyn Fetcher>,
{
    let schedule = &config.schedule;

    for kind in ProviderKind::ALL {
        let job = ingestion_job(kind, fetcher_for(kind), store.clone(), config);
        let cadence = match kind {
            ProviderKind::Weather => schedule.weather(),
            ProviderKind::AirQuality => schedule.air_quality(),
            ProviderKind::Energy => schedule.energy(),
        };
        scheduler.register(Arc::new(job), cadence)?;
    }

    scheduler.register(
        Arc::new(RetentionJob::new(store, config.retention)),
        schedule.retention(),
    )?;
    scheduler.register(Arc::new(MetricsReportJob::new()), schedule.metrics_report())?;

    Ok(())
}
