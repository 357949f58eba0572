//! End-to-end ingestion runs against the in-memory store.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use engine_core::{types, FetchError, ProviderKind, Store};
use integration_tests::fixtures;
use integration_tests::mocks::{FlakyStore, MockFetcher};
use integration_tests::setup::TestContext;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use worker::{DedupPolicy, Job, JobReport, JobRunner};

#[tokio::test]
async fn test_weather_second_run_creates_nothing() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris"), fixtures::zone(2, "Lyon")]);
    let source = ctx.source(ProviderKind::Weather).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
    let runner = ctx.runner(&fetcher);

    let first = runner.run(&source, &zones).await;
    assert_eq!(first.created, 8);
    assert_eq!(first.zones_processed, 2);

    let stored = ctx.store.indicators();
    for zone_id in [1, 2] {
        let zone_rows: Vec<_> = stored.iter().filter(|i| i.zone_id == zone_id).collect();
        assert_eq!(zone_rows.len(), 4);
        let stamps: HashSet<_> = zone_rows.iter().map(|i| i.timestamp).collect();
        assert_eq!(stamps.len(), 1, "one timestamp per zone and run");
        let kinds: HashSet<_> = zone_rows.iter().map(|i| i.indicator_type.as_str()).collect();
        assert_eq!(
            kinds,
            HashSet::from([types::TEMPERATURE, types::HUMIDITY, types::WIND_SPEED, types::PRESSURE])
        );
    }
    // 10:00 at UTC+1
    let expected = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    assert!(stored.iter().all(|i| i.timestamp == expected && i.source_id == source.id));

    let second = runner.run(&source, &zones).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 8);
    assert_eq!(ctx.store.indicator_count(), 8);
}

#[tokio::test]
async fn test_weather_new_hour_is_ingested() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris")]);
    let source = ctx.source(ProviderKind::Weather).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
    let runner = ctx.runner(&fetcher);

    assert_eq!(runner.run(&source, &zones).await.created, 4);

    fetcher.respond(1, fixtures::weather_payload_at("2024-01-15T11:00"));
    let next = runner.run(&source, &zones).await;
    assert_eq!(next.created, 4);
    assert_eq!(ctx.store.indicator_count(), 8);
}

#[tokio::test]
async fn test_failed_zone_does_not_stop_the_run() {
    let ctx = TestContext::new(fixtures::zones(5));
    let source = ctx.source(ProviderKind::Weather).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
    fetcher.fail_zone(3, FetchError::Timeout);

    let outcome = ctx.runner(&fetcher).run(&source, &zones).await;

    assert_eq!(fetcher.calls(), vec![1, 2, 3, 4, 5]);
    assert_eq!(outcome.zones_failed, 1);
    assert_eq!(outcome.zones_processed, 4);
    assert_eq!(outcome.created, 16);

    let ingested: HashSet<_> = ctx.store.indicators().iter().map(|i| i.zone_id).collect();
    assert_eq!(ingested, HashSet::from([1, 2, 4, 5]));
}

#[tokio::test]
async fn test_provider_outage_creates_nothing() {
    let ctx = TestContext::new(fixtures::zones(3));
    let source = ctx.source(ProviderKind::Weather).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
    fetcher.set_should_fail(true);

    let outcome = ctx.runner(&fetcher).run(&source, &zones).await;

    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.zones_failed, 3);
    assert_eq!(ctx.store.indicator_count(), 0);
}

#[tokio::test]
async fn test_zone_without_coordinates_is_skipped() {
    let ctx = TestContext::new(vec![
        fixtures::bare_zone(1, "Atlantis"),
        fixtures::bare_zone(2, "Lyon"),
    ]);
    let source = ctx.source(ProviderKind::Weather).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());

    let outcome = ctx.runner(&fetcher).run(&source, &zones).await;

    // Lyon resolves through the city table
    assert_eq!(fetcher.calls(), vec![2]);
    assert_eq!(outcome.zones_unresolved, 1);
    assert_eq!(outcome.created, 4);
}

#[tokio::test]
async fn test_air_quality_freshness_window() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris"), fixtures::zone(2, "Lyon")]);
    let source = ctx.source(ProviderKind::AirQuality).await;
    let zones = ctx.zones().await;
    let fetcher =
        MockFetcher::new(ProviderKind::AirQuality).with_payload(fixtures::air_quality_payload());
    let runner = ctx.runner(&fetcher);

    let first = runner.run(&source, &zones).await;
    assert_eq!(first.created, 6);
    assert!(ctx
        .store
        .indicators()
        .iter()
        .all(|i| i.indicator_type.starts_with(types::AIR_QUALITY_PREFIX)));

    // Readings are still fresh: every zone is gated before persisting
    let second = runner.run(&source, &zones).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 6);
    assert_eq!(ctx.store.indicator_count(), 6);
}

#[tokio::test]
async fn test_air_quality_stale_readings_are_refreshed() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris")]);
    let source = ctx.source(ProviderKind::AirQuality).await;
    let zones = ctx.zones().await;
    ctx.store.insert(fixtures::indicator(
        types::AIR_QUALITY_PM25,
        1,
        source.id,
        Utc::now() - ChronoDuration::minutes(90),
    ));
    let fetcher =
        MockFetcher::new(ProviderKind::AirQuality).with_payload(fixtures::air_quality_payload());

    let outcome = ctx.runner(&fetcher).run(&source, &zones).await;

    assert_eq!(outcome.created, 3);
    assert_eq!(ctx.store.indicator_count(), 4);
}

#[tokio::test]
async fn test_energy_runs_once_per_day() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris"), fixtures::zone(2, "Lyon")]);
    let source = ctx.source(ProviderKind::Energy).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Energy).with_payload(fixtures::energy_payload(3));
    let runner = ctx.runner(&fetcher);

    let first = runner.run(&source, &zones).await;
    assert_eq!(first.created, 4);
    let kinds: HashSet<_> = ctx
        .store
        .indicators()
        .iter()
        .map(|i| i.indicator_type.clone())
        .collect();
    assert_eq!(
        kinds,
        HashSet::from([types::ENERGY_CONSUMPTION.to_string(), types::CO2.to_string()])
    );

    let second = runner.run(&source, &zones).await;
    assert_eq!(second.created, 0);
    assert_eq!(ctx.store.indicator_count(), 4);
}

#[tokio::test]
async fn test_energy_ingests_zones_outside_the_city_table() {
    let ctx = TestContext::new(vec![fixtures::bare_zone(7, "Nantes")]);
    let source = ctx.source(ProviderKind::Energy).await;
    let zones = ctx.zones().await;
    let fetcher = MockFetcher::new(ProviderKind::Energy).with_payload(fixtures::energy_payload(2));

    let outcome = ctx.runner(&fetcher).run(&source, &zones).await;

    assert_eq!(fetcher.calls(), vec![7]);
    assert_eq!(outcome.zones_unresolved, 0);
    assert_eq!(outcome.zones_processed, 1);
    assert_eq!(outcome.created, 2);
    assert!(ctx.store.indicators().iter().all(|i| i.zone_id == 7));
}

#[tokio::test]
async fn test_stored_identities_are_unique() {
    let ctx = TestContext::new(fixtures::zones(3));
    let zones = ctx.zones().await;

    for kind in ProviderKind::ALL {
        let source = ctx.source(kind).await;
        let payload = match kind {
            ProviderKind::Weather => fixtures::weather_payload(),
            ProviderKind::AirQuality => fixtures::air_quality_payload(),
            ProviderKind::Energy => fixtures::energy_payload(2),
        };
        let fetcher = MockFetcher::new(kind).with_payload(payload);
        let runner = ctx.runner(&fetcher);
        runner.run(&source, &zones).await;
        runner.run(&source, &zones).await;
    }

    let stored = ctx.store.indicators();
    let keys: HashSet<_> = stored
        .iter()
        .map(|i| (i.indicator_type.clone(), i.zone_id, i.source_id, i.timestamp))
        .collect();
    assert_eq!(keys.len(), stored.len());
    assert_eq!(stored.len(), 3 * (4 + 3 + 2));
}

#[tokio::test]
async fn test_write_failure_skips_only_that_record() {
    let memory = Arc::new(engine_core::MemoryStore::with_zones(vec![fixtures::zone(1, "Paris")]));
    let flaky = Arc::new(FlakyStore::new(memory.clone()));
    flaky.reject_type(types::HUMIDITY);
    let store: Arc<dyn Store> = flaky;

    let source = store
        .find_or_create_source("Open-Meteo", "weather", "https://open-meteo.com")
        .await
        .unwrap();
    let zones = store.list_zones().await.unwrap();
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
    let runner = JobRunner::new(
        Arc::new(fetcher),
        store,
        DedupPolicy::PointInTime,
        1,
    );

    let outcome = runner.run(&source, &zones).await;

    assert_eq!(outcome.created, 3);
    assert_eq!(outcome.store_errors, 1);
    assert_eq!(outcome.skipped, 1);
    assert!(memory
        .indicators()
        .iter()
        .all(|i| i.indicator_type != types::HUMIDITY));
}

#[tokio::test]
async fn test_ingestion_job_registers_source_and_reports() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris")]);
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
    let job = ctx.job(&fetcher);

    assert_eq!(job.name(), ProviderKind::Weather.job_name());

    let report = job.execute(&CancellationToken::new()).await.unwrap();
    let JobReport::Ingestion(outcome) = report else {
        panic!("expected an ingestion report");
    };
    assert_eq!(outcome.created, 4);

    let sources = ctx.store.list_sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, ProviderKind::Weather.source_name());
}

#[tokio::test]
async fn test_ingestion_job_fails_when_zones_unavailable() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris")]);
    ctx.store.set_fail_queries(true);
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());

    let result = ctx.job(&fetcher).execute(&CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(fetcher.call_count(), 0);
}
