//! ClickHouse-backed store. Needs Docker (or `ECOTRACK_TEST_CLICKHOUSE_URL`).
//!
//! Run with `cargo test -p integration-tests --test clickhouse_store -- --ignored`.

use chrono::{Duration as ChronoDuration, Utc};
use clickhouse_client::{health as ch_health, ClickHouseClient, ClickHouseStore};
use engine_core::{ExistsQuery, ProviderKind, RetentionPolicy, Store, TimeMatch, TypeMatch};
use integration_tests::containers::TestClickHouse;
use integration_tests::fixtures;
use integration_tests::mocks::MockFetcher;
use std::sync::Arc;
use worker::{DedupPolicy, JobRunner, RetentionJob};

async fn setup_store(server: &TestClickHouse) -> Arc<ClickHouseStore> {
    let client = ClickHouseClient::new(server.fresh_config());

    assert!(ch_health::check_connection(&client).await);
    ch_health::init_schema(&client).await.expect("schema");
    Arc::new(ClickHouseStore::new(client))
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_clickhouse_ingest_dedup_and_retention() {
    let server = TestClickHouse::start().await;
    let store = setup_store(&server).await;

    store
        .insert_zones(&[fixtures::zone(1, "Paris"), fixtures::zone(2, "Lyon")])
        .await
        .unwrap();
    let zones = store.list_zones().await.unwrap();
    assert_eq!(zones.len(), 2);

    let kind = ProviderKind::Weather;
    let source = store
        .find_or_create_source(kind.source_name(), kind.source_description(), kind.source_url())
        .await
        .unwrap();
    let again = store
        .find_or_create_source(kind.source_name(), kind.source_description(), kind.source_url())
        .await
        .unwrap();
    assert_eq!(source.id, again.id);

    let fetcher = MockFetcher::new(kind).with_payload(fixtures::weather_payload());
    let runner = JobRunner::new(Arc::new(fetcher), store.clone(), DedupPolicy::PointInTime, 1);

    assert_eq!(runner.run(&source, &zones).await.created, 8);
    assert_eq!(runner.run(&source, &zones).await.created, 0);
    assert_eq!(store.count_indicators().await.unwrap(), 8);

    let stored = store.list_indicators().await.unwrap();
    let reading = &stored[0];
    let exists = store
        .query_exists(&ExistsQuery {
            types: TypeMatch::Exact(reading.indicator_type.clone()),
            zone_id: reading.zone_id,
            source_id: Some(reading.source_id),
            time: TimeMatch::At(reading.timestamp),
        })
        .await
        .unwrap();
    assert!(exists);

    // The fixture readings are from 2024, far past the horizon
    store
        .create_indicator(fixtures::draft(
            "air_quality_pm25",
            1,
            source.id,
            Utc::now() - ChronoDuration::hours(1),
        ))
        .await
        .unwrap();

    let retention = RetentionJob::new(store.clone(), RetentionPolicy::default());
    let deleted = retention.run_at(Utc::now()).await.unwrap();

    assert_eq!(deleted, 8);
    assert_eq!(store.count_indicators().await.unwrap(), 1);
}
