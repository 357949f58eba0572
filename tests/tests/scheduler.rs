//! The full job set driven by the scheduler, with scripted providers.

use async_trait::async_trait;
use engine_core::{ProviderKind, Result};
use integration_tests::fixtures;
use integration_tests::mocks::MockFetcher;
use integration_tests::setup::TestContext;
use providers::{Fetcher, ProviderPayload};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::health;
use tokio_util::sync::CancellationToken;
use worker::{register_engine_jobs, Cadence, Job, JobReport, Scheduler};

fn payload_for(kind: ProviderKind) -> ProviderPayload {
    match kind {
        ProviderKind::Weather => fixtures::weather_payload(),
        ProviderKind::AirQuality => fixtures::air_quality_payload(),
        ProviderKind::Energy => fixtures::energy_payload(3),
    }
}

async fn wait_for_indicators(ctx: &TestContext, expected: usize, timeout: Duration) {
    let started = Instant::now();
    while ctx.store.indicator_count() < expected {
        assert!(
            started.elapsed() < timeout,
            "only {} of {} indicators after {:?}",
            ctx.store.indicator_count(),
            expected,
            timeout
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_engine_ingests_then_stops_promptly() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris"), fixtures::zone(2, "Lyon")]);

    let mut scheduler = Scheduler::new();
    register_engine_jobs(&mut scheduler, &ctx.config, ctx.store(), |kind| {
        Arc::new(MockFetcher::new(kind).with_payload(payload_for(kind))) as Arc<dyn Fetcher>
    })
    .unwrap();
    scheduler.start().unwrap();

    // weather 2x4, air quality 2x3, energy 2x2 (runs on start)
    wait_for_indicators(&ctx, 18, Duration::from_secs(10)).await;

    // Retention is now parked in its wait for the next 02:00
    let started = Instant::now();
    let report = scheduler.stop(Duration::from_secs(5)).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(report.is_clean());
    assert_eq!(report.stopped.len(), 5);
    assert!(!scheduler.is_running());
    assert_eq!(ctx.store.indicator_count(), 18);

    let weather = health().job(ProviderKind::Weather.job_name()).unwrap();
    assert!(weather.runs >= 1);
}

struct ExplodingJob;

#[async_trait]
impl Job for ExplodingJob {
    fn name(&self) -> &str {
        "it_exploding"
    }

    async fn execute(&self, _cancel: &CancellationToken) -> Result<JobReport> {
        panic!("provider client poisoned")
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_job_does_not_affect_ingestion() {
    let ctx = TestContext::new(vec![fixtures::zone(1, "Paris")]);
    let fetcher = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());

    let mut scheduler = Scheduler::new().with_poll_interval(Duration::from_millis(50));
    scheduler
        .register(Arc::new(ExplodingJob), Cadence::Periodic(Duration::from_millis(100)))
        .unwrap();
    scheduler
        .register(Arc::new(ctx.job(&fetcher)), Cadence::Periodic(Duration::from_millis(200)))
        .unwrap();
    scheduler.start().unwrap();

    wait_for_indicators(&ctx, 4, Duration::from_secs(5)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let report = scheduler.stop(Duration::from_secs(5)).await;
    assert!(report.is_clean());

    // Repeated runs are deduplicated, the panicking neighbour kept firing
    assert!(fetcher.call_count() >= 2);
    assert_eq!(ctx.store.indicator_count(), 4);

    let exploding = health().job("it_exploding").unwrap();
    assert!(exploding.consecutive_failures >= 2);
    assert_eq!(
        exploding.last_error.as_deref(),
        Some("panic: provider client poisoned")
    );
}

#[tokio::test]
async fn test_register_rejects_engine_jobs_twice() {
    let ctx = TestContext::new(Vec::new());
    let mut scheduler = Scheduler::new();
    let fetcher_for = |kind| Arc::new(MockFetcher::new(kind)) as Arc<dyn Fetcher>;

    register_engine_jobs(&mut scheduler, &ctx.config, ctx.store(), fetcher_for).unwrap();
    let again = register_engine_jobs(&mut scheduler, &ctx.config, ctx.store(), fetcher_for);

    assert!(matches!(again, Err(engine_core::SchedulerError::DuplicateJob(_))));
    assert_eq!(scheduler.job_names().len(), 5);
}
