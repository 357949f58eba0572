//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{
    ExistsQuery, FetchError, Indicator, IndicatorDraft, MemoryStore, ProviderKind, Source, Store,
    StoreError, Zone, ZoneLocation,
};
use parking_lot::Mutex;
use providers::{Fetcher, ProviderPayload};
use std::collections::HashMap;
use std::sync::Arc;

/// Fetcher that answers from a per-zone script instead of the network.
///
/// Implements the same `Fetcher` trait as the HTTP fetchers, so the runner's
/// soft-failure and logging paths are exercised unchanged.
#[derive(Clone)]
pub struct MockFetcher {
    kind: ProviderKind,
    responses: Arc<Mutex<HashMap<i64, Result<ProviderPayload, FetchError>>>>,
    fallback: Arc<Mutex<Option<ProviderPayload>>>,
    calls: Arc<Mutex<Vec<i64>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockFetcher {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            responses: Arc::new(Mutex::new(HashMap::new())),
            fallback: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Payload returned for every zone without a specific script.
    pub fn with_payload(self, payload: ProviderPayload) -> Self {
        *self.fallback.lock() = Some(payload);
        self
    }

    pub fn respond(&self, zone_id: i64, payload: ProviderPayload) {
        self.responses.lock().insert(zone_id, Ok(payload));
    }

    pub fn fail_zone(&self, zone_id: i64, error: FetchError) {
        self.responses.lock().insert(zone_id, Err(error));
    }

    /// Fail every fetch (simulates a provider outage).
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Zone ids fetched so far, in order.
    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn try_fetch(&self, location: &ZoneLocation) -> Result<ProviderPayload, FetchError> {
        self.calls.lock().push(location.zone_id);

        if *self.should_fail.lock() {
            return Err(FetchError::Transport("mock provider outage".into()));
        }
        if let Some(scripted) = self.responses.lock().get(&location.zone_id) {
            return scripted.clone();
        }
        self.fallback
            .lock()
            .clone()
            .ok_or_else(|| FetchError::NoData("no scripted payload".into()))
    }
}

/// Store that delegates to a [`MemoryStore`] but rejects writes of chosen
/// indicator types.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    reject_types: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            reject_types: Mutex::new(Vec::new()),
        }
    }

    pub fn reject_type(&self, indicator_type: &str) {
        self.reject_types.lock().push(indicator_type.to_string());
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn create_indicator(&self, draft: IndicatorDraft) -> Result<Indicator, StoreError> {
        if self.reject_types.lock().contains(&draft.indicator_type) {
            return Err(StoreError::Write(format!("rejected {}", draft.indicator_type)));
        }
        self.inner.create_indicator(draft).await
    }

    async fn query_exists(&self, query: &ExistsQuery) -> Result<bool, StoreError> {
        self.inner.query_exists(query).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.delete_older_than(cutoff).await
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, StoreError> {
        self.inner.list_zones().await
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        self.inner.list_sources().await
    }

    async fn find_or_create_source(
        &self,
        name: &str,
        description: &str,
        url: &str,
    ) -> Result<Source, StoreError> {
        self.inner.find_or_create_source(name, description, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_mock_fetcher_scripts_and_records_calls() {
        let mock = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
        mock.fail_zone(2, FetchError::Status(500));

        let paris = fixtures::location(1, "Paris");
        let lyon = fixtures::location(2, "Lyon");

        assert!(mock.fetch(&paris).await.is_some());
        assert!(mock.fetch(&lyon).await.is_none());
        assert_eq!(mock.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_outage_mode() {
        let mock = MockFetcher::new(ProviderKind::Weather).with_payload(fixtures::weather_payload());
        mock.set_should_fail(true);

        let result = mock.try_fetch(&fixtures::location(1, "Paris")).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
        assert_eq!(mock.call_count(), 1);
    }
}
