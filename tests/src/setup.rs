//! Common test setup functions.

use engine_core::{MemoryStore, ProviderKind, Source, Store, Zone};
use std::sync::Arc;
use worker::{ingestion_job, DedupPolicy, IngestionJob, JobRunner, WorkerConfig};

use crate::mocks::MockFetcher;
use providers::Fetcher;

/// In-memory store plus the source row of one provider.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub config: WorkerConfig,
}

impl TestContext {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            store: Arc::new(MemoryStore::with_zones(zones)),
            config: WorkerConfig::default(),
        }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub async fn source(&self, kind: ProviderKind) -> Source {
        self.store
            .find_or_create_source(kind.source_name(), kind.source_description(), kind.source_url())
            .await
            .expect("memory store source")
    }

    pub async fn zones(&self) -> Vec<Zone> {
        self.store.list_zones().await.expect("memory store zones")
    }

    /// Runner with the production dedup policy of the fetcher's provider and
    /// no inter-zone delay.
    pub fn runner(&self, fetcher: &MockFetcher) -> JobRunner {
        let kind = fetcher.kind();
        JobRunner::new(
            Arc::new(fetcher.clone()),
            self.store(),
            DedupPolicy::for_kind(kind, &self.config.dedup),
            self.config.owner_id,
        )
    }

    /// Scheduled job as the engine builds it.
    pub fn job(&self, fetcher: &MockFetcher) -> IngestionJob {
        ingestion_job(fetcher.kind(), Arc::new(fetcher.clone()), self.store(), &self.config)
    }
}
