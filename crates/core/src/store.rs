//! The store contract consumed by ingestion and retention jobs.
//!
//! Every job holds an `Arc<dyn Store>`; implementations must tolerate
//! concurrent readers and writers. No job takes an application-level lock
//! on the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::error::StoreError;
use crate::indicator::{Indicator, IndicatorDraft};
use crate::zone::{Source, Zone};

/// Which indicator types an existence query matches.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeMatch {
    Exact(String),
    Prefix(String),
    AnyOf(Vec<String>),
}

impl TypeMatch {
    pub fn matches(&self, indicator_type: &str) -> bool {
        match self {
            Self::Exact(t) => indicator_type == t,
            Self::Prefix(p) => indicator_type.starts_with(p.as_str()),
            Self::AnyOf(set) => set.iter().any(|t| t == indicator_type),
        }
    }
}

/// Which timestamps an existence query matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeMatch {
    At(DateTime<Utc>),
    /// Inclusive lower bound.
    Since(DateTime<Utc>),
}

impl TimeMatch {
    pub fn matches(&self, timestamp: DateTime<Utc>) -> bool {
        match self {
            Self::At(t) => timestamp == *t,
            Self::Since(t) => timestamp >= *t,
        }
    }
}

/// "Does at least one indicator like this exist?"
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsQuery {
    pub types: TypeMatch,
    pub zone_id: i64,
    /// `None` matches any source.
    pub source_id: Option<i64>,
    pub time: TimeMatch,
}

impl ExistsQuery {
    pub fn matches(&self, indicator: &Indicator) -> bool {
        indicator.zone_id == self.zone_id
            && self.source_id.map_or(true, |id| indicator.source_id == id)
            && self.types.matches(&indicator.indicator_type)
            && self.time.matches(indicator.timestamp)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_indicator(&self, draft: IndicatorDraft) -> Result<Indicator, StoreError>;

    async fn query_exists(&self, query: &ExistsQuery) -> Result<bool, StoreError>;

    /// Deletes indicators with a timestamp strictly before `cutoff`.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn list_zones(&self) -> Result<Vec<Zone>, StoreError>;

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError>;

    async fn find_or_create_source(
        &self,
        name: &str,
        description: &str,
        url: &str,
    ) -> Result<Source, StoreError>;
}

/// In-process store backed by vectors behind a read/write lock.
///
/// Used by the `memory` backend and throughout the test suites. Writes can
/// be made to fail on demand to exercise soft-failure paths.
#[derive(Debug)]
pub struct MemoryStore {
    zones: RwLock<Vec<Zone>>,
    sources: RwLock<Vec<Source>>,
    indicators: RwLock<Vec<Indicator>>,
    next_source_id: AtomicI64,
    fail_writes: AtomicBool,
    fail_queries: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            zones: RwLock::new(Vec::new()),
            sources: RwLock::new(Vec::new()),
            indicators: RwLock::new(Vec::new()),
            next_source_id: AtomicI64::new(1),
            fail_writes: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
        }
    }

    pub fn with_zones(zones: Vec<Zone>) -> Self {
        let store = Self::new();
        *store.zones.write() = zones;
        store
    }

    pub fn add_zone(&self, zone: Zone) {
        self.zones.write().push(zone);
    }

    /// Inserts an indicator as-is, bypassing dedup (test seeding).
    pub fn insert(&self, indicator: Indicator) {
        self.indicators.write().push(indicator);
    }

    pub fn indicators(&self) -> Vec<Indicator> {
        self.indicators.read().clone()
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators.read().len()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    fn check_queries(&self) -> Result<(), StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store queries disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_indicator(&self, draft: IndicatorDraft) -> Result<Indicator, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("memory store writes disabled".into()));
        }
        let indicator = Indicator::from_draft(draft);
        self.indicators.write().push(indicator.clone());
        Ok(indicator)
    }

    async fn query_exists(&self, query: &ExistsQuery) -> Result<bool, StoreError> {
        self.check_queries()?;
        Ok(self.indicators.read().iter().any(|i| query.matches(i)))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Delete("memory store writes disabled".into()));
        }
        let mut indicators = self.indicators.write();
        let before = indicators.len();
        indicators.retain(|i| i.timestamp >= cutoff);
        Ok((before - indicators.len()) as u64)
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, StoreError> {
        self.check_queries()?;
        Ok(self.zones.read().clone())
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        self.check_queries()?;
        Ok(self.sources.read().clone())
    }

    async fn find_or_create_source(
        &self,
        name: &str,
        description: &str,
        url: &str,
    ) -> Result<Source, StoreError> {
        self.check_queries()?;
        let mut sources = self.sources.write();
        if let Some(existing) = sources.iter().find(|s| s.name == name) {
            return Ok(existing.clone());
        }
        let source = Source {
            id: self.next_source_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            description: description.to_string(),
            url: url.to_string(),
        };
        sources.push(source.clone());
        Ok(source)
    }
}
