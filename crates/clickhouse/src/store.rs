//! ClickHouse-backed [`Store`].

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use clickhouse::Row;
use engine_core::{
    ExistsQuery, Indicator, IndicatorDraft, Source, Store, StoreError, TimeMatch, TypeMatch, Zone,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{delete_error, query_error, write_error, ClickHouseClient};
use crate::schema::tables;

/// Indicator row. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub id: String,
    #[serde(rename = "type")]
    pub indicator_type: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: i64,
    pub zone_id: i64,
    pub source_id: i64,
    pub owner_id: i64,
    pub metadata: String,
}

impl From<&Indicator> for IndicatorRow {
    fn from(i: &Indicator) -> Self {
        Self {
            id: i.id.to_string(),
            indicator_type: i.indicator_type.clone(),
            value: i.value,
            unit: i.unit.clone(),
            timestamp: i.timestamp.timestamp_millis(),
            zone_id: i.zone_id,
            source_id: i.source_id,
            owner_id: i.owner_id,
            metadata: i.metadata.clone(),
        }
    }
}

impl TryFrom<IndicatorRow> for Indicator {
    type Error = StoreError;

    fn try_from(row: IndicatorRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| StoreError::Query(format!("bad indicator id {:?}: {}", row.id, e)))?;
        Ok(Self {
            id,
            indicator_type: row.indicator_type,
            value: row.value,
            unit: row.unit,
            timestamp: from_millis(row.timestamp)?,
            zone_id: row.zone_id,
            source_id: row.source_id,
            owner_id: row.owner_id,
            metadata: row.metadata,
        })
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct ZoneRow {
    pub id: i64,
    pub name: String,
    pub postal_code: Option<String>,
    pub geometry: Option<String>,
}

impl From<ZoneRow> for Zone {
    fn from(row: ZoneRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            postal_code: row.postal_code,
            geometry: row.geometry,
        }
    }
}

impl From<&Zone> for ZoneRow {
    fn from(zone: &Zone) -> Self {
        Self {
            id: zone.id,
            name: zone.name.clone(),
            postal_code: zone.postal_code.clone(),
            geometry: zone.geometry.clone(),
        }
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub url: String,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            url: row.url,
        }
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Query(format!("timestamp out of range: {}", ms)))
}

/// Bind value for an [`ExistsQuery`] condition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Str(String),
    List(Vec<String>),
    Int(i64),
}

/// Renders an [`ExistsQuery`] as a `SELECT count()` with positional binds.
pub(crate) fn exists_sql(query: &ExistsQuery) -> (String, Vec<Param>) {
    let mut conditions = vec!["zone_id = ?".to_string()];
    let mut params = vec![Param::Int(query.zone_id)];

    match &query.types {
        TypeMatch::Exact(t) => {
            conditions.push("type = ?".into());
            params.push(Param::Str(t.clone()));
        }
        TypeMatch::Prefix(p) => {
            conditions.push("startsWith(type, ?)".into());
            params.push(Param::Str(p.clone()));
        }
        TypeMatch::AnyOf(types) => {
            conditions.push("has(?, type)".into());
            params.push(Param::List(types.clone()));
        }
    }

    if let Some(source_id) = query.source_id {
        conditions.push("source_id = ?".into());
        params.push(Param::Int(source_id));
    }

    match query.time {
        TimeMatch::At(ts) => {
            conditions.push("timestamp = fromUnixTimestamp64Milli(?)".into());
            params.push(Param::Int(ts.timestamp_millis()));
        }
        TimeMatch::Since(ts) => {
            conditions.push("timestamp >= fromUnixTimestamp64Milli(?)".into());
            params.push(Param::Int(ts.timestamp_millis()));
        }
    }

    let sql = format!(
        "SELECT count() FROM {} WHERE {}",
        tables::INDICATORS,
        conditions.join(" AND ")
    );
    (sql, params)
}

pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    /// Inserts reference zones (provisioning and tests).
    pub async fn insert_zones(&self, zones: &[Zone]) -> Result<(), StoreError> {
        let mut insert = self.client.inner().insert(tables::ZONES).map_err(write_error)?;
        for zone in zones {
            insert.write(&ZoneRow::from(zone)).await.map_err(write_error)?;
        }
        insert.end().await.map_err(write_error)?;
        Ok(())
    }

    pub async fn count_indicators(&self) -> Result<u64, StoreError> {
        self.client
            .inner()
            .query(&format!("SELECT count() FROM {}", tables::INDICATORS))
            .fetch_one::<u64>()
            .await
            .map_err(query_error)
    }

    pub async fn list_indicators(&self) -> Result<Vec<Indicator>, StoreError> {
        let rows: Vec<IndicatorRow> = self
            .client
            .inner()
            .query(&format!(
                "SELECT id, type, value, unit, toUnixTimestamp64Milli(timestamp), zone_id, source_id, \
                 owner_id, metadata FROM {} ORDER BY zone_id, type, timestamp",
                tables::INDICATORS
            ))
            .fetch_all()
            .await
            .map_err(query_error)?;
        rows.into_iter().map(Indicator::try_from).collect()
    }
}

#[async_trait]
impl Store for ClickHouseStore {
    async fn create_indicator(&self, draft: IndicatorDraft) -> Result<Indicator, StoreError> {
        let indicator = Indicator::from_draft(draft);

        let mut insert = self
            .client
            .inner()
            .insert(tables::INDICATORS)
            .map_err(write_error)?;
        insert
            .write(&IndicatorRow::from(&indicator))
            .await
            .map_err(write_error)?;
        insert.end().await.map_err(write_error)?;

        Ok(indicator)
    }

    async fn query_exists(&self, query: &ExistsQuery) -> Result<bool, StoreError> {
        let (sql, params) = exists_sql(query);
        let mut q = self.client.inner().query(&sql);
        for param in params {
            q = match param {
                Param::Str(s) => q.bind(s),
                Param::List(l) => q.bind(l),
                Param::Int(i) => q.bind(i),
            };
        }
        let count: u64 = q.fetch_one().await.map_err(query_error)?;
        Ok(count > 0)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff_ms = cutoff.timestamp_millis();

        let expired: u64 = self
            .client
            .inner()
            .query(&format!(
                "SELECT count() FROM {} WHERE timestamp < fromUnixTimestamp64Milli(?)",
                tables::INDICATORS
            ))
            .bind(cutoff_ms)
            .fetch_one()
            .await
            .map_err(delete_error)?;

        if expired == 0 {
            return Ok(0);
        }

        self.client
            .inner()
            .clone()
            .with_option("mutations_sync", "1")
            .query(&format!(
                "ALTER TABLE {} DELETE WHERE timestamp < fromUnixTimestamp64Milli(?)",
                tables::INDICATORS
            ))
            .bind(cutoff_ms)
            .execute()
            .await
            .map_err(delete_error)?;

        info!(deleted = expired, cutoff = %cutoff, "Deleted expired indicators");
        Ok(expired)
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, StoreError> {
        let rows: Vec<ZoneRow> = self
            .client
            .inner()
            .query(&format!("SELECT ?fields FROM {} FINAL ORDER BY id", tables::ZONES))
            .fetch_all()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(Zone::from).collect())
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        let rows: Vec<SourceRow> = self
            .client
            .inner()
            .query(&format!("SELECT ?fields FROM {} FINAL ORDER BY id", tables::SOURCES))
            .fetch_all()
            .await
            .map_err(query_error)?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    async fn find_or_create_source(
        &self,
        name: &str,
        description: &str,
        url: &str,
    ) -> Result<Source, StoreError> {
        let existing: Option<SourceRow> = self
            .client
            .inner()
            .query(&format!(
                "SELECT ?fields FROM {} FINAL WHERE name = ? ORDER BY id LIMIT 1",
                tables::SOURCES
            ))
            .bind(name)
            .fetch_optional()
            .await
            .map_err(query_error)?;
        if let Some(row) = existing {
            return Ok(row.into());
        }

        // No sequences in ClickHouse; ids are allocated as max + 1.
        let next_id: i64 = self
            .client
            .inner()
            .query(&format!("SELECT toInt64(max(id) + 1) FROM {}", tables::SOURCES))
            .fetch_one()
            .await
            .map_err(query_error)?;
        let row = SourceRow {
            id: next_id.max(1),
            name: name.to_string(),
            description: description.to_string(),
            url: url.to_string(),
        };

        let mut insert = self.client.inner().insert(tables::SOURCES).map_err(write_error)?;
        insert.write(&row).await.map_err(write_error)?;
        insert.end().await.map_err(write_error)?;

        debug!(source = name, id = row.id, "Registered source");
        Ok(row.into())
    }
}
