//! ClickHouse table schemas.
//!
//! - Int64 ids for zones and sources, String (UUID text) for indicators
//! - LowCardinality for the indicator type and unit
//! - DateTime64(3) timestamps, written as epoch milliseconds

/// Reference table of geographic zones. Populated outside the engine.
pub const CREATE_ZONES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS zones (
    id Int64,
    name String,
    postal_code Nullable(String),
    geometry Nullable(String),
    created_at DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree()
ORDER BY id
"#;

/// One row per external provider.
pub const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id Int64,
    name String,
    description String,
    url String,
    created_at DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree()
ORDER BY id
"#;

/// Normalized readings.
pub const CREATE_INDICATORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS indicators (
    id String,
    type LowCardinality(String),
    value Float64,
    unit LowCardinality(String),
    timestamp DateTime64(3, 'UTC'),
    zone_id Int64,
    source_id Int64,
    owner_id Int64,
    metadata String,
    created_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (zone_id, type, timestamp, source_id)
SETTINGS index_granularity = 8192
"#;

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// Table DDL, run against the engine database.
pub fn all_tables() -> Vec<&'static str> {
    vec![CREATE_ZONES_TABLE, CREATE_SOURCES_TABLE, CREATE_INDICATORS_TABLE]
}

/// Table names.
pub mod tables {
    pub const ZONES: &str = "zones";
    pub const SOURCES: &str = "sources";
    pub const INDICATORS: &str = "indicators";
}
