//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use engine_core::StoreError;
use tracing::info;

/// ClickHouse client bound to the engine database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseConfig) -> Self {
        let inner = base_client(&config).with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Self { inner, config }
    }

    /// Client scoped to the engine database.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Client without a default database, for `CREATE DATABASE`.
    pub fn server(&self) -> Client {
        base_client(&self.config)
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }
}

fn base_client(config: &ClickHouseConfig) -> Client {
    let mut client = Client::default().with_url(&config.url);
    if let Some(ref user) = config.username {
        client = client.with_user(user);
    }
    if let Some(ref pass) = config.password {
        client = client.with_password(pass);
    }
    client
}

pub(crate) fn query_error(e: clickhouse::error::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

pub(crate) fn write_error(e: clickhouse::error::Error) -> StoreError {
    StoreError::Write(e.to_string())
}

pub(crate) fn delete_error(e: clickhouse::error::Error) -> StoreError {
    StoreError::Delete(e.to_string())
}
