//! ClickHouse health checks and schema bootstrap.

use crate::client::{query_error, ClickHouseClient};
use engine_core::StoreError;
use tracing::{debug, error, info};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.server().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Creates the database and tables if missing.
pub async fn init_schema(client: &ClickHouseClient) -> Result<(), StoreError> {
    use crate::schema::{all_tables, create_database};

    client
        .server()
        .query(&create_database(client.database()))
        .execute()
        .await
        .map_err(query_error)?;

    for ddl in all_tables() {
        client.inner().query(ddl).execute().await.map_err(query_error)?;
    }

    info!(database = client.database(), "ClickHouse schema initialized");
    Ok(())
}
