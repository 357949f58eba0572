//! Shared HTTP client and JSON GET helper.

use engine_core::FetchError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info};

use crate::config::ProviderConfig;

/// Builds the client shared by all fetchers. Every request it sends is
/// bounded by the configured timeout.
pub fn build_http_client(config: &ProviderConfig) -> engine_core::Result<Client> {
    let client = Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.timeout())
        .user_agent(concat!("ecotrack-ingest/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| engine_core::Error::config(format!("Failed to build HTTP client: {}", e)))?;

    info!(timeout_secs = config.timeout_secs, "Created provider HTTP client");
    Ok(client)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else if let Some(status) = err.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Sends a GET request and decodes a 2xx JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, FetchError> {
    let start = Instant::now();

    let result = async {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.json::<T>().await.map_err(map_reqwest_error)
    }
    .await;

    let elapsed = start.elapsed();
    metrics().fetch_latency_ms.observe(elapsed.as_millis() as u64);
    debug!(latency_ms = %elapsed.as_millis(), ok = result.is_ok(), "Provider request finished");

    result
}
