//! The provider-agnostic fetch contract.

use async_trait::async_trait;
use engine_core::{FetchError, ProviderKind, ZoneLocation};
use reqwest::Client;
use std::sync::Arc;
use telemetry::metrics;
use tracing::warn;

use crate::air_quality::AirQualityFetcher;
use crate::config::ProviderConfig;
use crate::energy::EnergyFetcher;
use crate::payload::ProviderPayload;
use crate::weather::WeatherFetcher;

/// One network call per zone, returning the raw provider payload.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identity of the provider this fetcher talks to.
    fn kind(&self) -> ProviderKind;

    async fn try_fetch(&self, location: &ZoneLocation) -> Result<ProviderPayload, FetchError>;

    /// Soft-failing fetch: any error is logged and turned into `None`.
    async fn fetch(&self, location: &ZoneLocation) -> Option<ProviderPayload> {
        metrics().fetch_attempts.inc();
        match self.try_fetch(location).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                metrics().fetch_failures.inc();
                warn!(
                    provider = %self.kind(),
                    zone = %location.name,
                    zone_id = location.zone_id,
                    code = e.code(),
                    error = %e,
                    "Fetch failed, skipping zone"
                );
                None
            }
        }
    }
}

/// Builds the HTTP fetcher for a provider.
pub fn http_fetcher(kind: ProviderKind, client: Client, config: &ProviderConfig) -> Arc<dyn Fetcher> {
    match kind {
        ProviderKind::Weather => Arc::new(WeatherFetcher::new(client, config)),
        ProviderKind::AirQuality => Arc::new(AirQualityFetcher::new(client, config)),
        ProviderKind::Energy => Arc::new(EnergyFetcher::new(client, config)),
    }
}
