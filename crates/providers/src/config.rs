//! Provider endpoint configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Endpoints, credentials, and network limits for the external providers.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Open-Meteo API base URL
    #[serde(default = "default_weather_base_url")]
    #[validate(url)]
    pub weather_base_url: String,
    /// WAQI API base URL
    #[serde(default = "default_air_quality_base_url")]
    #[validate(url)]
    pub air_quality_base_url: String,
    /// WAQI access token ("demo" only resolves a handful of stations)
    #[serde(default = "default_air_quality_token")]
    #[validate(length(min = 1))]
    pub air_quality_token: String,
    /// data.gouv.fr API base URL
    #[serde(default = "default_energy_base_url")]
    #[validate(url)]
    pub energy_base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 10, max = 30))]
    pub timeout_secs: u64,
    /// Days of history requested from Open-Meteo
    #[serde(default = "default_weather_past_days")]
    #[validate(range(min = 1, max = 92))]
    pub weather_past_days: u32,
    /// Datasets requested per data.gouv.fr search
    #[serde(default = "default_energy_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub energy_page_size: u32,
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_air_quality_base_url() -> String {
    "https://api.waqi.info".to_string()
}

fn default_air_quality_token() -> String {
    "demo".to_string()
}

fn default_energy_base_url() -> String {
    "https://www.data.gouv.fr".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_weather_past_days() -> u32 {
    7
}

fn default_energy_page_size() -> u32 {
    3
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            weather_base_url: default_weather_base_url(),
            air_quality_base_url: default_air_quality_base_url(),
            air_quality_token: default_air_quality_token(),
            energy_base_url: default_energy_base_url(),
            timeout_secs: default_timeout_secs(),
            weather_past_days: default_weather_past_days(),
            energy_page_size: default_energy_page_size(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Points every provider at one base URL (mock servers in tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.weather_base_url = base.to_string();
        self.air_quality_base_url = base.to_string();
        self.energy_base_url = base.to_string();
        self
    }
}

/// Joins a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
