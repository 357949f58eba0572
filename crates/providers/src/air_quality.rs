//! WAQI (World Air Quality Index) station feed.

use async_trait::async_trait;
use engine_core::{types, FetchError, ParseError, ProviderKind, ZoneLocation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::get_json;
use crate::config::{endpoint, ProviderConfig};
use crate::fetcher::Fetcher;
use crate::normalize::{NormalizeContext, Normalized};
use crate::payload::ProviderPayload;

const DEFAULT_STATION: &str = "WAQI Station";

/// WAQI pollutant keys and the indicator tags they map to.
const POLLUTANTS: [(&str, &str); 3] = [
    ("pm25", types::AIR_QUALITY_PM25),
    ("pm10", types::AIR_QUALITY_PM10),
    ("no2", types::AIR_QUALITY_NO2),
];

const UNIT: &str = "µg/m³";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityPayload {
    pub station: String,
    /// Tracked pollutants present in the feed. `None` when the entry has no value.
    pub pollutants: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    /// A station object when `status == "ok"`, an error message otherwise.
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StationData {
    #[serde(default)]
    city: Option<StationCity>,
    #[serde(default)]
    iaqi: BTreeMap<String, IaqiValue>,
}

#[derive(Debug, Deserialize)]
struct StationCity {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IaqiValue {
    v: Option<f64>,
}

pub struct AirQualityFetcher {
    client: Client,
    base_url: String,
    token: String,
}

impl AirQualityFetcher {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.air_quality_base_url.clone(),
            token: config.air_quality_token.clone(),
        }
    }
}

fn parse_feed(response: FeedResponse) -> Result<AirQualityPayload, FetchError> {
    if response.status != "ok" {
        let message = match response.data {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => "unknown error".to_string(),
            other => other.to_string(),
        };
        return Err(FetchError::Provider(message));
    }

    let station: StationData =
        serde_json::from_value(response.data).map_err(|e| FetchError::Decode(e.to_string()))?;

    let pollutants: BTreeMap<String, Option<f64>> = POLLUTANTS
        .iter()
        .filter_map(|(key, _)| station.iaqi.get(*key).map(|entry| (key.to_string(), entry.v)))
        .collect();

    if pollutants.is_empty() {
        return Err(FetchError::NoData("no tracked pollutant in feed".into()));
    }

    let station_name = station
        .city
        .and_then(|c| c.name)
        .unwrap_or_else(|| DEFAULT_STATION.to_string());

    Ok(AirQualityPayload {
        station: station_name,
        pollutants,
    })
}

#[async_trait]
impl Fetcher for AirQualityFetcher {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AirQuality
    }

    async fn try_fetch(&self, location: &ZoneLocation) -> Result<ProviderPayload, FetchError> {
        let coords = location.require_coordinates()?;
        let path = format!("feed/geo:{};{}/", coords.lat, coords.lon);
        let request = self
            .client
            .get(endpoint(&self.base_url, &path))
            .query(&[("token", self.token.as_str())]);

        let response: FeedResponse = get_json(request).await?;
        parse_feed(response).map(ProviderPayload::AirQuality)
    }
}

pub(crate) fn normalize(payload: &AirQualityPayload, ctx: &NormalizeContext<'_>) -> Normalized {
    let mut out = Normalized::default();

    let metadata = serde_json::json!({
        "source": ProviderKind::AirQuality.label(),
        "station": payload.station,
        "coordinates": ctx.location.coordinates,
    });

    for (key, indicator_type) in POLLUTANTS {
        let Some(value) = payload.pollutants.get(key) else {
            continue;
        };
        out.push(
            value
                .ok_or_else(|| ParseError::null(format!("iaqi.{}.v", key)))
                .map(|v| ctx.draft(indicator_type, v, UNIT, ctx.now, &metadata)),
        );
    }

    out
}
