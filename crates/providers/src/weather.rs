//! Open-Meteo hourly weather.
//!
//! The forecast endpoint answers with parallel arrays indexed by `time`.
//! Only the trailing index is ingested: it yields four readings that share
//! one timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use engine_core::{types, FetchError, ParseError, ProviderKind, ZoneLocation};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::client::get_json;
use crate::config::{endpoint, ProviderConfig};
use crate::fetcher::Fetcher;
use crate::normalize::{NormalizeContext, Normalized};
use crate::payload::ProviderPayload;

const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,pressure_msl";

/// Hourly series; values may be null where the model has no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub pressure_msl: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    /// Offset of the local times in `hourly.time` (requested with `timezone=auto`).
    #[serde(default)]
    pub utc_offset_seconds: i32,
    #[serde(default)]
    pub timezone: Option<String>,
    pub hourly: HourlySeries,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    #[serde(default)]
    timezone: Option<String>,
    hourly: Option<HourlySeries>,
}

pub struct WeatherFetcher {
    client: Client,
    url: String,
    past_days: u32,
}

impl WeatherFetcher {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            url: endpoint(&config.weather_base_url, "v1/forecast"),
            past_days: config.weather_past_days,
        }
    }
}

#[async_trait]
impl Fetcher for WeatherFetcher {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Weather
    }

    async fn try_fetch(&self, location: &ZoneLocation) -> Result<ProviderPayload, FetchError> {
        let coords = location.require_coordinates()?;
        let request = self.client.get(&self.url).query(&[
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("past_days", self.past_days.to_string()),
            ("timezone", "auto".to_string()),
        ]);

        let response: ForecastResponse = get_json(request).await?;
        let hourly = response
            .hourly
            .ok_or_else(|| FetchError::NoData("response has no hourly block".into()))?;
        if hourly.time.is_empty() {
            return Err(FetchError::NoData("hourly series is empty".into()));
        }

        Ok(ProviderPayload::Weather(WeatherPayload {
            utc_offset_seconds: response.utc_offset_seconds,
            timezone: response.timezone,
            hourly,
        }))
    }
}

/// Converts an Open-Meteo local time (`2024-01-15T10:00`) to UTC.
pub fn parse_local_time(value: &str, utc_offset_seconds: i32) -> Result<DateTime<Utc>, ParseError> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| ParseError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    let utc = naive - Duration::seconds(i64::from(utc_offset_seconds));
    Ok(Utc.from_utc_datetime(&utc))
}

fn value_at(series: &[Option<f64>], index: usize, field: &str) -> Result<f64, ParseError> {
    match series.get(index) {
        None => Err(ParseError::missing(format!("hourly.{}[{}]", field, index))),
        Some(None) => Err(ParseError::null(format!("hourly.{}[{}]", field, index))),
        Some(Some(v)) => Ok(*v),
    }
}

pub(crate) fn normalize(payload: &WeatherPayload, ctx: &NormalizeContext<'_>) -> Normalized {
    let mut out = Normalized::default();
    let hourly = &payload.hourly;

    let Some(last) = hourly.time.len().checked_sub(1) else {
        out.errors.push(ParseError::missing("hourly.time"));
        return out;
    };

    let timestamp = match parse_local_time(&hourly.time[last], payload.utc_offset_seconds) {
        Ok(ts) => ts,
        Err(e) => {
            out.errors.push(e);
            return out;
        }
    };

    let metadata = serde_json::json!({
        "source": ProviderKind::Weather.label(),
        "coordinates": ctx.location.coordinates,
    });

    let readings: [(&str, &[Option<f64>], &str, &str); 4] = [
        (types::TEMPERATURE, hourly.temperature_2m.as_slice(), "temperature_2m", "°C"),
        (types::HUMIDITY, hourly.relative_humidity_2m.as_slice(), "relative_humidity_2m", "%"),
        (types::WIND_SPEED, hourly.wind_speed_10m.as_slice(), "wind_speed_10m", "km/h"),
        (types::PRESSURE, hourly.pressure_msl.as_slice(), "pressure_msl", "hPa"),
    ];

    for (indicator_type, series, field, unit) in readings {
        out.push(
            value_at(series, last, field)
                .map(|value| ctx.draft(indicator_type, value, unit, timestamp, &metadata)),
        );
    }

    out
}
