//! Test fixtures: zones and provider payloads.

use chrono::{DateTime, Utc};
use engine_core::{city_coordinates, Coordinates, Indicator, IndicatorDraft, Zone, ZoneLocation};
use providers::air_quality::AirQualityPayload;
use providers::energy::{DatasetSummary, EnergyPayload};
use providers::weather::{HourlySeries, WeatherPayload};
use providers::ProviderPayload;
use std::collections::BTreeMap;

/// Zone with point geometry at the city's coordinates (Paris for unknown names).
pub fn zone(id: i64, name: &str) -> Zone {
    let coords = city_coordinates(name).unwrap_or(Coordinates::new(48.8566, 2.3522));
    Zone::new(id, name).with_point(coords)
}

/// Zone without geometry, resolved through the city table if possible.
pub fn bare_zone(id: i64, name: &str) -> Zone {
    Zone::new(id, name)
}

/// `n` zones with ids `1..=n`.
pub fn zones(n: i64) -> Vec<Zone> {
    const CITIES: [&str; 6] = ["Paris", "Lyon", "Marseille", "Bordeaux", "Lille", "Toulouse"];
    (1..=n)
        .map(|id| zone(id, CITIES[(id as usize - 1) % CITIES.len()]))
        .collect()
}

pub fn location(zone_id: i64, name: &str) -> ZoneLocation {
    ZoneLocation {
        zone_id,
        name: name.to_string(),
        coordinates: Some(city_coordinates(name).unwrap_or(Coordinates::new(48.8566, 2.3522))),
    }
}

/// Two-hour Open-Meteo series in Europe/Paris winter time (UTC+1).
pub fn weather_payload() -> ProviderPayload {
    weather_payload_at("2024-01-15T10:00")
}

pub fn weather_payload_at(last_time: &str) -> ProviderPayload {
    ProviderPayload::Weather(WeatherPayload {
        utc_offset_seconds: 3600,
        timezone: Some("Europe/Paris".into()),
        hourly: HourlySeries {
            time: vec!["2024-01-15T09:00".into(), last_time.into()],
            temperature_2m: vec![Some(3.0), Some(4.5)],
            relative_humidity_2m: vec![Some(80.0), Some(78.0)],
            wind_speed_10m: vec![Some(10.0), Some(12.3)],
            pressure_msl: vec![Some(1015.0), Some(1016.2)],
        },
    })
}

/// WAQI payload with pm25, pm10 and no2.
pub fn air_quality_payload() -> ProviderPayload {
    let mut pollutants = BTreeMap::new();
    pollutants.insert("pm25".to_string(), Some(12.0));
    pollutants.insert("pm10".to_string(), Some(20.0));
    pollutants.insert("no2".to_string(), Some(18.5));
    ProviderPayload::AirQuality(AirQualityPayload {
        station: "Test Station".into(),
        pollutants,
    })
}

pub fn energy_payload(datasets: usize) -> ProviderPayload {
    ProviderPayload::Energy(EnergyPayload {
        query: "consommation énergie test".into(),
        datasets: (0..datasets)
            .map(|i| DatasetSummary {
                id: format!("ds-{}", i),
                title: None,
            })
            .collect(),
    })
}

/// A draft reading with placeholder value and metadata.
pub fn draft(indicator_type: &str, zone_id: i64, source_id: i64, timestamp: DateTime<Utc>) -> IndicatorDraft {
    IndicatorDraft {
        indicator_type: indicator_type.to_string(),
        value: 1.0,
        unit: "u".into(),
        timestamp,
        zone_id,
        source_id,
        owner_id: 1,
        metadata: "{}".into(),
    }
}

/// A stored indicator, for seeding stores.
pub fn indicator(indicator_type: &str, zone_id: i64, source_id: i64, timestamp: DateTime<Utc>) -> Indicator {
    Indicator::from_draft(draft(indicator_type, zone_id, source_id, timestamp))
}
