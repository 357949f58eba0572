//! Reference data: zones, sources, and coordinate resolution.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::FetchError;

/// A geographic zone readings are attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub postal_code: Option<String>,
    /// GeoJSON-like point, e.g. `{"type":"Point","coordinates":[2.35,48.85]}`.
    pub geometry: Option<String>,
}

impl Zone {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            postal_code: None,
            geometry: None,
        }
    }

    pub fn with_point(mut self, coords: Coordinates) -> Self {
        self.geometry = Some(
            serde_json::json!({
                "type": "Point",
                "coordinates": [coords.lon, coords.lat],
            })
            .to_string(),
        );
        self
    }
}

/// An external data provider row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Source {
    pub id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: String,
    #[validate(url)]
    pub url: String,
}

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// What a fetcher needs to know about the zone it is fetching for.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLocation {
    pub zone_id: i64,
    pub name: String,
    /// Absent for providers addressed by zone name only.
    pub coordinates: Option<Coordinates>,
}

impl ZoneLocation {
    /// Fetch target carrying whatever coordinates the zone resolves to.
    pub fn for_zone(zone: &Zone) -> Self {
        Self {
            zone_id: zone.id,
            name: zone.name.clone(),
            coordinates: resolve_coordinates(zone),
        }
    }

    /// Coordinates for geo-addressed providers.
    pub fn require_coordinates(&self) -> Result<Coordinates, FetchError> {
        self.coordinates
            .ok_or_else(|| FetchError::NoData(format!("zone {} has no coordinates", self.name)))
    }
}

/// Fallback coordinates for zones without stored geometry.
const CITY_COORDINATES: &[(&str, Coordinates)] = &[
    ("Paris", Coordinates::new(48.8566, 2.3522)),
    ("Lyon", Coordinates::new(45.7640, 4.8357)),
    ("Marseille", Coordinates::new(43.2965, 5.3698)),
    ("Bordeaux", Coordinates::new(44.8378, -0.5792)),
    ("Lille", Coordinates::new(50.6292, 3.0573)),
    ("Toulouse", Coordinates::new(43.6045, 1.4440)),
];

#[derive(Deserialize)]
struct PointGeometry {
    coordinates: Vec<f64>,
}

/// Parses stored geometry. Coordinates are in GeoJSON order: `[lon, lat]`.
pub fn parse_geometry(geometry: &str) -> Option<Coordinates> {
    let point: PointGeometry = serde_json::from_str(geometry).ok()?;
    match point.coordinates.as_slice() {
        [lon, lat, ..] => Some(Coordinates::new(*lat, *lon)),
        _ => None,
    }
}

/// Looks a city up in the static table (case-insensitive substring match).
pub fn city_coordinates(name: &str) -> Option<Coordinates> {
    let name = name.to_lowercase();
    CITY_COORDINATES
        .iter()
        .find(|(city, _)| name.contains(&city.to_lowercase()))
        .map(|(_, coords)| *coords)
}

/// Resolves a zone's coordinates: stored geometry first, then the city table.
pub fn resolve_coordinates(zone: &Zone) -> Option<Coordinates> {
    zone.geometry
        .as_deref()
        .and_then(parse_geometry)
        .or_else(|| city_coordinates(&zone.name))
}
