//! External environmental data providers.
//!
//! Each provider module holds its fetcher, its raw payload shape, and the
//! normalizer that turns that payload into canonical indicator drafts:
//! - `weather`: Open-Meteo hourly forecast (point-in-time readings)
//! - `air_quality`: WAQI station feed (freshness-window readings)
//! - `energy`: data.gouv.fr dataset search (daily proxy signal)

pub mod air_quality;
pub mod client;
pub mod config;
pub mod energy;
pub mod fetcher;
pub mod normalize;
pub mod payload;
pub mod weather;

pub use client::build_http_client;
pub use config::ProviderConfig;
pub use fetcher::{http_fetcher, Fetcher};
pub use normalize::{normalize, NormalizeContext, Normalized};
pub use payload::*;
