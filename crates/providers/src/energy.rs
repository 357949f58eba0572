//! data.gouv.fr dataset search, used as a coarse energy signal.
//!
//! No energy figures are parsed: the number of datasets matching the zone is
//! turned into indicative consumption and CO2 values.

use async_trait::async_trait;
use engine_core::{types, FetchError, ProviderKind, ZoneLocation};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::client::get_json;
use crate::config::{endpoint, ProviderConfig};
use crate::fetcher::Fetcher;
use crate::normalize::{NormalizeContext, Normalized};
use crate::payload::ProviderPayload;

/// Indicative MWh/day per matching dataset.
pub const ENERGY_PER_DATASET: f64 = 100.0;
/// Indicative tCO2/day per matching dataset.
pub const CO2_PER_DATASET: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPayload {
    pub query: String,
    pub datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<DatasetSummary>,
}

pub struct EnergyFetcher {
    client: Client,
    url: String,
    page_size: u32,
}

impl EnergyFetcher {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            url: endpoint(&config.energy_base_url, "api/1/datasets/"),
            page_size: config.energy_page_size,
        }
    }
}

#[async_trait]
impl Fetcher for EnergyFetcher {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Energy
    }

    async fn try_fetch(&self, location: &ZoneLocation) -> Result<ProviderPayload, FetchError> {
        let query = format!("consommation énergie {}", location.name);
        let request = self.client.get(&self.url).query(&[
            ("q", query.clone()),
            ("page", "1".to_string()),
            ("page_size", self.page_size.to_string()),
        ]);

        let response: SearchResponse = get_json(request).await?;
        if response.data.is_empty() {
            return Err(FetchError::NoData(format!("no dataset matches {:?}", query)));
        }

        Ok(ProviderPayload::Energy(EnergyPayload {
            query,
            datasets: response.data,
        }))
    }
}

pub(crate) fn normalize(payload: &EnergyPayload, ctx: &NormalizeContext<'_>) -> Normalized {
    let mut out = Normalized::default();
    let count = payload.datasets.len();
    if count == 0 {
        return out;
    }

    let energy_meta = serde_json::json!({
        "source": ProviderKind::Energy.label(),
        "sector": "municipal",
        "city": ctx.location.name,
        "datasets": count,
    });
    let co2_meta = serde_json::json!({
        "source": ProviderKind::Energy.label(),
        "method": "estimation",
        "city": ctx.location.name,
        "datasets": count,
    });

    out.drafts.push(ctx.draft(
        types::ENERGY_CONSUMPTION,
        count as f64 * ENERGY_PER_DATASET,
        "MWh/jour",
        ctx.now,
        &energy_meta,
    ));
    out.drafts.push(ctx.draft(
        types::CO2,
        count as f64 * CO2_PER_DATASET,
        "tCO2/jour",
        ctx.now,
        &co2_meta,
    ));

    out
}
