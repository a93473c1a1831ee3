use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Geocoder, Place, openmeteo::truncate_body};

pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    base_url: String,
    language: String,
    http: Client,
}

impl OpenMeteoGeocoder {
    pub fn with_base_url(
        base_url: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Open-Meteo geocoding")?;

        Ok(Self {
            base_url: base_url.into(),
            language: language.into(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn lookup(&self, name: &str) -> Result<Option<Place>> {
        debug!("geocoding '{name}' via {}", self.base_url);

        let res = self
            .http
            .get(&self.base_url)
            .query(&[("name", name), ("count", "1"), ("language", self.language.as_str())])
            .send()
            .await
            .context("Failed to send request to Open-Meteo geocoding")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo geocoding response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        first_place(&body)
    }
}

fn first_place(body: &str) -> Result<Option<Place>> {
    let parsed: GeoResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo geocoding JSON")?;

    Ok(parsed.results.and_then(|r| r.into_iter().next()))
}
