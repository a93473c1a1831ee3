use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use super::{ForecastRequest, ForecastResponse, WeatherSource};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(FORECAST_URL, Duration::from_secs(30))
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Open-Meteo")?;

        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let query = request.query_pairs();
        debug!("GET {} {:?}", self.base_url, query);

        let res = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .context("Failed to send request to Open-Meteo forecast")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("{\"error\":true}"), "{\"error\":true}");
    }

    #[test]
    fn truncate_body_cuts_on_char_boundary() {
        let body = "é".repeat(150);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }

    #[test]
    fn decodes_error_free_body() {
        let body = r#"{"latitude":30.0,"longitude":31.25,"timezone":"Africa/Cairo",
            "current_weather":{"time":"2025-03-01T12:00","temperature":24.1,"windspeed":12.3,"winddirection":310.0,"weathercode":1}}"#;
        let parsed: ForecastResponse = serde_json::from_str(body).unwrap();
        let cw = parsed.current_weather.unwrap();
        assert_eq!(cw.temperature, 24.1);
        assert_eq!(cw.weathercode, Some(1));
        assert_eq!(parsed.timezone.as_deref(), Some("Africa/Cairo"));
    }
}
