use crate::{
    Config,
    coord::Coordinate,
    provider::{geocoding::OpenMeteoGeocoder, openmeteo::OpenMeteoClient},
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, fmt::Debug, sync::Arc};

pub mod geocoding;
pub mod openmeteo;

/// Field selection for one forecast call at one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub coord: Coordinate,
    pub current_weather: bool,
    pub current: Vec<&'static str>,
    pub hourly: Vec<&'static str>,
    pub daily: Vec<&'static str>,
    pub forecast_days: Option<u8>,
}

impl ForecastRequest {
    pub fn at(coord: Coordinate) -> Self {
        Self {
            coord,
            current_weather: false,
            current: Vec::new(),
            hourly: Vec::new(),
            daily: Vec::new(),
            forecast_days: None,
        }
    }

    pub fn with_current_weather(mut self) -> Self {
        self.current_weather = true;
        self
    }

    pub fn with_current(mut self, fields: &[&'static str]) -> Self {
        self.current.extend_from_slice(fields);
        self
    }

    pub fn with_hourly(mut self, fields: &[&'static str]) -> Self {
        self.hourly.extend_from_slice(fields);
        self
    }

    pub fn with_daily(mut self, fields: &[&'static str]) -> Self {
        self.daily.extend_from_slice(fields);
        self
    }

    pub fn with_forecast_days(mut self, days: u8) -> Self {
        self.forecast_days = Some(days);
        self
    }

    /// Query-string pairs in the order the forecast endpoint documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("latitude", self.coord.lat.to_string()),
            ("longitude", self.coord.lon.to_string()),
        ];

        if self.current_weather {
            pairs.push(("current_weather", "true".to_string()));
        }
        if !self.current.is_empty() {
            pairs.push(("current", self.current.join(",")));
        }
        if !self.hourly.is_empty() {
            pairs.push(("hourly", self.hourly.join(",")));
        }
        if !self.daily.is_empty() {
            pairs.push(("daily", self.daily.join(",")));
        }
        if let Some(days) = self.forecast_days {
            pairs.push(("forecast_days", days.to_string()));
        }

        pairs.push(("timezone", "auto".to_string()));
        pairs
    }
}

/// Decoded forecast body. Series arrays are indexed in parallel with `time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub current: Option<CurrentBlock>,
    #[serde(default)]
    pub current_weather: Option<CurrentWeather>,
    #[serde(default)]
    pub hourly: Option<SeriesBlock>,
    #[serde(default)]
    pub daily: Option<SeriesBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub windspeed: f64,
    pub winddirection: f64,
    #[serde(default)]
    pub weathercode: Option<u16>,
    pub time: String,
}

/// The `current=` block: a timestamp plus whichever variables were requested.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentBlock {
    pub time: String,
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

impl CurrentBlock {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(serde_json::Value::as_f64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

impl SeriesBlock {
    /// Numeric series by name; non-numeric entries become `None`.
    pub fn series(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let items = self.values.get(name)?.as_array()?;
        Some(items.iter().map(serde_json::Value::as_f64).collect())
    }

    pub fn first(&self, name: &str) -> Option<f64> {
        self.series(name)?.first().copied().flatten()
    }
}

/// One place returned by a geocoding lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }

    pub fn display_name(&self) -> String {
        match &self.country {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name.clone(),
        }
    }
}

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn forecast(&self, request: &ForecastRequest) -> anyhow::Result<ForecastResponse>;
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// First match for a free-text place name, `None` when nothing matches.
    async fn lookup(&self, name: &str) -> anyhow::Result<Option<Place>>;
}

/// Construct the forecast client described by the config.
pub fn source_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherSource>> {
    let client = OpenMeteoClient::with_base_url(config.forecast_url(), config.request_timeout())?;
    Ok(Arc::new(client))
}

/// Construct the geocoding client described by the config.
pub fn geocoder_from_config(config: &Config) -> anyhow::Result<Arc<dyn Geocoder>> {
    let geocoder = OpenMeteoGeocoder::with_base_url(
        config.geocoding_url(),
        config.geocoding_language(),
        config.request_timeout(),
    )?;
    Ok(Arc::new(geocoder))
}
