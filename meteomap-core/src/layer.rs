//! Weather layers and the single-point fetch behind every layer screen.

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::{
    classify::{PressureSystem, WindIntensity, cardinal_direction, rolling_average},
    coord::Coordinate,
    model::{LayerReading, LayerSample, PressureReading, TemperatureReading, WindReading},
    provider::{ForecastRequest, ForecastResponse, WeatherSource},
};

/// Hourly samples averaged for the pressure layer.
pub const PRESSURE_AVERAGE_HOURS: usize = 24;

/// Daily samples averaged for the wind layer.
pub const WIND_AVERAGE_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Temperature,
    Pressure,
    Wind,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Temperature => "temperature",
            LayerKind::Pressure => "pressure",
            LayerKind::Wind => "wind",
        }
    }

    pub const fn all() -> &'static [LayerKind] {
        &[LayerKind::Temperature, LayerKind::Pressure, LayerKind::Wind]
    }

    /// The forecast fields this layer needs at one coordinate.
    pub fn request(&self, coord: Coordinate) -> ForecastRequest {
        let req = ForecastRequest::at(coord);
        match self {
            LayerKind::Temperature => req.with_current_weather().with_daily(&[
                "temperature_2m_max",
                "temperature_2m_min",
                "precipitation_sum",
            ]),
            LayerKind::Pressure => req
                .with_current(&["surface_pressure", "pressure_msl"])
                .with_hourly(&["surface_pressure", "pressure_msl"]),
            LayerKind::Wind => req
                .with_current_weather()
                .with_hourly(&["windspeed_10m", "winddirection_10m", "windgusts_10m"])
                .with_daily(&["windspeed_10m_max"]),
        }
    }

    /// Pull this layer's reading out of a forecast body.
    pub fn extract(&self, response: &ForecastResponse) -> Result<LayerSample> {
        match self {
            LayerKind::Temperature => extract_temperature(response),
            LayerKind::Pressure => extract_pressure(response),
            LayerKind::Wind => extract_wind(response),
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LayerKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "temperature" | "temp" => Ok(LayerKind::Temperature),
            "pressure" => Ok(LayerKind::Pressure),
            "wind" => Ok(LayerKind::Wind),
            _ => Err(anyhow!(
                "Unknown layer '{value}'. Supported layers: temperature, pressure, wind."
            )),
        }
    }
}

/// Fetch and derive one layer reading at one coordinate.
///
/// Issues exactly one request. Every failure is logged and collapses to
/// `None`; nothing is retried.
pub async fn fetch_point(
    source: &dyn WeatherSource,
    layer: LayerKind,
    coord: Coordinate,
) -> Option<LayerSample> {
    let request = layer.request(coord);

    let response = match source.forecast(&request).await {
        Ok(response) => response,
        Err(err) => {
            warn!("{layer} fetch failed at {coord}: {err:#}");
            return None;
        }
    };

    match layer.extract(&response) {
        Ok(sample) => Some(sample),
        Err(err) => {
            warn!("{layer} response at {coord} unusable: {err:#}");
            None
        }
    }
}

fn extract_temperature(response: &ForecastResponse) -> Result<LayerSample> {
    let current = response
        .current_weather
        .as_ref()
        .context("response has no current_weather block")?;
    let daily = response.daily.as_ref().context("response has no daily block")?;

    let max_c = daily
        .first("temperature_2m_max")
        .context("daily temperature_2m_max is missing")?;
    let min_c = daily
        .first("temperature_2m_min")
        .context("daily temperature_2m_min is missing")?;

    Ok(LayerSample {
        reading: LayerReading::Temperature(TemperatureReading {
            current_c: current.temperature,
            max_c,
            min_c,
            wind_speed_kmh: current.windspeed,
            wind_direction_deg: current.winddirection,
            precipitation_mm: daily.first("precipitation_sum"),
        }),
        time: current.time.clone(),
    })
}

fn extract_pressure(response: &ForecastResponse) -> Result<LayerSample> {
    let current = response
        .current
        .as_ref()
        .context("response has no current block")?;
    let hourly = response.hourly.as_ref().context("response has no hourly block")?;

    let surface_hpa = current
        .value("surface_pressure")
        .context("current surface_pressure is missing")?;
    let sea_level_hpa = current
        .value("pressure_msl")
        .context("current pressure_msl is missing")?;

    let surface_series = hourly
        .series("surface_pressure")
        .context("hourly surface_pressure is missing")?;
    let sea_level_series = hourly
        .series("pressure_msl")
        .context("hourly pressure_msl is missing")?;

    Ok(LayerSample {
        reading: LayerReading::Pressure(PressureReading {
            surface_hpa,
            sea_level_hpa,
            avg_surface_24h: rolling_average(&surface_series, PRESSURE_AVERAGE_HOURS),
            avg_sea_level_24h: rolling_average(&sea_level_series, PRESSURE_AVERAGE_HOURS),
            system: PressureSystem::classify(sea_level_hpa),
        }),
        time: current.time.clone(),
    })
}

fn extract_wind(response: &ForecastResponse) -> Result<LayerSample> {
    let current = response
        .current_weather
        .as_ref()
        .context("response has no current_weather block")?;

    let gust_kmh = response
        .hourly
        .as_ref()
        .and_then(|h| h.first("windgusts_10m"));

    let avg_max_speed_7d = response
        .daily
        .as_ref()
        .and_then(|d| d.series("windspeed_10m_max"))
        .and_then(|s| rolling_average(&s, WIND_AVERAGE_DAYS));

    Ok(LayerSample {
        reading: LayerReading::Wind(WindReading {
            speed_kmh: current.windspeed,
            direction_deg: current.winddirection,
            cardinal: cardinal_direction(current.winddirection).to_string(),
            gust_kmh,
            avg_max_speed_7d,
            intensity: WindIntensity::classify(current.windspeed),
            timezone: response.timezone.clone(),
        }),
        time: current.time.clone(),
    })
}
