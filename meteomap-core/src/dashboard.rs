//! Multi-day outlooks for a fixed point or one of the Egyptian governorates.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::debug;

use crate::{
    classify::round_to_tenth,
    coord::Coordinate,
    provider::{CurrentWeather, ForecastRequest, WeatherSource},
};

/// The forecast endpoint's maximum horizon.
pub const MAX_OUTLOOK_DAYS: u8 = 16;

/// Cairo, used when no location is given.
pub const DEFAULT_LOCATION: Coordinate = Coordinate::new(31.2357, 30.0444);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Showers,
    SnowShowers,
    Thunderstorm,
}

impl WeatherCondition {
    /// Map a WMO weather code onto a coarse condition.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => WeatherCondition::Clear,
            1..=3 => WeatherCondition::PartlyCloudy,
            4..=48 => WeatherCondition::Cloudy,
            49..=67 => WeatherCondition::Rain,
            68..=77 => WeatherCondition::Snow,
            78..=82 => WeatherCondition::Showers,
            83..=86 => WeatherCondition::SnowShowers,
            _ => WeatherCondition::Thunderstorm,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::PartlyCloudy => "Partly cloudy",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Showers => "Showers",
            WeatherCondition::SnowShowers => "Snow showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "☀️",
            WeatherCondition::PartlyCloudy => "⛅",
            WeatherCondition::Cloudy => "☁️",
            WeatherCondition::Rain | WeatherCondition::Showers => "🌧️",
            WeatherCondition::Snow | WeatherCondition::SnowShowers => "🌨️",
            WeatherCondition::Thunderstorm => "⛈️",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyOutlook {
    pub date: NaiveDate,
    pub max_c: Option<f64>,
    pub min_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub max_wind_kmh: Option<f64>,
    pub condition: Option<WeatherCondition>,
}

#[derive(Debug, Clone)]
pub struct Outlook {
    pub coord: Coordinate,
    pub timezone: Option<String>,
    pub current: CurrentWeather,
    pub days: Vec<DailyOutlook>,
}

impl Outlook {
    pub fn current_condition(&self) -> Option<WeatherCondition> {
        self.current.weathercode.map(WeatherCondition::from_code)
    }

    /// Sum over the horizon, missing days counted as zero.
    pub fn total_precipitation(&self) -> f64 {
        round_to_tenth(
            self.days
                .iter()
                .map(|d| d.precipitation_mm.unwrap_or(0.0))
                .sum(),
        )
    }
}

const DAILY_FIELDS: [&str; 5] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "windspeed_10m_max",
    "weathercode",
];

/// Current conditions plus up to `days` daily rows (capped at 16).
pub async fn fetch_outlook(
    source: &dyn WeatherSource,
    coord: Coordinate,
    days: u8,
) -> Result<Outlook> {
    let days = days.clamp(1, MAX_OUTLOOK_DAYS);
    let request = ForecastRequest::at(coord)
        .with_current_weather()
        .with_daily(&DAILY_FIELDS)
        .with_forecast_days(days);

    let response = source
        .forecast(&request)
        .await
        .with_context(|| format!("Failed to fetch outlook for {coord}"))?;

    let current = response
        .current_weather
        .context("response has no current_weather block")?;
    let daily = response.daily.context("response has no daily block")?;

    let column = |name: &str| daily.series(name).unwrap_or_default();
    let (max, min, rain, wind, code) = (
        column("temperature_2m_max"),
        column("temperature_2m_min"),
        column("precipitation_sum"),
        column("windspeed_10m_max"),
        column("weathercode"),
    );
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut rows = Vec::with_capacity(daily.time.len());
    for (i, raw) in daily.time.iter().take(days as usize).enumerate() {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid daily date '{raw}'"))?;
        rows.push(DailyOutlook {
            date,
            max_c: at(&max, i),
            min_c: at(&min, i),
            precipitation_mm: at(&rain, i),
            max_wind_kmh: at(&wind, i),
            condition: at(&code, i).map(|c| WeatherCondition::from_code(c as u16)),
        });
    }
    debug!("outlook at {coord}: {} days", rows.len());

    Ok(Outlook {
        coord,
        timezone: response.timezone,
        current,
        days: rows,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub name: &'static str,
    pub coord: Coordinate,
}

const fn region(name: &'static str, lat: f64, lon: f64) -> Region {
    Region {
        name,
        coord: Coordinate::new(lon, lat),
    }
}

/// The 27 governorates of Egypt.
pub const REGIONS: [Region; 27] = [
    region("Cairo", 30.0444, 31.2357),
    region("Giza", 30.0131, 31.2089),
    region("Alexandria", 31.2001, 29.9187),
    region("Qalyubia", 30.4167, 31.2000),
    region("Monufia", 30.4650, 30.9310),
    region("Gharbia", 30.8667, 31.0000),
    region("Dakahlia", 31.0409, 31.3785),
    region("Kafr El Sheikh", 31.1107, 30.9396),
    region("Sharqia", 30.7323, 31.7147),
    region("Damietta", 31.4165, 31.8133),
    region("Port Said", 31.2565, 32.2841),
    region("Ismailia", 30.5830, 32.2654),
    region("Suez", 29.9668, 32.5498),
    region("Beni Suef", 29.0661, 31.0994),
    region("Faiyum", 29.3084, 30.8428),
    region("Minya", 28.1099, 30.7503),
    region("Asyut", 27.1800, 31.1837),
    region("Sohag", 26.5590, 31.6957),
    region("Qena", 26.1551, 32.7160),
    region("Luxor", 25.6872, 32.6396),
    region("Aswan", 24.0889, 32.8998),
    region("Red Sea", 26.9845, 33.9616),
    region("New Valley", 25.4448, 28.5559),
    region("Matrouh", 31.3543, 27.2373),
    region("North Sinai", 30.6060, 33.6176),
    region("South Sinai", 28.2416, 33.6176),
    region("Beheira", 30.8278, 30.5256),
];

pub fn find_region(name: &str) -> Option<&'static Region> {
    let wanted = name.trim();
    REGIONS.iter().find(|r| r.name.eq_ignore_ascii_case(wanted))
}
