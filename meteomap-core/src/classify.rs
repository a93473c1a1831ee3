//! Display classifications derived from raw measurements.

use serde::{Deserialize, Serialize};

/// Reference sea-level pressure in hPa separating high and low systems.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureSystem {
    High,
    Low,
    Normal,
}

impl PressureSystem {
    /// Strict comparisons on both sides: only exactly 1013 hPa is `Normal`.
    pub fn classify(sea_level_hpa: f64) -> Self {
        if sea_level_hpa > STANDARD_PRESSURE_HPA {
            PressureSystem::High
        } else if sea_level_hpa < STANDARD_PRESSURE_HPA {
            PressureSystem::Low
        } else {
            PressureSystem::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PressureSystem::High => "High Pressure",
            PressureSystem::Low => "Low Pressure",
            PressureSystem::Normal => "Normal",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PressureSystem::High => "red",
            PressureSystem::Low => "indigo",
            PressureSystem::Normal => "blue",
        }
    }
}

impl std::fmt::Display for PressureSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Informal wind bands in km/h, loosely following the Beaufort scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindIntensity {
    Calm,
    LightBreeze,
    ModerateBreeze,
    FreshBreeze,
    StrongBreeze,
    Gale,
    Storm,
}

impl WindIntensity {
    pub fn classify(speed_kmh: f64) -> Self {
        if speed_kmh < 1.0 {
            WindIntensity::Calm
        } else if speed_kmh < 12.0 {
            WindIntensity::LightBreeze
        } else if speed_kmh < 20.0 {
            WindIntensity::ModerateBreeze
        } else if speed_kmh < 29.0 {
            WindIntensity::FreshBreeze
        } else if speed_kmh < 39.0 {
            WindIntensity::StrongBreeze
        } else if speed_kmh < 50.0 {
            WindIntensity::Gale
        } else {
            WindIntensity::Storm
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WindIntensity::Calm => "Calm",
            WindIntensity::LightBreeze => "Light Breeze",
            WindIntensity::ModerateBreeze => "Moderate Breeze",
            WindIntensity::FreshBreeze => "Fresh Breeze",
            WindIntensity::StrongBreeze => "Strong Breeze",
            WindIntensity::Gale => "Gale",
            WindIntensity::Storm => "Storm",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            WindIntensity::Calm => "gray",
            WindIntensity::LightBreeze => "green",
            WindIntensity::ModerateBreeze => "lime",
            WindIntensity::FreshBreeze => "yellow",
            WindIntensity::StrongBreeze => "orange",
            WindIntensity::Gale => "red",
            WindIntensity::Storm => "purple",
        }
    }
}

impl std::fmt::Display for WindIntensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass name for a bearing in degrees.
pub fn cardinal_direction(degrees: f64) -> &'static str {
    let sector = (degrees / 22.5).round() as i64;
    COMPASS_POINTS[sector.rem_euclid(16) as usize]
}

/// Mean of the first `window` samples rounded to one decimal.
///
/// Null samples are left out of both the sum and the divisor rather than
/// counted as zero, so a gap in the series does not drag the mean down.
/// `None` when nothing is left.
pub fn rolling_average(series: &[Option<f64>], window: usize) -> Option<f64> {
    let samples: Vec<f64> = series.iter().take(window).flatten().copied().collect();
    if samples.is_empty() {
        return None;
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    Some(round_to_tenth(mean))
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
