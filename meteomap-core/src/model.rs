use serde::{Deserialize, Serialize};

use crate::{
    classify::{PressureSystem, WindIntensity},
    coord::Coordinate,
    layer::LayerKind,
};

/// Name given to ad-hoc points and to report rows without a name.
pub const DEFAULT_POINT_NAME: &str = "Point";

/// Name given to imported features without a `name`/`NAME` property.
pub const DEFAULT_FEATURE_NAME: &str = "Location";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub current_c: f64,
    pub max_c: f64,
    pub min_c: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: f64,
    pub precipitation_mm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureReading {
    pub surface_hpa: f64,
    pub sea_level_hpa: f64,
    pub avg_surface_24h: Option<f64>,
    pub avg_sea_level_24h: Option<f64>,
    pub system: PressureSystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    pub speed_kmh: f64,
    pub direction_deg: f64,
    pub cardinal: String,
    pub gust_kmh: Option<f64>,
    pub avg_max_speed_7d: Option<f64>,
    pub intensity: WindIntensity,
    pub timezone: Option<String>,
}

/// Layer-specific measurements plus the classifications derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "lowercase")]
pub enum LayerReading {
    Temperature(TemperatureReading),
    Pressure(PressureReading),
    Wind(WindReading),
}

impl LayerReading {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerReading::Temperature(_) => LayerKind::Temperature,
            LayerReading::Pressure(_) => LayerKind::Pressure,
            LayerReading::Wind(_) => LayerKind::Wind,
        }
    }

    /// Color token of the derived classification, used for disc styling.
    pub fn color(&self) -> &'static str {
        match self {
            LayerReading::Temperature(_) => "blue",
            LayerReading::Pressure(p) => p.system.color(),
            LayerReading::Wind(w) => w.intensity.color(),
        }
    }
}

/// A fetched reading together with the time stamp the upstream reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSample {
    pub reading: LayerReading,
    pub time: String,
}

/// One successful fetch for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointObservation {
    pub name: String,
    pub coord: Coordinate,
    pub reading: LayerReading,
    pub time: String,
}

impl PointObservation {
    pub fn new(name: impl Into<String>, coord: Coordinate, sample: LayerSample) -> Self {
        Self {
            name: name.into(),
            coord,
            reading: sample.reading,
            time: sample.time,
        }
    }
}

/// Observations in feature order, replaced wholesale by every import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationBatch {
    observations: Vec<PointObservation>,
}

impl ObservationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: PointObservation) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointObservation> {
        self.observations.iter()
    }

    pub fn get(&self, index: usize) -> Option<&PointObservation> {
        self.observations.get(index)
    }
}

impl FromIterator<PointObservation> for ObservationBatch {
    fn from_iter<I: IntoIterator<Item = PointObservation>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ObservationBatch {
    type Item = &'a PointObservation;
    type IntoIter = std::slice::Iter<'a, PointObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
