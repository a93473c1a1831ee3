//! Batch import: zipped shapefile in, one observation per point feature out.

use log::{info, warn};
use std::{fs, path::Path};
use thiserror::Error;

use crate::{
    coord::Coordinate,
    layer::{LayerKind, fetch_point},
    model::{DEFAULT_FEATURE_NAME, ObservationBatch, PointObservation},
    provider::WeatherSource,
};

pub mod archive;

pub use archive::decode_archive;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Please upload a Shapefile (.zip)")]
    MissingInput,

    #[error("Failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process shapefile: {0}")]
    Decode(String),
}

/// A point geometry from the archive with its display-name attribute, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub coord: Coordinate,
    pub name: Option<String>,
}

impl PointFeature {
    pub fn new(coord: Coordinate, name: Option<String>) -> Self {
        Self { coord, name }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FEATURE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub batch: ObservationBatch,
    pub total: usize,
}

impl ImportOutcome {
    pub fn loaded(&self) -> usize {
        self.batch.len()
    }

    pub fn skipped(&self) -> usize {
        self.total - self.batch.len()
    }
}

/// Read and decode the archive at `path`. `None` means no file was selected.
pub fn read_archive(path: Option<&Path>) -> Result<Vec<PointFeature>, ImportError> {
    let path = path.ok_or(ImportError::MissingInput)?;

    let bytes = fs::read(path).map_err(|source| ImportError::Read {
        path: path.display().to_string(),
        source,
    })?;

    decode_archive(&bytes)
}

/// Fetch every feature in order, one request at a time.
///
/// Failed fetches are skipped: they contribute neither an observation nor a
/// placeholder, so the batch keeps the relative order of the successes.
pub async fn import_features(
    source: &dyn WeatherSource,
    layer: LayerKind,
    features: &[PointFeature],
) -> ImportOutcome {
    info!("importing {} features for the {layer} layer", features.len());

    let mut batch = ObservationBatch::new();
    for (index, feature) in features.iter().enumerate() {
        match fetch_point(source, layer, feature.coord).await {
            Some(sample) => {
                batch.push(PointObservation::new(
                    feature.display_name(),
                    feature.coord,
                    sample,
                ));
            }
            None => warn!(
                "skipping feature #{index} '{}' at {}",
                feature.display_name(),
                feature.coord
            ),
        }
    }

    let outcome = ImportOutcome {
        batch,
        total: features.len(),
    };
    info!(
        "import finished: {} loaded, {} skipped",
        outcome.loaded(),
        outcome.skipped()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::LayerReading,
        provider::{ForecastRequest, ForecastResponse},
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Fails for longitudes listed in `failing`, records every request.
    #[derive(Debug, Default)]
    struct Scripted {
        failing: Vec<f64>,
        seen: Mutex<Vec<Coordinate>>,
    }

    #[async_trait]
    impl WeatherSource for Scripted {
        async fn forecast(&self, request: &ForecastRequest) -> anyhow::Result<ForecastResponse> {
            self.seen.lock().unwrap().push(request.coord);
            if self.failing.contains(&request.coord.lon) {
                return Err(anyhow!("HTTP 502"));
            }
            Ok(serde_json::from_value(json!({
                "current_weather": {"time": "2025-01-01T00:00", "temperature": request.coord.lon, "windspeed": 3.0, "winddirection": 90.0},
                "daily": {"temperature_2m_max": [1.0], "temperature_2m_min": [0.0]}
            }))
            .unwrap())
        }
    }

    fn features(lons: &[f64]) -> Vec<PointFeature> {
        lons.iter()
            .map(|lon| PointFeature::new(Coordinate::new(*lon, 10.0), Some(format!("P{lon}"))))
            .collect()
    }

    #[test]
    fn display_name_falls_back_to_location() {
        let c = Coordinate::new(0.0, 0.0);
        assert_eq!(PointFeature::new(c, None).display_name(), "Location");
        assert_eq!(PointFeature::new(c, Some(String::new())).display_name(), "Location");
        assert_eq!(PointFeature::new(c, Some("Giza".into())).display_name(), "Giza");
    }

    #[test]
    fn missing_input_fails_before_io() {
        assert!(matches!(read_archive(None), Err(ImportError::MissingInput)));
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let err = read_archive(Some(Path::new("/definitely/not/here.zip"))).unwrap_err();
        assert!(matches!(err, ImportError::Read { .. }));
    }

    #[tokio::test]
    async fn k_of_n_successes_keep_relative_order() {
        let source = Scripted {
            failing: vec![2.0, 4.0],
            ..Default::default()
        };
        let feats = features(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let outcome = import_features(&source, LayerKind::Temperature, &feats).await;

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.loaded(), 3);
        assert_eq!(outcome.skipped(), 2);
        let names: Vec<&str> = outcome.batch.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["P1", "P3", "P5"]);

        // one request per feature, in file order
        let seen: Vec<f64> = source.seen.lock().unwrap().iter().map(|c| c.lon).collect();
        assert_eq!(seen, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn observations_carry_feature_coordinates() {
        let source = Scripted::default();
        let outcome = import_features(&source, LayerKind::Temperature, &features(&[7.0])).await;

        let obs = outcome.batch.get(0).unwrap();
        assert_eq!(obs.coord, Coordinate::new(7.0, 10.0));
        assert!(matches!(&obs.reading, LayerReading::Temperature(t) if t.current_c == 7.0));
    }

    #[tokio::test]
    async fn empty_feature_list_yields_empty_batch() {
        let outcome = import_features(&Scripted::default(), LayerKind::Wind, &[]).await;
        assert!(outcome.batch.is_empty());
        assert_eq!(outcome.skipped(), 0);
    }
}
