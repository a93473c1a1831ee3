//! Tabular reports over the current observation batch.

use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    layer::LayerKind,
    model::{DEFAULT_POINT_NAME, LayerReading, ObservationBatch, PointObservation},
};

pub mod pdf;

pub use pdf::render_pdf;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No {0} data available to download")]
    EmptyBatch(LayerKind),

    #[error("Failed to generate PDF: {0}")]
    Render(String),

    #[error("Failed to write report '{path}'")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LayerKind {
    pub fn report_title(&self) -> &'static str {
        match self {
            LayerKind::Temperature => "Temperature Report",
            LayerKind::Pressure => "Atmospheric Pressure Report",
            LayerKind::Wind => "Wind Report",
        }
    }

    pub fn report_file_name(&self) -> &'static str {
        match self {
            LayerKind::Temperature => "weather_report.pdf",
            LayerKind::Pressure => "pressure_report.pdf",
            LayerKind::Wind => "wind_report.pdf",
        }
    }

    pub fn report_columns(&self) -> &'static [&'static str] {
        match self {
            LayerKind::Temperature => &[
                "Name",
                "Lon",
                "Lat",
                "Current Temperature (°C)",
                "Max Temperature (°C)",
                "Min Temperature (°C)",
                "Wind Speed (km/h)",
            ],
            LayerKind::Pressure => &[
                "Name",
                "Lon",
                "Lat",
                "Surface Pressure (hPa)",
                "Sea Level Pressure (hPa)",
                "Pressure Type",
                "Avg Surface (24h)",
                "Avg Sea Level (24h)",
            ],
            LayerKind::Wind => &[
                "Name",
                "Lon",
                "Lat",
                "Wind Speed (km/h)",
                "Direction",
                "Gust (km/h)",
                "Intensity",
                "Avg Max Speed (7d)",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub layer: LayerKind,
    pub title: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// One row per observation, in batch order.
    pub fn from_batch(layer: LayerKind, batch: &ObservationBatch) -> Result<Self, ExportError> {
        if batch.is_empty() {
            return Err(ExportError::EmptyBatch(layer));
        }

        let columns = layer.report_columns();
        let rows = batch
            .iter()
            .map(|obs| {
                let mut row = row_for(obs);
                row.resize(columns.len(), String::new());
                row
            })
            .collect();

        Ok(Self {
            layer,
            title: layer.report_title(),
            columns,
            rows,
        })
    }
}

fn row_for(obs: &PointObservation) -> Vec<String> {
    let name = if obs.name.is_empty() {
        DEFAULT_POINT_NAME.to_string()
    } else {
        obs.name.clone()
    };
    let mut row = vec![
        name,
        format!("{:.4}", obs.coord.lon),
        format!("{:.4}", obs.coord.lat),
    ];

    match &obs.reading {
        LayerReading::Temperature(t) => row.extend([
            t.current_c.to_string(),
            t.max_c.to_string(),
            t.min_c.to_string(),
            t.wind_speed_kmh.to_string(),
        ]),
        LayerReading::Pressure(p) => row.extend([
            p.surface_hpa.to_string(),
            p.sea_level_hpa.to_string(),
            p.system.label().to_string(),
            tenth_or_blank(p.avg_surface_24h),
            tenth_or_blank(p.avg_sea_level_24h),
        ]),
        LayerReading::Wind(w) => row.extend([
            w.speed_kmh.to_string(),
            format!("{} ({})", w.cardinal, w.direction_deg),
            w.gust_kmh.map(|g| g.to_string()).unwrap_or_default(),
            w.intensity.label().to_string(),
            tenth_or_blank(w.avg_max_speed_7d),
        ]),
    }
    row
}

fn tenth_or_blank(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_default()
}

/// Render the batch and write it to `dir` under the layer's fixed file name.
///
/// The document is fully rendered before anything touches the disk.
pub fn export_report(
    layer: LayerKind,
    batch: &ObservationBatch,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let table = ReportTable::from_batch(layer, batch)?;
    let bytes = render_pdf(&table)?;

    let path = dir.join(layer.report_file_name());
    fs::write(&path, bytes).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;

    info!("wrote {} rows to {}", table.rows.len(), path.display());
    Ok(path)
}
