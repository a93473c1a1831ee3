//! One layer screen: a map surface, the current batch, and the flows that
//! mutate them. Failures come back as `ScreenError` for the caller to present.

use log::info;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

use crate::{
    coord::{Coordinate, ParseError, parse_coordinates},
    import::{ImportError, ImportOutcome, import_features, read_archive},
    layer::{LayerKind, fetch_point},
    map::{MapEvent, MapSurface, MapView, Pixel, Popup},
    model::{DEFAULT_POINT_NAME, ObservationBatch, PointObservation},
    provider::WeatherSource,
    report::{ExportError, export_report},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to fetch {0} data")]
    Fetch(LayerKind),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ScreenError {
    /// Warning for input problems caught before any I/O, error otherwise.
    pub fn severity(&self) -> Severity {
        match self {
            ScreenError::Parse(_)
            | ScreenError::Import(ImportError::MissingInput)
            | ScreenError::Export(ExportError::EmptyBatch(_)) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// What a map gesture did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Ignored,
    Reset,
    Selected(Popup),
    Queried(Popup),
}

#[derive(Debug)]
pub struct LayerScreen<M: MapSurface = MapView> {
    layer: LayerKind,
    source: Arc<dyn WeatherSource>,
    map: M,
    batch: ObservationBatch,
}

impl LayerScreen<MapView> {
    pub fn new(layer: LayerKind, source: Arc<dyn WeatherSource>) -> Self {
        Self::with_map(layer, source, MapView::default())
    }
}

impl<M: MapSurface> LayerScreen<M> {
    pub fn with_map(layer: LayerKind, source: Arc<dyn WeatherSource>, map: M) -> Self {
        Self {
            layer,
            source,
            map,
            batch: ObservationBatch::new(),
        }
    }

    pub fn layer(&self) -> LayerKind {
        self.layer
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn batch(&self) -> &ObservationBatch {
        &self.batch
    }

    /// Parse typed coordinates, then run the ad-hoc query flow.
    pub async fn query_text(&mut self, text: &str) -> Result<PointObservation, ScreenError> {
        let coord = parse_coordinates(text)?;
        self.query_point(coord).await
    }

    /// Fetch one point and redraw the map around it.
    ///
    /// Nothing on the surface changes when the fetch fails.
    pub async fn query_point(&mut self, coord: Coordinate) -> Result<PointObservation, ScreenError> {
        let sample = fetch_point(self.source.as_ref(), self.layer, coord)
            .await
            .ok_or(ScreenError::Fetch(self.layer))?;

        let observation = PointObservation::new(DEFAULT_POINT_NAME, coord, sample);
        self.map.draw_query(&observation);
        Ok(observation)
    }

    /// Import a zipped shapefile; `None` means no file was chosen.
    ///
    /// Batch and markers are swapped only after every feature was processed.
    pub async fn import_archive(&mut self, path: Option<&Path>) -> Result<ImportOutcome, ScreenError> {
        let features = read_archive(path)?;
        let outcome = import_features(self.source.as_ref(), self.layer, &features).await;

        self.batch = outcome.batch.clone();
        self.map.draw_batch(self.layer, &self.batch);
        info!("{} points loaded on the {} map", self.batch.len(), self.layer);
        Ok(outcome)
    }

    pub fn export_report(&self, dir: &Path) -> Result<PathBuf, ScreenError> {
        Ok(export_report(self.layer, &self.batch, dir)?)
    }

    pub async fn dispatch(&mut self, event: MapEvent) -> Result<EventOutcome, ScreenError> {
        match event {
            MapEvent::Click(pixel) => Ok(if self.map.primary_click(pixel) {
                EventOutcome::Reset
            } else {
                EventOutcome::Ignored
            }),
            MapEvent::SingleClick(pixel) => Ok(self
                .map
                .select_click(pixel)
                .map_or(EventOutcome::Ignored, EventOutcome::Selected)),
            MapEvent::DoubleClick(pixel) => self.secondary_trigger(pixel).await,
        }
    }

    async fn secondary_trigger(&mut self, pixel: Pixel) -> Result<EventOutcome, ScreenError> {
        let coord = self.map.pixel_to_coordinate(pixel);
        let observation = self.query_point(coord).await?;
        Ok(EventOutcome::Queried(Popup::query(&observation)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        import::archive::tests::{name_dbf, point_shp, zip_of},
        map::MapMarker,
        provider::{ForecastRequest, ForecastResponse},
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves pressure data; fails for any longitude in `failing`.
    #[derive(Debug, Default)]
    struct FakeSource {
        failing: Vec<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherSource for FakeSource {
        async fn forecast(&self, request: &ForecastRequest) -> anyhow::Result<ForecastResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&request.coord.lon) {
                return Err(anyhow!("status 500"));
            }
            Ok(serde_json::from_value(json!({
                "current": {"time": "2025-03-01T12:00", "surface_pressure": 1009.0, "pressure_msl": 1016.2},
                "hourly": {"time": [], "surface_pressure": [1009.0, 1011.0], "pressure_msl": [1016.0, 1016.4]}
            }))
            .unwrap())
        }
    }

    fn screen(source: FakeSource) -> (LayerScreen, Arc<FakeSource>) {
        let source = Arc::new(source);
        (LayerScreen::new(LayerKind::Pressure, source.clone()), source)
    }

    fn write_archive(dir: &Path, points: &[(f64, f64)], names: &[&str]) -> PathBuf {
        let path = dir.join("points.zip");
        let bytes = zip_of(&[
            ("points.shp", point_shp(points)),
            ("points.dbf", name_dbf("name", names)),
        ]);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn valid_text_query_draws_one_disc_and_centers() {
        let (mut screen, source) = screen(FakeSource::default());

        let obs = screen.query_text("30.04, 31.24").await.unwrap();

        assert_eq!(obs.coord, Coordinate::new(31.24, 30.04));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(screen.map().markers().len(), 1);
        assert_eq!(screen.map().viewport().center, obs.coord);
        assert_eq!(screen.map().popup().unwrap().title, "Pressure Info");
    }

    #[tokio::test]
    async fn repeated_query_never_accumulates_markers() {
        let (mut screen, _) = screen(FakeSource::default());

        screen.query_text("30.04 31.24").await.unwrap();
        assert_eq!(screen.map().markers().len(), 1);
        screen.query_text("30.04 31.24").await.unwrap();
        assert_eq!(screen.map().markers().len(), 1);
    }

    #[tokio::test]
    async fn malformed_text_issues_no_request() {
        let (mut screen, source) = screen(FakeSource::default());

        for bad in ["", "abc", "1 2 3"] {
            let err = screen.query_text(bad).await.unwrap_err();
            assert!(matches!(err, ScreenError::Parse(_)));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            screen.query_text("north").await.unwrap_err().severity(),
            Severity::Warning
        );
    }

    #[tokio::test]
    async fn failed_query_leaves_surface_untouched() {
        let (mut screen, _) = screen(FakeSource {
            failing: vec![50.0],
            ..Default::default()
        });
        screen.query_text("10, 20").await.unwrap();
        let before = screen.map().markers().to_vec();

        let err = screen.query_point(Coordinate::new(50.0, 10.0)).await.unwrap_err();

        assert!(matches!(err, ScreenError::Fetch(LayerKind::Pressure)));
        assert_eq!(err.severity(), Severity::Error);
        assert_eq!(screen.map().markers(), before.as_slice());
    }

    #[tokio::test]
    async fn import_replaces_batch_and_markers_with_successes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(
            dir.path(),
            &[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)],
            &["Alpha", "Beta", "Gamma"],
        );
        let (mut screen, source) = screen(FakeSource {
            failing: vec![2.0],
            ..Default::default()
        });
        screen.query_text("10, 20").await.unwrap();

        let outcome = screen.import_archive(Some(&path)).await.unwrap();

        assert_eq!((outcome.total, outcome.loaded(), outcome.skipped()), (3, 2, 1));
        let names: Vec<&str> = screen.batch().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Gamma"]);
        assert_eq!(screen.map().markers().len(), 2);
        assert!(screen
            .map()
            .markers()
            .iter()
            .all(|m| matches!(m, MapMarker::Icon { .. })));
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn missing_file_fails_before_network() {
        let (mut screen, source) = screen(FakeSource::default());

        let err = screen.import_archive(None).await.unwrap_err();

        assert!(matches!(err, ScreenError::Import(ImportError::MissingInput)));
        assert_eq!(err.severity(), Severity::Warning);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_archive_keeps_prior_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_archive(dir.path(), &[(1.0, 1.0)], &["Alpha"]);
        let bad = dir.path().join("bad.zip");
        std::fs::write(&bad, b"not a zip").unwrap();

        let (mut screen, _) = screen(FakeSource::default());
        screen.import_archive(Some(&good)).await.unwrap();

        let err = screen.import_archive(Some(&bad)).await.unwrap_err();

        assert!(matches!(err, ScreenError::Import(ImportError::Decode(_))));
        assert_eq!(screen.batch().len(), 1);
        assert_eq!(screen.map().markers().len(), 1);
    }

    #[tokio::test]
    async fn export_requires_a_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (mut screen, _) = screen(FakeSource::default());

        let err = screen.export_report(dir.path()).unwrap_err();
        assert_eq!(err.severity(), Severity::Warning);

        let archive = write_archive(dir.path(), &[(1.0, 1.0), (2.0, 2.0)], &["A", "B"]);
        screen.import_archive(Some(&archive)).await.unwrap();
        let path = screen.export_report(dir.path()).unwrap();
        assert!(path.ends_with("pressure_report.pdf"));
    }

    #[tokio::test]
    async fn double_click_queries_the_clicked_coordinate() {
        let (mut screen, source) = screen(FakeSource::default());
        let target = Coordinate::new(31.0, 30.0);
        let pixel = screen.map().viewport().pixel_of(target);

        let outcome = screen.dispatch(MapEvent::DoubleClick(pixel)).await.unwrap();

        assert!(matches!(outcome, EventOutcome::Queried(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let center = screen.map().viewport().center;
        assert!((center.lon - 31.0).abs() < 1e-6 && (center.lat - 30.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn click_on_empty_space_resets_and_select_opens_popup() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), &[(31.2, 30.0)], &["Giza"]);
        let (mut screen, _) = screen(FakeSource::default());
        screen.import_archive(Some(&archive)).await.unwrap();

        let at = screen.map().viewport().pixel_of(Coordinate::new(31.2, 30.0));
        let outcome = screen.dispatch(MapEvent::SingleClick(at)).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Selected(ref p) if p.title == "Giza"));

        // Selecting recentred the view, so find the icon again.
        let at = screen.map().viewport().pixel_of(Coordinate::new(31.2, 30.0));
        assert_eq!(screen.dispatch(MapEvent::Click(at)).await.unwrap(), EventOutcome::Ignored);

        let empty = Pixel::new(at.x + 300.0, at.y);
        assert_eq!(screen.dispatch(MapEvent::Click(empty)).await.unwrap(), EventOutcome::Reset);
        assert!(screen.map().markers().is_empty());
        assert!(screen.map().popup().is_none());
        // The exportable batch is left alone by the reset gesture.
        assert_eq!(screen.batch().len(), 1);
    }
}
