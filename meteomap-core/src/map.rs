//! Drawable map surface: one base layer, one vector layer of markers, one popup.

use chrono::NaiveDateTime;
use std::{f64::consts::PI, time::Duration};

use crate::{
    classify::PressureSystem,
    coord::Coordinate,
    layer::LayerKind,
    model::{LayerReading, ObservationBatch, PointObservation},
};

pub const TILE_SIZE: f64 = 256.0;
const EARTH_RADIUS_M: f64 = 6_378_137.0;

pub const INITIAL_CENTER: Coordinate = Coordinate::new(30.0, 25.0);
pub const INITIAL_ZOOM: f64 = 2.0;

/// Radius of the disc drawn around an ad-hoc query, in projected meters.
pub const QUERY_DISC_RADIUS_M: f64 = 50_000.0;
pub const QUERY_ZOOM: f64 = 8.0;
pub const SELECT_ZOOM: f64 = 10.0;
pub const SELECT_ANIMATION: Duration = Duration::from_millis(800);

/// Distance in pixels within which an icon counts as hit.
pub const ICON_HIT_RADIUS_PX: f64 = 12.0;

pub const BASE_TOPO_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: Pixel) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Spherical Web-Mercator projection (EPSG:3857), in meters.
pub fn to_mercator(coord: Coordinate) -> (f64, f64) {
    let x = EARTH_RADIUS_M * coord.lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + coord.lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

pub fn from_mercator(x: f64, y: f64) -> Coordinate {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    Coordinate::new(lon, lat)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: INITIAL_CENTER,
            zoom: INITIAL_ZOOM,
            width: 1024.0,
            height: 768.0,
        }
    }
}

impl Viewport {
    /// Meters per pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        2.0 * PI * EARTH_RADIUS_M / (TILE_SIZE * 2f64.powf(self.zoom))
    }

    pub fn pixel_of(&self, coord: Coordinate) -> Pixel {
        let (cx, cy) = to_mercator(self.center);
        let (x, y) = to_mercator(coord);
        let res = self.resolution();
        Pixel::new(
            self.width / 2.0 + (x - cx) / res,
            self.height / 2.0 - (y - cy) / res,
        )
    }

    pub fn coordinate_at(&self, pixel: Pixel) -> Coordinate {
        let (cx, cy) = to_mercator(self.center);
        let res = self.resolution();
        from_mercator(
            cx + (pixel.x - self.width / 2.0) * res,
            cy - (pixel.y - self.height / 2.0) * res,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscStyle {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f64,
    /// Classification color token.
    pub token: &'static str,
}

impl DiscStyle {
    pub fn for_reading(reading: &LayerReading) -> Self {
        match reading {
            LayerReading::Temperature(_) => Self {
                fill: "rgba(0, 123, 255, 0.25)",
                stroke: "#007bff",
                stroke_width: 2.0,
                token: reading.color(),
            },
            LayerReading::Pressure(p) if p.system == PressureSystem::High => Self {
                fill: "rgba(239, 68, 68, 0.15)",
                stroke: "#ef4444",
                stroke_width: 3.0,
                token: reading.color(),
            },
            LayerReading::Pressure(_) => Self {
                fill: "rgba(99, 102, 241, 0.15)",
                stroke: "#6366f1",
                stroke_width: 3.0,
                token: reading.color(),
            },
            LayerReading::Wind(_) => Self {
                fill: "rgba(255, 193, 7, 0.25)",
                stroke: "#ffc107",
                stroke_width: 2.0,
                token: reading.color(),
            },
        }
    }
}

pub fn icon_url(layer: LayerKind) -> &'static str {
    match layer {
        LayerKind::Pressure => "https://cdn-icons-png.flaticon.com/512/2917/2917995.png",
        LayerKind::Temperature | LayerKind::Wind => {
            "https://cdn-icons-png.flaticon.com/512/252/252025.png"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapMarker {
    Disc {
        center: Coordinate,
        radius_m: f64,
        style: DiscStyle,
    },
    Icon {
        observation: PointObservation,
        icon: &'static str,
    },
}

impl MapMarker {
    pub fn position(&self) -> Coordinate {
        match self {
            MapMarker::Disc { center, .. } => *center,
            MapMarker::Icon { observation, .. } => observation.coord,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub position: Coordinate,
    pub title: String,
    pub rows: Vec<(&'static str, String)>,
}

impl Popup {
    /// Detail popup shown after an ad-hoc query.
    pub fn query(obs: &PointObservation) -> Self {
        let (title, rows) = match &obs.reading {
            LayerReading::Temperature(t) => (
                "Weather Info",
                vec![
                    ("Current Temperature", format!("{}°C", t.current_c)),
                    ("Temperature Max", format!("{}°C", t.max_c)),
                    ("Temperature Min", format!("{}°C", t.min_c)),
                    (
                        "Wind Speed",
                        format!("{} km/h ({}°)", t.wind_speed_kmh, t.wind_direction_deg),
                    ),
                    ("Time", obs.time.clone()),
                ],
            ),
            LayerReading::Pressure(p) => (
                "Pressure Info",
                vec![
                    ("Pressure System", p.system.label().to_string()),
                    ("Surface", format!("{} hPa", p.surface_hpa)),
                    ("Sea Level", format!("{} hPa", p.sea_level_hpa)),
                    ("24hr Avg (Surface)", hpa_or_na(p.avg_surface_24h)),
                    ("24hr Avg (Sea Level)", hpa_or_na(p.avg_sea_level_24h)),
                    ("Last Updated", display_time(&obs.time)),
                ],
            ),
            LayerReading::Wind(w) => (
                "Wind Info",
                vec![
                    ("Coordinates", obs.coord.to_string()),
                    ("Wind Speed", format!("{} km/h", w.speed_kmh)),
                    (
                        "Wind Direction",
                        format!("{}° ({})", w.direction_deg, w.cardinal),
                    ),
                    ("Intensity", w.intensity.label().to_string()),
                    ("Wind Gusts", kmh_or_na(w.gust_kmh)),
                    ("Avg Max Speed (7d)", kmh_or_na(w.avg_max_speed_7d)),
                    ("Time", obs.time.clone()),
                    (
                        "Timezone",
                        w.timezone.clone().unwrap_or_else(|| "N/A".to_string()),
                    ),
                ],
            ),
        };

        Self {
            position: obs.coord,
            title: title.to_string(),
            rows,
        }
    }

    /// Compact popup shown when an imported point is selected.
    pub fn marker(obs: &PointObservation) -> Self {
        let rows = match &obs.reading {
            LayerReading::Temperature(t) => vec![
                ("Current", format!("{}°C", t.current_c)),
                ("Max | Min", format!("{}°C | {}°C", t.max_c, t.min_c)),
                (
                    "Wind",
                    format!("{} km/h ({}°)", t.wind_speed_kmh, t.wind_direction_deg),
                ),
            ],
            LayerReading::Pressure(p) => vec![
                ("Type", p.system.label().to_string()),
                ("Surface", format!("{} hPa", p.surface_hpa)),
                ("Sea Level", format!("{} hPa", p.sea_level_hpa)),
                ("Avg 24h", hpa_or_na(p.avg_sea_level_24h)),
            ],
            LayerReading::Wind(w) => vec![
                ("Speed", format!("{} km/h", w.speed_kmh)),
                ("Direction", format!("{}° ({})", w.direction_deg, w.cardinal)),
                ("Intensity", w.intensity.label().to_string()),
            ],
        };

        Self {
            position: obs.coord,
            title: obs.name.clone(),
            rows,
        }
    }
}

impl std::fmt::Display for Popup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        for (label, value) in &self.rows {
            writeln!(f, "  {label}: {value}")?;
        }
        Ok(())
    }
}

fn hpa_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1} hPa"))
}

fn kmh_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v} km/h"))
}

/// `2025-03-01T12:15` becomes `2025-03-01 12:15`; anything else is kept.
fn display_time(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// A requested view change; `None` duration means the default animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAnimation {
    pub center: Coordinate,
    pub zoom: f64,
    pub duration: Option<Duration>,
}

/// User gestures on the map.
///
/// A real click produces `Click` first and, when it was not part of a
/// double activation, `SingleClick` afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    Click(Pixel),
    SingleClick(Pixel),
    DoubleClick(Pixel),
}

/// One mutable drawable surface, addressed from every map event.
pub trait MapSurface {
    fn clear(&mut self);
    fn draw_disc(&mut self, center: Coordinate, radius_m: f64, style: DiscStyle);
    fn draw_markers(&mut self, layer: LayerKind, batch: &ObservationBatch);
    fn center_on(&mut self, center: Coordinate, zoom: f64, duration: Option<Duration>);
    fn show_popup(&mut self, popup: Popup);
    fn hide_popup(&mut self);
    /// Topmost marker under `pixel`.
    fn hit_test(&self, pixel: Pixel) -> Option<&MapMarker>;
    fn pixel_to_coordinate(&self, pixel: Pixel) -> Coordinate;

    /// Replace every marker with one disc for an ad-hoc query and zoom to it.
    fn draw_query(&mut self, obs: &PointObservation) {
        self.clear();
        self.draw_disc(
            obs.coord,
            QUERY_DISC_RADIUS_M,
            DiscStyle::for_reading(&obs.reading),
        );
        self.center_on(obs.coord, QUERY_ZOOM, None);
        self.show_popup(Popup::query(obs));
    }

    /// Replace every marker with one icon per observation. The view stays put.
    fn draw_batch(&mut self, layer: LayerKind, batch: &ObservationBatch) {
        self.clear();
        self.draw_markers(layer, batch);
    }

    /// A click on empty space resets the surface. Returns whether it did.
    fn primary_click(&mut self, pixel: Pixel) -> bool {
        if self.hit_test(pixel).is_some() {
            return false;
        }
        self.hide_popup();
        self.clear();
        true
    }

    /// Open the popup of the imported point under `pixel`, if any.
    fn select_click(&mut self, pixel: Pixel) -> Option<Popup> {
        let observation = match self.hit_test(pixel)? {
            MapMarker::Icon { observation, .. } => observation.clone(),
            MapMarker::Disc { .. } => return None,
        };

        let popup = Popup::marker(&observation);
        self.show_popup(popup.clone());
        self.center_on(observation.coord, SELECT_ZOOM, Some(SELECT_ANIMATION));
        Some(popup)
    }
}

/// In-memory map surface tracking exactly what a renderer would display.
#[derive(Debug, Clone, Default)]
pub struct MapView {
    viewport: Viewport,
    markers: Vec<MapMarker>,
    popup: Option<Popup>,
    last_animation: Option<ViewAnimation>,
}

impl MapView {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn markers(&self) -> &[MapMarker] {
        &self.markers
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn last_animation(&self) -> Option<&ViewAnimation> {
        self.last_animation.as_ref()
    }

    fn marker_hit(&self, marker: &MapMarker, pixel: Pixel) -> bool {
        let at = self.viewport.pixel_of(marker.position());
        match marker {
            MapMarker::Disc { radius_m, .. } => {
                at.distance(pixel) * self.viewport.resolution() <= *radius_m
            }
            MapMarker::Icon { .. } => at.distance(pixel) <= ICON_HIT_RADIUS_PX,
        }
    }
}

impl MapSurface for MapView {
    fn clear(&mut self) {
        self.markers.clear();
    }

    fn draw_disc(&mut self, center: Coordinate, radius_m: f64, style: DiscStyle) {
        self.markers.push(MapMarker::Disc {
            center,
            radius_m,
            style,
        });
    }

    fn draw_markers(&mut self, layer: LayerKind, batch: &ObservationBatch) {
        let icon = icon_url(layer);
        self.markers
            .extend(batch.iter().cloned().map(|observation| MapMarker::Icon { observation, icon }));
    }

    fn center_on(&mut self, center: Coordinate, zoom: f64, duration: Option<Duration>) {
        self.viewport.center = center;
        self.viewport.zoom = zoom;
        self.last_animation = Some(ViewAnimation {
            center,
            zoom,
            duration,
        });
    }

    fn show_popup(&mut self, popup: Popup) {
        self.popup = Some(popup);
    }

    fn hide_popup(&mut self) {
        self.popup = None;
    }

    fn hit_test(&self, pixel: Pixel) -> Option<&MapMarker> {
        self.markers
            .iter()
            .rev()
            .find(|marker| self.marker_hit(marker, pixel))
    }

    fn pixel_to_coordinate(&self, pixel: Pixel) -> Coordinate {
        self.viewport.coordinate_at(pixel)
    }
}
