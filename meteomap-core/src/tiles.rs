//! Raster overlay layers served by OpenWeatherMap, drawn over an Esri base map.

use anyhow::{Result, anyhow};
use std::convert::TryFrom;

use crate::{
    config::Config,
    map::{BASE_TOPO_URL, INITIAL_CENTER},
};

pub const BASE_IMAGERY_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

const OVERLAY_URL: &str = "https://tile.openweathermap.org/map";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Temperature,
    Pressure,
    Wind,
    Clouds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMap {
    Topo,
    Imagery,
}

impl BaseMap {
    pub fn url_template(&self) -> &'static str {
        match self {
            BaseMap::Topo => BASE_TOPO_URL,
            BaseMap::Imagery => BASE_IMAGERY_URL,
        }
    }
}

impl Overlay {
    pub const fn all() -> &'static [Overlay] {
        &[
            Overlay::Temperature,
            Overlay::Pressure,
            Overlay::Wind,
            Overlay::Clouds,
        ]
    }

    /// OpenWeatherMap layer id.
    pub fn layer_id(&self) -> &'static str {
        match self {
            Overlay::Temperature => "temp_new",
            Overlay::Pressure => "pressure_new",
            Overlay::Wind => "wind_new",
            Overlay::Clouds => "clouds_new",
        }
    }

    pub fn base_map(&self) -> BaseMap {
        match self {
            Overlay::Clouds => BaseMap::Imagery,
            _ => BaseMap::Topo,
        }
    }

    /// Overlay opacity, clamped to the renderer's 0..=1 range.
    pub fn opacity(&self) -> f64 {
        match self {
            Overlay::Temperature => 0.7,
            _ => 1.0,
        }
    }

    pub fn initial_zoom(&self) -> f64 {
        match self {
            Overlay::Clouds => 3.0,
            _ => 2.0,
        }
    }

    pub fn url_template(&self, api_key: &str) -> String {
        format!(
            "{OVERLAY_URL}/{}/{{z}}/{{x}}/{{y}}.png?appid={api_key}",
            self.layer_id()
        )
    }

    pub fn tile_url(&self, api_key: &str, z: u8, x: u32, y: u32) -> String {
        format!(
            "{OVERLAY_URL}/{}/{z}/{x}/{y}.png?appid={api_key}",
            self.layer_id()
        )
    }
}

impl std::fmt::Display for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Overlay::Temperature => "temperature",
            Overlay::Pressure => "pressure",
            Overlay::Wind => "wind",
            Overlay::Clouds => "clouds",
        };
        f.write_str(name)
    }
}

impl TryFrom<&str> for Overlay {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "temperature" | "temp" => Ok(Overlay::Temperature),
            "pressure" => Ok(Overlay::Pressure),
            "wind" => Ok(Overlay::Wind),
            "clouds" | "cloud" => Ok(Overlay::Clouds),
            _ => Err(anyhow!(
                "Unknown overlay '{value}'. Supported overlays: temperature, pressure, wind, clouds."
            )),
        }
    }
}

/// Everything a renderer needs to show one overlay screen.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    pub overlay: Overlay,
    pub base_url: &'static str,
    pub overlay_url: String,
    pub opacity: f64,
    pub center: crate::coord::Coordinate,
    pub zoom: f64,
}

impl OverlayView {
    /// Fails when no tile key is configured.
    pub fn from_config(overlay: Overlay, config: &Config) -> Result<Self> {
        let key = config.tile_api_key()?;
        Ok(Self {
            overlay,
            base_url: overlay.base_map().url_template(),
            overlay_url: overlay.url_template(key),
            opacity: overlay.opacity(),
            center: INITIAL_CENTER,
            zoom: overlay.initial_zoom(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_urls_use_layer_ids() {
        assert_eq!(
            Overlay::Wind.url_template("KEY"),
            "https://tile.openweathermap.org/map/wind_new/{z}/{x}/{y}.png?appid=KEY"
        );
        assert_eq!(
            Overlay::Temperature.tile_url("KEY", 3, 4, 2),
            "https://tile.openweathermap.org/map/temp_new/3/4/2.png?appid=KEY"
        );
    }

    #[test]
    fn clouds_sit_on_imagery() {
        assert_eq!(Overlay::Clouds.base_map(), BaseMap::Imagery);
        assert_eq!(Overlay::Clouds.initial_zoom(), 3.0);
        assert!(
            Overlay::all()
                .iter()
                .filter(|o| **o != Overlay::Clouds)
                .all(|o| o.base_map() == BaseMap::Topo)
        );
    }

    #[test]
    fn parses_overlay_names() {
        assert_eq!(Overlay::try_from("CLOUDS").unwrap(), Overlay::Clouds);
        assert_eq!(Overlay::try_from("temp").unwrap(), Overlay::Temperature);
        assert!(Overlay::try_from("snow").is_err());
    }

    #[test]
    fn view_requires_a_key() {
        let err = OverlayView::from_config(Overlay::Pressure, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("meteomap configure"));

        let cfg = Config {
            tile_api_key: Some("abc".into()),
            ..Default::default()
        };
        let view = OverlayView::from_config(Overlay::Pressure, &cfg).unwrap();
        assert!(view.overlay_url.ends_with("appid=abc"));
        assert_eq!(view.base_url, BASE_TOPO_URL);
        assert_eq!(view.opacity, 1.0);
    }
}
