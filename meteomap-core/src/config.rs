use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    layer::LayerKind,
    provider::{geocoding::GEOCODING_URL, openmeteo::FORECAST_URL},
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHAT_CITY: &str = "Cairo";
pub const DEFAULT_GEOCODING_LANGUAGE: &str = "en";

/// Top-level configuration stored on disk.
///
/// Every field is optional; unset fields fall back to the public
/// Open-Meteo endpoints and the current directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Layer used when a command does not name one, e.g. "pressure".
    pub default_layer: Option<String>,

    pub forecast_url: Option<String>,
    pub geocoding_url: Option<String>,
    pub geocoding_language: Option<String>,

    /// OpenWeatherMap key substituted into overlay tile URLs.
    pub tile_api_key: Option<String>,

    /// Directory PDF reports are written to.
    pub report_dir: Option<PathBuf>,

    pub chat_default_city: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Return the default layer as a strongly-typed LayerKind.
    pub fn default_layer(&self) -> Result<LayerKind> {
        match &self.default_layer {
            Some(s) => LayerKind::try_from(s.as_str()),
            None => Ok(LayerKind::Temperature),
        }
    }

    pub fn set_default_layer(&mut self, layer: LayerKind) {
        self.default_layer = Some(layer.as_str().to_string());
    }

    pub fn forecast_url(&self) -> &str {
        self.forecast_url.as_deref().unwrap_or(FORECAST_URL)
    }

    pub fn geocoding_url(&self) -> &str {
        self.geocoding_url.as_deref().unwrap_or(GEOCODING_URL)
    }

    pub fn geocoding_language(&self) -> &str {
        self.geocoding_language
            .as_deref()
            .unwrap_or(DEFAULT_GEOCODING_LANGUAGE)
    }

    pub fn chat_default_city(&self) -> &str {
        self.chat_default_city.as_deref().unwrap_or(DEFAULT_CHAT_CITY)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Tile key, or an error telling the user how to set one.
    pub fn tile_api_key(&self) -> Result<&str> {
        self.tile_api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No tile API key configured.\n\
                 Hint: run `meteomap configure` and enter your OpenWeatherMap key."
            )
        })
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.default_layer()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteomap", "meteomap")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_endpoints() {
        let cfg = Config::default();

        assert_eq!(cfg.forecast_url(), "https://api.open-meteo.com/v1/forecast");
        assert_eq!(cfg.geocoding_url(), "https://geocoding-api.open-meteo.com/v1/search");
        assert_eq!(cfg.default_layer().unwrap(), LayerKind::Temperature);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.chat_default_city(), "Cairo");
        assert_eq!(cfg.report_dir(), PathBuf::from("."));
    }

    #[test]
    fn tile_key_errors_when_not_set() {
        let err = Config::default().tile_api_key().unwrap_err();

        assert!(err.to_string().contains("No tile API key configured"));
        assert!(err.to_string().contains("meteomap configure"));
    }

    #[test]
    fn parses_toml_overrides() {
        let cfg = Config::from_toml(
            r#"
            default_layer = "wind"
            tile_api_key = "KEY"
            report_dir = "/tmp/reports"
            request_timeout_secs = 5
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.default_layer().unwrap(), LayerKind::Wind);
        assert_eq!(cfg.tile_api_key().unwrap(), "KEY");
        assert_eq!(cfg.report_dir(), PathBuf::from("/tmp/reports"));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn unknown_default_layer_is_rejected() {
        let err = Config::from_toml(r#"default_layer = "clouds""#).unwrap_err();
        assert!(err.to_string().contains("Unknown layer"));
    }

    #[test]
    fn set_default_layer_roundtrips_through_toml() {
        let mut cfg = Config::default();
        cfg.set_default_layer(LayerKind::Pressure);

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.default_layer().unwrap(), LayerKind::Pressure);
    }
}
