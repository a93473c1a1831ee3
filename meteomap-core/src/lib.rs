//! Core library for the `meteomap` CLI.
//!
//! This crate defines:
//! - Coordinate parsing and the temperature, pressure and wind layers
//! - Open-Meteo forecast and geocoding clients behind async traits
//! - Shapefile batch import, PDF reports and the map surface they draw on
//! - The weather chat responder, multi-day dashboards and overlay tiles
//!
//! It is used by `meteomap-cli`, but the layer screens can be driven by any
//! front end that implements [`map::MapSurface`].

pub mod chat;
pub mod classify;
pub mod config;
pub mod coord;
pub mod dashboard;
pub mod import;
pub mod layer;
pub mod map;
pub mod model;
pub mod provider;
pub mod report;
pub mod screen;
pub mod tiles;

pub use config::Config;
pub use coord::{Coordinate, ParseError, parse_coordinates};
pub use layer::LayerKind;
pub use model::{ObservationBatch, PointObservation};
pub use provider::{Geocoder, WeatherSource};
pub use screen::{LayerScreen, ScreenError, Severity};
