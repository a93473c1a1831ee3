use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use inquire::{InquireError, Password, Select, Text};
use log::info;
use std::path::PathBuf;

use meteomap_core::{
    Config, Coordinate, LayerKind, LayerScreen, ScreenError, Severity,
    chat::{ChatBot, Conversation},
    dashboard::{self, DEFAULT_LOCATION, MAX_OUTLOOK_DAYS, Outlook, REGIONS},
    map::Popup,
    provider::{geocoder_from_config, source_from_config},
    tiles::{Overlay, OverlayView},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteomap", version, about = "Weather layers, reports and forecasts")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query one point, e.g. `meteomap point 30.04, 31.24`.
    Point {
        /// Two numbers separated by a comma and/or whitespace.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        coords: Vec<String>,

        /// temperature, pressure or wind. Defaults to the configured layer.
        #[arg(long, short)]
        layer: Option<String>,
    },

    /// Fetch every point of a zipped shapefile.
    Import {
        /// Path to the .zip archive.
        archive: PathBuf,

        #[arg(long, short)]
        layer: Option<String>,

        /// Also write the PDF report.
        #[arg(long)]
        report: bool,

        /// Directory for the report. Defaults to the configured one.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Ask the weather assistant. Without a message, start a chat session.
    Chat { message: Vec<String> },

    /// Multi-day outlook for a location (Cairo by default).
    Dashboard {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[arg(long, default_value_t = MAX_OUTLOOK_DAYS)]
        days: u8,
    },

    /// List the Egyptian governorates, or show the outlook for one.
    Regions {
        name: Option<String>,

        #[arg(long, default_value_t = MAX_OUTLOOK_DAYS)]
        days: u8,
    },

    /// Print the tile sources for an overlay map.
    Overlay {
        /// temperature, pressure, wind or clouds.
        layer: String,

        #[arg(long, requires_all = ["x", "y"])]
        z: Option<u8>,
        #[arg(long)]
        x: Option<u32>,
        #[arg(long)]
        y: Option<u32>,
    },

    /// Interactively edit the configuration file.
    Configure,

    /// List the supported layers.
    Layers,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Point { coords, layer } => {
                let layer = resolve_layer(layer.as_deref(), &config)?;
                let mut screen = LayerScreen::new(layer, source_from_config(&config)?);

                screen.query_text(&coords.join(" ")).await?;
                if let Some(popup) = screen.map().popup() {
                    print!("{popup}");
                }
            }
            Command::Import {
                archive,
                layer,
                report,
                out,
            } => {
                let layer = resolve_layer(layer.as_deref(), &config)?;
                let mut screen = LayerScreen::new(layer, source_from_config(&config)?);

                let outcome = screen.import_archive(Some(&archive)).await?;
                for observation in screen.batch() {
                    println!("{}", Popup::marker(observation));
                }
                println!(
                    "Loaded {} of {} points ({} skipped)",
                    outcome.loaded(),
                    outcome.total,
                    outcome.skipped()
                );

                if report {
                    let dir = out.unwrap_or_else(|| config.report_dir());
                    let path = screen.export_report(&dir)?;
                    println!("Report written to {}", path.display());
                }
            }
            Command::Chat { message } => {
                let bot = ChatBot::new(
                    geocoder_from_config(&config)?,
                    source_from_config(&config)?,
                    config.chat_default_city(),
                )?;

                if message.is_empty() {
                    chat_session(&bot).await?;
                } else if let Some(reply) = bot.respond(&message.join(" ")).await {
                    println!("{reply}");
                }
            }
            Command::Dashboard { lat, lon, days } => {
                let coord = match (lat, lon) {
                    (Some(lat), Some(lon)) => Coordinate::new(lon, lat),
                    _ => DEFAULT_LOCATION,
                };
                let source = source_from_config(&config)?;
                let outlook = dashboard::fetch_outlook(source.as_ref(), coord, days).await?;
                print_outlook(&coord.to_string(), &outlook);
            }
            Command::Regions { name: None, .. } => {
                for region in &REGIONS {
                    println!("{:<16} {}", region.name, region.coord);
                }
            }
            Command::Regions {
                name: Some(name),
                days,
            } => {
                let region = dashboard::find_region(&name).ok_or_else(|| {
                    anyhow!("Unknown region '{name}'. Run `meteomap regions` to list them.")
                })?;
                let source = source_from_config(&config)?;
                let outlook = dashboard::fetch_outlook(source.as_ref(), region.coord, days).await?;
                print_outlook(region.name, &outlook);
            }
            Command::Overlay { layer, z, x, y } => {
                let overlay = Overlay::try_from(layer.as_str())?;
                let view = OverlayView::from_config(overlay, &config)?;

                println!("Overlay:  {} (opacity {})", view.overlay, view.opacity);
                println!("Base:     {}", view.base_url);
                println!("Tiles:    {}", view.overlay_url);
                println!("View:     {} at zoom {}", view.center, view.zoom);
                if let (Some(z), Some(x), Some(y)) = (z, x, y) {
                    println!("Tile:     {}", overlay.tile_url(config.tile_api_key()?, z, x, y));
                }
            }
            Command::Configure => configure(config)?,
            Command::Layers => {
                for layer in LayerKind::all() {
                    println!("{:<12} {}", layer.as_str(), layer.report_title());
                }
            }
        }

        Ok(())
    }
}

fn resolve_layer(name: Option<&str>, config: &Config) -> Result<LayerKind> {
    match name {
        Some(name) => LayerKind::try_from(name),
        None => config.default_layer(),
    }
}

/// Print a failure the way the screens present it: warnings for bad input,
/// errors for everything else.
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ScreenError>() {
        Some(screen_err) if screen_err.severity() == Severity::Warning => {
            eprintln!("warning: {screen_err}");
        }
        _ => eprintln!("error: {err:#}"),
    }
}

async fn chat_session(bot: &ChatBot) -> Result<()> {
    let mut conversation = Conversation::new();
    if let Some(greeting) = conversation.messages().first() {
        println!("{}\n", greeting.text);
    }

    loop {
        let input = match Text::new("You:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };
        if matches!(input.trim(), "exit" | "quit") {
            break;
        }
        if let Some(reply) = conversation.send(bot, &input).await {
            println!("\n{}\n", reply.text);
        }
    }

    info!("chat ended after {} messages", conversation.messages().len());
    Ok(())
}

fn print_outlook(label: &str, outlook: &Outlook) {
    let current = &outlook.current;
    let condition = outlook
        .current_condition()
        .map(|c| format!("{} {}", c.icon(), c.label()))
        .unwrap_or_default();

    println!("{label} ({})", outlook.timezone.as_deref().unwrap_or("local time"));
    println!(
        "Now: {}°C, wind {} km/h {condition}",
        current.temperature, current.windspeed
    );
    println!();

    for day in &outlook.days {
        let icon = day.condition.map(|c| c.icon()).unwrap_or(" ");
        println!(
            "{:<12} {icon}  {:>6} / {:<6} rain {:>5}  wind {:>6}",
            day.date.format("%a, %b %-d").to_string(),
            celsius(day.max_c),
            celsius(day.min_c),
            amount(day.precipitation_mm, "mm"),
            amount(day.max_wind_kmh, "km/h"),
        );
    }

    println!();
    println!("Total precipitation: {} mm", outlook.total_precipitation());
}

fn celsius(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}°C"))
}

fn amount(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v} {unit}"))
}

fn configure(mut config: Config) -> Result<()> {
    let layers: Vec<&str> = LayerKind::all().iter().map(LayerKind::as_str).collect();
    let current = config.default_layer()?;
    let start = layers.iter().position(|l| *l == current.as_str()).unwrap_or(0);

    let layer = Select::new("Default layer:", layers)
        .with_starting_cursor(start)
        .prompt()?;
    config.set_default_layer(LayerKind::try_from(layer)?);

    let key = Password::new("OpenWeatherMap tile key (empty keeps the current one):")
        .without_confirmation()
        .prompt()?;
    if !key.trim().is_empty() {
        config.tile_api_key = Some(key.trim().to_string());
    }

    let report_dir = config.report_dir();
    let dir = Text::new("Report directory:")
        .with_default(&report_dir.display().to_string())
        .prompt()?;
    config.report_dir = Some(PathBuf::from(dir));

    let city = Text::new("Default chat city:")
        .with_default(config.chat_default_city())
        .prompt()?;
    config.chat_default_city = Some(city);

    config.save()?;
    let path = Config::config_file_path().context("Failed to locate the saved config")?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}
