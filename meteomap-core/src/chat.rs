//! Free-text weather questions: pull a city out of the message, geocode it,
//! and answer with today's conditions there.

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::{fmt, sync::Arc};

use crate::provider::{ForecastRequest, ForecastResponse, Geocoder, Place, WeatherSource};

pub const GREETING: &str = "👋 Hi! I'm your weather assistant.\n\n\
Ask me about the weather in any city 🌍\n\n\
For example:\n\
• Weather in London\n\
• الطقس في القاهرة\n\
• What's the weather in Alexandria";

pub const APOLOGY: &str =
    "⚠️ Sorry, something went wrong while fetching the weather.\n\nPlease try again in a moment 🔄";

/// Words that mark a message as a weather question without an explicit "in".
const WEATHER_WORDS: [&str; 4] = ["طقس", "weather", "جو", "حالة"];

/// Finds the place a message is asking about.
#[derive(Debug, Clone)]
pub struct CityExtractor {
    arabic: Regex,
    english: Regex,
    default_city: String,
}

impl CityExtractor {
    pub fn new(default_city: impl Into<String>) -> Result<Self> {
        Ok(Self {
            arabic: Regex::new(r"في\s+(.+)")?,
            english: Regex::new(r"(?i)in\s+(.+)")?,
            default_city: default_city.into(),
        })
    }

    /// `None` only for blank input.
    ///
    /// An English "in <city>" wins over an Arabic "في <city>" in the same
    /// message. Without either, a message mentioning the weather is taken to
    /// end with the city name; anything else asks about the default city.
    pub fn extract_city(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let captured = |re: &Regex| {
            re.captures(input)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|city| !city.is_empty())
        };
        if let Some(city) = captured(&self.english).or_else(|| captured(&self.arabic)) {
            return Some(city);
        }

        let lower = input.to_lowercase();
        if WEATHER_WORDS.iter().any(|w| lower.contains(w)) {
            return input.split_whitespace().last().map(str::to_string);
        }

        Some(self.default_city.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Rainy,
    Showers,
    Hot,
    Cold,
    Fair,
}

impl Mood {
    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Rainy => "🌧️",
            Mood::Showers => "🌦️",
            Mood::Hot => "🌡️",
            Mood::Cold => "❄️",
            Mood::Fair => "🌤️",
        }
    }
}

/// Today's numbers for one place, as shown in a chat reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatForecast {
    pub place: String,
    pub temperature_c: f64,
    pub max_c: Option<f64>,
    pub min_c: Option<f64>,
    pub wind_kmh: f64,
    pub wind_direction_deg: f64,
    pub max_wind_kmh: Option<f64>,
    pub rain_mm: Option<f64>,
}

impl ChatForecast {
    fn from_response(place: &Place, response: &ForecastResponse) -> Result<Self> {
        let current = response
            .current_weather
            .as_ref()
            .context("response has no current_weather block")?;
        let daily = response.daily.as_ref();
        let today = |name: &str| daily.and_then(|d| d.first(name));

        Ok(Self {
            place: place.display_name(),
            temperature_c: current.temperature,
            max_c: today("temperature_2m_max"),
            min_c: today("temperature_2m_min"),
            wind_kmh: current.windspeed,
            wind_direction_deg: current.winddirection,
            max_wind_kmh: today("windspeed_10m_max"),
            rain_mm: today("precipitation_sum"),
        })
    }

    /// Rain outranks temperature.
    pub fn mood(&self) -> Mood {
        let rain = self.rain_mm.unwrap_or(0.0);
        if rain > 5.0 {
            Mood::Rainy
        } else if rain > 0.0 {
            Mood::Showers
        } else if self.temperature_c > 35.0 {
            Mood::Hot
        } else if self.temperature_c < 10.0 {
            Mood::Cold
        } else {
            Mood::Fair
        }
    }

    pub fn needs_umbrella(&self) -> bool {
        self.rain_mm.is_some_and(|r| r > 0.0)
    }
}

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

impl fmt::Display for ChatForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Weather in {}", self.mood().emoji(), self.place)?;
        writeln!(f)?;
        writeln!(f, "🌡️ Temperature:")?;
        writeln!(f, "• Now: {}°C", self.temperature_c)?;
        writeln!(f, "• High: {}°C", or_na(self.max_c))?;
        writeln!(f, "• Low: {}°C", or_na(self.min_c))?;
        writeln!(f)?;
        writeln!(f, "💨 Wind:")?;
        writeln!(f, "• Speed: {} km/h", self.wind_kmh)?;
        writeln!(f, "• Direction: {}°", self.wind_direction_deg)?;
        writeln!(f, "• Max: {} km/h", or_na(self.max_wind_kmh))?;
        writeln!(f)?;
        writeln!(f, "☔ Precipitation:")?;
        writeln!(f, "• Expected today: {} mm", or_na(self.rain_mm))?;
        writeln!(f)?;
        if self.needs_umbrella() {
            write!(f, "⚠️ Don't forget your umbrella!")
        } else {
            write!(f, "☀️ Enjoy your day!")
        }
    }
}

fn not_found(city: &str) -> String {
    format!(
        "❌ Sorry, I couldn't find the city \"{city}\".\n\n\
         Check the spelling and try again 🔍"
    )
}

#[derive(Debug, Clone)]
pub struct ChatBot {
    geocoder: Arc<dyn Geocoder>,
    source: Arc<dyn WeatherSource>,
    extractor: CityExtractor,
}

impl ChatBot {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        source: Arc<dyn WeatherSource>,
        default_city: &str,
    ) -> Result<Self> {
        Ok(Self {
            geocoder,
            source,
            extractor: CityExtractor::new(default_city)?,
        })
    }

    /// Answer one message. Blank input gets no reply.
    ///
    /// Every failure past that point is folded into the reply text.
    pub async fn respond(&self, input: &str) -> Option<String> {
        let city = self.extractor.extract_city(input)?;
        debug!("chat question resolved to city '{city}'");

        let reply = match self.lookup_forecast(&city).await {
            Ok(Some(forecast)) => forecast.to_string(),
            Ok(None) => not_found(&city),
            Err(err) => {
                warn!("chat lookup for '{city}' failed: {err:#}");
                APOLOGY.to_string()
            }
        };
        Some(reply)
    }

    async fn lookup_forecast(&self, city: &str) -> Result<Option<ChatForecast>> {
        let Some(place) = self.geocoder.lookup(city).await? else {
            return Ok(None);
        };

        let request = ForecastRequest::at(place.coordinate())
            .with_current_weather()
            .with_daily(&[
                "temperature_2m_max",
                "temperature_2m_min",
                "precipitation_sum",
                "windspeed_10m_max",
            ]);
        let response = self.source.forecast(&request).await?;

        ChatForecast::from_response(&place, &response).map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

/// Message history of one chat session, opened by the greeting.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message {
                sender: Sender::Bot,
                text: GREETING.to_string(),
            }],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Record the user's message and the bot's reply; blank input is dropped.
    pub async fn send(&mut self, bot: &ChatBot, input: &str) -> Option<&Message> {
        if input.trim().is_empty() {
            return None;
        }
        self.messages.push(Message {
            sender: Sender::User,
            text: input.to_string(),
        });

        let text = bot.respond(input).await?;
        self.messages.push(Message {
            sender: Sender::Bot,
            text,
        });
        self.messages.last()
    }
}
