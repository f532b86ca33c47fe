//! Current weather through the OpenWeatherMap API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Weather as WeatherConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/";
const CURRENT_WEATHER_PATH: &str = "data/2.5/weather";
const UNITS: &str = "metric";
const USER_AGENT: &str = concat!("healthcast/", env!("CARGO_PKG_VERSION"));

/// Errors returned by [`WeatherClient`].
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("city {0:?} not found")]
    CityNotFound(String),
    #[error("weather provider returned status {0}")]
    Status(u16),
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather provider sent an unexpected body: {0}")]
    Body(String),
}

/// Weather observed for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city: String,
    /// Celsius degrees.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// Free-text description, e.g. `light rain`.
    pub condition: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: Option<String>,
    main: Option<Main>,
    #[serde(default)]
    weather: Vec<Condition>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// OpenWeatherMap HTTP client.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    /// Create a new [`WeatherClient`].
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(USER_AGENT)
            .build()?;

        if config.api_key.is_empty() {
            tracing::warn!("missing weather api key, requests will be rejected");
        }

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch current weather for `city`.
    pub async fn current(&self, city: &str) -> Result<Reading, WeatherError> {
        let city = city.trim();
        let url = format!("{}/{CURRENT_WEATHER_PATH}", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", UNITS)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::CityNotFound(city.to_owned()));
        }
        if !status.is_success() {
            tracing::debug!(%status, %city, "weather request rejected");
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body: CurrentResponse = response.json().await?;
        let Some(main) = body.main else {
            // Provider answers 200 with an error message for some lookups.
            tracing::debug!(message = ?body.message, %city, "no reading in response");
            return Err(WeatherError::CityNotFound(city.to_owned()));
        };
        let condition = body
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| WeatherError::Body("missing `weather[0]`".into()))?;

        let reading = Reading {
            city: body.name.filter(|n| !n.is_empty()).unwrap_or(city.to_owned()),
            temperature: main.temp,
            humidity: main.humidity,
            condition,
        };

        tracing::debug!(?reading, "weather fetched");
        Ok(reading)
    }
}
