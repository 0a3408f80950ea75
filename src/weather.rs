//! Geographic coordinate to current weather condition, via an
//! open-meteo-style provider.
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    campaigns::Timestamp,
    fetcher::{FetcherConfig, ResilientFetcher},
    Error, Result,
};

/// Fixed condition vocabulary rules target, derived from WMO weather codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Foggy,
    Rainy,
    Snowy,
    Stormy,
    Unknown,
}

impl WeatherCondition {
    /// Map a WMO weather code onto the condition vocabulary.
    pub fn from_code(code: u32) -> WeatherCondition {
        match code {
            0 => WeatherCondition::Clear,
            1..=3 => WeatherCondition::Cloudy,
            4..=49 => WeatherCondition::Foggy,
            50..=69 => WeatherCondition::Rainy,
            70..=79 => WeatherCondition::Snowy,
            80..=99 => WeatherCondition::Stormy,
            _ => WeatherCondition::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Foggy => "foggy",
            WeatherCondition::Rainy => "rainy",
            WeatherCondition::Snowy => "snowy",
            WeatherCondition::Stormy => "stormy",
            WeatherCondition::Unknown => "unknown",
        }
    }
}

/// Current weather at a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherInfo {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Raw WMO weather code.
    pub code: u32,
    pub condition: WeatherCondition,
}

impl WeatherInfo {
    /// Temperature at or above which `weather_is_hot` is set.
    pub const HOT_THRESHOLD: f64 = 30.0;
    /// Temperature at or below which `weather_is_cold` is set.
    pub const COLD_THRESHOLD: f64 = 5.0;

    pub fn is_hot(&self) -> bool {
        self.temperature >= WeatherInfo::HOT_THRESHOLD
    }

    pub fn is_cold(&self) -> bool {
        self.temperature <= WeatherInfo::COLD_THRESHOLD
    }
}

/// Wire format of the weather provider. A body without `current_weather`
/// fails decoding and counts as a lookup failure.
#[derive(Debug, Deserialize)]
struct WeatherResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: u32,
}

impl WeatherResponse {
    fn into_info(self) -> WeatherInfo {
        WeatherInfo {
            temperature: self.current_weather.temperature,
            code: self.current_weather.weathercode,
            condition: WeatherCondition::from_code(self.current_weather.weathercode),
        }
    }
}

/// Resolves a coordinate to [`WeatherInfo`] through a [`ResilientFetcher`].
pub struct WeatherResolver {
    client: reqwest::Client,
    base_url: String,
    fetcher: ResilientFetcher<WeatherInfo>,
}

impl WeatherResolver {
    /// Service name used for logging and circuit-breaker errors.
    pub const SERVICE: &'static str = "weather";
    /// Cache TTL for weather lookups, in seconds.
    pub const CACHE_TTL_SECS: i64 = 300;

    pub fn new(client: reqwest::Client, base_url: String, timeout: Duration) -> WeatherResolver {
        WeatherResolver {
            client,
            base_url,
            fetcher: ResilientFetcher::new(
                FetcherConfig::new(
                    WeatherResolver::SERVICE,
                    chrono::Duration::seconds(WeatherResolver::CACHE_TTL_SECS),
                )
                .with_lookup_timeout(timeout),
            ),
        }
    }

    /// Resolve current weather at the coordinate. Nearby coordinates share
    /// cache entries through the rounded key.
    pub async fn resolve(&self, lat: f64, lon: f64, now: Timestamp) -> Result<WeatherInfo> {
        let key = cache_key(lat, lon);
        self.fetcher
            .fetch(&key, now, || self.lookup(lat, lon))
            .await
    }

    async fn lookup(&self, lat: f64, lon: f64) -> Result<WeatherInfo> {
        let url = Url::parse_with_params(
            &format!("{}/v1/forecast", self.base_url),
            &[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current_weather", "true".to_owned()),
            ],
        )
        .map_err(Error::InvalidBaseUrl)?;

        log::debug!(target: "dco", lat, lon; "fetching weather lookup");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: WeatherResponse = response.json().await?;

        Ok(body.into_info())
    }
}

/// Coordinates rounded to 2 decimal places, so nearby requests coalesce.
fn cache_key(lat: f64, lon: f64) -> String {
    format!("{lat:.2},{lon:.2}")
}
