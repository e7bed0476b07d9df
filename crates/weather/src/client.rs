//! HTTP client for the Open-Meteo geocoding and forecast endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::codes::condition_for_code;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_URL: &str = "https://api.open-meteo.com";

/// Resolved city weather for one day.
///
/// Serializable so the pipeline can memoize it as a step output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherInfo {
    /// The city name as queried.
    pub city: String,
    /// The name the geocoder resolved the query to.
    pub resolved_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// The forecast day the summary describes.
    pub date: NaiveDate,
    pub condition_text: String,
    pub condition_icon: String,
    pub temp_min: i32,
    pub temp_max: i32,
    pub current_temp: i32,
}

/// Errors from the weather lookup.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("{endpoint} request failed: HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// The geocoder returned no usable coordinates for the city.
    #[error("no coordinates found for city '{0}'")]
    CityNotFound(String),

    /// The forecast response is missing its current or daily block.
    #[error("incomplete weather data for city '{0}'")]
    Incomplete(String),
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    name: String,
    #[serde(default)]
    country_code: Option<String>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<NaiveDate>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    weather_code: Vec<i32>,
}

/// Client for the Open-Meteo APIs.
pub struct OpenMeteoClient {
    client: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoClient {
    /// Create a client against the public Open-Meteo endpoints.
    pub fn new() -> Self {
        Self::with_base_urls(GEOCODING_URL.into(), FORECAST_URL.into())
    }

    /// Create a client against custom base URLs (used by tests).
    pub fn with_base_urls(geocoding_url: String, forecast_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            geocoding_url,
            forecast_url,
        }
    }

    /// Resolve a city and fetch its one-day weather summary.
    pub async fn current_weather(&self, city: &str) -> Result<WeatherInfo, WeatherError> {
        let geo = self.resolve_city(city).await?;
        let forecast = self.fetch_forecast(geo.latitude, geo.longitude).await?;

        let current = forecast
            .current
            .ok_or_else(|| WeatherError::Incomplete(city.to_string()))?;
        let daily = forecast
            .daily
            .ok_or_else(|| WeatherError::Incomplete(city.to_string()))?;

        let (date, temp_max, temp_min) = match (
            daily.time.first(),
            daily.temperature_2m_max.first(),
            daily.temperature_2m_min.first(),
        ) {
            (Some(date), Some(max), Some(min)) => (*date, *max, *min),
            _ => return Err(WeatherError::Incomplete(city.to_string())),
        };

        // Prefer the daily code; it describes the whole day on the card.
        let code = daily.weather_code.first().copied().unwrap_or(current.weather_code);
        let (text, icon) = condition_for_code(code);

        Ok(WeatherInfo {
            city: city.to_string(),
            resolved_name: geo.name,
            latitude: geo.latitude,
            longitude: geo.longitude,
            date,
            condition_text: text.to_string(),
            condition_icon: icon.to_string(),
            temp_min: temp_min.round() as i32,
            temp_max: temp_max.round() as i32,
            current_temp: current.temperature_2m.round() as i32,
        })
    }

    /// Geocode a city name to coordinates.
    ///
    /// The query drops a trailing `市` suffix (the geocoder indexes bare
    /// names); among the candidates, a mainland (`CN`) match wins over the
    /// globally best one.
    async fn resolve_city(&self, city: &str) -> Result<GeocodeResult, WeatherError> {
        let query = city.strip_suffix('市').unwrap_or(city);
        let response = self
            .client
            .get(format!("{}/v1/search", self.geocoding_url))
            .query(&[
                ("name", query),
                ("count", "10"),
                ("language", "zh"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                endpoint: "geocoding",
                status: status.as_u16(),
            });
        }

        let data: GeocodeResponse = response.json().await?;
        let mut results = data.results;
        let cn_idx = results
            .iter()
            .position(|r| r.country_code.as_deref() == Some("CN"));

        match cn_idx {
            Some(idx) => Ok(results.swap_remove(idx)),
            None if !results.is_empty() => Ok(results.swap_remove(0)),
            None => Err(WeatherError::CityNotFound(city.to_string())),
        }
    }

    /// Fetch the one-day forecast for coordinates.
    async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastResponse, WeatherError> {
        let response = self
            .client
            .get(format!("{}/v1/forecast", self.forecast_url))
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current", "temperature_2m,weather_code".to_string()),
                (
                    "daily",
                    "weather_code,temperature_2m_max,temperature_2m_min".to_string(),
                ),
                ("forecast_days", "1".to_string()),
                ("timezone", "Asia/Shanghai".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                endpoint: "forecast",
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
