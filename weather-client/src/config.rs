use std::env;
use std::path::PathBuf;
use std::time::Duration;

use common::models::Coordinates;

/// Geocoding results barely change; keep them for 30 days.
pub const GEOCODE_TTL: Duration = Duration::from_secs(30 * 24 * 3600);
/// Forecasts go stale quickly.
pub const FORECAST_TTL: Duration = Duration::from_secs(10 * 60);
pub const GEOCODE_RESULT_COUNT: usize = 5;
pub const FORECAST_DAYS: usize = 7;
pub const HOURLY_DISPLAY_POINTS: usize = 24;

pub const FALLBACK_PLACE: &str = "Mumbai";
pub const FALLBACK_COORDS: Coordinates = Coordinates {
    latitude: 19.076,
    longitude: 72.8777,
};

pub struct Config {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub geolocation_url: String,
    pub geolocation_enabled: bool,
    pub store_path: PathBuf,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub debounce_ms: u64,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            geocoding_url: env::var("GEOCODING_URL").unwrap_or_else(|_| {
                "https://geocoding-api.open-meteo.com/v1/search".to_string()
            }),
            forecast_url: env::var("FORECAST_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            geolocation_url: env::var("GEOLOCATION_URL")
                .unwrap_or_else(|_| "https://ipapi.co/json/".to_string()),
            geolocation_enabled: env::var("GEOLOCATION_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            store_path: env::var("WEATHER_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_store_path()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            http_max_retries: env::var("HTTP_MAX_RETRIES")
                .ok()
                .and_then(|r| r.parse().ok())
                .unwrap_or(2),
            debounce_ms: env::var("DEBOUNCE_MS")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(300),
            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".weather-client")
        .join("store.json")
}
