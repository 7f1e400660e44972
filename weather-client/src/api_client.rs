use crate::cache::TtlCache;
use crate::config::{FORECAST_DAYS, FORECAST_TTL, GEOCODE_RESULT_COUNT, GEOCODE_TTL};
use chrono::{NaiveDate, NaiveDateTime};
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::{
    Coordinates, CurrentConditions, DailyPoint, HourlyPoint, Place, UnitSystem, WeatherSnapshot,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument};

#[derive(Debug, Serialize, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

/// Raw forecast payload, cached as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
    hourly: HourlySeries,
    daily: DailySeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
    time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
    precipitation_probability: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailySeries {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_probability_mean: Vec<Option<f64>>,
    weathercode: Vec<i32>,
}

/// Outcome of a forecast lookup
#[derive(Debug, Clone)]
pub struct ForecastResult {
    pub snapshot: WeatherSnapshot,
    pub from_cache: bool,
    /// Network round-trip time; `None` when served from cache
    pub latency: Option<Duration>,
}

pub struct OpenMeteoClient {
    http_client: HttpClient,
    cache: Arc<TtlCache>,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    pub fn new(
        http_client: HttpClient,
        cache: Arc<TtlCache>,
        geocoding_url: String,
        forecast_url: String,
    ) -> Self {
        Self {
            http_client,
            cache,
            geocoding_url,
            forecast_url,
        }
    }

    /// Up to five candidate places for `query`. An empty list is a normal
    /// outcome, not an error.
    #[instrument(skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Vec<Place>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = geocode_cache_key(query);
        if let Some(cached) = self.cache.get::<Vec<Place>>(&key).await {
            info!(query, results = cached.len(), "Cache hit");
            return Ok(cached);
        }

        info!(query, "Geocoding via API");

        let url = format!(
            "{}?name={}&count={}&language=en&format=json",
            self.geocoding_url,
            urlencoding::encode(query),
            GEOCODE_RESULT_COUNT
        );

        let response: GeocodingResponse = self.http_client.get_json(&url).await?;
        let mut places = response.results;
        places.truncate(GEOCODE_RESULT_COUNT);

        self.cache.set(&key, &places, GEOCODE_TTL).await?;

        Ok(places)
    }

    #[instrument(skip(self, coords, units), fields(coords = %coords, units = %units))]
    pub async fn forecast(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<ForecastResult, AppError> {
        let key = forecast_cache_key(coords, units);
        if let Some(cached) = self.cache.get::<ForecastResponse>(&key).await {
            info!(key = %key, "Cache hit");
            return Ok(ForecastResult {
                snapshot: cached.into_snapshot(units)?,
                from_cache: true,
                latency: None,
            });
        }

        info!(key = %key, "Fetching forecast from API");

        let url = format!(
            "{}?latitude={}&longitude={}&current_weather=true\
             &hourly=temperature_2m,precipitation_probability\
             &daily=temperature_2m_max,temperature_2m_min,precipitation_probability_mean,weathercode\
             &forecast_days={}&timezone=auto&temperature_unit={}",
            self.forecast_url,
            coords.latitude,
            coords.longitude,
            FORECAST_DAYS,
            units.temperature_unit()
        );

        let started = Instant::now();
        let response: ForecastResponse = self.http_client.get_json(&url).await?;
        let latency = started.elapsed();

        // Validate before caching so a bad payload is never served later
        let snapshot = response.clone().into_snapshot(units)?;
        self.cache.set(&key, &response, FORECAST_TTL).await?;

        info!(latency_ms = latency.as_millis(), "Forecast fetched");

        Ok(ForecastResult {
            snapshot,
            from_cache: false,
            latency: Some(latency),
        })
    }
}

pub fn geocode_cache_key(query: &str) -> String {
    format!("geo:{}", query.trim().to_lowercase())
}

pub fn forecast_cache_key(coords: Coordinates, units: UnitSystem) -> String {
    format!("meteo:{}:{}", coords.rounded_key(), units)
}

impl ForecastResponse {
    fn into_snapshot(self, units: UnitSystem) -> Result<WeatherSnapshot, AppError> {
        let hourly = self.hourly;
        ensure_len("hourly", hourly.time.len(), &[
            hourly.temperature_2m.len(),
            hourly.precipitation_probability.len(),
        ])?;
        let daily = self.daily;
        ensure_len("daily", daily.time.len(), &[
            daily.temperature_2m_max.len(),
            daily.temperature_2m_min.len(),
            daily.precipitation_probability_mean.len(),
            daily.weathercode.len(),
        ])?;

        let hourly_points = hourly
            .time
            .iter()
            .zip(hourly.temperature_2m)
            .zip(hourly.precipitation_probability)
            .map(|((time, temperature), precipitation_probability)| {
                Ok(HourlyPoint {
                    time: parse_local_time(time)?,
                    temperature,
                    precipitation_probability,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let mut daily_points = Vec::with_capacity(daily.time.len());
        for (i, date) in daily.time.iter().enumerate() {
            daily_points.push(DailyPoint {
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                    AppError::validation(format!("bad daily date '{}': {}", date, e))
                })?,
                high: daily.temperature_2m_max[i],
                low: daily.temperature_2m_min[i],
                precipitation_probability_mean: daily.precipitation_probability_mean[i],
                weathercode: daily.weathercode[i],
            });
        }

        Ok(WeatherSnapshot {
            units,
            current: CurrentConditions {
                temperature: self.current_weather.temperature,
                windspeed: self.current_weather.windspeed,
                weathercode: self.current_weather.weathercode,
                time: parse_local_time(&self.current_weather.time)?,
            },
            hourly: hourly_points,
            daily: daily_points,
        })
    }
}

fn ensure_len(series: &str, expected: usize, others: &[usize]) -> Result<(), AppError> {
    if others.iter().all(|&len| len == expected) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} series length mismatch: time has {}, values have {:?}",
            series, expected, others
        )))
    }
}

/// The API reports local times without seconds, e.g. `2024-01-01T14:00`.
fn parse_local_time(raw: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| AppError::validation(format!("bad timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> ForecastResponse {
        ForecastResponse {
            current_weather: CurrentWeather {
                temperature: 21.4,
                windspeed: 11.0,
                weathercode: 3,
                time: "2024-06-01T14:00".into(),
            },
            hourly: HourlySeries {
                time: vec!["2024-06-01T00:00".into(), "2024-06-01T01:00".into()],
                temperature_2m: vec![18.0, 17.5],
                precipitation_probability: vec![Some(10.0), None],
            },
            daily: DailySeries {
                time: vec!["2024-06-01".into()],
                temperature_2m_max: vec![23.0],
                temperature_2m_min: vec![14.0],
                precipitation_probability_mean: vec![Some(20.0)],
                weathercode: vec![61],
            },
        }
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(geocode_cache_key("  LonDon "), "geo:london");
        assert_eq!(
            forecast_cache_key(Coordinates::new(51.50853, -0.12574), UnitSystem::Imperial),
            "meteo:51.51,-0.13:imperial"
        );
    }

    #[test]
    fn test_into_snapshot() {
        let snapshot = sample_response().into_snapshot(UnitSystem::Metric).unwrap();
        assert_eq!(snapshot.units, UnitSystem::Metric);
        assert_eq!(snapshot.current.weathercode, 3);
        assert_eq!(snapshot.hourly.len(), 2);
        assert_eq!(snapshot.hourly[1].precipitation_probability, None);
        assert_eq!(snapshot.daily[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(snapshot.daily[0].weathercode, 61);
    }

    #[test]
    fn test_mismatched_series_is_rejected() {
        let mut response = sample_response();
        response.hourly.temperature_2m.pop();
        let err = response.into_snapshot(UnitSystem::Metric).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let mut response = sample_response();
        response.current_weather.time = "yesterday".into();
        assert!(response.into_snapshot(UnitSystem::Metric).is_err());
    }

    #[test]
    fn test_parse_local_time_accepts_seconds() {
        assert!(parse_local_time("2024-06-01T14:00").is_ok());
        assert!(parse_local_time("2024-06-01T14:00:30").is_ok());
    }
}
