use common::errors::{AppError, LocationError};
use common::http_client::HttpClient;
use common::models::Coordinates;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    /// Accepted for parity with device geolocation; an IP lookup has one accuracy
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// A previous fix younger than this is returned without a new lookup
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            timeout: Duration::from_secs(8),
            maximum_age: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeoFix {
    pub coords: Coordinates,
    pub label: Option<String>,
    pub acquired_at: Instant,
}

pub type LocateFuture<'a> = Pin<Box<dyn Future<Output = Result<GeoFix, LocationError>> + Send + 'a>>;

pub trait Geolocator: Send + Sync {
    fn locate<'a>(&'a self, options: &'a GeolocationOptions) -> LocateFuture<'a>;
}

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country_name: Option<String>,
}

pub struct IpGeolocator {
    http_client: HttpClient,
    url: String,
    last_fix: Mutex<Option<GeoFix>>,
}

impl IpGeolocator {
    pub fn new(http_client: HttpClient, url: String) -> Self {
        Self {
            http_client,
            url,
            last_fix: Mutex::new(None),
        }
    }

    fn recent_fix(&self, maximum_age: Duration) -> Option<GeoFix> {
        let last = self.last_fix.lock().ok()?;
        last.as_ref()
            .filter(|fix| fix.acquired_at.elapsed() < maximum_age)
            .cloned()
    }

    #[instrument(
        skip(self, options),
        fields(
            high_accuracy = options.high_accuracy,
            timeout_ms = options.timeout.as_millis()
        )
    )]
    async fn lookup(&self, options: &GeolocationOptions) -> Result<GeoFix, LocationError> {
        if let Some(fix) = self.recent_fix(options.maximum_age) {
            info!("Reusing recent position fix");
            return Ok(fix);
        }

        let result: IpApiResult =
            tokio::time::timeout(options.timeout, self.http_client.get_json(&self.url))
                .await
                .map_err(|_| {
                    warn!("Position lookup timed out");
                    LocationError::Timeout
                })?
                .map_err(classify)?;

        let latitude = result
            .latitude
            .ok_or_else(|| LocationError::Other("no latitude in response".into()))?;
        let longitude = result
            .longitude
            .ok_or_else(|| LocationError::Other("no longitude in response".into()))?;

        let label = match (result.city, result.country_name) {
            (Some(city), Some(country)) if !country.is_empty() => {
                Some(format!("{}, {}", city, country))
            }
            (Some(city), _) => Some(city),
            (None, country) => country,
        };

        let fix = GeoFix {
            coords: Coordinates::new(latitude, longitude),
            label,
            acquired_at: Instant::now(),
        };
        if let Ok(mut last) = self.last_fix.lock() {
            *last = Some(fix.clone());
        }
        info!(coords = %fix.coords, "Position acquired");
        Ok(fix)
    }
}

impl Geolocator for IpGeolocator {
    fn locate<'a>(&'a self, options: &'a GeolocationOptions) -> LocateFuture<'a> {
        Box::pin(self.lookup(options))
    }
}

fn classify(err: AppError) -> LocationError {
    match err {
        AppError::HttpError { status: 401 | 403, .. } => LocationError::PermissionDenied,
        AppError::TimeoutError(_) => LocationError::Timeout,
        AppError::HttpError { .. } | AppError::NetworkError(_) => LocationError::Unavailable,
        other => LocationError::Other(other.to_string()),
    }
}
