use crate::store::KeyValueStore;
use common::errors::AppError;
use common::models::{Coordinates, UnitSystem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const UNITS_KEY: &str = "units";
const LAST_COORDS_KEY: &str = "lastCoords";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub lat: f64,
    pub lon: f64,
    pub place: String,
}

impl SavedLocation {
    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved preference, or the default when absent or unreadable.
    pub fn units(&self) -> UnitSystem {
        self.store
            .get_item(UNITS_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn save_units(&self, units: UnitSystem) -> Result<(), AppError> {
        self.store.set_item(UNITS_KEY, units.as_str())
    }

    pub fn last_location(&self) -> Option<SavedLocation> {
        let raw = self.store.get_item(LAST_COORDS_KEY)?;
        match serde_json::from_str::<SavedLocation>(&raw) {
            Ok(saved) if saved.lat.is_finite() && saved.lon.is_finite() => Some(saved),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable saved location");
                None
            }
        }
    }

    pub fn save_last_location(&self, coords: Coordinates, place: &str) -> Result<(), AppError> {
        let saved = SavedLocation {
            lat: coords.latitude,
            lon: coords.longitude,
            place: place.to_string(),
        };
        self.store
            .set_item(LAST_COORDS_KEY, &serde_json::to_string(&saved)?)
    }
}
