//! Session controller: turns user intents into fetches and screens.
//!
//! The controller exclusively owns the session state. Every mutation goes
//! through `&mut self`, and forecast loads are awaited in place, so two loads
//! can never interleave and overwrite each other's view. Only the debounced
//! suggestion lookup runs detached; its result comes back through a channel
//! and is dropped if the query changed in the meantime.

use crate::api_client::{ForecastResult, OpenMeteoClient};
use crate::config::{FALLBACK_COORDS, FALLBACK_PLACE};
use crate::debounce::Debouncer;
use crate::geolocation::{GeolocationOptions, Geolocator};
use crate::render::{self, RenderedWeather};
use crate::session::SessionStore;
use common::errors::{AppError, LocationError};
use common::models::{Coordinates, Place, UnitSystem};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// What the front-end should display
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Loading {
        place: String,
        skeleton: RenderedWeather,
    },
    Weather {
        place: String,
        units: UnitSystem,
        rendered: RenderedWeather,
        from_cache: bool,
        latency: Option<Duration>,
    },
    LoadFailed {
        place: String,
        banner: String,
    },
    Suggestions {
        query: String,
        items: Vec<String>,
    },
    SuggestionsHidden,
    /// Blocking notice the user has to acknowledge
    Alert(String),
    /// Informational text such as help or a rejected command
    Notice(String),
}

pub trait View: Send {
    fn show(&mut self, screen: Screen);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub place: String,
    pub coords: Option<Coordinates>,
    pub units: UnitSystem,
}

/// How a finished suggestion lookup was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionOutcome {
    Shown(usize),
    Empty,
    /// The lookup failed; the list stays hidden and the UI carries on
    Suppressed,
    /// The input changed while the lookup was in flight
    Stale,
}

/// Result of a debounced geocode, delivered back to the controller
#[derive(Debug)]
pub struct SuggestionsReady {
    pub query: String,
    pub result: Result<Vec<Place>, AppError>,
}

pub struct Controller {
    api: Arc<OpenMeteoClient>,
    geolocator: Option<Arc<dyn Geolocator>>,
    session: SessionStore,
    view: Box<dyn View>,
    state: SessionState,
    load_state: LoadState,
    suggestions: Vec<Place>,
    latest_query: String,
    debouncer: Debouncer,
    suggestions_tx: mpsc::UnboundedSender<SuggestionsReady>,
}

impl Controller {
    /// Build a controller with units restored from the session store. The
    /// returned receiver yields debounced lookups to pass to
    /// [`Controller::show_suggestions`].
    pub fn new(
        api: Arc<OpenMeteoClient>,
        geolocator: Option<Arc<dyn Geolocator>>,
        session: SessionStore,
        view: Box<dyn View>,
        debounce_window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SuggestionsReady>) {
        let (suggestions_tx, suggestions_rx) = mpsc::unbounded_channel();
        let units = session.units();
        let controller = Self {
            api,
            geolocator,
            session,
            view,
            state: SessionState {
                place: String::new(),
                coords: None,
                units,
            },
            load_state: LoadState::Idle,
            suggestions: Vec::new(),
            latest_query: String::new(),
            debouncer: Debouncer::new(debounce_window),
            suggestions_tx,
        };
        (controller, suggestions_rx)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn suggestions(&self) -> &[Place] {
        &self.suggestions
    }

    /// Restore the last loaded location, or fall back to the default, and
    /// load it.
    pub async fn start(&mut self) -> LoadState {
        match self.session.last_location() {
            Some(saved) => {
                info!(place = %saved.place, "Restoring last location");
                self.state.place = saved.place.clone();
                self.state.coords = Some(saved.coords());
            }
            None => {
                info!(place = FALLBACK_PLACE, "No saved location, using fallback");
                self.state.place = FALLBACK_PLACE.to_string();
                self.state.coords = Some(FALLBACK_COORDS);
            }
        }
        self.load().await
    }

    /// Keystroke in the search field. Restarts the debounce window.
    pub fn search_input(&mut self, text: &str) {
        let query = text.trim().to_string();
        self.latest_query = query.clone();

        if query.is_empty() {
            self.debouncer.cancel();
            self.hide_suggestions();
            return;
        }

        let api = self.api.clone();
        let tx = self.suggestions_tx.clone();
        self.debouncer.schedule(async move {
            let result = api.geocode(&query).await;
            // receiver gone means the controller shut down
            let _ = tx.send(SuggestionsReady { query, result });
        });
    }

    /// Geocode `query` right away, bypassing the debounce window.
    pub async fn lookup_suggestions(&mut self, query: &str) -> SuggestionOutcome {
        let query = query.trim().to_string();
        self.latest_query = query.clone();
        let result = self.api.geocode(&query).await;
        self.show_suggestions(SuggestionsReady { query, result })
    }

    pub fn show_suggestions(&mut self, ready: SuggestionsReady) -> SuggestionOutcome {
        if ready.query != self.latest_query {
            info!(query = %ready.query, latest = %self.latest_query, "Dropping stale suggestions");
            return SuggestionOutcome::Stale;
        }

        match ready.result {
            Ok(places) if places.is_empty() => {
                self.hide_suggestions();
                SuggestionOutcome::Empty
            }
            Ok(places) => {
                let count = places.len();
                self.view.show(Screen::Suggestions {
                    query: ready.query,
                    items: render::render_suggestions(&places),
                });
                self.suggestions = places;
                SuggestionOutcome::Shown(count)
            }
            Err(e) => {
                warn!(query = %ready.query, error = %e, "Suggestion lookup failed");
                self.hide_suggestions();
                SuggestionOutcome::Suppressed
            }
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.view.show(Screen::Notice(message.into()));
    }

    pub fn dismiss_suggestions(&mut self) {
        self.hide_suggestions();
    }

    /// Make the `index`-th suggestion the active location and load it.
    pub async fn select_suggestion(&mut self, index: usize) -> Result<LoadState, AppError> {
        let place = self.suggestions.get(index).cloned().ok_or_else(|| {
            AppError::validation(format!(
                "no suggestion #{} (have {})",
                index + 1,
                self.suggestions.len()
            ))
        })?;

        self.end_search();
        self.state.place = place.label();
        self.state.coords = Some(place.coordinates());
        Ok(self.load().await)
    }

    /// Flip the unit system, persist it, and reload if a location is active.
    pub async fn toggle_units(&mut self) -> LoadState {
        self.state.units = self.state.units.toggled();
        info!(units = %self.state.units, "Units toggled");
        if let Err(e) = self.session.save_units(self.state.units) {
            warn!(error = %e, "Failed to persist unit preference");
        }

        if self.state.coords.is_some() {
            self.load().await
        } else {
            self.load_state
        }
    }

    /// One-shot position request; failures are surfaced as an alert.
    pub async fn use_my_location(&mut self) -> LoadState {
        let Some(geolocator) = self.geolocator.clone() else {
            self.view
                .show(Screen::Alert(LocationError::Unsupported.to_string()));
            return self.load_state;
        };

        let options = GeolocationOptions::default();
        match geolocator.locate(&options).await {
            Ok(fix) => {
                self.end_search();
                self.state.place = fix.label.unwrap_or_else(|| fix.coords.to_string());
                self.state.coords = Some(fix.coords);
                self.load().await
            }
            Err(e) => {
                warn!(error = %e, "Geolocation failed");
                self.view.show(Screen::Alert(e.to_string()));
                self.load_state
            }
        }
    }

    /// Reload the active location, typically after a failed load.
    pub async fn retry(&mut self) -> LoadState {
        self.load().await
    }

    /// One load cycle: Loading, then Loaded or Failed.
    #[instrument(skip(self), fields(place = %self.state.place, units = %self.state.units))]
    pub async fn load(&mut self) -> LoadState {
        let Some(coords) = self.state.coords else {
            return self.load_state;
        };

        self.load_state = LoadState::Loading;
        self.view.show(Screen::Loading {
            place: self.state.place.clone(),
            skeleton: render::render_skeleton(&self.state.place),
        });

        match self.api.forecast(coords, self.state.units).await {
            Ok(result) => self.finish_load(coords, result),
            Err(e) => {
                error!(error = %e, "Forecast load failed");
                self.load_state = LoadState::Failed;
                self.view.show(Screen::LoadFailed {
                    place: self.state.place.clone(),
                    banner: render::render_error(&self.state.place, &e.to_string()),
                });
            }
        }
        self.load_state
    }

    fn finish_load(&mut self, coords: Coordinates, result: ForecastResult) {
        let rendered = render::render_weather(&self.state.place, &result.snapshot);
        self.view.show(Screen::Weather {
            place: self.state.place.clone(),
            units: result.snapshot.units,
            rendered,
            from_cache: result.from_cache,
            latency: result.latency,
        });
        self.load_state = LoadState::Loaded;
        self.persist_location(coords);
    }

    fn persist_location(&self, coords: Coordinates) {
        if let Err(e) = self.session.save_last_location(coords, &self.state.place) {
            warn!(error = %e, "Failed to persist last location");
        }
    }

    /// A location was chosen; lookups still pending or in flight are stale.
    fn end_search(&mut self) {
        self.debouncer.cancel();
        self.latest_query.clear();
        self.hide_suggestions();
    }

    fn hide_suggestions(&mut self) {
        self.suggestions.clear();
        self.view.show(Screen::SuggestionsHidden);
    }
}
