//! Weather lookup client over the Open-Meteo geocoding and forecast APIs.
//!
//! Geocoding and forecast responses go through a two-tier TTL cache (memory
//! in front of a JSON file). A [`controller::Controller`] owns the session and
//! emits [`controller::Screen`]s for a front-end to display.

pub mod api_client;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod geolocation;
pub mod render;
pub mod session;
pub mod store;
pub mod terminal;
