use common::http_client::HttpClient;
use common::tracing::{init_tracing, init_tracing_pretty};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;
use weather_client::api_client::OpenMeteoClient;
use weather_client::cache::TtlCache;
use weather_client::clock::SystemClock;
use weather_client::config::Config;
use weather_client::controller::Controller;
use weather_client::geolocation::{Geolocator, IpGeolocator};
use weather_client::session::SessionStore;
use weather_client::store::{FileStore, KeyValueStore};
use weather_client::terminal::{self, TerminalView};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    if config.log_json {
        init_tracing();
    } else {
        init_tracing_pretty();
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.store_path.clone()));
    info!(path = %config.store_path.display(), "Using store");

    let http_client = HttpClient::new(config.http_timeout_secs, config.http_max_retries)?;
    let cache = Arc::new(TtlCache::new(store.clone(), Arc::new(SystemClock)));
    let api = Arc::new(OpenMeteoClient::new(
        http_client.clone(),
        cache,
        config.geocoding_url.clone(),
        config.forecast_url.clone(),
    ));

    let geolocator: Option<Arc<dyn Geolocator>> = if config.geolocation_enabled {
        Some(Arc::new(IpGeolocator::new(
            http_client,
            config.geolocation_url.clone(),
        )))
    } else {
        None
    };

    let (controller, suggestions) = Controller::new(
        api,
        geolocator,
        SessionStore::new(store),
        Box::new(TerminalView),
        config.debounce_window(),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(terminal::shutdown_signal(shutdown.clone()));

    let stdin = BufReader::new(tokio::io::stdin());
    terminal::run(controller, suggestions, stdin, shutdown).await?;

    info!("Weather client stopped");
    Ok(())
}
