use tracing_subscriber::fmt::layer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing with structured JSON output on stderr
pub fn init_tracing() {
    Registry::default()
        .with(env_filter("info"))
        .with(layer().json().with_writer(std::io::stderr))
        .init();
}

/// Initialize tracing with pretty output for interactive use.
///
/// Logs go to stderr so they never interleave with the rendered forecast on
/// stdout. Defaults to `warn` because the terminal is shared with the view.
pub fn init_tracing_pretty() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}
