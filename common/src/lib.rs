//! Shared building blocks for the weather client: error taxonomy, the
//! retrying HTTP client, domain models and tracing setup.

pub mod errors;
pub mod http_client;
pub mod models;
pub mod tracing;
