//! External store clients: the metrics time-series
//! store and the UI-command store, each behind a trait with an HTTP
//! implementation and an in-memory fake for tests, grounded on the
//! reqwest-based HTTP-client shape.

mod metrics_store;
mod ui_command_store;

pub use metrics_store::{HttpMetricsStore, InMemoryMetricsStore, MetricsStore};
pub use ui_command_store::{HttpUiCommandStore, InMemoryUiCommandStore, UiCommandStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("malformed store response: {0}")]
    Malformed(String),
}
