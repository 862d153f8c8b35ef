//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Host error: {0}")]
    Host(#[from] navguard_events::HostError),

    #[error("Filter error: {0}")]
    Filter(#[from] navguard_filter::FilterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
