//! Host call error types

use thiserror::Error;

use crate::tab::TabId;

#[derive(Error, Debug, Clone)]
pub enum HostError {
    #[error("Host API unavailable: {0}")]
    Unavailable(String),

    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Host rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },
}
