//! Error types for the fallible edges of the engine.
//!
//! Simulation steps never fail; only the event history touches the
//! filesystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
