//! Error type for the remote-control surface.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown input uid: {0}")]
    UnknownInput(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
