//! Error type for sub-channel input sources.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input {0}: could not open {1}")]
    Open(String, String, #[source] std::io::Error),
    #[error("input {0}: read failed")]
    Read(String, #[source] std::io::Error),
    #[error("input {0}: uri {1} is not a valid prbs:// generator spec")]
    InvalidPrbsUri(String, String),
    #[error("input {0}: requested bitrate {1} kbps is not a multiple of 8")]
    BitrateNotMultipleOf8(String, u16),
}

pub type Result<T> = std::result::Result<T, InputError>;
