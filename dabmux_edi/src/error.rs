//! Error type for EDI/STI-D decode and encode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdiError {
    #[error("malformed AF packet: {0}")]
    MalformedAf(&'static str),
    #[error("AF CRC mismatch")]
    AfCrcMismatch,
    #[error("malformed PF fragment: {0}")]
    MalformedPft(&'static str),
    #[error("PF fragment CRC mismatch")]
    PftCrcMismatch,
    #[error("reed-solomon reconstruction failed for pseq {0}")]
    ReconstructionFailed(u16),
    #[error("STI-D AF packet missing required tag {0}")]
    MissingTag(&'static str),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EdiError>;
