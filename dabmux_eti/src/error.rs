//! Error type for ETI-NI frame emission.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtiError {
    #[error("eti frame exceeds the 6144-byte bound: {0} bytes")]
    FrameTooLarge(usize),
    #[error("too many sub-channels for one eti frame: {0}")]
    TooManySubchannels(usize),
}

pub type Result<T> = std::result::Result<T, EtiError>;
