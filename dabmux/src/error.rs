//! Top-level error type gluing every crate's error into one enum, used up
//! to the `main()` boundary where it's wrapped in `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DabmuxError {
    #[error("configuration error: {0}")]
    Config(#[from] dabmux_model::ConfigError),
    #[error("input error: {0}")]
    Input(#[from] dabmux_input::InputError),
    #[error("eti error: {0}")]
    Eti(#[from] dabmux_eti::EtiError),
    #[error("edi error: {0}")]
    Edi(#[from] dabmux_edi::EdiError),
    #[error("time error: {0}")]
    Time(#[from] dabmux_core::TimeError),
    #[error("unrecognised input uri scheme: {0}")]
    UnknownInputScheme(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DabmuxError>;
