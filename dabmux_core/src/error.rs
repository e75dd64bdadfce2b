//! Shared error type for ensemble timing.

use thiserror::Error;

/// Errors that can occur while tracking ensemble (TAI/TIST) time.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    /// The TAI-UTC offset was required (EDI or ZMQ metadata output enabled)
    /// but no leap-second bulletin has been loaded. Treated as startup-fatal
    /// by the binary's config-validation path.
    #[error("TAI-UTC offset required but not available")]
    MissingTaiOffset,
    /// A requested `tist_offset` (in seconds) does not fit the 24-bit TIST
    /// representation once converted to 16384ths of a millisecond.
    #[error("tist offset {0} seconds is out of range")]
    OffsetOutOfRange(i32),
}

/// Result type alias used for time operations.
pub type Result<T> = std::result::Result<T, TimeError>;
