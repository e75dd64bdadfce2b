//! Errors raised while building and validating an ensemble.

use thiserror::Error;

/// Configuration and validation errors. Surfaced at startup only; the
/// binary maps every variant to process exit code 1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate sub-channel id {0}")]
    DuplicateSubchannelId(String),
    #[error("duplicate service id {0}")]
    DuplicateServiceId(String),
    #[error("duplicate component id {0}")]
    DuplicateComponentId(String),
    #[error("ensemble capacity exceeded: {used} CU used, 864 CU available")]
    CapacityExceeded { used: u16 },
    #[error("sub-channel {0}: bitrate {1} kbit/s is not a multiple of 8")]
    BitrateNotMultipleOf8(String, u16),
    #[error("sub-channel {0}: EEP-B requires bitrate % 32 == 0, got {1}")]
    EepBBitrateInvalid(String, u16),
    #[error("component {0} references unknown service {1}")]
    UnknownService(String, String),
    #[error("component {0} references unknown sub-channel {1}")]
    UnknownSubchannel(String, String),
    #[error("packet component {0} references non-packet sub-channel {1}")]
    NotAPacketSubchannel(String, String),
    #[error("linkage set {0} references unknown key service {1}")]
    UnknownKeyService(String, String),
    #[error("announcement cluster {0}: invalid cluster id {1}")]
    InvalidClusterId(String, u8),
    #[error("primary component {0} (SCIdS=0) carries a label, which is not permitted")]
    PrimaryComponentLabeled(String),
    #[error("sub-channel {0}: no UEP table entry matches bitrate {1} kbit/s, table index {2}")]
    NoMatchingUepEntry(String, u16, u8),
    #[error("invalid URI: {0}")]
    InvalidUri(String),
    #[error("TAI-UTC offset required (EDI/ZMQ metadata output enabled) but not available")]
    MissingTaiOffset,
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
