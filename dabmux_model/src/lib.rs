//! # dabmux_model
//!
//! The ensemble data model: typed entities, cross-reference validation,
//! slot allocation, and the TOML configuration loader that builds an
//! [`Ensemble`] from a parsed configuration tree.

pub mod announcement;
pub mod component;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod frequency;
pub mod label;
pub mod linkage;
pub mod managed;
pub mod other_ensemble;
pub mod protection;
pub mod service;
pub mod subchannel;

pub use announcement::{AnnouncementCluster, AnnouncementFlags};
pub use component::{Component, PacketAddressing, UserApplication};
pub use config::{load_config, ConfigRoot};
pub use ensemble::{Ensemble, LocalTimeOffset, ReconfigCounter, TransmissionMode, MAX_CAPACITY_UNITS};
pub use error::{ConfigError, Result};
pub use frequency::{DabFrequency, FmFrequency, FrequencyInfo};
pub use label::{ExtendedLabel, Label, TextAttribute, TextControl};
pub use linkage::{LinkEntry, LinkType, LinkageSet, LinkageSubset};
pub use managed::ManagedObject;
pub use other_ensemble::OtherEnsembleService;
pub use protection::{EepProfile, Protection, Resolved};
pub use service::{ProgrammeType, Service, ServiceId};
pub use subchannel::{BufferPolicy, Subchannel, SubchannelType};
