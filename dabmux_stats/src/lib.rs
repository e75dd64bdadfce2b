//! # dabmux_stats
//!
//! Per-input statistics registry and the newline-delimited JSON
//! remote-control surface.

pub mod controls;
pub mod error;
pub mod rc;
pub mod registry;

pub use controls::{ControlRegistry, InputControls, MultiplexerControls};
pub use error::{Result, StatsError};
pub use rc::{serve, RcSupervisor};
pub use registry::{InputSnapshot, InputState, Registry};
