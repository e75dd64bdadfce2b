//! # dabmux_eti
//!
//! Main Service Channel assembly and bit-exact ETI-NI frame emission.

pub mod error;
pub mod eti;
pub mod msc;

pub use error::{EtiError, Result};
pub use eti::{build_frame, tist_field, FRAME_BOUND};
pub use msc::{assemble_msc, msc_trailer, FrameSource, MscResult};
