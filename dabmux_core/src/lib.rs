//! # dabmux_core
//!
//! Foundational utilities shared across the multiplexer workspace: TAI/TIST
//! time discipline, CRC-16 framing checksums, and the lock-free SPSC ring
//! buffer used to hand frames from network receive threads to the
//! real-time assembler.

pub mod crc;
pub mod error;
pub mod spsc;
pub mod stack_vec;
pub mod time;

pub use error::{Result, TimeError};
pub use spsc::{Consumer, Producer, SpscRingBuffer};
pub use stack_vec::StackVec;
pub use time::{EnsembleClock, MjdTime, TaiCache};
