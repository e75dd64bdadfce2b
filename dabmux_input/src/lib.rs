//! # dabmux_input
//!
//! Sub-channel input sources (file playback, PRBS test generator), and the
//! prebuffering/timestamp release queues that sit between an input and the
//! MSC assembler.

pub mod error;
pub mod file;
pub mod input;
pub mod prbs;
pub mod queue;

pub use error::{InputError, Result};
pub use file::{FileInput, FileInputMode};
pub use input::Input;
pub use prbs::PrbsInput;
pub use queue::{FrameGrouping, InputState, InputStats, PrebufferingQueue, TimestampQueue, TimestampedFrame};
