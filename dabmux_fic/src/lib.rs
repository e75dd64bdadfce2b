//! # dabmux_fic
//!
//! Fast Information Channel assembly: the FIG table generators, FIB
//! framing, and the carousel scheduler that packs due generators into
//! each frame's FIC payload.

pub mod carousel;
pub mod fib;
pub mod fig0;
pub mod fig1;
pub mod fig2;
pub mod generator;
pub mod rate;
pub mod watermark;

pub use carousel::Carousel;
pub use fib::{finish_fib, FIB_DATA_SIZE, FIB_SIZE};
pub use generator::{fig0_header, fig_header, FigGenerator, FrameContext};
pub use rate::RepetitionRate;
