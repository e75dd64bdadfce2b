//! FIG type 0: multiplex configuration information, one sub-module per
//! extension family.

pub mod announcement;
pub mod header;
pub mod linking;
pub mod misc;
pub mod packet;
pub mod service;
pub mod subchannel;

#[cfg(test)]
pub(crate) mod test_support;

pub use announcement::{Fig0_18, Fig0_19};
pub use header::{Fig0_0, Fig0_7};
pub use linking::{Fig0_21, Fig0_24, Fig0_6};
pub use misc::{Fig0_10, Fig0_13, Fig0_14, Fig0_5, Fig0_9};
pub use packet::Fig0_3;
pub use service::{Fig0_17, Fig0_2, Fig0_8};
pub use subchannel::Fig0_1;
