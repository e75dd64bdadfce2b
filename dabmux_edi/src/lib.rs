//! # dabmux_edi
//!
//! EDI/STI-D decode (AF/PF framing, PFT reassembly, TAG packet parsing,
//! STI frame assembly) and encode (TAG packet build, AF wrapping, optional
//! PFT/FEC, multi-destination fan-out).

pub mod af;
pub mod decoder;
pub mod emitter;
pub mod error;
pub mod pft;
pub mod stid;
pub mod tag;

pub use af::{AfPacket, AF_MAGIC};
pub use decoder::EdiDecoder;
pub use emitter::{EdiEmitter, EdiFrameInput, PftConfig};
pub use error::{EdiError, Result};
pub use pft::{PftFragment, PftReassembler};
pub use stid::{StiDDecoder, StiFrame, StiTimestamp};
pub use tag::{decode_tags, encode_tags, Tag};
