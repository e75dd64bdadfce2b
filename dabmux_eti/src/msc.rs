//! Main Service Channel assembly: pulls one frame's bytes from each
//! sub-channel at its computed offset in the MST region.

use dabmux_core::crc::crc16_ccitt;
use dabmux_model::Subchannel;

/// Supplies one sub-channel's frame bytes per tick. The multiplexer wires
/// one of these per sub-channel, adapting whatever concrete input
/// (file, PRBS, EDI/STI-D network source) that sub-channel was opened
/// against.
pub trait FrameSource {
    /// Fill `buf[..len]` with this tick's frame. `true` means data was
    /// supplied; `false` means the input had nothing (an MSC underrun —
    /// the caller zero-fills the slot and keeps multiplexing).
    fn pull(&mut self, buf: &mut [u8], len: usize) -> bool;
}

pub struct MscResult {
    pub mst: Vec<u8>,
    pub underruns: u32,
}

/// Concatenates every sub-channel's frame, in declaration order, into the
/// MST region. A negative/failed read zero-fills that sub-channel's slot
/// and counts as an underrun rather than aborting the frame.
pub fn assemble_msc(subchannels: &[Subchannel], sources: &mut [&mut dyn FrameSource]) -> MscResult {
    assert_eq!(subchannels.len(), sources.len(), "one frame source per sub-channel");
    let total: usize = subchannels.iter().map(Subchannel::frame_size_bytes).sum();
    let mut mst = vec![0u8; total];
    let mut underruns = 0;
    let mut offset = 0;
    for (sc, source) in subchannels.iter().zip(sources.iter_mut()) {
        let len = sc.frame_size_bytes();
        let slice = &mut mst[offset..offset + len];
        if !source.pull(slice, len) {
            slice.fill(0);
            underruns += 1;
        }
        offset += len;
    }
    MscResult { mst, underruns }
}

/// The 8-byte MSC trailer: 16-bit CRC over the MST region, RFU=0xFFFF,
/// then the 32-bit TIST (see [`crate::eti::tist_field`]).
pub fn msc_trailer(mst: &[u8], tist: u32) -> [u8; 8] {
    let crc = crc16_ccitt(mst);
    let mut out = [0u8; 8];
    out[0..2].copy_from_slice(&crc.to_be_bytes());
    out[2..4].copy_from_slice(&0xFFFFu16.to_be_bytes());
    out[4..8].copy_from_slice(&tist.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dabmux_model::{BufferPolicy, Protection, Subchannel, SubchannelType};

    struct Fixed(u8);
    impl FrameSource for Fixed {
        fn pull(&mut self, buf: &mut [u8], _len: usize) -> bool {
            buf.fill(self.0);
            true
        }
    }

    struct Dry;
    impl FrameSource for Dry {
        fn pull(&mut self, _buf: &mut [u8], _len: usize) -> bool {
            false
        }
    }

    fn subchannel(uid: &str, bitrate_kbps: u16) -> Subchannel {
        Subchannel {
            uid: uid.to_string(),
            id: 0,
            subchannel_type: SubchannelType::DabAudio,
            bitrate_kbps,
            protection: Protection::Eep { profile: dabmux_model::EepProfile::A, level: 3 },
            buffer_policy: BufferPolicy::Prebuffering,
            input_uri: String::new(),
            start_cu: 0,
            size_cu: 0,
        }
    }

    #[test]
    fn concatenates_subchannels_in_order() {
        let subs = vec![subchannel("a", 8), subchannel("b", 8)];
        let mut a = Fixed(1);
        let mut b = Fixed(2);
        let mut sources: Vec<&mut dyn FrameSource> = vec![&mut a, &mut b];
        let result = assemble_msc(&subs, &mut sources);
        assert_eq!(result.mst.len(), 48);
        assert!(result.mst[..24].iter().all(|&b| b == 1));
        assert!(result.mst[24..].iter().all(|&b| b == 2));
        assert_eq!(result.underruns, 0);
    }

    #[test]
    fn dry_source_zero_fills_and_counts_underrun() {
        let subs = vec![subchannel("a", 8)];
        let mut dry = Dry;
        let mut sources: Vec<&mut dyn FrameSource> = vec![&mut dry];
        let result = assemble_msc(&subs, &mut sources);
        assert!(result.mst.iter().all(|&b| b == 0));
        assert_eq!(result.underruns, 1);
    }
}
