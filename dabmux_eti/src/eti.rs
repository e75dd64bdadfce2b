//! ETI-NI (Network Independent) frame emission: SYNC/FC/STC/EOH/MST/EOF/TIST,
//! bounded to 6144 bytes.

use dabmux_core::crc::crc16_ccitt;
use dabmux_core::time::MjdTime;
use dabmux_model::Subchannel;

use crate::error::{EtiError, Result};

pub const FRAME_BOUND: usize = 6144;
const FSYNC_A: [u8; 3] = [0x07, 0x3A, 0xB6];

fn fsync(frame_counter: u64) -> [u8; 3] {
    if frame_counter % 2 == 0 {
        FSYNC_A
    } else {
        [!FSYNC_A[0], !FSYNC_A[1], !FSYNC_A[2]]
    }
}

fn sync_word(frame_counter: u64) -> [u8; 4] {
    let fs = fsync(frame_counter);
    [0, fs[0], fs[1], fs[2]] // ERR=0 (no error), FSYNC
}

/// STC word: 6-bit SCID, 10-bit SAD, 6-bit TPL, 10-bit STL (in 32-bit words).
fn stc_word(scid: u8, sad: u16, tpl: u8, stl_dwords: u16) -> [u8; 4] {
    let scid = (scid & 0x3F) as u32;
    let sad = (sad & 0x3FF) as u32;
    let tpl = (tpl & 0x3F) as u32;
    let stl = (stl_dwords & 0x3FF) as u32;
    let word = (scid << 26) | (sad << 16) | (tpl << 10) | stl;
    word.to_be_bytes()
}

/// MNSC time code: phase 0 is a sync marker, phases 1-3 carry hours,
/// minutes, seconds respectively, selected by `frame_counter % 8 % 4`.
fn mnsc_word(frame_counter: u64, mjd: &MjdTime) -> u16 {
    let phase = (frame_counter % 8 % 4) as u8;
    match phase {
        1 => 0x1000 | mjd.hours as u16,
        2 => 0x2000 | mjd.minutes as u16,
        3 => 0x3000 | mjd.seconds as u16,
        _ => 0x0000,
    }
}

fn fc_word(frame_counter: u64, nst: u8, fic_words: u16, fl_words: u16) -> [u8; 4] {
    let fct = (frame_counter % 250) as u8;
    let fp = (frame_counter % 8) as u8;
    let mid = match frame_counter % 4 {
        0 => 1,
        1 => 2,
        2 => 3,
        _ => 0,
    };
    let _ = fic_words; // FICF is always 1 in this engine (FIC is always present)
    let byte1 = 0x80 | (nst & 0x7F);
    let byte2 = ((fp & 0x07) << 5) | ((mid & 0x03) << 3) | ((fl_words >> 8) as u8 & 0x07);
    let byte3 = (fl_words & 0xFF) as u8;
    [fct, byte1, byte2, byte3]
}

/// TIST field: high 24 bits of the TIST counter followed by the trailing
/// `0xFF` marker byte, or the all-ones sentinel when TIST is disabled.
pub fn tist_field(tist_24bit: Option<u32>) -> [u8; 4] {
    match tist_24bit {
        Some(t) => {
            let bytes = t.to_be_bytes();
            [bytes[1], bytes[2], bytes[3], 0xFF]
        }
        None => [0xFF; 4],
    }
}

/// Assembles one complete ETI-NI frame: SYNC, FC, STC (one per
/// sub-channel), EOH, FIC, MST (sub-channel bytes from
/// [`crate::msc::assemble_msc`]), EOF, TIST.
#[allow(clippy::too_many_arguments)]
pub fn build_frame(
    frame_counter: u64,
    subchannels: &[Subchannel],
    fic: &[u8],
    mst: &[u8],
    mjd: &MjdTime,
    tist_24bit: Option<u32>,
) -> Result<Vec<u8>> {
    if subchannels.len() > 0x7F {
        return Err(EtiError::TooManySubchannels(subchannels.len()));
    }

    let mut stc = Vec::with_capacity(subchannels.len() * 4);
    for sc in subchannels {
        let stl_dwords = (sc.frame_size_bytes() / 4) as u16;
        stc.extend_from_slice(&stc_word(sc.id, sc.start_cu, sc.to_tpl(), stl_dwords));
    }

    let fic_words = (fic.len() / 4) as u16;
    // FL counts STC + EOH + FIC + MST in 32-bit words.
    let fl_words = ((stc.len() + 4 + fic.len() + mst.len()) / 4) as u16;

    let mut frame = Vec::with_capacity(FRAME_BOUND);
    frame.extend_from_slice(&sync_word(frame_counter));
    frame.extend_from_slice(&fc_word(frame_counter, subchannels.len() as u8, fic_words, fl_words));
    frame.extend_from_slice(&stc);

    let mnsc = mnsc_word(frame_counter, mjd);
    let mut eoh = Vec::with_capacity(4);
    eoh.extend_from_slice(&mnsc.to_be_bytes());
    let crc_region: Vec<u8> = frame[4..].iter().chain(eoh.iter()).copied().collect();
    let eoh_crc = crc16_ccitt(&crc_region);
    eoh.extend_from_slice(&eoh_crc.to_be_bytes());
    frame.extend_from_slice(&eoh);

    frame.extend_from_slice(fic);
    frame.extend_from_slice(mst);

    let mst_crc = crc16_ccitt(mst);
    let mut eof = Vec::with_capacity(4);
    eof.extend_from_slice(&mst_crc.to_be_bytes());
    eof.extend_from_slice(&0xFFFFu16.to_be_bytes());
    frame.extend_from_slice(&eof);

    frame.extend_from_slice(&tist_field(tist_24bit));

    let effective_size = (fl_words as usize + 2) * 4 + 4;
    if effective_size > FRAME_BOUND || frame.len() > FRAME_BOUND {
        return Err(EtiError::FrameTooLarge(effective_size.max(frame.len())));
    }
    frame.resize(FRAME_BOUND, 0x55);

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dabmux_core::time::MjdTime;

    fn mjd() -> MjdTime {
        MjdTime { mjd: 60000, hours: 12, minutes: 34, seconds: 56, milliseconds: 0, utc_flag: true }
    }

    #[test]
    fn fsync_alternates_by_parity() {
        assert_eq!(sync_word(0)[1..], FSYNC_A);
        assert_eq!(sync_word(1)[1], !FSYNC_A[0]);
    }

    #[test]
    fn mnsc_phase_cycles_through_time_fields() {
        assert_eq!(mnsc_word(0, &mjd()) & 0xF000, 0x0000);
        assert_eq!(mnsc_word(1, &mjd()) & 0x0FFF, mjd().hours as u16);
        assert_eq!(mnsc_word(2, &mjd()) & 0x0FFF, mjd().minutes as u16);
        assert_eq!(mnsc_word(3, &mjd()) & 0x0FFF, mjd().seconds as u16);
    }

    #[test]
    fn frame_is_padded_to_6144_bytes() {
        let frame = build_frame(0, &[], &[0xFFu8; 24], &[], &mjd(), Some(0)).unwrap();
        assert_eq!(frame.len(), FRAME_BOUND);
    }

    #[test]
    fn tist_disabled_writes_all_ones() {
        assert_eq!(tist_field(None), [0xFF; 4]);
    }
}
