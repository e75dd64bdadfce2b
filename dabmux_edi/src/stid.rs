//! STI-D frame assembly from a decoded AF packet's TAG Packet body.
//!
//! A conforming AF packet carries exactly one `*ptr` (protocol pointer),
//! one `dsti` (management: DFLC, optional STAT/SPID, optional timestamp),
//! zero or more `ss##` (one per sub-channel, 1-based index in the tag
//! name's numeric suffix), and optionally `ODRa`/`ODRv` extra metrics.

use std::collections::VecDeque;

use crate::error::{EdiError, Result};
use crate::tag::{decode_tags, Tag};

const MAX_QUEUE_FRAMES: usize = 1000;

const FLAG_STIHF: u8 = 0x80;
const FLAG_ATSTF: u8 = 0x40;
const FLAG_RFADF: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StiTimestamp {
    pub utc_offset: u8,
    pub seconds: u32,
    /// 24-bit TIST-like sub-second counter.
    pub tsta: u32,
}

#[derive(Debug, Clone)]
pub struct StiFrame {
    /// `(1-based stream index, sub-channel payload bytes)`, in the order
    /// the `ss##` tags appeared.
    pub subchannels: Vec<(u8, Vec<u8>)>,
    pub dflc: u16,
    pub rfad_flag: bool,
    pub stat: Option<u8>,
    pub spid: Option<u8>,
    pub timestamp: Option<StiTimestamp>,
    pub odr_audio_levels: Option<Vec<u8>>,
    pub odr_version: Option<Vec<u8>>,
}

fn parse_dsti(payload: &[u8]) -> Result<(u16, bool, Option<u8>, Option<u8>, Option<StiTimestamp>)> {
    if payload.len() < 3 {
        return Err(EdiError::MalformedAf("dsti tag too short"));
    }
    let flags = payload[0];
    let dflc = (u16::from_be_bytes([payload[1], payload[2]]) & 0x3FFF) % 5000;
    let mut pos = 3;

    let (stat, spid) = if flags & FLAG_STIHF != 0 {
        if payload.len() < pos + 2 {
            return Err(EdiError::MalformedAf("dsti tag missing STAT/SPID"));
        }
        let stat = payload[pos];
        let spid = payload[pos + 1];
        pos += 2;
        (Some(stat), Some(spid))
    } else {
        (None, None)
    };

    let timestamp = if flags & FLAG_ATSTF != 0 {
        if payload.len() < pos + 8 {
            return Err(EdiError::MalformedAf("dsti tag missing timestamp"));
        }
        let utc_offset = payload[pos];
        let seconds = u32::from_be_bytes(payload[pos + 1..pos + 5].try_into().unwrap());
        let tsta = u32::from_be_bytes([0, payload[pos + 5], payload[pos + 6], payload[pos + 7]]);
        Some(StiTimestamp { utc_offset, seconds, tsta })
    } else {
        None
    };

    Ok((dflc, flags & FLAG_RFADF != 0, stat, spid, timestamp))
}

/// Parses the numeric suffix out of a `ss##` tag name, e.g. `ss01` -> 1.
fn subchannel_index(name: &[u8; 4]) -> Option<u8> {
    if &name[0..2] != b"ss" {
        return None;
    }
    let tens = (name[2] as char).to_digit(10)?;
    let ones = (name[3] as char).to_digit(10)?;
    Some((tens * 10 + ones) as u8)
}

fn assemble(tags: &[Tag]) -> Result<StiFrame> {
    tags.iter()
        .find(|t| &t.name == b"*ptr")
        .ok_or(EdiError::MissingTag("*ptr"))?;
    let dsti = tags.iter().find(|t| &t.name == b"dsti").ok_or(EdiError::MissingTag("dsti"))?;
    let (dflc, rfad_flag, stat, spid, timestamp) = parse_dsti(&dsti.payload)?;

    let mut subchannels = Vec::new();
    let mut odr_audio_levels = None;
    let mut odr_version = None;
    for tag in tags {
        if let Some(idx) = subchannel_index(&tag.name) {
            subchannels.push((idx, tag.payload.clone()));
        } else if &tag.name == b"ODRa" {
            odr_audio_levels = Some(tag.payload.clone());
        } else if &tag.name == b"ODRv" {
            odr_version = Some(tag.payload.clone());
        }
    }

    Ok(StiFrame { subchannels, dflc, rfad_flag, stat, spid, timestamp, odr_audio_levels, odr_version })
}

/// Decodes AF packet bodies into STI frames and holds them in a bounded
/// queue; once full the oldest frame is dropped to make room.
#[derive(Default)]
pub struct StiDDecoder {
    queue: VecDeque<StiFrame>,
    pub dropped: u64,
}

impl StiDDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_af_body(&mut self, data: &[u8]) -> Result<()> {
        let tags = decode_tags(data)?;
        let frame = assemble(&tags)?;
        if self.queue.len() >= MAX_QUEUE_FRAMES {
            self.queue.pop_front();
            self.dropped += 1;
        }
        self.queue.push_back(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<StiFrame> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
