//! PFT (Protection, Fragmentation and Transport) reassembly: recovers an
//! AF packet that arrived split across PF fragments, tolerating loss via
//! Reed-Solomon erasure parity shards.
//!
//! Fragment layout: `PF` magic, 16-bit pseq, 1-byte fragment index, 1-byte
//! fragment count, 1-byte data-shard count (the rest are parity), 16-bit
//! original AF length, a fixed-size shard payload, and a trailing
//! CRC-16/CCITT over everything before it.

use std::collections::{HashMap, VecDeque};

use reed_solomon_erasure::galois_8::ReedSolomon;

use dabmux_core::crc::crc16_ccitt;

use crate::error::{EdiError, Result};

pub const PF_MAGIC: &[u8; 2] = b"PF";
const HEADER_LEN: usize = 9;

#[derive(Debug, Clone)]
pub struct PftFragment {
    pub pseq: u16,
    pub findex: u8,
    pub fcount: u8,
    pub data_fcount: u8,
    pub af_len: u16,
    pub shard: Vec<u8>,
}

impl PftFragment {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.shard.len() + 2);
        out.extend_from_slice(PF_MAGIC);
        out.extend_from_slice(&self.pseq.to_be_bytes());
        out.push(self.findex);
        out.push(self.fcount);
        out.push(self.data_fcount);
        out.extend_from_slice(&self.af_len.to_be_bytes());
        out.extend_from_slice(&self.shard);
        let crc = crc16_ccitt(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN + 2 || &buf[0..2] != PF_MAGIC {
            return Err(EdiError::MalformedPft("missing PF magic"));
        }
        let crc_at = buf.len() - 2;
        let expected = u16::from_be_bytes(buf[crc_at..].try_into().unwrap());
        let actual = crc16_ccitt(&buf[..crc_at]);
        if expected != actual {
            return Err(EdiError::PftCrcMismatch);
        }
        let pseq = u16::from_be_bytes(buf[2..4].try_into().unwrap());
        let findex = buf[4];
        let fcount = buf[5];
        let data_fcount = buf[6];
        let af_len = u16::from_be_bytes(buf[7..9].try_into().unwrap());
        let shard = buf[HEADER_LEN..crc_at].to_vec();
        Ok(Self { pseq, findex, fcount, data_fcount, af_len, shard })
    }
}

/// Split an AF packet's bytes into `data_fcount` data shards plus
/// `parity_fcount` Reed-Solomon parity shards, all equal in length (the
/// last data shard is zero-padded).
pub fn fragment(af_bytes: &[u8], data_fcount: u8, parity_fcount: u8, pseq: u16) -> Result<Vec<PftFragment>> {
    let shard_len = af_bytes.len().div_ceil(data_fcount as usize).max(1);
    let mut shards: Vec<Vec<u8>> = Vec::with_capacity((data_fcount + parity_fcount) as usize);
    for i in 0..data_fcount as usize {
        let start = i * shard_len;
        let end = (start + shard_len).min(af_bytes.len());
        let mut shard = vec![0u8; shard_len];
        if start < af_bytes.len() {
            shard[..end - start].copy_from_slice(&af_bytes[start..end]);
        }
        shards.push(shard);
    }
    for _ in 0..parity_fcount {
        shards.push(vec![0u8; shard_len]);
    }

    if parity_fcount > 0 {
        let rs = ReedSolomon::new(data_fcount as usize, parity_fcount as usize)
            .map_err(|_| EdiError::MalformedPft("invalid reed-solomon shard configuration"))?;
        rs.encode(&mut shards).map_err(|_| EdiError::MalformedPft("reed-solomon encode failed"))?;
    }

    let fcount = data_fcount + parity_fcount;
    Ok(shards
        .into_iter()
        .enumerate()
        .map(|(findex, shard)| PftFragment {
            pseq,
            findex: findex as u8,
            fcount,
            data_fcount,
            af_len: af_bytes.len() as u16,
            shard,
        })
        .collect())
}

struct FragmentBuffer {
    fcount: u8,
    data_fcount: u8,
    af_len: u16,
    shard_len: usize,
    shards: Vec<Option<Vec<u8>>>,
    received: usize,
}

/// Reassembles PF fragments into complete AF packets, recovering missing
/// fragments via Reed-Solomon when enough shards have arrived. Tracks at
/// most `max_delay` distinct pseqs at once; the oldest is evicted (and
/// counted lost) once that bound is exceeded.
pub struct PftReassembler {
    max_delay: usize,
    buffers: HashMap<u16, FragmentBuffer>,
    order: VecDeque<u16>,
    pub lost: u64,
    pub recovered: u64,
}

impl PftReassembler {
    pub fn new(max_delay: usize) -> Self {
        Self { max_delay, buffers: HashMap::new(), order: VecDeque::new(), lost: 0, recovered: 0 }
    }

    /// Feed one fragment. Returns the reassembled AF packet bytes once a
    /// pseq is complete (directly or via erasure recovery).
    pub fn push(&mut self, frag: PftFragment) -> Option<Vec<u8>> {
        if !self.buffers.contains_key(&frag.pseq) {
            if self.order.len() >= self.max_delay {
                if let Some(oldest) = self.order.pop_front() {
                    if self.buffers.remove(&oldest).is_some() {
                        self.lost += 1;
                    }
                }
            }
            self.order.push_back(frag.pseq);
            self.buffers.insert(
                frag.pseq,
                FragmentBuffer {
                    fcount: frag.fcount,
                    data_fcount: frag.data_fcount,
                    af_len: frag.af_len,
                    shard_len: frag.shard.len(),
                    shards: vec![None; frag.fcount as usize],
                    received: 0,
                },
            );
        }

        let pseq = frag.pseq;
        let complete = {
            let buf = self.buffers.get_mut(&pseq)?;
            let slot = frag.findex as usize;
            if slot >= buf.shards.len() {
                return None;
            }
            if buf.shards[slot].is_none() {
                buf.shards[slot] = Some(frag.shard);
                buf.received += 1;
            }
            buf.received >= buf.data_fcount as usize
        };

        if !complete {
            return None;
        }

        let buf = self.buffers.remove(&pseq).unwrap();
        self.order.retain(|&p| p != pseq);
        let all_present = buf.shards.iter().all(Option::is_some);
        let shards = if all_present {
            buf.shards
        } else {
            let mut shards = buf.shards;
            let rs = ReedSolomon::new(buf.data_fcount as usize, (buf.fcount - buf.data_fcount) as usize).ok()?;
            if rs.reconstruct(&mut shards).is_err() {
                self.lost += 1;
                return None;
            }
            self.recovered += 1;
            shards
        };

        let mut out = Vec::with_capacity(buf.data_fcount as usize * buf.shard_len);
        for shard in shards.into_iter().take(buf.data_fcount as usize) {
            out.extend_from_slice(&shard.unwrap_or_else(|| vec![0u8; buf.shard_len]));
        }
        out.truncate(buf.af_len as usize);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_without_loss() {
        let af = vec![7u8; 40];
        let frags = fragment(&af, 4, 2, 1).unwrap();
        let mut reassembler = PftReassembler::new(8);
        let mut out = None;
        for frag in frags {
            out = reassembler.push(frag).or(out);
        }
        assert_eq!(out, Some(af));
    }

    #[test]
    fn recovers_from_missing_data_shard_via_parity() {
        let af = (0u8..40).collect::<Vec<_>>();
        let frags = fragment(&af, 4, 2, 7).unwrap();
        let mut reassembler = PftReassembler::new(8);
        let mut out = None;
        for frag in frags.into_iter().filter(|f| f.findex != 0) {
            out = reassembler.push(frag).or(out);
        }
        assert_eq!(out, Some(af));
        assert_eq!(reassembler.recovered, 1);
    }

    #[test]
    fn evicts_oldest_pseq_past_max_delay() {
        let mut reassembler = PftReassembler::new(1);
        let af_a = fragment(&vec![1u8; 8], 2, 0, 1).unwrap();
        let af_b = fragment(&vec![2u8; 8], 2, 0, 2).unwrap();
        reassembler.push(af_a[0].clone());
        reassembler.push(af_b[0].clone());
        assert_eq!(reassembler.lost, 1);
    }

    #[test]
    fn round_trips_fragment_wire_encoding() {
        let frag = PftFragment { pseq: 99, findex: 1, fcount: 3, data_fcount: 2, af_len: 10, shard: vec![1, 2, 3] };
        let encoded = frag.encode();
        let decoded = PftFragment::decode(&encoded).unwrap();
        assert_eq!(decoded.pseq, 99);
        assert_eq!(decoded.shard, vec![1, 2, 3]);
    }
}
