//! EDI emitter: builds the per-frame TAG packet (`*ptr`/`deti`/`est<n>`),
//! wraps it in an AF packet, optionally PFT-fragments it with
//! Reed-Solomon parity, and fans the result out to every destination.

use std::collections::VecDeque;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, UdpSocket};

use tracing::warn;

use crate::af::AfPacket;
use crate::error::Result;
use crate::pft::{fragment, PftFragment};
use crate::tag::{encode_tags, Tag};

pub const DEFAULT_CHUNK_LEN: usize = 207;
pub const DEFAULT_FEC: u8 = 3;
pub const DEFAULT_TAGPACKET_ALIGNMENT: usize = 8;
const MAX_INTERLEAVE_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, Copy)]
pub struct PftConfig {
    pub chunk_len: usize,
    pub fec: u8,
    pub latency_frames: u32,
}

impl Default for PftConfig {
    fn default() -> Self {
        Self { chunk_len: DEFAULT_CHUNK_LEN, fec: DEFAULT_FEC, latency_frames: 0 }
    }
}

impl PftConfig {
    /// Caps interleaving depth so the fragment spread never exceeds 30 s.
    pub fn interleave_frames(&self, frame_duration_ms: u32) -> u32 {
        let max_frames = (MAX_INTERLEAVE_SECONDS * 1000.0 / frame_duration_ms as f64) as u32;
        self.latency_frames.min(max_frames)
    }
}

pub struct EdiFrameInput<'a> {
    pub fct: u8,
    pub mnsc: u16,
    pub atstf: bool,
    pub utco: u8,
    pub edi_seconds: u32,
    pub tsta: u32,
    /// Sub-channel payload bytes in MSC order, at most 10 (one ASCII
    /// digit is all a 4-byte `est<n>` tag name has room for).
    pub subchannels: &'a [&'a [u8]],
}

fn ptr_payload() -> Vec<u8> {
    let mut p = b"DETI".to_vec();
    p.push(0); // major
    p.push(0); // minor
    p
}

fn deti_payload(input: &EdiFrameInput) -> Vec<u8> {
    let mut p = Vec::with_capacity(11);
    let flags = if input.atstf { 0x40 } else { 0 };
    p.push(flags);
    p.push(input.fct);
    p.extend_from_slice(&input.mnsc.to_be_bytes());
    if input.atstf {
        p.push(input.utco);
        p.extend_from_slice(&input.edi_seconds.to_be_bytes());
        p.extend_from_slice(&input.tsta.to_be_bytes()[1..]);
    }
    p
}

fn build_tag_packet(input: &EdiFrameInput, tagpacket_alignment: usize) -> Vec<u8> {
    let mut tags = vec![Tag::new(b"*ptr", ptr_payload()), Tag::new(b"deti", deti_payload(input))];
    for (i, bytes) in input.subchannels.iter().take(10).enumerate() {
        let name = [b'e', b's', b't', b'0' + i as u8];
        tags.push(Tag::new(&name, bytes.to_vec()));
    }
    let mut body = encode_tags(&tags);
    let alignment = tagpacket_alignment.max(1);
    while body.len() % alignment != 0 {
        body.push(0);
    }
    body
}

enum Destination {
    Udp { socket: UdpSocket, target: SocketAddr },
    Tcp { target: SocketAddr, stream: Option<TcpStream>, queue: VecDeque<Vec<u8>>, max_queue: usize, drops: u64 },
}

impl Destination {
    fn send(&mut self, data: &[u8]) {
        match self {
            Destination::Udp { socket, target } => {
                if let Err(err) = socket.send_to(data, *target) {
                    warn!(%err, %target, "edi udp send failed");
                }
            }
            Destination::Tcp { target, stream, queue, max_queue, drops } => {
                if queue.len() >= *max_queue {
                    queue.pop_front();
                    *drops += 1;
                }
                queue.push_back(data.to_vec());

                if stream.is_none() {
                    *stream = TcpStream::connect(*target).ok();
                }
                if let Some(s) = stream {
                    while let Some(front) = queue.front() {
                        match s.write_all(front) {
                            Ok(()) => {
                                queue.pop_front();
                            }
                            Err(err) => {
                                warn!(%err, %target, "edi tcp write failed, will retry");
                                *stream = None;
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Builds and fans out one EDI frame per multiplexer tick.
pub struct EdiEmitter {
    seq: u16,
    pseq: u16,
    destinations: Vec<Destination>,
    pft: Option<PftConfig>,
    tagpacket_alignment: usize,
}

impl EdiEmitter {
    pub fn new(pft: Option<PftConfig>) -> Self {
        Self::with_tagpacket_alignment(pft, DEFAULT_TAGPACKET_ALIGNMENT)
    }

    pub fn with_tagpacket_alignment(pft: Option<PftConfig>, tagpacket_alignment: usize) -> Self {
        Self { seq: 0, pseq: 0, destinations: Vec::new(), pft, tagpacket_alignment }
    }

    pub fn add_udp_unicast(&mut self, socket: UdpSocket, target: SocketAddr) {
        self.destinations.push(Destination::Udp { socket, target });
    }

    pub fn add_tcp_server(&mut self, target: SocketAddr, max_queue: usize) {
        self.destinations.push(Destination::Tcp { target, stream: None, queue: VecDeque::new(), max_queue, drops: 0 });
    }

    fn next_seq(&mut self) -> u16 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }

    fn next_pseq(&mut self) -> u16 {
        let pseq = self.pseq;
        self.pseq = self.pseq.wrapping_add(1);
        pseq
    }

    fn packets_for(&mut self, af_bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
        let Some(pft) = self.pft else {
            return Ok(vec![af_bytes.to_vec()]);
        };
        let data_fcount = af_bytes.len().div_ceil(pft.chunk_len).max(1) as u8;
        let pseq = self.next_pseq();
        let fragments: Vec<PftFragment> = fragment(af_bytes, data_fcount, pft.fec, pseq)?;
        Ok(fragments.iter().map(PftFragment::encode).collect())
    }

    /// Assembles and sends one frame's worth of EDI traffic to every
    /// registered destination.
    pub fn emit_frame(&mut self, input: &EdiFrameInput) -> Result<()> {
        let body = build_tag_packet(input, self.tagpacket_alignment);
        let seq = self.next_seq();
        let af = AfPacket::new_sti_d(seq, body).encode();
        let packets = self.packets_for(&af)?;

        for dest in &mut self.destinations {
            for packet in &packets {
                dest.send(packet);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_packet_is_padded_to_multiple_of_8() {
        let input = EdiFrameInput { fct: 0, mnsc: 0, atstf: false, utco: 0, edi_seconds: 0, tsta: 0, subchannels: &[] };
        let body = build_tag_packet(&input, DEFAULT_TAGPACKET_ALIGNMENT);
        assert_eq!(body.len() % 8, 0);
    }

    #[test]
    fn tag_packet_honours_custom_alignment() {
        let input = EdiFrameInput { fct: 0, mnsc: 0, atstf: false, utco: 0, edi_seconds: 0, tsta: 0, subchannels: &[&[1, 2, 3]] };
        let body = build_tag_packet(&input, 16);
        assert_eq!(body.len() % 16, 0);
    }

    #[test]
    fn atstf_adds_timestamp_fields_to_deti() {
        let input = EdiFrameInput { fct: 3, mnsc: 7, atstf: true, utco: 1, edi_seconds: 1000, tsta: 0x123456, subchannels: &[] };
        let payload = deti_payload(&input);
        assert_eq!(payload.len(), 11);
        assert_eq!(payload[0] & 0x40, 0x40);
    }

    #[test]
    fn interleave_frames_capped_at_30_seconds() {
        let pft = PftConfig { chunk_len: 207, fec: 3, latency_frames: 100_000 };
        assert_eq!(pft.interleave_frames(24), 1250);
    }

    #[test]
    fn emit_without_pft_sends_single_af_packet() {
        let mut emitter = EdiEmitter::new(None);
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target: SocketAddr = "127.0.0.1:65000".parse().unwrap();
        emitter.add_udp_unicast(socket, target);
        let input = EdiFrameInput { fct: 0, mnsc: 0, atstf: false, utco: 0, edi_seconds: 0, tsta: 0, subchannels: &[&[1, 2, 3]] };
        emitter.emit_frame(&input).unwrap();
    }
}
