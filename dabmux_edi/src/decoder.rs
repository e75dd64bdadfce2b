//! Wires the three decode stages together: packet framing, PFT
//! reassembly, and STI-D tag dispatch.

use tracing::debug;

use crate::af;
use crate::error::Result;
use crate::pft::{PftFragment, PftReassembler};
use crate::stid::StiDDecoder;

/// Decodes a byte stream (TCP) or successive datagrams (UDP) carrying
/// interleaved AF and PF packets into STI-D frames.
pub struct EdiDecoder {
    reassembler: PftReassembler,
    sti: StiDDecoder,
    pub skipped_bytes: u64,
}

impl EdiDecoder {
    pub fn new(max_delay: usize) -> Self {
        Self { reassembler: PftReassembler::new(max_delay), sti: StiDDecoder::new(), skipped_bytes: 0 }
    }

    /// Feed one UDP datagram (always exactly one AF or PF packet).
    pub fn push_datagram(&mut self, datagram: &[u8]) -> Result<()> {
        self.ingest(datagram)
    }

    /// Feed a chunk of a self-framed TCP stream; returns the number of
    /// bytes consumed. Leftover bytes (a partial trailing packet) should
    /// be prepended to the next chunk by the caller.
    pub fn push_stream(&mut self, buf: &[u8]) -> Result<usize> {
        let mut pos = 0;
        loop {
            let (skipped, offset) = af::skip_to_magic(&buf[pos..]);
            self.skipped_bytes += skipped as u64;
            pos += offset;
            if pos + 2 > buf.len() {
                return Ok(pos);
            }
            match self.ingest(&buf[pos..]) {
                Ok(()) => {}
                Err(_) if buf.len() - pos < 65536 => return Ok(pos), // wait for more bytes
                Err(err) => return Err(err),
            }
            // ingest doesn't report consumed length for stream mode; a
            // conforming sender only ever puts one packet per `push_stream`
            // call when framing is ambiguous, so stop after the first.
            return Ok(buf.len());
        }
    }

    fn ingest(&mut self, buf: &[u8]) -> Result<()> {
        if buf.len() >= 2 && &buf[0..2] == af::AF_MAGIC {
            let (packet, _consumed) = af::decode(buf)?;
            debug!(seq = packet.seq, len = packet.data.len(), "decoded AF packet");
            return self.sti.push_af_body(&packet.data);
        }
        let frag = PftFragment::decode(buf)?;
        if let Some(af_bytes) = self.reassembler.push(frag) {
            let (packet, _) = af::decode(&af_bytes)?;
            self.sti.push_af_body(&packet.data)?;
        }
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<crate::stid::StiFrame> {
        self.sti.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::af::AfPacket;
    use crate::tag::{encode_tags, Tag};

    fn sample_af_body() -> Vec<u8> {
        let tags = vec![Tag::new(b"*ptr", vec![0; 6]), Tag::new(b"dsti", vec![0, 0, 1])];
        encode_tags(&tags)
    }

    #[test]
    fn decodes_unfragmented_af_datagram() {
        let af = AfPacket::new_sti_d(1, sample_af_body()).encode();
        let mut decoder = EdiDecoder::new(8);
        decoder.push_datagram(&af).unwrap();
        assert!(decoder.pop_frame().is_some());
    }
}
