//! PRBS test generator: bytes from a Galois LFSR, polynomial taken from a
//! `prbs://:0xPOLY` URI.

use dabmux_core::stack_vec::StackVec;
use tracing::debug;

use crate::error::{InputError, Result};
use crate::input::Input;

/// Parse a `prbs://:0xPOLY` (or bare decimal) URI into a 32-bit polynomial.
fn parse_polynomial(uid: &str, uri: &str) -> Result<u32> {
    let rest = uri.strip_prefix("prbs://:").ok_or_else(|| InputError::InvalidPrbsUri(uid.into(), uri.into()))?;
    let parsed = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        rest.parse::<u32>()
    };
    parsed.map_err(|_| InputError::InvalidPrbsUri(uid.into(), uri.into()))
}

/// Byte-oriented Galois LFSR. Self-synchronising: the generator always
/// starts from the same known state after `open`, so a rewind (loss of
/// downstream sync) recovers without any external handshake.
#[derive(Debug, Clone, Copy)]
struct GaloisLfsr {
    polynomial: u32,
    state: u32,
}

impl GaloisLfsr {
    const SEED: u32 = 0xACE1;

    fn new(polynomial: u32) -> Self {
        Self { polynomial, state: Self::SEED }
    }

    fn next_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            let lsb = self.state & 1;
            self.state >>= 1;
            if lsb != 0 {
                self.state ^= self.polynomial;
            }
            byte = (byte << 1) | lsb as u8;
        }
        byte
    }
}

pub struct PrbsInput {
    uid: String,
    lfsr: Option<GaloisLfsr>,
    bitrate_kbps: u16,
}

impl PrbsInput {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into(), lfsr: None, bitrate_kbps: 0 }
    }

    pub fn bitrate_kbps(&self) -> u16 {
        self.bitrate_kbps
    }
}

impl Input for PrbsInput {
    fn open(&mut self, uri: &str) -> Result<()> {
        let polynomial = parse_polynomial(&self.uid, uri)?;
        debug!(uid = %self.uid, polynomial, "opened prbs generator");
        self.lfsr = Some(GaloisLfsr::new(polynomial));
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8], len: usize) -> Result<usize> {
        let Some(lfsr) = self.lfsr.as_mut() else {
            return Ok(0);
        };
        for slot in buf.iter_mut().take(len) {
            *slot = lfsr.next_byte();
        }
        Ok(len)
    }

    fn set_bitrate(&mut self, kbps: u16) -> Result<u16> {
        if kbps % 8 != 0 {
            return Err(InputError::BitrateNotMultipleOf8(self.uid.clone(), kbps));
        }
        self.bitrate_kbps = kbps;
        Ok(kbps)
    }

    fn close(&mut self) {
        self.lfsr = None;
    }
}

/// Drains up to `N` frames worth of PRBS bytes into a stack buffer, for
/// callers that want a burst without per-frame round trips (diagnostics,
/// not the steady-state hot path).
pub fn burst<const N: usize>(lfsr_polynomial: u32, frame_bytes: usize) -> StackVec<u8, N> {
    let mut lfsr = GaloisLfsr::new(lfsr_polynomial);
    let mut out = StackVec::new();
    for _ in 0..frame_bytes.min(N) {
        let _ = out.push(lfsr.next_byte());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_polynomial() {
        assert_eq!(parse_polynomial("in", "prbs://:0xB8").unwrap(), 0xB8);
    }

    #[test]
    fn rejects_malformed_uri() {
        assert!(parse_polynomial("in", "file:///dev/null").is_err());
    }

    #[test]
    fn is_deterministic_after_reopen() {
        let mut input = PrbsInput::new("prbs1");
        input.open("prbs://:0xB8").unwrap();
        let mut first = [0u8; 16];
        input.read_frame(&mut first, 16).unwrap();

        input.open("prbs://:0xB8").unwrap();
        let mut second = [0u8; 16];
        input.read_frame(&mut second, 16).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_bitrate_not_multiple_of_8() {
        let mut input = PrbsInput::new("prbs1");
        assert!(input.set_bitrate(65).is_err());
        assert!(input.set_bitrate(64).is_ok());
    }
}
