//! Frequency information records (FIG 0/21): alternative frequencies the
//! receiver may tune when this ensemble's signal degrades.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DabFrequency {
    /// Frequency in 16 kHz units.
    pub frequency_16khz: u16,
    pub adjacent: bool,
    pub mode_i: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmFrequency {
    /// Offset in 100 kHz units from 87.5 MHz.
    pub offset_100khz: u16,
}

#[derive(Debug, Clone)]
pub enum FrequencyInfo {
    Dab {
        foreign_eid: u16,
        frequencies: Vec<DabFrequency>,
        other_ensemble: bool,
        continuity: bool,
    },
    Fm {
        pi_code: u16,
        frequencies: Vec<FmFrequency>,
        other_ensemble: bool,
        continuity: bool,
    },
    DrmOrAmss {
        service_id: u32,
        /// Frequencies in kHz.
        frequencies: Vec<u32>,
        other_ensemble: bool,
        continuity: bool,
    },
}

impl FrequencyInfo {
    pub fn other_ensemble(&self) -> bool {
        match self {
            FrequencyInfo::Dab { other_ensemble, .. }
            | FrequencyInfo::Fm { other_ensemble, .. }
            | FrequencyInfo::DrmOrAmss { other_ensemble, .. } => *other_ensemble,
        }
    }
}
