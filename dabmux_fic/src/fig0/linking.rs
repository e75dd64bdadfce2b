//! FIG 0/6 (service linking), 0/21 (frequency information) and 0/24
//! (other-ensemble services).

use dabmux_model::{Ensemble, FrequencyInfo, LinkType};

use crate::generator::{fig0_header, fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

/// FIG 0/6: one instance per (linkage set, link type) pair, since a single
/// instance can only carry links of one type.
#[derive(Debug, Default)]
pub struct Fig0_6 {
    cursor: usize,
}

impl FigGenerator for Fig0_6 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 6)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::C
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let subsets: Vec<_> = ensemble.linkage_sets.iter().flat_map(|s| s.split_by_type()).collect();
        let n = subsets.len();
        if n == 0 {
            return (0, true);
        }

        let subset = &subsets[self.cursor % n];
        let mut body = Vec::new();
        let lsn_hi = ((subset.set.active as u16) << 15)
            | ((subset.set.hard as u16) << 14)
            | ((subset.set.international as u16) << 13)
            | (subset.set.lsn & 0x0FFF);
        body.extend_from_slice(&lsn_hi.to_be_bytes());

        let type_bits: u8 = match subset.link_type {
            LinkType::Dab => 0,
            LinkType::Fm => 1,
            LinkType::Drm => 2,
            LinkType::Amss => 3,
        };
        for link in &subset.links {
            let ecc_present = link.ecc.is_some();
            body.push((ecc_present as u8) << 7 | type_bits << 5);
            if let Some(ecc) = link.ecc {
                body.push(ecc);
            }
            match subset.link_type {
                LinkType::Dab | LinkType::Fm => body.extend_from_slice(&(link.id as u16).to_be_bytes()),
                LinkType::Drm | LinkType::Amss => body.extend_from_slice(&link.id.to_be_bytes()),
            }
        }

        if body.len() + 2 > buf.len() {
            return (0, false);
        }
        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(6, false, false, subset.set.international);
        buf[2..2 + body.len()].copy_from_slice(&body);
        self.cursor = (self.cursor + 1) % n;
        (2 + body.len(), self.cursor == 0)
    }
}

/// FIG 0/21: one instance per frequency-information entry, grouped by the
/// range type (DAB/FM/DRM-AMSS) encoded within each [`FrequencyInfo`] variant.
#[derive(Debug, Default)]
pub struct Fig0_21 {
    cursor: usize,
}

impl FigGenerator for Fig0_21 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 21)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::C
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let n = ensemble.frequency_info.len();
        if n == 0 {
            return (0, true);
        }

        let entry = &ensemble.frequency_info[self.cursor % n];
        let mut body = Vec::new();
        match entry {
            FrequencyInfo::Dab { foreign_eid, frequencies, other_ensemble, continuity } => {
                body.extend_from_slice(&foreign_eid.to_be_bytes());
                body.push((*other_ensemble as u8) << 7 | (*continuity as u8) << 6 | 0 << 4 | frequencies.len() as u8 & 0x0F);
                for f in frequencies {
                    body.extend_from_slice(&f.frequency_16khz.to_be_bytes());
                    body.push((f.adjacent as u8) << 7 | (f.mode_i as u8) << 6);
                }
            }
            FrequencyInfo::Fm { pi_code, frequencies, other_ensemble, continuity } => {
                body.extend_from_slice(&pi_code.to_be_bytes());
                body.push((*other_ensemble as u8) << 7 | (*continuity as u8) << 6 | 1 << 4 | frequencies.len() as u8 & 0x0F);
                for f in frequencies {
                    body.extend_from_slice(&f.offset_100khz.to_be_bytes());
                }
            }
            FrequencyInfo::DrmOrAmss { service_id, frequencies, other_ensemble, continuity } => {
                body.extend_from_slice(&service_id.to_be_bytes());
                body.push((*other_ensemble as u8) << 7 | (*continuity as u8) << 6 | 2 << 4 | frequencies.len() as u8 & 0x0F);
                for f in frequencies {
                    body.extend_from_slice(&(*f as u16).to_be_bytes());
                }
            }
        }

        if body.len() + 2 > buf.len() {
            return (0, false);
        }
        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(21, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        self.cursor = (self.cursor + 1) % n;
        (2 + body.len(), self.cursor == 0)
    }
}

/// FIG 0/24: one entry per service that is also carried by other ensembles.
#[derive(Debug, Default)]
pub struct Fig0_24 {
    cursor: usize,
}

impl FigGenerator for Fig0_24 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 24)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::C
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let n = ensemble.other_ensemble_services.len();
        if n == 0 {
            return (0, true);
        }

        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let entry = &ensemble.other_ensemble_services[(self.cursor + visited) % n];
            let entry_len = 4 + 1 + entry.other_eids.len() * 2;
            if body.len() + entry_len > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&entry.service_id.to_be_bytes());
            body.push(entry.other_eids.len() as u8 & 0x3F);
            for eid in &entry.other_eids {
                body.extend_from_slice(&eid.to_be_bytes());
            }
            visited += 1;
        }
        if visited == 0 {
            return (0, false);
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(24, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;
    use dabmux_model::linkage::{LinkEntry, LinkageSet};
    use dabmux_model::DabFrequency;

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) }
    }

    #[test]
    fn fig0_6_emits_one_subset_per_call() {
        let mut ens = empty_ensemble();
        ens.linkage_sets.push(LinkageSet {
            lsn: 42,
            active: true,
            hard: false,
            international: false,
            key_service_uid: "svc1".into(),
            links: vec![
                LinkEntry { link_type: LinkType::Dab, id: 0x1001, ecc: None },
                LinkEntry { link_type: LinkType::Fm, id: 0xE201, ecc: Some(0xE2) },
            ],
        });
        let mut gen = Fig0_6::default();
        let mut buf = [0u8; 30];
        let (n1, complete1) = gen.fill(&ens, &ctx(), &mut buf);
        assert!(n1 > 0);
        assert!(!complete1);
        let (n2, complete2) = gen.fill(&ens, &ctx(), &mut buf);
        assert!(n2 > 0);
        assert!(complete2);
    }

    #[test]
    fn fig0_21_encodes_dab_frequencies() {
        let mut ens = empty_ensemble();
        ens.frequency_info.push(FrequencyInfo::Dab {
            foreign_eid: 0x4002,
            frequencies: vec![DabFrequency { frequency_16khz: 1, adjacent: true, mode_i: true }],
            other_ensemble: true,
            continuity: false,
        });
        let mut gen = Fig0_21::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ens, &ctx(), &mut buf);
        assert!(complete);
        assert_eq!(n, 2 + 2 + 1 + 3);
    }

    #[test]
    fn fig0_24_empty_completes_immediately() {
        let ens = empty_ensemble();
        let mut gen = Fig0_24::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ens, &ctx(), &mut buf);
        assert_eq!(n, 0);
        assert!(complete);
    }
}
