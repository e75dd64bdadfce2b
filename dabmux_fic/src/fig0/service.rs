//! FIG 0/2 (service organisation + component listing), FIG 0/8
//! (service-component global definition) and FIG 0/17 (programme type).

use dabmux_model::{Ensemble, Service, ServiceId};

use crate::generator::{fig0_header, fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

fn service_id_bytes(id: ServiceId, out: &mut Vec<u8>) {
    match id {
        ServiceId::Programme(v) => out.extend_from_slice(&v.to_be_bytes()),
        ServiceId::Data(v) => out.extend_from_slice(&v.to_be_bytes()),
    }
}

/// FIG 0/2: one entry per service, each carrying its component count and
/// the SCIdS of every component that belongs to it.
#[derive(Debug, Default)]
pub struct Fig0_2 {
    cursor: usize,
}

impl FigGenerator for Fig0_2 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 2)
    }

    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::A
    }

    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let n = ensemble.services.len();
        if n == 0 {
            return (0, true);
        }

        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let svc = &ensemble.services[(self.cursor + visited) % n];
            let components: Vec<&dabmux_model::Component> =
                ensemble.components.iter().filter(|c| c.service_uid == svc.uid).collect();
            let entry_len = svc_id_len(svc) + 1 + components.len();
            if body.len() + entry_len > buf.len().saturating_sub(2) {
                break;
            }
            let before = body.len();
            service_id_bytes(svc.service_id, &mut body);
            body.push((components.len() as u8) & 0x0F);
            for comp in &components {
                body.push(comp.scids & 0x0F);
            }
            debug_assert_eq!(body.len() - before, entry_len);
            visited += 1;
        }

        if visited == 0 {
            return (0, false);
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(2, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

fn svc_id_len(svc: &Service) -> usize {
    match svc.service_id {
        ServiceId::Programme(_) => 2,
        ServiceId::Data(_) => 4,
    }
}

/// FIG 0/8: binds a component to its service via SCIdS and, for packet
/// components, the packet address/id.
#[derive(Debug, Default)]
pub struct Fig0_8 {
    cursor: usize,
}

impl FigGenerator for Fig0_8 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 8)
    }

    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }

    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let n = ensemble.components.len();
        if n == 0 {
            return (0, true);
        }

        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let comp = &ensemble.components[(self.cursor + visited) % n];
            let Some(svc) = ensemble.services.iter().find(|s| s.uid == comp.service_uid) else {
                visited += 1;
                continue;
            };
            let mut entry = Vec::new();
            service_id_bytes(svc.service_id, &mut entry);
            entry.push(comp.scids & 0x0F);
            if let Some(pa) = comp.packet_addressing {
                entry.extend_from_slice(&pa.packet_id.to_be_bytes());
            }
            if body.len() + entry.len() > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&entry);
            visited += 1;
        }

        if visited == 0 {
            return (0, false);
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(8, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

/// FIG 0/17: programme type (8-bit code) plus the dynamic/static flag,
/// one entry per programme service.
#[derive(Debug, Default)]
pub struct Fig0_17 {
    cursor: usize,
}

impl FigGenerator for Fig0_17 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 17)
    }

    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }

    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let services: Vec<&Service> = ensemble.services.iter().filter(|s| s.programme_type.is_some()).collect();
        let n = services.len();
        if n == 0 {
            return (0, true);
        }

        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let svc = services[(self.cursor + visited) % n];
            let pty = svc.programme_type.unwrap();
            if body.len() + 4 > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&svc.service_id_as_u16().to_be_bytes());
            body.push((pty.dynamic as u8) << 7 | (pty.code & 0x1F));
            body.push(0);
            visited += 1;
        }

        if visited == 0 {
            return (0, false);
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(17, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

trait ServiceIdU16 {
    fn service_id_as_u16(&self) -> u16;
}

impl ServiceIdU16 for Service {
    fn service_id_as_u16(&self) -> u16 {
        match self.service_id {
            ServiceId::Programme(v) => v,
            ServiceId::Data(v) => v as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;
    use dabmux_model::{Label, ProgrammeType};

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) }
    }

    #[test]
    fn fig0_2_lists_component_count_per_service() {
        let mut ens = empty_ensemble();
        ens.services.push(Service {
            uid: "svc1".into(),
            service_id: ServiceId::Programme(0x4001),
            ecc: None,
            programme_type: None,
            language_code: None,
            announcement_support: 0,
            announcement_clusters: vec![],
            label: Label::new("Svc"),
        });
        let mut gen = Fig0_2::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ens, &ctx(), &mut buf);
        assert!(complete);
        assert!(n > 0);
    }

    #[test]
    fn fig0_17_skips_services_without_programme_type() {
        let mut ens = empty_ensemble();
        ens.services.push(Service {
            uid: "svc1".into(),
            service_id: ServiceId::Programme(0x4001),
            ecc: None,
            programme_type: Some(ProgrammeType { code: 5, dynamic: true }),
            language_code: None,
            announcement_support: 0,
            announcement_clusters: vec![],
            label: Label::new("Svc"),
        });
        let mut gen = Fig0_17::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ens, &ctx(), &mut buf);
        assert!(complete);
        assert_eq!(n, 6);
    }
}
