//! FIG 0/5 (service language), 0/9 (country/LTO/international table +
//! per-service ECC), 0/10 (date and time), 0/13 (user-application
//! information) and 0/14 (FEC scheme for enhanced packet mode).

use dabmux_model::{Ensemble, ServiceId};

use crate::generator::{fig0_header, fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

/// FIG 0/5: one (SId, language code) entry per service with a language set.
#[derive(Debug, Default)]
pub struct Fig0_5 {
    cursor: usize,
}

impl FigGenerator for Fig0_5 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 5)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let services: Vec<_> = ensemble.services.iter().filter(|s| s.language_code.is_some()).collect();
        let n = services.len();
        if n == 0 {
            return (0, true);
        }
        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let svc = services[(self.cursor + visited) % n];
            if body.len() + 3 > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&as_u16(svc.service_id).to_be_bytes());
            body.push(svc.language_code.unwrap());
            visited += 1;
        }
        if visited == 0 {
            return (0, false);
        }
        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(5, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

/// FIG 0/9: ensemble country/LTO/international table id, plus one
/// per-service ECC override entry.
#[derive(Debug, Default)]
pub struct Fig0_9 {
    cursor: usize,
}

impl FigGenerator for Fig0_9 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 9)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let lto_raw = match ensemble.local_time_offset {
            dabmux_model::LocalTimeOffset::HalfHours(h) => (h as i8 as u8) & 0x3F,
            dabmux_model::LocalTimeOffset::Auto => 0x40,
        };
        let overrides: Vec<_> = ensemble.services.iter().filter(|s| s.ecc.is_some()).collect();
        let n = overrides.len();

        let mut body = vec![lto_raw, ensemble.international_table_id, ensemble.ecc];
        let mut visited = 0;
        while visited < n {
            let svc = overrides[(self.cursor + visited) % n];
            if body.len() + 3 > buf.len().saturating_sub(2) {
                break;
            }
            body.extend_from_slice(&as_u16(svc.service_id).to_be_bytes());
            body.push(svc.ecc.unwrap());
            visited += 1;
        }

        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(9, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = n == 0 || visited == n;
        self.cursor = if n == 0 { 0 } else { (self.cursor + visited) % n };
        (written, complete)
    }
}

/// FIG 0/10: Modified Julian Day plus hours/minutes/seconds/milliseconds.
#[derive(Debug, Default)]
pub struct Fig0_10;

impl FigGenerator for Fig0_10 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 10)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }
    fn fill(&mut self, _ensemble: &Ensemble, ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        if buf.len() < 7 {
            return (0, false);
        }
        let mjd = ctx.mjd;
        buf[0] = fig_header(0, 6);
        buf[1] = fig0_header(10, false, false, false);
        buf[2] = ((mjd.utc_flag as u8) << 7) | ((mjd.mjd >> 10) as u8 & 0x7F);
        buf[3] = (mjd.mjd >> 2) as u8 & 0xFF;
        buf[4] = ((mjd.mjd & 0x03) as u8) << 6 | (mjd.hours & 0x1F) << 1 | (mjd.minutes >> 5) & 0x01;
        buf[5] = (mjd.minutes & 0x1F) << 3 | (mjd.seconds / 10) & 0x07;
        buf[6] = ((mjd.seconds % 10) << 4) | ((mjd.milliseconds / 100) as u8 & 0x0F);
        (7, true)
    }
}

/// FIG 0/13: user-application information (Slideshow, SPI, …) per
/// component that declares one.
#[derive(Debug, Default)]
pub struct Fig0_13 {
    cursor: usize,
}

impl FigGenerator for Fig0_13 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 13)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let entries: Vec<(&dabmux_model::Component, &dabmux_model::UserApplication)> = ensemble
            .components
            .iter()
            .flat_map(|c| c.user_applications.iter().map(move |ua| (c, ua)))
            .collect();
        let n = entries.len();
        if n == 0 {
            return (0, true);
        }
        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let (comp, ua) = entries[(self.cursor + visited) % n];
            if body.len() + 4 > buf.len().saturating_sub(2) {
                break;
            }
            body.push(comp.scids & 0x0F);
            body.extend_from_slice(&ua.app_type.to_be_bytes());
            body.push(ua.xpad_app_type.unwrap_or(0));
            visited += 1;
        }
        if visited == 0 {
            return (0, false);
        }
        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(13, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

/// FIG 0/14: FEC scheme in use for enhanced packet-mode sub-channels
/// (those above 8 kbit/s protected at EEP). Emits one entry per such
/// sub-channel.
#[derive(Debug, Default)]
pub struct Fig0_14 {
    cursor: usize,
}

impl FigGenerator for Fig0_14 {
    fn fig_type(&self) -> (u8, u8) {
        (0, 14)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::B
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let subchannels: Vec<_> =
            ensemble.subchannels.iter().filter(|s| s.subchannel_type.is_packet()).collect();
        let n = subchannels.len();
        if n == 0 {
            return (0, true);
        }
        let mut body = Vec::new();
        let mut visited = 0;
        while visited < n {
            let sc = subchannels[(self.cursor + visited) % n];
            if body.len() + 2 > buf.len().saturating_sub(2) {
                break;
            }
            body.push(sc.id & 0x3F);
            body.push(0x01); // FEC scheme: Reed-Solomon, the only scheme this engine emits.
            visited += 1;
        }
        if visited == 0 {
            return (0, false);
        }
        buf[0] = fig_header(0, (body.len() + 1) as u8);
        buf[1] = fig0_header(14, false, false, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        let written = 2 + body.len();
        let complete = visited == n;
        self.cursor = (self.cursor + visited) % n;
        (written, complete)
    }
}

fn as_u16(id: ServiceId) -> u16 {
    match id {
        ServiceId::Programme(v) => v,
        ServiceId::Data(v) => v as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(1_700_000_000, 250) }
    }

    #[test]
    fn fig0_9_always_emits_ensemble_fields() {
        let ensemble = empty_ensemble();
        let mut gen = Fig0_9::default();
        let mut buf = [0u8; 30];
        let (n, complete) = gen.fill(&ensemble, &ctx(), &mut buf);
        assert!(complete);
        assert_eq!(n, 5);
    }

    #[test]
    fn fig0_10_encodes_mjd() {
        let ensemble = empty_ensemble();
        let mut gen = Fig0_10;
        let mut buf = [0u8; 16];
        let (n, complete) = gen.fill(&ensemble, &ctx(), &mut buf);
        assert!(complete);
        assert_eq!(n, 7);
    }
}
