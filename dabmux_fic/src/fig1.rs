//! FIG type 1: 16-byte labels with an 8-character short-label mask.
//!
//! Extension 0 labels the ensemble, 1 labels programme services, 4 labels
//! service components, 5 labels data services (32-bit SId).

use dabmux_model::{Component, Ensemble, Service, ServiceId};

use crate::generator::{fig_header, FigGenerator, FrameContext};
use crate::rate::RepetitionRate;

/// FIG 1 data byte: `Charset:4 | OE:1 | Extension:3`.
fn fig1_header(extension: u8, oe: bool) -> u8 {
    (0 << 4) | ((oe as u8) << 3) | (extension & 0x07)
}

fn write_label_entry(id_bytes: &[u8], label: &dabmux_model::Label, body: &mut Vec<u8>) {
    body.extend_from_slice(id_bytes);
    body.extend_from_slice(label.long_bytes());
    body.resize(body.len() + (16 - label.long_bytes().len()), b' ');
    body.extend_from_slice(&label.short_mask.to_be_bytes());
}

#[derive(Debug, Default)]
pub struct Fig1_0;

impl FigGenerator for Fig1_0 {
    fn fig_type(&self) -> (u8, u8) {
        (1, 0)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::D
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let mut body = Vec::new();
        write_label_entry(&ensemble.eid.to_be_bytes(), &ensemble.label, &mut body);
        if body.len() + 2 > buf.len() {
            return (0, false);
        }
        buf[0] = fig_header(1, (body.len() + 1) as u8);
        buf[1] = fig1_header(0, false);
        buf[2..2 + body.len()].copy_from_slice(&body);
        (2 + body.len(), true)
    }
}

#[derive(Debug, Default)]
pub struct Fig1_1 {
    cursor: usize,
}

impl FigGenerator for Fig1_1 {
    fn fig_type(&self) -> (u8, u8) {
        (1, 1)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::D
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let services: Vec<&Service> = ensemble.services.iter().filter(|s| s.is_programme()).collect();
        single_entry_per_call(&services, &mut self.cursor, buf, 1, |svc| {
            let ServiceId::Programme(id) = svc.service_id else { unreachable!() };
            (id.to_be_bytes().to_vec(), &svc.label)
        })
    }
}

#[derive(Debug, Default)]
pub struct Fig1_4 {
    cursor: usize,
}

impl FigGenerator for Fig1_4 {
    fn fig_type(&self) -> (u8, u8) {
        (1, 4)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::D
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let components: Vec<&Component> = ensemble.components.iter().filter(|c| c.label.is_some()).collect();
        single_entry_per_call(&components, &mut self.cursor, buf, 4, |comp| {
            (vec![comp.scids], comp.label.as_ref().unwrap())
        })
    }
}

#[derive(Debug, Default)]
pub struct Fig1_5 {
    cursor: usize,
}

impl FigGenerator for Fig1_5 {
    fn fig_type(&self) -> (u8, u8) {
        (1, 5)
    }
    fn repetition_rate(&self) -> RepetitionRate {
        RepetitionRate::D
    }
    fn fill(&mut self, ensemble: &Ensemble, _ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        let services: Vec<&Service> = ensemble.services.iter().filter(|s| !s.is_programme()).collect();
        single_entry_per_call(&services, &mut self.cursor, buf, 5, |svc| {
            let ServiceId::Data(id) = svc.service_id else { unreachable!() };
            (id.to_be_bytes().to_vec(), &svc.label)
        })
    }
}

/// Shared "one labelled entity per invocation" pattern used by 1/1, 1/4
/// and 1/5: advance a cursor through `items`, emitting exactly one label
/// per call (FIG 1 instances are small enough that batching rarely pays
/// off, and keeping one-per-call simplifies resuming after a miss).
fn single_entry_per_call<T>(
    items: &[T],
    cursor: &mut usize,
    buf: &mut [u8],
    extension: u8,
    id_and_label: impl Fn(&T) -> (Vec<u8>, &dabmux_model::Label),
) -> (usize, bool) {
    let n = items.len();
    if n == 0 {
        return (0, true);
    }
    let (id_bytes, label) = id_and_label(&items[*cursor % n]);
    let mut body = Vec::new();
    write_label_entry(&id_bytes, label, &mut body);
    if body.len() + 2 > buf.len() {
        return (0, false);
    }
    buf[0] = fig_header(1, (body.len() + 1) as u8);
    buf[1] = fig1_header(extension, false);
    buf[2..2 + body.len()].copy_from_slice(&body);
    *cursor = (*cursor + 1) % n;
    (2 + body.len(), *cursor == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fig0::test_support::empty_ensemble;
    use dabmux_core::time::MjdTime;

    fn ctx() -> FrameContext {
        FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) }
    }

    #[test]
    fn fig1_0_emits_ensemble_label() {
        let ensemble = empty_ensemble();
        let mut gen = Fig1_0;
        let mut buf = [0u8; 32];
        let (n, complete) = gen.fill(&ensemble, &ctx(), &mut buf);
        assert!(complete);
        assert_eq!(n, 2 + 2 + 16 + 2);
    }
}
