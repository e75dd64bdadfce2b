//! The FIC carousel: schedules every FIG generator against its repetition
//! rate and packs the due ones into the frame's FIBs, FIG-type-ordered.

use dabmux_model::Ensemble;

use crate::fib::{finish_fib, FIB_DATA_SIZE, FIB_SIZE};
use crate::fig0::{
    Fig0_0, Fig0_1, Fig0_10, Fig0_13, Fig0_14, Fig0_17, Fig0_18, Fig0_19, Fig0_2, Fig0_21, Fig0_24,
    Fig0_3, Fig0_5, Fig0_6, Fig0_7, Fig0_8, Fig0_9,
};
use crate::fig1::{Fig1_0, Fig1_1, Fig1_4, Fig1_5};
use crate::fig2::Fig2_0;
use crate::generator::{FigGenerator, FrameContext};

/// Tags every concrete FIG generator this engine knows how to produce.
/// Dispatch is a single `match` rather than `Box<dyn FigGenerator>` so the
/// carousel owns each generator's state inline, with no heap allocation
/// per table.
enum AnyFig {
    Fig0_0(Fig0_0),
    Fig0_1(Fig0_1),
    Fig0_2(Fig0_2),
    Fig0_3(Fig0_3),
    Fig0_5(Fig0_5),
    Fig0_6(Fig0_6),
    Fig0_7(Fig0_7),
    Fig0_8(Fig0_8),
    Fig0_9(Fig0_9),
    Fig0_10(Fig0_10),
    Fig0_13(Fig0_13),
    Fig0_14(Fig0_14),
    Fig0_17(Fig0_17),
    Fig0_18(Fig0_18),
    Fig0_19(Fig0_19),
    Fig0_21(Fig0_21),
    Fig0_24(Fig0_24),
    Fig1_0(Fig1_0),
    Fig1_1(Fig1_1),
    Fig1_4(Fig1_4),
    Fig1_5(Fig1_5),
    Fig2_0(Fig2_0),
}

macro_rules! dispatch {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            AnyFig::Fig0_0(g) => g.$method($($arg),*),
            AnyFig::Fig0_1(g) => g.$method($($arg),*),
            AnyFig::Fig0_2(g) => g.$method($($arg),*),
            AnyFig::Fig0_3(g) => g.$method($($arg),*),
            AnyFig::Fig0_5(g) => g.$method($($arg),*),
            AnyFig::Fig0_6(g) => g.$method($($arg),*),
            AnyFig::Fig0_7(g) => g.$method($($arg),*),
            AnyFig::Fig0_8(g) => g.$method($($arg),*),
            AnyFig::Fig0_9(g) => g.$method($($arg),*),
            AnyFig::Fig0_10(g) => g.$method($($arg),*),
            AnyFig::Fig0_13(g) => g.$method($($arg),*),
            AnyFig::Fig0_14(g) => g.$method($($arg),*),
            AnyFig::Fig0_17(g) => g.$method($($arg),*),
            AnyFig::Fig0_18(g) => g.$method($($arg),*),
            AnyFig::Fig0_19(g) => g.$method($($arg),*),
            AnyFig::Fig0_21(g) => g.$method($($arg),*),
            AnyFig::Fig0_24(g) => g.$method($($arg),*),
            AnyFig::Fig1_0(g) => g.$method($($arg),*),
            AnyFig::Fig1_1(g) => g.$method($($arg),*),
            AnyFig::Fig1_4(g) => g.$method($($arg),*),
            AnyFig::Fig1_5(g) => g.$method($($arg),*),
            AnyFig::Fig2_0(g) => g.$method($($arg),*),
        }
    };
}

impl FigGenerator for AnyFig {
    fn fig_type(&self) -> (u8, u8) {
        dispatch!(self, fig_type)
    }
    fn repetition_rate(&self) -> RepetitionRateAlias {
        dispatch!(self, repetition_rate)
    }
    fn fill(&mut self, ensemble: &Ensemble, ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool) {
        dispatch!(self, fill, ensemble, ctx, buf)
    }
}

use crate::rate::RepetitionRate as RepetitionRateAlias;

struct Scheduled {
    fig: AnyFig,
    remaining_ms: i64,
}

/// Owns every FIG generator and packs each frame's due ones into the FIC's
/// FIBs. FIG 0/0 is special-cased: it is attempted in the first FIB of
/// every frame where [`TransmissionMode::fig0_0_period_frames`] says it
/// must reappear, ahead of anything else.
///
/// [`TransmissionMode::fig0_0_period_frames`]: dabmux_model::TransmissionMode::fig0_0_period_frames
pub struct Carousel {
    generators: Vec<Scheduled>,
}

impl Default for Carousel {
    fn default() -> Self {
        Self::new()
    }
}

impl Carousel {
    pub fn new() -> Self {
        let figs: Vec<AnyFig> = vec![
            AnyFig::Fig0_0(Fig0_0),
            AnyFig::Fig0_1(Fig0_1::default()),
            AnyFig::Fig0_2(Fig0_2::default()),
            AnyFig::Fig0_3(Fig0_3::default()),
            AnyFig::Fig0_5(Fig0_5::default()),
            AnyFig::Fig0_6(Fig0_6::default()),
            AnyFig::Fig0_7(Fig0_7),
            AnyFig::Fig0_8(Fig0_8::default()),
            AnyFig::Fig0_9(Fig0_9::default()),
            AnyFig::Fig0_10(Fig0_10),
            AnyFig::Fig0_13(Fig0_13::default()),
            AnyFig::Fig0_14(Fig0_14::default()),
            AnyFig::Fig0_17(Fig0_17::default()),
            AnyFig::Fig0_18(Fig0_18::default()),
            AnyFig::Fig0_19(Fig0_19::default()),
            AnyFig::Fig0_21(Fig0_21::default()),
            AnyFig::Fig0_24(Fig0_24::default()),
            AnyFig::Fig1_0(Fig1_0),
            AnyFig::Fig1_1(Fig1_1::default()),
            AnyFig::Fig1_4(Fig1_4::default()),
            AnyFig::Fig1_5(Fig1_5::default()),
            AnyFig::Fig2_0(Fig2_0),
        ];
        Carousel { generators: figs.into_iter().map(|fig| Scheduled { fig, remaining_ms: 0 }).collect() }
    }

    /// Produce this frame's FIBs. `frame_duration_ms` is always 24 in
    /// production; parameterised so tests can fast-forward the schedule.
    pub fn assemble_fic(
        &mut self,
        ensemble: &Ensemble,
        ctx: &FrameContext,
        frame_duration_ms: u32,
    ) -> Vec<[u8; FIB_SIZE]> {
        for g in &mut self.generators {
            g.remaining_ms -= frame_duration_ms as i64;
        }

        let fib_count = ensemble.transmission_mode.fib_count() as usize;
        let mut fibs: Vec<Vec<u8>> = vec![Vec::new(); fib_count.max(1)];

        let fig0_0_due = ctx.frame_counter % ensemble.transmission_mode.fig0_0_period_frames() as u64 == 0;
        if fig0_0_due {
            if let Some(slot) = self.generators.iter_mut().find(|g| g.fig.fig_type() == (0, 0)) {
                Self::drain_into(slot, ensemble, ctx, &mut fibs[0..1]);
            }
        }

        for slot in &mut self.generators {
            if slot.fig.fig_type() == (0, 0) || slot.remaining_ms > 0 {
                continue;
            }
            Self::drain_into(slot, ensemble, ctx, &mut fibs);
        }

        fibs.into_iter()
            .map(|mut data| {
                data.resize(FIB_DATA_SIZE, 0xFF);
                finish_fib(data)
            })
            .collect()
    }

    /// Keep handing a generator fresh room in successive FIBs until it
    /// reports complete or every FIB has run out of space, then reset its
    /// deadline to its repetition-rate class.
    fn drain_into(slot: &mut Scheduled, ensemble: &Ensemble, ctx: &FrameContext, fibs: &mut [Vec<u8>]) {
        for fib in fibs.iter_mut() {
            loop {
                let room = FIB_DATA_SIZE - fib.len();
                if room < 2 {
                    break;
                }
                let mut tmp = vec![0u8; room];
                let (n, complete) = slot.fig.fill(ensemble, ctx, &mut tmp);
                if n == 0 {
                    break;
                }
                fib.extend_from_slice(&tmp[..n]);
                if complete {
                    slot.remaining_ms = slot.fig.repetition_rate().deadline_ms() as i64;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dabmux_core::time::MjdTime;
    use dabmux_model::{Label, LocalTimeOffset, ReconfigCounter, TransmissionMode};

    fn empty_ensemble() -> Ensemble {
        Ensemble {
            ecc: 0xE1,
            eid: 0x4001,
            international_table_id: 1,
            local_time_offset: LocalTimeOffset::HalfHours(0),
            transmission_mode: TransmissionMode::I,
            alarm: false,
            reconfig_counter: ReconfigCounter::Fixed(0),
            label: Label::new("Test"),
            subchannels: vec![],
            services: vec![],
            components: vec![],
            announcement_clusters: vec![],
            linkage_sets: vec![],
            frequency_info: vec![],
            other_ensemble_services: vec![],
        }
    }

    #[test]
    fn fib_count_matches_transmission_mode() {
        let ensemble = empty_ensemble();
        let mut carousel = Carousel::new();
        let ctx = FrameContext { frame_counter: 0, mjd: MjdTime::from_unix(0, 0) };
        let fibs = carousel.assemble_fic(&ensemble, &ctx, 24);
        assert_eq!(fibs.len(), ensemble.transmission_mode.fib_count() as usize);
        for fib in &fibs {
            assert_eq!(fib.len(), FIB_SIZE);
        }
    }

    #[test]
    fn fig0_0_lands_in_first_fib_every_frame_in_mode_i() {
        let ensemble = empty_ensemble();
        let mut carousel = Carousel::new();
        for frame in 0..3u64 {
            let ctx = FrameContext { frame_counter: frame, mjd: MjdTime::from_unix(0, 0) };
            let fibs = carousel.assemble_fic(&ensemble, &ctx, 24);
            // FIG 0/0's header byte always opens the first FIB.
            assert_eq!(fibs[0][0] >> 5, 0);
        }
    }
}
