//! The main loop: assembles one frame every 24 ms, writes it to every ETI
//! output, fans the EDI TAG packet out, and maintains the liveness/config
//! push cadence.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dabmux_core::time::{EnsembleClock, MjdTime, FRAME_PERIOD_MS};
use dabmux_edi::{EdiEmitter, EdiFrameInput};
use dabmux_eti::msc::{assemble_msc, FrameSource};
use dabmux_eti::build_frame;
use dabmux_fic::{Carousel, FrameContext};
use dabmux_model::Ensemble;
use dabmux_stats::{ControlRegistry, RcSupervisor};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::inputs::InputChannel;

/// Verify remote-control liveness and push a config snapshot at these
/// cadences (in frames), per the main-loop contract.
const LIVENESS_CHECK_FRAMES: u64 = 250;
const CONFIG_PUSH_FRAMES: u64 = 10;

pub struct Multiplexer {
    pub ensemble: Ensemble,
    pub carousel: Carousel,
    pub clock: EnsembleClock,
    pub channels: Vec<InputChannel>,
    pub outputs: Vec<Box<dyn Write + Send>>,
    pub edi: Option<EdiEmitter>,
    pub controls: ControlRegistry,
    pub rc: Option<RcSupervisor>,
    pub frame_limit: Option<u64>,
}

impl Multiplexer {
    /// Assembles and emits exactly one 24 ms frame.
    fn tick(&mut self) -> Result<()> {
        let (tist, edi_seconds) = self.clock.current();
        let mjd = MjdTime::from_unix(edi_seconds as u64, 0);
        let ctx = FrameContext { frame_counter: self.clock.frame_counter(), mjd };

        let fibs = self.carousel.assemble_fic(&self.ensemble, &ctx, FRAME_PERIOD_MS);
        let fic: Vec<u8> = fibs.into_iter().flatten().collect();

        let utco = 0i32;
        for channel in &mut self.channels {
            channel.advance_time(edi_seconds, utco, tist.unwrap_or(0));
        }

        let mut sources: Vec<&mut dyn FrameSource> =
            self.channels.iter_mut().map(|c| c as &mut dyn FrameSource).collect();
        let msc = assemble_msc(&self.ensemble.subchannels, &mut sources);
        if msc.underruns > 0 {
            debug!(underruns = msc.underruns, "msc assembly had zero-filled slots this frame");
        }

        let frame = build_frame(self.clock.frame_counter(), &self.ensemble.subchannels, &fic, &msc.mst, &mjd, tist)?;
        for output in &mut self.outputs {
            if let Err(err) = output.write_all(&frame) {
                warn!(%err, "eti output write failed");
            }
        }

        if let Some(emitter) = &mut self.edi {
            let mut offset = 0;
            let mut slices = Vec::with_capacity(self.ensemble.subchannels.len());
            for sc in &self.ensemble.subchannels {
                let len = sc.frame_size_bytes();
                slices.push(&msc.mst[offset..offset + len]);
                offset += len;
            }
            let input = EdiFrameInput {
                fct: self.clock.fct(),
                mnsc: 0,
                atstf: tist.is_some(),
                utco: utco as u8,
                edi_seconds,
                tsta: tist.unwrap_or(0),
                subchannels: &slices,
            };
            emitter.emit_frame(&input)?;
        }

        self.clock.advance_24ms();
        let frames = self.controls.increment_frames();

        if frames % LIVENESS_CHECK_FRAMES == 0 {
            if let Some(rc) = &mut self.rc {
                rc.check_and_restart();
            }
            debug!(frames, "remote-control liveness checked");
        }
        if frames % CONFIG_PUSH_FRAMES == 0 {
            let offset = self.controls.multiplexer().tist_offset_seconds;
            if self.clock.tist_offset() != offset {
                if let Err(err) = self.clock.set_tist_offset(offset) {
                    warn!(%err, offset, "remote-control pushed an out-of-range tist offset, ignoring");
                } else {
                    info!(offset, "applied remote-control tist offset");
                }
            }
        }

        Ok(())
    }

    /// Runs the loop until `shutdown` is set or the frame limit is hit.
    pub fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let period = Duration::from_millis(FRAME_PERIOD_MS as u64);
        let mut next_tick = Instant::now();
        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("shutdown signal received, stopping");
                return Ok(());
            }
            self.tick()?;
            if let Some(limit) = self.frame_limit {
                if self.controls.frames() >= limit {
                    info!(limit, "frame limit reached, stopping");
                    return Ok(());
                }
            }

            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                std::thread::sleep(next_tick - now);
            } else {
                next_tick = now;
            }
        }
    }
}
