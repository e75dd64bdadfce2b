//! The per-table FIG generator contract.

use dabmux_core::time::MjdTime;
use dabmux_model::Ensemble;

use crate::rate::RepetitionRate;

/// Main-loop-owned per-frame state a generator may need, beyond the
/// (read-mostly) ensemble model itself.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// CIF count since multiplex start.
    pub frame_counter: u64,
    /// Current wall-clock date/time, for FIG 0/10.
    pub mjd: MjdTime,
}

/// A single FIG table generator. Implementations are stateful across
/// calls: a multi-instance table (e.g. one FIG 0/1 per sub-channel) tracks
/// its own iteration position so a table can be split across several
/// frames without re-walking already-emitted entries.
pub trait FigGenerator {
    /// `(figtype, figextension)`, used only for logging/diagnostics.
    fn fig_type(&self) -> (u8, u8);
    fn repetition_rate(&self) -> RepetitionRate;
    /// Write at most one FIG instance into `buf` (already sized to the
    /// caller's remaining budget), including the leading FIG header byte.
    /// Returns `(bytes_written, fig_complete)`; `fig_complete = false`
    /// means the table's full content did not fit and the next call
    /// should continue from where this one left off.
    fn fill(&mut self, ensemble: &Ensemble, ctx: &FrameContext, buf: &mut [u8]) -> (usize, bool);
}

/// FIG outer header byte: `figtype:3 | length_minus_1:5`. `length` is the
/// number of bytes following this header byte.
pub fn fig_header(figtype: u8, length: u8) -> u8 {
    ((figtype & 0x07) << 5) | (length.saturating_sub(1) & 0x1F)
}

/// FIG-type-0 first data byte: `C/N:1 | OE:1 | P/D:1 | Extension:5`.
pub fn fig0_header(extension: u8, cn: bool, oe: bool, pd: bool) -> u8 {
    ((cn as u8) << 7) | ((oe as u8) << 6) | ((pd as u8) << 5) | (extension & 0x1F)
}
