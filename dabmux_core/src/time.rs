//! TAI clock, MJD/TIST arithmetic, and the 24 ms frame cadence.
//!
//! This is the "level 1..5" time representation from ETS 300 799 Annex C:
//! a millisecond-resolution pulse-per-second counter, rounded to 24 ms
//! granularity, expressed in the ETI/EDI TIST field as a 24-bit count of
//! 1/16384 s units.

use crate::error::{Result, TimeError};

/// Length of one CIF / ETI frame in milliseconds.
pub const FRAME_PERIOD_MS: u32 = 24;

/// Number of frames per second-modulo window (`1000 / 24` rounded, DAB uses
/// a 250-frame wraparound of FCT which lines up with a 6 second period).
pub const FCT_WRAP: u32 = 250;

/// TIST units per millisecond (2^14 = 16384, per Annex C level 5).
const TIST_UNITS_PER_MS: u64 = 16384;

/// Mask for the 24-bit TIST field.
const TIST_MASK: u32 = 0x00FF_FFFF;

/// Tracks the multiplex's notion of time: a free-running millisecond
/// counter modulo 1000 (the "pulse-per-second" position), an EDI seconds
/// counter, and the frame (CIF) counter.
#[derive(Debug, Clone)]
pub struct EnsembleClock {
    /// Frame counter since multiplex start; wraps per-component (FCT mod 250,
    /// DLFC mod 5000) by its readers, not by this counter itself.
    frame_counter: u64,
    /// Milliseconds since the last PPS edge, 0..1000, in 24 ms steps.
    ms_in_second: u32,
    /// Seconds counter used as the EDI "seconds since 1970" field.
    edi_time_seconds: u32,
    /// Runtime-adjustable offset applied to the emitted TIST, in seconds.
    tist_offset_seconds: i32,
    /// Whether the TIST field should be emitted at all (if disabled, callers
    /// write the all-ones sentinel instead of calling `current()`).
    tist_enabled: bool,
}

impl EnsembleClock {
    /// Initialise the clock so that FCT=0 lands at the requested TIST offset.
    ///
    /// `tist_at_fct0_ms` is the millisecond-in-second position (0..1000,
    /// truncated to a 24 ms boundary) that FCT=0 of this run should report.
    /// Returns the initial frame counter value.
    pub fn init(tist_at_fct0_ms: u32, tist_offset_seconds: i32, edi_time_seconds: u32, tist_enabled: bool) -> (Self, u64) {
        let ms_in_second = (tist_at_fct0_ms / FRAME_PERIOD_MS) * FRAME_PERIOD_MS % 1000;

        // Choose the initial frame counter such that
        // (initial + offset_in_counts) mod 250 == 250 - counter_offset mod 250,
        // i.e. the configured TIST offset (converted to a frame count) lines
        // up FCT=0 with the requested millisecond position.
        let counts_per_second = 1000 / FRAME_PERIOD_MS;
        let offset_in_counts = (ms_in_second / FRAME_PERIOD_MS) as u64;
        let counter_offset = offset_in_counts % FCT_WRAP as u64;
        let initial_frame_counter = (FCT_WRAP as u64 + counts_per_second as u64 - counter_offset) % FCT_WRAP as u64;

        let clock = Self {
            frame_counter: initial_frame_counter,
            ms_in_second,
            edi_time_seconds,
            tist_offset_seconds,
            tist_enabled,
        };
        (clock, initial_frame_counter)
    }

    /// Current frame counter (CIF count since multiplex start).
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// FCT field value: `frame_counter % 250`.
    pub fn fct(&self) -> u8 {
        (self.frame_counter % FCT_WRAP as u64) as u8
    }

    /// DLFC field value: `frame_counter % 5000`.
    pub fn dlfc(&self) -> u16 {
        (self.frame_counter % 5000) as u16
    }

    /// FP (frame phase) field: `frame_counter % 8`.
    pub fn fp(&self) -> u8 {
        (self.frame_counter % 8) as u8
    }

    /// `(tist_24bit, edi_time_seconds)` for the current frame.
    ///
    /// Returns `None` for the TIST half if TIST output is disabled (the
    /// caller should then write the 0xFFFFFFFF sentinel).
    pub fn current(&self) -> (Option<u32>, u32) {
        if !self.tist_enabled {
            return (None, self.edi_time_seconds);
        }

        let offset_ms = (self.tist_offset_seconds as i64) * 1000;
        let ms = ((self.ms_in_second as i64) + offset_ms).rem_euclid(1000) as u64;
        let tist = ((ms * TIST_UNITS_PER_MS) & TIST_MASK as u64) as u32;
        (Some(tist), self.edi_time_seconds)
    }

    /// Advance by one 24 ms frame.
    pub fn advance_24ms(&mut self) {
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.ms_in_second += FRAME_PERIOD_MS;
        if self.ms_in_second >= 1000 {
            self.ms_in_second -= 1000;
            self.edi_time_seconds = self.edi_time_seconds.wrapping_add(1);
        }
    }

    /// Update the runtime-settable TIST offset (remote-control surface).
    pub fn set_tist_offset(&mut self, seconds: i32) -> Result<()> {
        if !(-500..=500).contains(&seconds) {
            return Err(TimeError::OffsetOutOfRange(seconds));
        }
        self.tist_offset_seconds = seconds;
        Ok(())
    }

    /// Current runtime-settable TIST offset, in seconds.
    pub fn tist_offset(&self) -> i32 {
        self.tist_offset_seconds
    }
}

/// Modified Julian Day + time-of-day, as carried by FIG 0/10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MjdTime {
    /// Modified Julian Day.
    pub mjd: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub milliseconds: u16,
    /// Whether the UTC flag (sub-second precision present) should be set.
    pub utc_flag: bool,
}

impl MjdTime {
    /// Compute MJD + time-of-day from a Unix timestamp (seconds) and a
    /// sub-second millisecond remainder.
    pub fn from_unix(unix_seconds: u64, milliseconds: u16) -> Self {
        const UNIX_EPOCH_MJD: u64 = 40587; // 1970-01-01 is MJD 40587
        let days = unix_seconds / 86400;
        let secs_of_day = unix_seconds % 86400;
        let mjd = UNIX_EPOCH_MJD + days;

        let hours = (secs_of_day / 3600) as u8;
        let minutes = ((secs_of_day % 3600) / 60) as u8;
        let seconds = (secs_of_day % 60) as u8;

        Self {
            mjd: mjd as u32,
            hours,
            minutes,
            seconds,
            milliseconds,
            utc_flag: milliseconds != 0 || seconds != 0,
        }
    }
}

/// A cache of the IETF TAI-UTC leap-second offset, refreshed from a bulletin.
///
/// If EDI or ZMQ metadata output is enabled the offset must be available
/// at startup, or the system refuses to start.
#[derive(Debug, Default, Clone)]
pub struct TaiCache {
    offset_seconds: Option<i64>,
}

impl TaiCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a minimal leap-second bulletin: lines of the form
    /// `<ntp-seconds>\t<tai-offset>` (as used by the IETF leap-seconds.list
    /// format, comments starting with `#` ignored). Keeps the offset with
    /// the latest effective date not in the future relative to `now_ntp`.
    pub fn refresh_from(&mut self, bulletin: &str, now_ntp: u64) {
        let mut best: Option<(u64, i64)> = None;
        for line in bulletin.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(when), Some(offset)) = (parts.next(), parts.next()) else {
                continue;
            };
            let (Ok(when), Ok(offset)) = (when.parse::<u64>(), offset.parse::<i64>()) else {
                continue;
            };
            if when <= now_ntp && best.map(|(w, _)| when >= w).unwrap_or(true) {
                best = Some((when, offset));
            }
        }
        if let Some((_, offset)) = best {
            self.offset_seconds = Some(offset);
        }
    }

    /// Directly set the offset (e.g. from a compiled-in constant).
    pub fn set_offset(&mut self, offset_seconds: i64) {
        self.offset_seconds = Some(offset_seconds);
    }

    pub fn offset_seconds(&self) -> Option<i64> {
        self.offset_seconds
    }

    /// Fail if the offset is required but missing.
    pub fn require(&self) -> Result<i64> {
        self.offset_seconds.ok_or(TimeError::MissingTaiOffset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fct_wraps_at_250() {
        let (mut clock, _) = EnsembleClock::init(0, 0, 0, true);
        for _ in 0..250 {
            clock.advance_24ms();
        }
        assert_eq!(clock.fct(), 0);
    }

    #[test]
    fn dlfc_wraps_at_5000() {
        let (mut clock, _) = EnsembleClock::init(0, 0, 0, true);
        for _ in 0..5000 {
            clock.advance_24ms();
        }
        assert_eq!(clock.dlfc(), 0);
    }

    #[test]
    fn tist_disabled_returns_none() {
        let (clock, _) = EnsembleClock::init(0, 0, 0, false);
        let (tist, _) = clock.current();
        assert_eq!(tist, None);
    }

    #[test]
    fn tist_fits_24_bits() {
        let (clock, _) = EnsembleClock::init(500, 0, 0, true);
        let (tist, _) = clock.current();
        assert!(tist.unwrap() <= 0x00FF_FFFF);
    }

    #[test]
    fn offset_out_of_range_rejected() {
        let (mut clock, _) = EnsembleClock::init(0, 0, 0, true);
        assert!(clock.set_tist_offset(10_000).is_err());
        assert!(clock.set_tist_offset(10).is_ok());
    }

    #[test]
    fn edi_seconds_advance_on_second_boundary() {
        let (mut clock, _) = EnsembleClock::init(988, 0, 100, true);
        let before = clock.current().1;
        for _ in 0..5 {
            clock.advance_24ms();
        }
        assert_eq!(clock.current().1, before + 1);
    }

    #[test]
    fn mjd_from_unix_epoch() {
        let t = MjdTime::from_unix(0, 0);
        assert_eq!(t.mjd, 40587);
        assert_eq!(t.hours, 0);
    }

    #[test]
    fn tai_cache_require_fails_when_empty() {
        let cache = TaiCache::new();
        assert!(cache.require().is_err());
    }

    #[test]
    fn tai_cache_picks_latest_non_future_entry() {
        let mut cache = TaiCache::new();
        cache.refresh_from("# comment\n2272060800\t10\n2287785600\t11\n2303683200\t12\n", 2_290_000_000);
        assert_eq!(cache.require().unwrap(), 11);
    }
}
