//! Prebuffering and timestamp release queues, and the input state FSM
//! computed from their rolling glitch/level statistics.

use std::collections::VecDeque;

use tracing::warn;

/// One AAC superframe is five DAB logical frames; MPEG sub-channels drop
/// one frame at a time instead.
const AAC_SUPERFRAME_FRAMES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameGrouping {
    /// Drops happen one AAC superframe (5 frames) at a time, to keep
    /// superframe alignment.
    AacSuperframe,
    /// Drops happen one frame at a time.
    Mpeg,
}

/// Data-driven ring buffer: readers get zeroed frames until the ring
/// refills past `low_watermark`, and overflow drops whole superframes
/// (or single MPEG frames) rather than truncating mid-superframe.
pub struct PrebufferingQueue {
    frames: VecDeque<Vec<u8>>,
    min_frames: usize,
    low_watermark: usize,
    max_frames: usize,
    grouping: FrameGrouping,
    prebuffering: bool,
    pub underruns: u64,
    pub overruns: u64,
}

impl PrebufferingQueue {
    /// `min_frames`/`low_watermark`/`max_frames` are frame counts; typical
    /// sizing is 1 superframe minimum, 8 superframes low-watermark, 500
    /// superframes maximum (the same unit counts apply to MPEG framing).
    pub fn new(min_frames: usize, low_watermark: usize, max_frames: usize, grouping: FrameGrouping) -> Self {
        Self {
            frames: VecDeque::new(),
            min_frames,
            low_watermark,
            max_frames,
            grouping,
            prebuffering: true,
            underruns: 0,
            overruns: 0,
        }
    }

    fn drop_chunk_size(&self) -> usize {
        match self.grouping {
            FrameGrouping::AacSuperframe => AAC_SUPERFRAME_FRAMES,
            FrameGrouping::Mpeg => 1,
        }
    }

    pub fn push(&mut self, frame: Vec<u8>) {
        if self.frames.len() >= self.max_frames {
            let drop_n = self.drop_chunk_size().min(self.frames.len());
            for _ in 0..drop_n {
                self.frames.pop_front();
            }
            self.overruns += 1;
            warn!(dropped = drop_n, "prebuffering queue overrun, dropped oldest frames");
        }
        self.frames.push_back(frame);
        if self.prebuffering && self.frames.len() >= self.low_watermark {
            self.prebuffering = false;
        }
    }

    /// Returns `Some(frame)` once filled past the low watermark and data is
    /// available; `None` (the caller should emit zeros) while prebuffering
    /// or once the ring runs dry again.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        if self.prebuffering {
            return None;
        }
        match self.frames.pop_front() {
            Some(frame) => {
                if self.frames.len() < self.min_frames {
                    self.prebuffering = true;
                    self.underruns += 1;
                }
                Some(frame)
            }
            None => {
                self.prebuffering = true;
                self.underruns += 1;
                None
            }
        }
    }

    pub fn is_prebuffering(&self) -> bool {
        self.prebuffering
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// A frame with an explicit release time, in multiplex seconds.
pub struct TimestampedFrame {
    pub release_seconds: f64,
    pub bytes: Vec<u8>,
}

/// Queue for [`BufferPolicy::Timestamped`](dabmux_model::BufferPolicy::Timestamped)
/// inputs: a frame is only released once its timestamp has elapsed.
pub struct TimestampQueue {
    frames: VecDeque<TimestampedFrame>,
    overrun_threshold: usize,
    pub underruns: u64,
    pub overruns: u64,
}

impl TimestampQueue {
    pub fn new(overrun_threshold: usize) -> Self {
        Self { frames: VecDeque::new(), overrun_threshold, underruns: 0, overruns: 0 }
    }

    pub fn push(&mut self, frame: TimestampedFrame) {
        if self.frames.len() >= self.overrun_threshold {
            self.frames.pop_front();
            self.overruns += 1;
        }
        self.frames.push_back(frame);
    }

    /// Releases the head frame iff its release time has elapsed; otherwise
    /// (future release, or empty) silently reports no data.
    pub fn pop_ready(&mut self, now_seconds: f64) -> Option<Vec<u8>> {
        match self.frames.front() {
            Some(frame) if frame.release_seconds <= now_seconds => Some(self.frames.pop_front().unwrap().bytes),
            Some(_) => None,
            None => {
                self.underruns += 1;
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    NoData,
    Unstable,
    Silence,
    Streaming,
}

const GLITCH_SATURATION: u32 = 500;
const GLITCH_RESET_WINDOW_SECONDS: f64 = 30.0 * 60.0;
const UNSTABLE_WINDOW_SECONDS: f64 = 30.0 * 60.0;
const UNSTABLE_GLITCH_THRESHOLD: u32 = 3;
const NO_DATA_SECONDS: f64 = 30.0;
const SILENCE_WINDOWS: u32 = 100;
const SILENCE_THRESHOLD_DBFS: f32 = -50.0;

/// Rolling statistics feeding the input-state FSM: glitch counts over a
/// 30-minute window, and 120 ms peak-level samples over 100 windows.
#[derive(Debug, Default)]
pub struct InputStats {
    glitch_count: u32,
    last_glitch_at: Option<f64>,
    last_data_at: Option<f64>,
    silence_windows: u32,
}

impl InputStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_data(&mut self, now_seconds: f64) {
        self.last_data_at = Some(now_seconds);
    }

    pub fn record_glitch(&mut self, now_seconds: f64) {
        if let Some(last) = self.last_glitch_at {
            if now_seconds - last > GLITCH_RESET_WINDOW_SECONDS {
                self.glitch_count = 0;
            }
        }
        self.glitch_count = (self.glitch_count + 1).min(GLITCH_SATURATION);
        self.last_glitch_at = Some(now_seconds);
    }

    /// Feed a 120 ms window's peak level (dBFS) on both channels.
    pub fn record_level_window(&mut self, peak_left_dbfs: f32, peak_right_dbfs: f32) {
        if peak_left_dbfs <= SILENCE_THRESHOLD_DBFS && peak_right_dbfs <= SILENCE_THRESHOLD_DBFS {
            self.silence_windows = (self.silence_windows + 1).min(SILENCE_WINDOWS);
        } else {
            self.silence_windows = 0;
        }
    }

    pub fn state(&self, now_seconds: f64) -> InputState {
        let no_data = match self.last_data_at {
            None => true,
            Some(last) => now_seconds - last >= NO_DATA_SECONDS,
        };
        if no_data {
            return InputState::NoData;
        }

        let unstable = match self.last_glitch_at {
            Some(last) if now_seconds - last <= UNSTABLE_WINDOW_SECONDS => self.glitch_count >= UNSTABLE_GLITCH_THRESHOLD,
            _ => false,
        };
        if unstable {
            return InputState::Unstable;
        }

        if self.silence_windows >= SILENCE_WINDOWS {
            return InputState::Silence;
        }

        InputState::Streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prebuffering_queue_holds_zeros_until_watermark() {
        let mut q = PrebufferingQueue::new(1, 3, 10, FrameGrouping::Mpeg);
        assert!(q.pop().is_none());
        q.push(vec![1]);
        q.push(vec![2]);
        assert!(q.pop().is_none());
        q.push(vec![3]);
        assert_eq!(q.pop(), Some(vec![1]));
    }

    #[test]
    fn overrun_drops_oldest_superframe() {
        let mut q = PrebufferingQueue::new(1, 1, 5, FrameGrouping::AacSuperframe);
        for i in 0..6u8 {
            q.push(vec![i]);
        }
        assert_eq!(q.overruns, 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn timestamp_queue_withholds_future_frames() {
        let mut q = TimestampQueue::new(100);
        q.push(TimestampedFrame { release_seconds: 10.0, bytes: vec![1] });
        assert!(q.pop_ready(5.0).is_none());
        assert_eq!(q.pop_ready(10.0), Some(vec![1]));
    }

    #[test]
    fn state_no_data_after_30_seconds_of_silence() {
        let stats = InputStats::new();
        assert_eq!(stats.state(0.0), InputState::NoData);
    }

    #[test]
    fn state_unstable_after_three_glitches_in_window() {
        let mut stats = InputStats::new();
        stats.record_data(0.0);
        stats.record_glitch(0.0);
        stats.record_glitch(1.0);
        stats.record_glitch(2.0);
        assert_eq!(stats.state(2.0), InputState::Unstable);
    }

    #[test]
    fn state_silence_after_100_quiet_windows() {
        let mut stats = InputStats::new();
        stats.record_data(0.0);
        for _ in 0..SILENCE_WINDOWS {
            stats.record_level_window(-60.0, -60.0);
        }
        assert_eq!(stats.state(0.0), InputState::Silence);
    }

    #[test]
    fn state_streaming_when_nothing_wrong() {
        let mut stats = InputStats::new();
        stats.record_data(0.0);
        stats.record_level_window(-6.0, -6.0);
        assert_eq!(stats.state(0.0), InputState::Streaming);
    }
}
