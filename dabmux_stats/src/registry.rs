//! Per-input statistics registry: every opened input registers here under
//! its uid, publishing fill-level and audio-level windows plus counters
//! and FSM state once per 24 ms tick.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use serde::Serialize;

/// 30 s at one sample per 24 ms frame.
const FILL_WINDOW_SAMPLES: usize = 1250;
/// ~500 ms.
const AUDIO_SHORT_WINDOW_SAMPLES: usize = 21;
/// 5 minutes.
const AUDIO_LONG_WINDOW_SAMPLES: usize = 12_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputState {
    NoData,
    Unstable,
    Silence,
    Streaming,
}

#[derive(Debug)]
struct SlidingWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SlidingWindow {
    fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn min_max(&self) -> Option<(f32, f32)> {
        let mut it = self.samples.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }

    fn max(&self) -> Option<f32> {
        self.min_max().map(|(_, max)| max)
    }
}

#[derive(Debug, Serialize)]
pub struct InputSnapshot {
    pub uid: String,
    pub fill_min: Option<f32>,
    pub fill_max: Option<f32>,
    pub peak_audio_short_dbfs: Option<f32>,
    pub peak_audio_long_dbfs: Option<f32>,
    pub underruns: u64,
    pub overruns: u64,
    pub state: InputState,
}

struct InputRecord {
    fill_window: SlidingWindow,
    audio_short: SlidingWindow,
    audio_long: SlidingWindow,
    underruns: u64,
    overruns: u64,
    state: InputState,
}

impl InputRecord {
    fn new() -> Self {
        Self {
            fill_window: SlidingWindow::new(FILL_WINDOW_SAMPLES),
            audio_short: SlidingWindow::new(AUDIO_SHORT_WINDOW_SAMPLES),
            audio_long: SlidingWindow::new(AUDIO_LONG_WINDOW_SAMPLES),
            underruns: 0,
            overruns: 0,
            state: InputState::NoData,
        }
    }

    fn snapshot(&self, uid: &str) -> InputSnapshot {
        let (fill_min, fill_max) = self.fill_window.min_max().map_or((None, None), |(a, b)| (Some(a), Some(b)));
        InputSnapshot {
            uid: uid.to_string(),
            fill_min,
            fill_max,
            peak_audio_short_dbfs: self.audio_short.max(),
            peak_audio_long_dbfs: self.audio_long.max(),
            underruns: self.underruns,
            overruns: self.overruns,
            state: self.state,
        }
    }
}

/// Process-wide registry every input publishes its per-tick stats into.
/// Cheap to clone: it's a handle onto a shared, lock-protected map.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<String, InputRecord>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uid: &str) {
        self.inner.write().unwrap().entry(uid.to_string()).or_insert_with(InputRecord::new);
    }

    pub fn record_fill(&self, uid: &str, level: f32) {
        if let Some(rec) = self.inner.write().unwrap().get_mut(uid) {
            rec.fill_window.push(level);
        }
    }

    pub fn record_audio_peak(&self, uid: &str, dbfs: f32) {
        if let Some(rec) = self.inner.write().unwrap().get_mut(uid) {
            rec.audio_short.push(dbfs);
            rec.audio_long.push(dbfs);
        }
    }

    pub fn record_underrun(&self, uid: &str) {
        if let Some(rec) = self.inner.write().unwrap().get_mut(uid) {
            rec.underruns += 1;
        }
    }

    pub fn record_overrun(&self, uid: &str) {
        if let Some(rec) = self.inner.write().unwrap().get_mut(uid) {
            rec.overruns += 1;
        }
    }

    pub fn set_state(&self, uid: &str, state: InputState) {
        if let Some(rec) = self.inner.write().unwrap().get_mut(uid) {
            rec.state = state;
        }
    }

    pub fn uids(&self) -> Vec<String> {
        self.inner.read().unwrap().keys().cloned().collect()
    }

    pub fn snapshot_all(&self) -> Vec<InputSnapshot> {
        self.inner.read().unwrap().iter().map(|(uid, rec)| rec.snapshot(uid)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_fill_min_max_over_window() {
        let registry = Registry::new();
        registry.register("a");
        registry.record_fill("a", 1.0);
        registry.record_fill("a", 5.0);
        registry.record_fill("a", 3.0);
        let snap = registry.snapshot_all().into_iter().find(|s| s.uid == "a").unwrap();
        assert_eq!(snap.fill_min, Some(1.0));
        assert_eq!(snap.fill_max, Some(5.0));
    }

    #[test]
    fn unregistered_uid_updates_are_ignored() {
        let registry = Registry::new();
        registry.record_underrun("ghost");
        assert!(registry.uids().is_empty());
    }

    #[test]
    fn counters_accumulate() {
        let registry = Registry::new();
        registry.register("a");
        registry.record_underrun("a");
        registry.record_underrun("a");
        registry.record_overrun("a");
        let snap = registry.snapshot_all().into_iter().next().unwrap();
        assert_eq!(snap.underruns, 2);
        assert_eq!(snap.overruns, 1);
    }
}
