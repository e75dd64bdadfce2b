//! Controllable parameter set exposed over the remote-control surface:
//! per-input buffer thresholds/enable flag/keyfile, and per-multiplexer
//! TIST offset plus the read-only frame counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputControls {
    pub min_frames: usize,
    pub low_watermark: usize,
    pub max_frames: usize,
    pub enabled: bool,
    pub encryption_keyfile: Option<String>,
}

impl Default for InputControls {
    fn default() -> Self {
        Self { min_frames: 1, low_watermark: 8, max_frames: 500, enabled: true, encryption_keyfile: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiplexerControls {
    pub tist_offset_seconds: i32,
}

/// Process-wide store of runtime-adjustable parameters. `frames` is
/// read-only from the remote-control surface's point of view; only the
/// main loop increments it.
#[derive(Clone)]
pub struct ControlRegistry {
    inputs: Arc<RwLock<HashMap<String, InputControls>>>,
    multiplexer: Arc<RwLock<MultiplexerControls>>,
    frames: Arc<AtomicU64>,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self { inputs: Arc::default(), multiplexer: Arc::default(), frames: Arc::new(AtomicU64::new(0)) }
    }
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_input(&self, uid: &str) {
        self.inputs.write().unwrap().entry(uid.to_string()).or_default();
    }

    pub fn input(&self, uid: &str) -> Option<InputControls> {
        self.inputs.read().unwrap().get(uid).cloned()
    }

    pub fn set_input(&self, uid: &str, controls: InputControls) {
        self.inputs.write().unwrap().insert(uid.to_string(), controls);
    }

    pub fn multiplexer(&self) -> MultiplexerControls {
        self.multiplexer.read().unwrap().clone()
    }

    pub fn set_tist_offset(&self, seconds: i32) {
        self.multiplexer.write().unwrap().tist_offset_seconds = seconds;
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn increment_frames(&self) -> u64 {
        self.frames.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_controls_default_to_sane_thresholds() {
        let registry = ControlRegistry::new();
        registry.register_input("a");
        let controls = registry.input("a").unwrap();
        assert!(controls.enabled);
        assert_eq!(controls.low_watermark, 8);
    }

    #[test]
    fn frames_counter_only_advances_through_increment() {
        let registry = ControlRegistry::new();
        assert_eq!(registry.frames(), 0);
        registry.increment_frames();
        registry.increment_frames();
        assert_eq!(registry.frames(), 2);
    }

    #[test]
    fn tist_offset_is_settable() {
        let registry = ControlRegistry::new();
        registry.set_tist_offset(-5);
        assert_eq!(registry.multiplexer().tist_offset_seconds, -5);
    }
}
