// Engine configuration - RON-backed settings for a SequencerEngine
//
// Every field has a default, so a config file only needs the keys it changes.

use crate::chaos::director::{DEFAULT_INTENSITY, DEFAULT_INTERVAL_MS, clamp_interval};
use crate::error::{EngineError, EngineResult};
use crate::generator::interference::DEFAULT_CAPACITY;
use crate::generator::markov::{DEFAULT_ORDER, MAX_ORDER};
use crate::sequencer::snapshot_timeline::DEFAULT_TIMELINE_LENGTH;
use crate::sequencer::timeline::{DEFAULT_BPM, MAX_BPM, MAX_SWING, MIN_BPM};
use crate::sequencer::transport::DEFAULT_LOOKAHEAD_SECS;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted `superposition_capacity`
pub const MAX_SUPERPOSITION_CAPACITY: usize = 64;

/// Largest accepted `note_queue_capacity` (events)
pub const MAX_NOTE_QUEUE_CAPACITY: usize = 1 << 16;

/// Largest accepted `history_capacity` (undo steps)
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

/// Largest accepted `timeline_capacity` (frames)
pub const MAX_TIMELINE_CAPACITY: usize = 10_000;

/// Chaos director settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub interval_ms: u64,
    pub intensity: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            intensity: DEFAULT_INTENSITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tempo_bpm: f64,
    pub swing: f64,
    /// How far ahead of the clock steps are dispatched
    pub lookahead_secs: f64,
    /// Scheduler wake-up period, must be shorter than the lookahead
    pub poll_interval_ms: u64,
    pub markov_order: usize,
    /// Superposition slots in the quantum registry
    pub superposition_capacity: usize,
    /// Ring buffer size for `create_note_channel`
    pub note_queue_capacity: usize,
    /// Undo steps kept by the edit history
    pub history_capacity: usize,
    /// Frames kept by the rewindable snapshot timeline
    pub timeline_capacity: usize,
    /// Fixed seed for every rng the engine owns; entropy when absent
    pub seed: Option<u64>,
    pub chaos: ChaosConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_BPM,
            swing: 0.0,
            lookahead_secs: DEFAULT_LOOKAHEAD_SECS,
            poll_interval_ms: 25,
            markov_order: DEFAULT_ORDER,
            superposition_capacity: DEFAULT_CAPACITY,
            note_queue_capacity: 1024,
            history_capacity: 100,
            timeline_capacity: DEFAULT_TIMELINE_LENGTH,
            seed: None,
            chaos: ChaosConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse RON text. Missing fields take their defaults.
    pub fn from_ron_str(text: &str) -> EngineResult<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON config file
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_ron_string(&self) -> EngineResult<String> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::new())?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings the engine cannot run with.
    ///
    /// Out-of-range musical values (tempo, swing, intensity, chaos interval)
    /// are not errors; `sanitized()` clamps them.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.lookahead_secs.is_finite() && self.lookahead_secs > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "lookahead_secs must be positive, got {}",
                self.lookahead_secs
            )));
        }
        if self.poll_interval_ms == 0 || self.poll_interval().as_secs_f64() >= self.lookahead_secs {
            return Err(EngineError::InvalidConfig(format!(
                "poll_interval_ms ({}) must be non-zero and shorter than the lookahead ({}s)",
                self.poll_interval_ms, self.lookahead_secs
            )));
        }
        if !(1..=MAX_ORDER).contains(&self.markov_order) {
            return Err(EngineError::InvalidConfig(format!(
                "markov_order must be in 1..={}, got {}",
                MAX_ORDER, self.markov_order
            )));
        }
        for (name, value, max) in self.capacities() {
            if value == 0 || value > max {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be in 1..={}, got {}",
                    name, max, value
                )));
            }
        }
        Ok(())
    }

    fn capacities(&self) -> [(&'static str, usize, usize); 4] {
        [
            ("superposition_capacity", self.superposition_capacity, MAX_SUPERPOSITION_CAPACITY),
            ("note_queue_capacity", self.note_queue_capacity, MAX_NOTE_QUEUE_CAPACITY),
            ("history_capacity", self.history_capacity, MAX_HISTORY_CAPACITY),
            ("timeline_capacity", self.timeline_capacity, MAX_TIMELINE_CAPACITY),
        ]
    }

    /// Copy with musical values and capacities clamped into their legal ranges
    pub fn sanitized(&self) -> Self {
        let not_nan = |value: f64, fallback: f64| if value.is_nan() { fallback } else { value };
        Self {
            tempo_bpm: not_nan(self.tempo_bpm, DEFAULT_BPM).clamp(MIN_BPM, MAX_BPM),
            swing: not_nan(self.swing, 0.0).clamp(0.0, MAX_SWING),
            chaos: ChaosConfig {
                interval_ms: clamp_interval(self.chaos.interval_ms).as_millis() as u64,
                intensity: not_nan(self.chaos.intensity, 0.0).clamp(0.0, 1.0),
            },
            superposition_capacity: self
                .superposition_capacity
                .clamp(1, MAX_SUPERPOSITION_CAPACITY),
            note_queue_capacity: self.note_queue_capacity.clamp(1, MAX_NOTE_QUEUE_CAPACITY),
            history_capacity: self.history_capacity.clamp(1, MAX_HISTORY_CAPACITY),
            timeline_capacity: self.timeline_capacity.clamp(1, MAX_TIMELINE_CAPACITY),
            ..self.clone()
        }
    }
}
