// Timeline - Tempo and swing math for the 16-step grid
// Converts BPM and swing into beat, step and off-beat offset durations (seconds)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Steps per beat (sixteenth notes)
pub const STEPS_PER_BEAT: f64 = 4.0;

/// Lowest accepted tempo
pub const MIN_BPM: f64 = 60.0;

/// Highest accepted tempo
pub const MAX_BPM: f64 = 240.0;

/// Tempo used when none (or garbage) is given
pub const DEFAULT_BPM: f64 = 120.0;

/// Largest swing offset, as a fraction of a beat.
/// Keeps a swung off-beat strictly ahead of the following on-beat.
pub const MAX_SWING: f64 = 0.2;

/// Tempo in BPM (Beats Per Minute), always within [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo. Out-of-range (or NaN) values are clamped.
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: clamp_bpm(bpm),
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set BPM value (clamped)
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = clamp_bpm(bpm);
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one sixteenth step in seconds
    pub fn step_duration_seconds(&self) -> f64 {
        self.beat_duration_seconds() / STEPS_PER_BEAT
    }

    /// Duration of the full 16-step loop in seconds
    pub fn bar_duration_seconds(&self) -> f64 {
        self.step_duration_seconds() * crate::sequencer::pattern::STEPS as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return DEFAULT_BPM;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Swing ratio, always within [0, MAX_SWING]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Swing {
    ratio: f64,
}

impl Swing {
    /// Creates a new swing ratio. Out-of-range (or NaN) values are clamped.
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio };
        Self {
            ratio: ratio.clamp(0.0, MAX_SWING),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Delay applied to `step`'s dispatch time. Only odd (off-beat) steps swing.
    pub fn offset_seconds(&self, step: usize, tempo: &Tempo) -> f64 {
        if step % 2 == 1 {
            self.ratio * tempo.beat_duration_seconds()
        } else {
            0.0
        }
    }
}
