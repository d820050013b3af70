// Pattern - Fixed 16-step on/off sequence for one voice
// The length never changes: every operator works on a [bool; STEPS] array in place

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of steps in every pattern (sixteenth notes of one 4/4 bar)
pub const STEPS: usize = 16;

/// Raw step data of a pattern
pub type Steps = [bool; STEPS];

/// One independently sequenced instrument channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceId {
    Drum,
    Synth1,
    Synth2,
}

impl VoiceId {
    /// All voices, in lock order
    pub const ALL: [VoiceId; 3] = [VoiceId::Drum, VoiceId::Synth1, VoiceId::Synth2];

    /// Row index of this voice in the 3x16 grid
    pub fn index(self) -> usize {
        match self {
            VoiceId::Drum => 0,
            VoiceId::Synth1 => 1,
            VoiceId::Synth2 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VoiceId::Drum => "drum",
            VoiceId::Synth1 => "synth1",
            VoiceId::Synth2 => "synth2",
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A voice's step pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    voice: VoiceId,
    steps: Steps,
}

impl Pattern {
    /// Create an empty (all-off) pattern
    pub fn new(voice: VoiceId) -> Self {
        Self {
            voice,
            steps: [false; STEPS],
        }
    }

    /// Create a pattern from existing step data
    pub fn from_steps(voice: VoiceId, steps: Steps) -> Self {
        Self { voice, steps }
    }

    pub fn voice(&self) -> VoiceId {
        self.voice
    }

    /// Always STEPS
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Borrow the step data
    pub fn steps(&self) -> &Steps {
        &self.steps
    }

    /// Independent copy of the step data
    pub fn get_pattern(&self) -> Steps {
        self.steps
    }

    /// Check a single step. Out-of-range indices read as off.
    pub fn is_step_active(&self, index: usize) -> bool {
        self.steps.get(index).copied().unwrap_or(false)
    }

    /// Write a single step. Out-of-range indices are ignored.
    pub fn set_step(&mut self, index: usize, value: bool) {
        if let Some(step) = self.steps.get_mut(index) {
            *step = value;
        }
    }

    /// Flip one step. Out-of-range indices are ignored.
    pub fn toggle_step(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            *step = !*step;
        }
    }

    /// Replace the whole sequence.
    ///
    /// Input whose length is not exactly STEPS is ignored and the pattern is
    /// left untouched. Returns whether the pattern was replaced.
    pub fn set_pattern(&mut self, bits: &[bool]) -> bool {
        match <Steps>::try_from(bits) {
            Ok(steps) => {
                self.steps = steps;
                true
            }
            Err(_) => {
                log::warn!(
                    "Ignoring {} pattern of length {} (expected {})",
                    self.voice,
                    bits.len(),
                    STEPS
                );
                false
            }
        }
    }

    /// Complement every step
    pub fn invert(&mut self) {
        for step in self.steps.iter_mut() {
            *step = !*step;
        }
    }

    /// Rotate left by `n` steps (negative rotates right).
    /// `shift(n)` followed by `shift(16 - n)` is the identity.
    pub fn shift(&mut self, n: i32) {
        let amount = n.rem_euclid(STEPS as i32) as usize;
        self.steps.rotate_left(amount);
    }

    /// Set each step on with probability 0.5
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for step in self.steps.iter_mut() {
            *step = rng.gen_bool(0.5);
        }
    }

    /// Turn every step off
    pub fn clear(&mut self) {
        self.steps = [false; STEPS];
    }

    /// Indices of the active steps, ascending
    pub fn active_steps(&self) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect()
    }

    pub fn has_active_steps(&self) -> bool {
        self.steps.iter().any(|&on| on)
    }

    /// Fraction of steps that are on
    pub fn density(&self) -> f64 {
        density(&self.steps)
    }

    /// Fraction of adjacent step pairs that differ (a cheap entropy measure)
    pub fn complexity(&self) -> f64 {
        let transitions = self.steps.windows(2).filter(|w| w[0] != w[1]).count();
        transitions as f64 / STEPS as f64
    }
}

/// Fraction of steps that are on
pub fn density(steps: &Steps) -> f64 {
    steps.iter().filter(|&&on| on).count() as f64 / STEPS as f64
}

/// Build step data from a 0/1 literal, e.g. a preset table row
pub fn steps_from_bits(bits: [u8; STEPS]) -> Steps {
    bits.map(|b| b != 0)
}
