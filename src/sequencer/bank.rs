// PatternBank - The three live voices shared between scheduler and mutators
//
// Each voice sits behind its own mutex (single writer per pattern). Readers take
// copies under the lock so a step decision never sees a half-written pattern.
// Grid-wide transforms lock all three voices in VoiceId::ALL order.

use crate::error::EngineResult;
use crate::sequencer::pattern::{Pattern, STEPS, Steps, VoiceId, steps_from_bits};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Plain value crossing the persistence boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternSnapshot {
    pub drum: Steps,
    pub synth1: Steps,
    pub synth2: Steps,
}

impl PatternSnapshot {
    pub fn get(&self, voice: VoiceId) -> &Steps {
        match voice {
            VoiceId::Drum => &self.drum,
            VoiceId::Synth1 => &self.synth1,
            VoiceId::Synth2 => &self.synth2,
        }
    }

    pub fn get_mut(&mut self, voice: VoiceId) -> &mut Steps {
        match voice {
            VoiceId::Drum => &mut self.drum,
            VoiceId::Synth1 => &mut self.synth1,
            VoiceId::Synth2 => &mut self.synth2,
        }
    }

    /// Rows in voice order, as a 3x16 grid
    pub fn to_grid(&self) -> [Steps; 3] {
        [self.drum, self.synth1, self.synth2]
    }

    pub fn from_grid(grid: [Steps; 3]) -> Self {
        let [drum, synth1, synth2] = grid;
        Self {
            drum,
            synth1,
            synth2,
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Factory pattern sets, by name
const PRESETS: [(&str, [[u8; STEPS]; 3]); 8] = [
    (
        "Classic House",
        [
            [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0],
        ],
    ),
    (
        "Kraftwerk",
        [
            [1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0],
            [1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0],
            [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0],
        ],
    ),
    (
        "Techno",
        [
            [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0],
            [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1],
            [1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
        ],
    ),
    (
        "Breakbeat",
        [
            [1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 0],
            [0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1],
        ],
    ),
    (
        "Minimal",
        [
            [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
        ],
    ),
    (
        "Acid",
        [
            [1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0],
            [1, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1, 1, 0, 1, 0],
            [0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1],
        ],
    ),
    (
        "Robotic",
        [
            [1, 0, 1, 0, 0, 1, 1, 0, 1, 0, 1, 0, 0, 1, 1, 0],
            [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0],
            [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1],
        ],
    ),
    ("Clear All", [[0; STEPS]; 3]),
];

/// Names of the built-in presets, in display order
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

/// Look up a built-in preset by name
pub fn preset(name: &str) -> Option<PatternSnapshot> {
    PRESETS
        .iter()
        .find(|(preset_name, _)| *preset_name == name)
        .map(|&(_, rows)| PatternSnapshot::from_grid(rows.map(steps_from_bits)))
}

/// The live patterns of all voices
#[derive(Debug)]
pub struct PatternBank {
    voices: [Mutex<Pattern>; 3],
}

fn lock(pattern: &Mutex<Pattern>) -> MutexGuard<'_, Pattern> {
    // A panicked writer cannot leave a partial pattern behind (steps are Copy
    // and replaced whole), so a poisoned lock is still safe to read.
    pattern.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PatternBank {
    /// Create a bank with all voices empty
    pub fn new() -> Self {
        Self {
            voices: VoiceId::ALL.map(|voice| Mutex::new(Pattern::new(voice))),
        }
    }

    /// Consistent copy of one voice
    pub fn pattern(&self, voice: VoiceId) -> Pattern {
        *lock(&self.voices[voice.index()])
    }

    /// Consistent copy of one voice's steps
    pub fn steps(&self, voice: VoiceId) -> Steps {
        lock(&self.voices[voice.index()]).get_pattern()
    }

    /// Mutate one voice under its lock
    pub fn with_pattern<T>(&self, voice: VoiceId, f: impl FnOnce(&mut Pattern) -> T) -> T {
        let mut guard = lock(&self.voices[voice.index()]);
        f(&mut guard)
    }

    /// Mutate all voices at once. Locks are taken in VoiceId::ALL order.
    pub fn with_all<T>(&self, f: impl FnOnce(&mut [Pattern; 3]) -> T) -> T {
        let mut guards = self.voices.each_ref().map(lock);
        let mut patterns = [*guards[0], *guards[1], *guards[2]];
        let result = f(&mut patterns);
        for (guard, pattern) in guards.iter_mut().zip(patterns) {
            **guard = pattern;
        }
        result
    }

    /// Copy all voices. Each voice is consistent on its own; voices may come
    /// from different mutation rounds.
    pub fn snapshot_all(&self) -> PatternSnapshot {
        PatternSnapshot {
            drum: self.steps(VoiceId::Drum),
            synth1: self.steps(VoiceId::Synth1),
            synth2: self.steps(VoiceId::Synth2),
        }
    }

    /// Replace all voices from a snapshot, atomically with respect to with_all
    pub fn restore(&self, snapshot: &PatternSnapshot) {
        self.with_all(|patterns| {
            for pattern in patterns.iter_mut() {
                pattern.set_pattern(snapshot.get(pattern.voice()));
            }
        });
    }

    /// Replace all voices with a built-in preset. Returns false for unknown names.
    pub fn apply_preset(&self, name: &str) -> bool {
        match preset(name) {
            Some(snapshot) => {
                self.restore(&snapshot);
                true
            }
            None => false,
        }
    }
}

impl Default for PatternBank {
    fn default() -> Self {
        Self::new()
    }
}
