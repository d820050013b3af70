// Chaos transforms - The closed set of mutations the director can apply
//
// Each kind maps to one handler through `MutationKind::handler`. Handlers read
// and write the live bank through its per-voice locks, so the scheduler never
// sees a half-applied transform.

use crate::generator::structural::{self, CA_RULES};
use crate::sequencer::bank::PatternBank;
use crate::sequencer::pattern::{STEPS, Steps, VoiceId};
use rand::{Rng, RngCore};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Rotation amounts PatternShift picks from
pub const SHIFT_AMOUNTS: [i32; 6] = [1, -1, 2, -2, 4, -4];

/// Upper bound (exclusive) of ProbabilisticToggle's flip probability
pub const MAX_TOGGLE_PROBABILITY: f64 = 0.3;

/// Largest hit count EuclideanRhythm picks
pub const MAX_EUCLIDEAN_HITS: usize = 8;

/// Gap between the stages of a butterfly cascade
pub const BUTTERFLY_DELAY: Duration = Duration::from_millis(100);

/// Transform kinds, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    BitFlip,
    PatternShift,
    ProbabilisticToggle,
    EuclideanRhythm,
    ConwayStep,
    QuantumCollapse,
    FractalPattern,
    GoldenRatioPattern,
    CellularAutomaton1D,
    ButterflyCascade,
}

/// Handler signature: live bank, current intensity, randomness
pub type Transform = fn(&Arc<PatternBank>, f64, &mut dyn RngCore);

impl MutationKind {
    pub const ALL: [MutationKind; 10] = [
        MutationKind::BitFlip,
        MutationKind::PatternShift,
        MutationKind::ProbabilisticToggle,
        MutationKind::EuclideanRhythm,
        MutationKind::ConwayStep,
        MutationKind::QuantumCollapse,
        MutationKind::FractalPattern,
        MutationKind::GoldenRatioPattern,
        MutationKind::CellularAutomaton1D,
        MutationKind::ButterflyCascade,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MutationKind::BitFlip => "bit_flip",
            MutationKind::PatternShift => "pattern_shift",
            MutationKind::ProbabilisticToggle => "probabilistic_toggle",
            MutationKind::EuclideanRhythm => "euclidean_rhythm",
            MutationKind::ConwayStep => "conway_step",
            MutationKind::QuantumCollapse => "quantum_collapse",
            MutationKind::FractalPattern => "fractal_pattern",
            MutationKind::GoldenRatioPattern => "golden_ratio_pattern",
            MutationKind::CellularAutomaton1D => "cellular_automaton_1d",
            MutationKind::ButterflyCascade => "butterfly_cascade",
        }
    }

    /// Uniform pick over all kinds
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn handler(self) -> Transform {
        match self {
            MutationKind::BitFlip => |bank, _, rng| {
                bit_flip(bank, rng);
            },
            MutationKind::PatternShift => |bank, _, rng| {
                pattern_shift(bank, rng);
            },
            MutationKind::ProbabilisticToggle => |bank, _, rng| {
                probabilistic_toggle(bank, rng);
            },
            MutationKind::EuclideanRhythm => |bank, _, rng| {
                euclidean_rhythm(bank, rng);
            },
            MutationKind::ConwayStep => |bank, _, _| conway_step(bank),
            MutationKind::QuantumCollapse => |bank, intensity, rng| {
                quantum_collapse(bank, intensity, rng);
            },
            MutationKind::FractalPattern => |bank, _, rng| {
                fractal_pattern(bank, rng);
            },
            MutationKind::GoldenRatioPattern => |bank, _, rng| {
                golden_ratio_pattern(bank, rng);
            },
            MutationKind::CellularAutomaton1D => |bank, _, rng| {
                cellular_automaton(bank, rng);
            },
            MutationKind::ButterflyCascade => |bank, _, rng| {
                butterfly_cascade(bank, rng);
            },
        }
    }

    /// Run this kind's handler against the live bank
    pub fn apply(self, bank: &Arc<PatternBank>, intensity: f64, rng: &mut dyn RngCore) {
        log::debug!("Applying {} (intensity {:.2})", self, intensity);
        (self.handler())(bank, intensity, rng);
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn random_voice<R: Rng + ?Sized>(rng: &mut R) -> VoiceId {
    VoiceId::ALL[rng.gen_range(0..VoiceId::ALL.len())]
}

fn replace_voice(bank: &PatternBank, voice: VoiceId, steps: &Steps) {
    bank.with_pattern(voice, |pattern| pattern.set_pattern(steps));
}

/// Flip one random step of one random voice
pub fn bit_flip<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> (VoiceId, usize) {
    let voice = random_voice(rng);
    let step = rng.gen_range(0..STEPS);
    bank.with_pattern(voice, |pattern| pattern.toggle_step(step));
    (voice, step)
}

/// Rotate a random voice by ±1, ±2 or ±4
pub fn pattern_shift<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> (VoiceId, i32) {
    let voice = random_voice(rng);
    let amount = SHIFT_AMOUNTS[rng.gen_range(0..SHIFT_AMOUNTS.len())];
    bank.with_pattern(voice, |pattern| pattern.shift(amount));
    (voice, amount)
}

/// Flip each step of a random voice with a random probability below 0.3
pub fn probabilistic_toggle<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> (VoiceId, f64) {
    let voice = random_voice(rng);
    let probability = rng.gen_range(0.0..MAX_TOGGLE_PROBABILITY);
    bank.with_pattern(voice, |pattern| {
        for step in 0..STEPS {
            if rng.gen_bool(probability) {
                pattern.toggle_step(step);
            }
        }
    });
    (voice, probability)
}

/// Replace a random voice with an even spread of 1 to 8 hits
pub fn euclidean_rhythm<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> (VoiceId, usize) {
    let hits = rng.gen_range(1..=MAX_EUCLIDEAN_HITS);
    let voice = random_voice(rng);
    replace_voice(bank, voice, &structural::euclidean(hits));
    (voice, hits)
}

/// One Game-of-Life generation over all three voices at once
pub fn conway_step(bank: &PatternBank) {
    bank.with_all(|patterns| {
        let grid = patterns.each_ref().map(|pattern| pattern.get_pattern());
        let next = structural::conway_step(&grid);
        for (pattern, row) in patterns.iter_mut().zip(next) {
            pattern.set_pattern(&row);
        }
    });
}

/// Blend a random voice toward 16 fresh coin flips, each step taking the
/// coin with probability `intensity`
pub fn quantum_collapse<R: Rng + ?Sized>(bank: &PatternBank, intensity: f64, rng: &mut R) -> VoiceId {
    let candidate: Steps = std::array::from_fn(|_| rng.gen_bool(0.5));
    let voice = random_voice(rng);
    let intensity = crate::generator::evolution::probability(intensity);
    bank.with_pattern(voice, |pattern| {
        for (step, &bit) in candidate.iter().enumerate() {
            if rng.gen_bool(intensity) {
                pattern.set_step(step, bit);
            }
        }
    });
    voice
}

/// Replace a random voice with the recursive-bisection pattern
pub fn fractal_pattern<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> VoiceId {
    let voice = random_voice(rng);
    replace_voice(bank, voice, &structural::fractal());
    voice
}

/// Replace a random voice with the golden-ratio pattern
pub fn golden_ratio_pattern<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> VoiceId {
    let voice = random_voice(rng);
    replace_voice(bank, voice, &structural::golden_ratio());
    voice
}

/// Advance the drum voice one generation under a random Wolfram rule
pub fn cellular_automaton<R: Rng + ?Sized>(bank: &PatternBank, rng: &mut R) -> u8 {
    let rule = CA_RULES[rng.gen_range(0..CA_RULES.len())];
    bank.with_pattern(VoiceId::Drum, |pattern| {
        let next = structural::cellular_automaton_1d(pattern.steps(), rule);
        pattern.set_pattern(&next);
    });
    rule
}

/// Flip a random drum step now, synth1 one step later after BUTTERFLY_DELAY,
/// synth2 two steps later after another BUTTERFLY_DELAY.
///
/// The delayed flips run on their own thread; the handle is returned so
/// callers may wait for the cascade to land.
pub fn butterfly_cascade<R: Rng + ?Sized>(
    bank: &Arc<PatternBank>,
    rng: &mut R,
) -> Option<thread::JoinHandle<()>> {
    let index = rng.gen_range(0..STEPS);
    bank.with_pattern(VoiceId::Drum, |pattern| pattern.toggle_step(index));

    let bank = Arc::clone(bank);
    let spawned = thread::Builder::new()
        .name("nexus-butterfly".to_string())
        .spawn(move || {
            thread::sleep(BUTTERFLY_DELAY);
            bank.with_pattern(VoiceId::Synth1, |p| p.toggle_step((index + 1) % STEPS));
            thread::sleep(BUTTERFLY_DELAY);
            bank.with_pattern(VoiceId::Synth2, |p| p.toggle_step((index + 2) % STEPS));
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("Butterfly cascade stopped after the drum: {}", e);
            None
        }
    }
}
