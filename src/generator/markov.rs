// Markov pattern generator
//
// Order-k binary Markov chains trained on whole 16-step loops. Training treats
// each pattern as circular, so the last window predicts the first step again.

use crate::generator::evolution::{self, Constraints};
use crate::sequencer::bank::PatternSnapshot;
use crate::sequencer::pattern::{STEPS, Steps, VoiceId, steps_from_bits};
use rand::Rng;

/// Order used when none is configured
pub const DEFAULT_ORDER: usize = 2;

/// Largest supported order (a window must fit in a loop with room to spare)
pub const MAX_ORDER: usize = 8;

/// Mutation rate of the mutation branch in `evolve`
const EVOLVE_MUTATION_RATE: f64 = 0.1;

/// A k-bit window, oldest bit in the highest position
type StateKey = u16;

/// Next-bit counts for one state, in first-observed order
#[derive(Debug, Clone, PartialEq)]
struct Transitions {
    state: StateKey,
    counts: Vec<(bool, u32)>,
}

/// Order-k binary Markov chain plus the corpus it was trained on
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovModel {
    order: usize,
    /// States in first-observed order
    table: Vec<Transitions>,
    corpus: Vec<Steps>,
}

impl MarkovModel {
    /// Create an untrained model. `order` is clamped to [1, MAX_ORDER].
    pub fn new(order: usize) -> Self {
        Self {
            order: order.clamp(1, MAX_ORDER),
            table: Vec::new(),
            corpus: Vec::new(),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_trained(&self) -> bool {
        !self.table.is_empty()
    }

    /// Number of distinct observed states
    pub fn state_count(&self) -> usize {
        self.table.len()
    }

    /// Observed count of `state -> next`. `state` must hold `order` bits.
    pub fn transition_count(&self, state: &[bool], next: bool) -> u32 {
        if state.len() != self.order {
            return 0;
        }
        self.transitions(pack(state))
            .and_then(|t| t.counts.iter().find(|(bit, _)| *bit == next))
            .map_or(0, |(_, count)| *count)
    }

    /// Add one loop to the model. Training only ever adds counts.
    pub fn train(&mut self, pattern: &Steps) {
        self.corpus.push(*pattern);

        for i in 0..=STEPS - self.order {
            let state = pack(&pattern[i..i + self.order]);
            let next = pattern.get(i + self.order).copied().unwrap_or(pattern[0]);
            self.record(state, next);
        }
    }

    fn record(&mut self, state: StateKey, next: bool) {
        let index = match self.table.iter().position(|t| t.state == state) {
            Some(index) => index,
            None => {
                self.table.push(Transitions {
                    state,
                    counts: Vec::new(),
                });
                self.table.len() - 1
            }
        };

        let counts = &mut self.table[index].counts;
        match counts.iter_mut().find(|(bit, _)| *bit == next) {
            Some((_, count)) => *count += 1,
            None => counts.push((next, 1)),
        }
    }

    fn transitions(&self, state: StateKey) -> Option<&Transitions> {
        self.table.iter().find(|t| t.state == state)
    }

    /// Random walk through the chain, seeded from a random observed state.
    /// An untrained model yields an all-off loop.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Steps {
        let mut steps = [false; STEPS];
        if self.table.is_empty() {
            return steps;
        }

        let mask: StateKey = (1 << self.order) - 1;
        let mut window = self.table[rng.gen_range(0..self.table.len())].state;
        for (i, step) in steps.iter_mut().take(self.order).enumerate() {
            *step = (window >> (self.order - 1 - i)) & 1 == 1;
        }

        for step in steps.iter_mut().skip(self.order) {
            let bit = self.next_bit(window, rng);
            *step = bit;
            window = ((window << 1) | StateKey::from(bit)) & mask;
        }
        steps
    }

    /// Weighted draw over the window's observed successors, or a coin flip
    /// for a window never seen in training
    fn next_bit<R: Rng + ?Sized>(&self, window: StateKey, rng: &mut R) -> bool {
        let Some(transitions) = self.transitions(window) else {
            return rng.gen_bool(0.5);
        };

        let total: u32 = transitions.counts.iter().map(|(_, count)| count).sum();
        let mut threshold = rng.gen_range(0..total);
        for &(bit, count) in &transitions.counts {
            if threshold < count {
                return bit;
            }
            threshold -= count;
        }
        false
    }

    /// Every loop the model was trained on, in training order
    pub fn training_patterns(&self) -> &[Steps] {
        &self.corpus
    }

    /// A uniformly chosen training loop (crossover material)
    pub fn random_training_pattern<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Steps> {
        if self.corpus.is_empty() {
            return None;
        }
        Some(self.corpus[rng.gen_range(0..self.corpus.len())])
    }
}

impl Default for MarkovModel {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}

fn pack(bits: &[bool]) -> StateKey {
    bits.iter()
        .fold(0, |key, &bit| (key << 1) | StateKey::from(bit))
}

const DRUM_CORPUS: [[u8; STEPS]; 5] = [
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0], // four on the floor
    [1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0], // breakbeat
    [1, 0, 1, 0, 0, 1, 1, 0, 1, 0, 1, 0, 0, 1, 1, 0], // techno
    [1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0], // minimal
    [1, 1, 0, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0], // jungle
];

const SYNTH1_CORPUS: [[u8; STEPS]; 4] = [
    [1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0],
    [0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1],
];

const SYNTH2_CORPUS: [[u8; STEPS]; 3] = [
    [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0],
    [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1],
];

/// Seed loops each voice's model is trained on at startup
pub fn classic_corpus(voice: VoiceId) -> Vec<Steps> {
    let rows: &[[u8; STEPS]] = match voice {
        VoiceId::Drum => &DRUM_CORPUS,
        VoiceId::Synth1 => &SYNTH1_CORPUS,
        VoiceId::Synth2 => &SYNTH2_CORPUS,
    };
    rows.iter().copied().map(steps_from_bits).collect()
}

/// One Markov model per voice
#[derive(Debug, Clone)]
pub struct MarkovGenerator {
    models: [MarkovModel; 3],
}

impl MarkovGenerator {
    /// Models of the given order, trained on the classic corpus
    pub fn new(order: usize) -> Self {
        let mut generator = Self::untrained(order);
        for voice in VoiceId::ALL {
            for pattern in classic_corpus(voice) {
                generator.models[voice.index()].train(&pattern);
            }
        }
        log::debug!(
            "Markov models trained (order {}, {} drum states)",
            generator.models[0].order(),
            generator.models[0].state_count()
        );
        generator
    }

    /// Models of the given order with no training at all
    pub fn untrained(order: usize) -> Self {
        Self {
            models: VoiceId::ALL.map(|_| MarkovModel::new(order)),
        }
    }

    pub fn model(&self, voice: VoiceId) -> &MarkovModel {
        &self.models[voice.index()]
    }

    pub fn model_mut(&mut self, voice: VoiceId) -> &mut MarkovModel {
        &mut self.models[voice.index()]
    }

    pub fn generate<R: Rng + ?Sized>(&self, voice: VoiceId, rng: &mut R) -> Steps {
        self.model(voice).generate(rng)
    }

    /// Fresh loops for every voice
    pub fn generate_all<R: Rng + ?Sized>(&self, rng: &mut R) -> PatternSnapshot {
        let mut snapshot = PatternSnapshot::default();
        for voice in VoiceId::ALL {
            *snapshot.get_mut(voice) = self.generate(voice, rng);
        }
        snapshot
    }

    /// Generate all voices, then shape them: density on every voice,
    /// syncopation on the drum, polyrhythm on synth2
    pub fn generate_with_constraints<R: Rng + ?Sized>(
        &self,
        constraints: &Constraints,
        rng: &mut R,
    ) -> PatternSnapshot {
        let mut snapshot = self.generate_all(rng);

        if let Some(target) = constraints.density {
            for voice in VoiceId::ALL {
                let steps = snapshot.get_mut(voice);
                *steps = evolution::adjust_density(steps, target, rng);
            }
        }
        if let Some(amount) = constraints.syncopation {
            snapshot.drum = evolution::add_syncopation(&snapshot.drum, amount, rng);
        }
        if let Some(ratio) = constraints.polyrhythm {
            snapshot.synth2 = evolution::create_polyrhythm(&snapshot.synth2, ratio);
        }

        log::debug!("Generated constrained patterns: {:?}", constraints);
        snapshot
    }

    /// Random-selection evolution. Each generation proposes, per voice, a
    /// mutated copy and a crossover with a training loop, then adopts one
    /// proposal at random.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        patterns: &PatternSnapshot,
        generations: usize,
        rng: &mut R,
    ) -> PatternSnapshot {
        let mut current = *patterns;

        for _ in 0..generations {
            let mut variations: Vec<(VoiceId, Steps)> = Vec::with_capacity(VoiceId::ALL.len() * 2);
            for voice in VoiceId::ALL {
                let steps = current.get(voice);
                variations.push((voice, evolution::mutate(steps, EVOLVE_MUTATION_RATE, rng)));
                if let Some(training) = self.model(voice).random_training_pattern(rng) {
                    variations.push((voice, evolution::crossover(steps, &training, rng)));
                }
            }

            let (voice, steps) = variations[rng.gen_range(0..variations.len())];
            *current.get_mut(voice) = steps;
        }
        current
    }
}

impl Default for MarkovGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}
