// Interference / entanglement combiner
//
// Superpositions hold several candidate loops for one voice; observing a step
// collapses just that step into the live pattern and cascades the result to
// entangled partners. State lives in an arena of slots addressed by id, not in
// the patterns themselves.

use crate::sequencer::bank::PatternBank;
use crate::sequencer::pattern::{STEPS, Steps, VoiceId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Superposition slots in a registry built with `Default`
pub const DEFAULT_CAPACITY: usize = 8;

/// Observations kept in the history log
const HISTORY_LIMIT: usize = 256;

/// Walk length per step in `quantum_random_walk_pattern`
const RANDOM_WALK_STEPS: usize = 10;

/// Handle to a superposition slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuperpositionId(usize);

impl SuperpositionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to an entanglement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntanglementId(usize);

impl EntanglementId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How an observation on one side is written to the partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntanglementKind {
    /// Partner gets the complement at the same step
    Inverse,
    /// Partner gets the same bit at the same step
    Mirror,
    /// Partner gets the same bit `floor(strength * 4)` steps later
    PhaseShift,
    /// The two superpositions trade probability vectors
    ProbabilitySwap,
}

impl EntanglementKind {
    pub const ALL: [EntanglementKind; 4] = [
        EntanglementKind::Inverse,
        EntanglementKind::Mirror,
        EntanglementKind::PhaseShift,
        EntanglementKind::ProbabilitySwap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntanglementKind::Inverse => "inverse",
            EntanglementKind::Mirror => "mirror",
            EntanglementKind::PhaseShift => "phase_shift",
            EntanglementKind::ProbabilitySwap => "probability_swap",
        }
    }
}

/// Candidate loops for one voice with their probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct Superposition {
    voice: VoiceId,
    states: Vec<Steps>,
    /// Same length as `states`, sums to 1
    probabilities: Vec<f64>,
    collapsed: bool,
}

impl Superposition {
    pub fn voice(&self) -> VoiceId {
        self.voice
    }

    pub fn states(&self) -> &[Steps] {
        &self.states
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Cumulative draw over the candidates; false if nothing is selected
    fn draw<R: Rng + ?Sized>(&self, step: usize, rng: &mut R) -> bool {
        let threshold: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        for (state, probability) in self.states.iter().zip(&self.probabilities) {
            cumulative += probability;
            if threshold < cumulative {
                return state[step];
            }
        }
        // Rounding can leave the cumulative sum just under 1
        self.states.last().is_some_and(|state| state[step])
    }
}

/// A symmetric coupling between two voices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entanglement {
    pub a: VoiceId,
    pub b: VoiceId,
    pub kind: EntanglementKind,
    /// In [0, 1]
    pub strength: f64,
}

impl Entanglement {
    /// The other side of the pair, if `voice` is part of it
    pub fn partner(&self, voice: VoiceId) -> Option<VoiceId> {
        if self.a == voice {
            Some(self.b)
        } else if self.b == voice {
            Some(self.a)
        } else {
            None
        }
    }

    /// Step offset used by phase-shift entanglements
    pub fn phase_offset(&self) -> usize {
        (self.strength * 4.0).floor() as usize
    }
}

/// One recorded collapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub voice: VoiceId,
    pub step: usize,
    pub result: bool,
}

/// Arena of superpositions plus the entanglements between voices
#[derive(Debug, Clone)]
pub struct QuantumRegistry {
    slots: Vec<Option<Superposition>>,
    entanglements: Vec<Entanglement>,
    history: VecDeque<Observation>,
}

impl QuantumRegistry {
    /// Registry with room for `capacity` superpositions
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            entanglements: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live superpositions
    pub fn superposition_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn slot_of(&self, voice: VoiceId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|s| s.voice == voice))
    }

    /// Hold `candidates` for `voice` with uniform probabilities. The live
    /// pattern is not touched.
    ///
    /// A voice has at most one superposition; creating another replaces it in
    /// the same slot. Returns None (and does nothing) without candidates or
    /// when every slot is taken.
    pub fn create_superposition(
        &mut self,
        voice: VoiceId,
        candidates: Vec<Steps>,
    ) -> Option<SuperpositionId> {
        if candidates.is_empty() {
            log::warn!("Ignoring superposition for {} without candidates", voice);
            return None;
        }

        let index = match self.slot_of(voice) {
            Some(index) => index,
            None => match self.slots.iter().position(Option::is_none) {
                Some(index) => index,
                None => {
                    log::warn!(
                        "No free superposition slot for {} ({} in use)",
                        voice,
                        self.capacity()
                    );
                    return None;
                }
            },
        };

        let probability = 1.0 / candidates.len() as f64;
        log::debug!(
            "Superposition of {} candidates for {} in slot {}",
            candidates.len(),
            voice,
            index
        );
        self.slots[index] = Some(Superposition {
            voice,
            probabilities: vec![probability; candidates.len()],
            states: candidates,
            collapsed: false,
        });
        Some(SuperpositionId(index))
    }

    pub fn superposition(&self, voice: VoiceId) -> Option<&Superposition> {
        self.slot_of(voice).and_then(|index| self.slots[index].as_ref())
    }

    pub fn superposition_by_id(&self, id: SuperpositionId) -> Option<&Superposition> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Free the voice's slot. Returns whether there was one.
    pub fn remove_superposition(&mut self, voice: VoiceId) -> bool {
        match self.slot_of(voice) {
            Some(index) => {
                self.slots[index] = None;
                true
            }
            None => false,
        }
    }

    /// Couple two distinct voices. `strength` is clamped to [0, 1].
    pub fn entangle(
        &mut self,
        a: VoiceId,
        b: VoiceId,
        kind: EntanglementKind,
        strength: f64,
    ) -> Option<EntanglementId> {
        if a == b {
            log::warn!("Ignoring entanglement of {} with itself", a);
            return None;
        }

        let strength = if strength.is_nan() {
            0.0
        } else {
            strength.clamp(0.0, 1.0)
        };
        self.entanglements.push(Entanglement {
            a,
            b,
            kind,
            strength,
        });
        log::debug!("Entangled {} and {} ({}, {:.2})", a, b, kind.name(), strength);
        Some(EntanglementId(self.entanglements.len() - 1))
    }

    /// Couple two voices with a random kind and strength
    pub fn entangle_random<R: Rng + ?Sized>(
        &mut self,
        a: VoiceId,
        b: VoiceId,
        rng: &mut R,
    ) -> Option<EntanglementId> {
        let kind = EntanglementKind::ALL[rng.gen_range(0..EntanglementKind::ALL.len())];
        let strength = rng.gen_range(0.0..1.0);
        self.entangle(a, b, kind, strength)
    }

    pub fn entanglements(&self) -> &[Entanglement] {
        &self.entanglements
    }

    pub fn entanglement(&self, id: EntanglementId) -> Option<&Entanglement> {
        self.entanglements.get(id.0)
    }

    /// Collapse one step of `voice` into the live pattern and cascade it to
    /// direct partners. Returns the observed bit, or None when there is no
    /// open superposition for the voice or `step` is out of range.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        bank: &PatternBank,
        voice: VoiceId,
        step: usize,
        rng: &mut R,
    ) -> Option<bool> {
        if step >= STEPS {
            return None;
        }
        let superposition = self.superposition(voice).filter(|s| !s.collapsed)?;
        let result = superposition.draw(step, rng);

        bank.with_pattern(voice, |pattern| pattern.set_step(step, result));
        self.record(Observation {
            voice,
            step,
            result,
        });
        self.cascade(bank, voice, step, result);
        Some(result)
    }

    /// Apply an observation to every entanglement that contains `voice`.
    /// Partners' own entanglements are not followed.
    fn cascade(&mut self, bank: &PatternBank, voice: VoiceId, step: usize, result: bool) {
        let partners: Vec<(VoiceId, Entanglement)> = self
            .entanglements
            .iter()
            .filter_map(|e| e.partner(voice).map(|partner| (partner, *e)))
            .collect();

        for (partner, entanglement) in partners {
            match entanglement.kind {
                EntanglementKind::Inverse => {
                    bank.with_pattern(partner, |p| p.set_step(step, !result));
                }
                EntanglementKind::Mirror => {
                    bank.with_pattern(partner, |p| p.set_step(step, result));
                }
                EntanglementKind::PhaseShift => {
                    let shifted = (step + entanglement.phase_offset()) % STEPS;
                    bank.with_pattern(partner, |p| p.set_step(shifted, result));
                }
                EntanglementKind::ProbabilitySwap => self.swap_probabilities(voice, partner),
            }
        }
    }

    /// Trade probability vectors. Needs both superpositions with the same
    /// number of candidates; anything else is left alone.
    fn swap_probabilities(&mut self, a: VoiceId, b: VoiceId) {
        let (Some(i), Some(j)) = (self.slot_of(a), self.slot_of(b)) else {
            return;
        };
        let (low, high) = (i.min(j), i.max(j));
        let (head, tail) = self.slots.split_at_mut(high);
        if let (Some(first), Some(second)) = (head[low].as_mut(), tail[0].as_mut()) {
            if first.probabilities.len() == second.probabilities.len() {
                std::mem::swap(&mut first.probabilities, &mut second.probabilities);
            } else {
                log::debug!("Probability swap skipped: {} vs {} candidates", a, b);
            }
        }
    }

    /// Observe every step of the voice in order, then close the
    /// superposition. Returns the resulting pattern.
    pub fn collapse_all<R: Rng + ?Sized>(
        &mut self,
        bank: &PatternBank,
        voice: VoiceId,
        rng: &mut R,
    ) -> Option<Steps> {
        if !self.superposition(voice).is_some_and(|s| !s.collapsed) {
            return None;
        }

        for step in 0..STEPS {
            self.observe(bank, voice, step, rng);
        }
        if let Some(index) = self.slot_of(voice) {
            if let Some(superposition) = self.slots[index].as_mut() {
                superposition.collapsed = true;
            }
        }
        log::debug!("Collapsed {} superposition", voice);
        Some(bank.steps(voice))
    }

    fn record(&mut self, observation: Observation) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(observation);
    }

    /// Most recent observations, oldest first
    pub fn observation_history(&self) -> &VecDeque<Observation> {
        &self.history
    }

    /// Drop every superposition, entanglement and recorded observation
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.entanglements.clear();
        self.history.clear();
    }
}

impl Default for QuantumRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Combine two loops as waves: each bit is +1 or -1 and the sum decides.
/// Agreement keeps the shared bit; disagreement is a fair coin flip.
pub fn create_quantum_interference<R: Rng + ?Sized>(a: &Steps, b: &Steps, rng: &mut R) -> Steps {
    std::array::from_fn(|i| {
        let wave = |on: bool| if on { 1 } else { -1 };
        let sum = wave(a[i]) + wave(b[i]);
        match sum {
            s if s > 0 => true,
            s if s < 0 => false,
            _ => rng.gen_bool(0.5),
        }
    })
}

/// Each step is an independent ±1 random walk; positive endpoints are hits
pub fn quantum_random_walk_pattern<R: Rng + ?Sized>(rng: &mut R) -> Steps {
    std::array::from_fn(|_| {
        let position: i32 = (0..RANDOM_WALK_STEPS)
            .map(|_| if rng.gen_bool(0.5) { 1 } else { -1 })
            .sum();
        position > 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::pattern::steps_from_bits;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(17)
    }

    #[test]
    fn test_superposition_is_uniform_and_passive() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        let id = registry
            .create_superposition(VoiceId::Drum, vec![[true; STEPS], [false; STEPS]])
            .unwrap();

        let superposition = registry.superposition_by_id(id).unwrap();
        assert_eq!(superposition.probabilities(), &[0.5, 0.5]);
        assert!(!superposition.is_collapsed());
        assert!(!bank.pattern(VoiceId::Drum).has_active_steps());
    }

    #[test]
    fn test_draw_falls_back_to_last_state() {
        let superposition = Superposition {
            voice: VoiceId::Drum,
            states: vec![[false; STEPS], [true; STEPS]],
            probabilities: vec![0.0, 0.0],
            collapsed: false,
        };
        let mut rng = rng();
        for step in 0..STEPS {
            assert!(superposition.draw(step, &mut rng));
        }
    }

    #[test]
    fn test_single_candidate_observation_is_certain() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Synth1, vec![[true; STEPS]]);

        assert_eq!(registry.observe(&bank, VoiceId::Synth1, 3, &mut rng()), Some(true));
        // Only the observed step changes
        assert_eq!(bank.pattern(VoiceId::Synth1).active_steps(), vec![3]);
        assert_eq!(
            registry.observation_history().back(),
            Some(&Observation {
                voice: VoiceId::Synth1,
                step: 3,
                result: true
            })
        );
    }

    #[test]
    fn test_inverse_entanglement_is_synchronous() {
        let bank = PatternBank::new();
        bank.with_pattern(VoiceId::Synth2, |p| p.set_pattern(&[true; STEPS]));
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]);
        registry.entangle(VoiceId::Drum, VoiceId::Synth2, EntanglementKind::Inverse, 0.5);

        assert_eq!(registry.observe(&bank, VoiceId::Drum, 6, &mut rng()), Some(true));
        assert!(!bank.pattern(VoiceId::Synth2).is_step_active(6));
        assert!(bank.pattern(VoiceId::Synth2).is_step_active(5));
    }

    #[test]
    fn test_entanglement_is_symmetric() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Synth2, vec![[true; STEPS]]);
        registry.entangle(VoiceId::Drum, VoiceId::Synth2, EntanglementKind::Mirror, 1.0);

        registry.observe(&bank, VoiceId::Synth2, 9, &mut rng());
        assert_eq!(bank.pattern(VoiceId::Drum).active_steps(), vec![9]);
    }

    #[test]
    fn test_phase_shift_offsets_by_strength() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]);
        registry.entangle(VoiceId::Drum, VoiceId::Synth1, EntanglementKind::PhaseShift, 0.6);

        registry.observe(&bank, VoiceId::Drum, 15, &mut rng());
        // floor(0.6 * 4) = 2, wrapping past the end
        assert_eq!(bank.pattern(VoiceId::Synth1).active_steps(), vec![1]);
    }

    #[test]
    fn test_cascade_does_not_chain() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]);
        registry.entangle(VoiceId::Drum, VoiceId::Synth1, EntanglementKind::Mirror, 0.0);
        registry.entangle(VoiceId::Synth1, VoiceId::Synth2, EntanglementKind::Mirror, 0.0);

        registry.observe(&bank, VoiceId::Drum, 0, &mut rng());
        assert!(bank.pattern(VoiceId::Synth1).is_step_active(0));
        assert!(!bank.pattern(VoiceId::Synth2).has_active_steps());
    }

    #[test]
    fn test_probability_swap() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS], [false; STEPS]]);
        registry.create_superposition(
            VoiceId::Synth1,
            vec![[true; STEPS], [false; STEPS]],
        );
        // Make the vectors distinguishable
        registry.slots[1].as_mut().unwrap().probabilities = vec![0.9, 0.1];
        registry.entangle(VoiceId::Drum, VoiceId::Synth1, EntanglementKind::ProbabilitySwap, 0.0);

        registry.observe(&bank, VoiceId::Drum, 0, &mut rng());
        assert_eq!(
            registry.superposition(VoiceId::Drum).unwrap().probabilities(),
            &[0.9, 0.1]
        );
        assert_eq!(
            registry.superposition(VoiceId::Synth1).unwrap().probabilities(),
            &[0.5, 0.5]
        );
    }

    #[test]
    fn test_probability_swap_needs_matching_lengths() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]);
        registry.create_superposition(VoiceId::Synth1, vec![[true; STEPS], [false; STEPS]]);
        registry.entangle(VoiceId::Drum, VoiceId::Synth1, EntanglementKind::ProbabilitySwap, 0.0);

        registry.observe(&bank, VoiceId::Drum, 0, &mut rng());
        assert_eq!(registry.superposition(VoiceId::Drum).unwrap().probabilities(), &[1.0]);
    }

    #[test]
    fn test_collapse_all_then_observe_is_noop() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        let target = steps_from_bits([1, 0, 1, 1, 0, 0, 1, 0, 1, 0, 0, 0, 1, 1, 0, 1]);
        registry.create_superposition(VoiceId::Drum, vec![target]);

        assert_eq!(registry.collapse_all(&bank, VoiceId::Drum, &mut rng()), Some(target));
        assert!(registry.superposition(VoiceId::Drum).unwrap().is_collapsed());
        assert_eq!(registry.observation_history().len(), STEPS);

        assert_eq!(registry.observe(&bank, VoiceId::Drum, 0, &mut rng()), None);
        assert_eq!(registry.collapse_all(&bank, VoiceId::Drum, &mut rng()), None);
    }

    #[test]
    fn test_observe_without_superposition() {
        let bank = PatternBank::new();
        let mut registry = QuantumRegistry::default();
        assert_eq!(registry.observe(&bank, VoiceId::Drum, 0, &mut rng()), None);

        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]);
        assert_eq!(registry.observe(&bank, VoiceId::Drum, STEPS, &mut rng()), None);
    }

    #[test]
    fn test_capacity_exhaustion_is_noop() {
        let mut registry = QuantumRegistry::new(1);
        assert!(registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]).is_some());
        assert!(registry.create_superposition(VoiceId::Synth1, vec![[true; STEPS]]).is_none());
        assert!(registry.superposition(VoiceId::Synth1).is_none());

        // Replacing the voice that already owns the slot still works
        let id = registry.create_superposition(VoiceId::Drum, vec![[false; STEPS]; 2]);
        assert_eq!(id.map(SuperpositionId::index), Some(0));
        assert_eq!(registry.superposition_count(), 1);

        assert!(registry.remove_superposition(VoiceId::Drum));
        assert!(registry.create_superposition(VoiceId::Synth1, vec![[true; STEPS]]).is_some());
    }

    #[test]
    fn test_entangle_rejects_self_and_clamps_strength() {
        let mut registry = QuantumRegistry::default();
        assert!(registry.entangle(VoiceId::Drum, VoiceId::Drum, EntanglementKind::Mirror, 0.5).is_none());

        let id = registry
            .entangle(VoiceId::Drum, VoiceId::Synth1, EntanglementKind::PhaseShift, 7.0)
            .unwrap();
        let entanglement = registry.entanglement(id).unwrap();
        assert_eq!(entanglement.strength, 1.0);
        assert_eq!(entanglement.phase_offset(), 4);

        let id = registry.entangle_random(VoiceId::Synth1, VoiceId::Synth2, &mut rng()).unwrap();
        let strength = registry.entanglement(id).unwrap().strength;
        assert!((0.0..1.0).contains(&strength));
    }

    #[test]
    fn test_clear() {
        let mut registry = QuantumRegistry::default();
        registry.create_superposition(VoiceId::Drum, vec![[true; STEPS]]);
        registry.entangle(VoiceId::Drum, VoiceId::Synth1, EntanglementKind::Mirror, 0.5);
        registry.clear();

        assert_eq!(registry.superposition_count(), 0);
        assert!(registry.entanglements().is_empty());
        assert!(registry.observation_history().is_empty());
        assert_eq!(registry.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_interference_of_equal_patterns_is_constructive() {
        let mut rng = rng();
        let pattern = steps_from_bits([1, 0, 0, 1, 1, 0, 1, 0, 0, 0, 1, 1, 0, 1, 0, 0]);
        assert_eq!(create_quantum_interference(&pattern, &pattern, &mut rng), pattern);

        let silent = [false; STEPS];
        assert_eq!(create_quantum_interference(&silent, &silent, &mut rng), silent);
    }

    #[test]
    fn test_interference_of_opposite_patterns_flips_coins() {
        let mut rng = rng();
        let all_true = [true; STEPS];
        let all_false = [false; STEPS];

        let mut hits = 0;
        for _ in 0..20 {
            let result = create_quantum_interference(&all_true, &all_false, &mut rng);
            hits += result.iter().filter(|&&on| on).count();
        }
        // 320 fair coin flips
        assert!(hits > 100 && hits < 220, "hits = {}", hits);
    }

    #[test]
    fn test_random_walk_pattern_varies() {
        let mut rng = rng();
        let patterns: Vec<Steps> = (0..8).map(|_| quantum_random_walk_pattern(&mut rng)).collect();
        assert!(patterns.iter().any(|p| p.iter().any(|&on| on)));
        assert!(patterns.iter().any(|p| p.iter().any(|&on| !on)));
    }
}
