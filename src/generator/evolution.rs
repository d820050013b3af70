// Pattern evolution - Density shaping, syncopation, mutation and crossover
// Pure functions over step arrays; randomness comes from the caller's rng.

use crate::sequencer::pattern::{STEPS, Steps, density};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Steps on the beat, left alone by syncopation
const STRONG_BEATS: [usize; 4] = [0, 4, 8, 12];

/// Shaping applied after Markov generation. `None` skips a stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Target fraction of active steps, every voice
    pub density: Option<f64>,
    /// Off-beat flip probability, drum only
    pub syncopation: Option<f64>,
    /// Hits per loop for synth2's even grid
    pub polyrhythm: Option<usize>,
}

/// Add or remove `floor(|target - current| * 16)` hits at random positions
pub fn adjust_density<R: Rng + ?Sized>(steps: &Steps, target: f64, rng: &mut R) -> Steps {
    let current = density(steps);
    let target = probability(target);
    let adding = target > current;
    let count = ((target - current).abs() * STEPS as f64).floor() as usize;

    // Candidates are the steps that can change in the wanted direction
    let mut candidates: Vec<usize> = (0..STEPS).filter(|&i| steps[i] != adding).collect();
    candidates.shuffle(rng);

    let mut result = *steps;
    for &index in candidates.iter().take(count) {
        result[index] = adding;
    }
    result
}

/// Flip each off-beat step with probability `amount`
pub fn add_syncopation<R: Rng + ?Sized>(steps: &Steps, amount: f64, rng: &mut R) -> Steps {
    let amount = probability(amount);
    let mut result = *steps;
    for (i, step) in result.iter_mut().enumerate() {
        if !STRONG_BEATS.contains(&i) && rng.gen_bool(amount) {
            *step = !*step;
        }
    }
    result
}

/// Replace with hits every `floor(16 / ratio)` steps from step 0.
/// A ratio of 0 or above 16 has no valid spacing and returns the input.
pub fn create_polyrhythm(steps: &Steps, ratio: usize) -> Steps {
    if ratio == 0 || ratio > STEPS {
        return *steps;
    }

    let mut result = [false; STEPS];
    for index in (0..STEPS).step_by(STEPS / ratio) {
        result[index] = true;
    }
    result
}

/// Flip each step with probability `rate`
pub fn mutate<R: Rng + ?Sized>(steps: &Steps, rate: f64, rng: &mut R) -> Steps {
    let rate = probability(rate);
    steps.map(|step| if rng.gen_bool(rate) { !step } else { step })
}

/// Single-point crossover: `a[..cut] ++ b[cut..]`, cut uniform in [0, 16)
pub fn crossover<R: Rng + ?Sized>(a: &Steps, b: &Steps, rng: &mut R) -> Steps {
    let cut = rng.gen_range(0..STEPS);
    let mut result = *b;
    result[..cut].copy_from_slice(&a[..cut]);
    result
}

/// A counterpart that mostly fills the gaps of `steps`:
/// empty steps become hits with p = 0.3, hits are doubled with p = 0.1
pub fn complementary<R: Rng + ?Sized>(steps: &Steps, rng: &mut R) -> Steps {
    steps.map(|on| {
        let p = if on { 0.1 } else { 0.3 };
        rng.gen_bool(p)
    })
}

/// Clamp to [0, 1]; NaN reads as 0
pub(crate) fn probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::pattern::steps_from_bits;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn four_on_floor() -> Steps {
        steps_from_bits([1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0])
    }

    #[test]
    fn test_adjust_density_adds_hits() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = four_on_floor();
        let denser = adjust_density(&base, 0.5, &mut rng);

        assert_eq!(density(&denser), 0.5);
        // Existing hits are kept
        for i in STRONG_BEATS {
            assert!(denser[i]);
        }
    }

    #[test]
    fn test_adjust_density_removes_hits() {
        let mut rng = StdRng::seed_from_u64(2);
        let sparser = adjust_density(&[true; STEPS], 0.25, &mut rng);
        assert_eq!(density(&sparser), 0.25);
    }

    #[test]
    fn test_adjust_density_at_target_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let base = four_on_floor();
        assert_eq!(adjust_density(&base, 0.25, &mut rng), base);
    }

    #[test]
    fn test_syncopation_keeps_strong_beats() {
        let mut rng = StdRng::seed_from_u64(4);
        let base = four_on_floor();
        let flipped = add_syncopation(&base, 1.0, &mut rng);

        for i in 0..STEPS {
            if STRONG_BEATS.contains(&i) {
                assert_eq!(flipped[i], base[i]);
            } else {
                assert_ne!(flipped[i], base[i]);
            }
        }
        assert_eq!(add_syncopation(&base, 0.0, &mut rng), base);
    }

    #[test]
    fn test_polyrhythm() {
        let empty = [false; STEPS];
        assert_eq!(create_polyrhythm(&empty, 4), four_on_floor());
        assert_eq!(create_polyrhythm(&empty, 16), [true; STEPS]);

        let base = four_on_floor();
        assert_eq!(create_polyrhythm(&base, 0), base);
        assert_eq!(create_polyrhythm(&base, 17), base);
    }

    #[test]
    fn test_mutate_rates() {
        let mut rng = StdRng::seed_from_u64(5);
        let base = four_on_floor();
        assert_eq!(mutate(&base, 0.0, &mut rng), base);
        assert_eq!(mutate(&base, 1.0, &mut rng), base.map(|b| !b));
    }

    #[test]
    fn test_crossover_takes_prefix_and_suffix() {
        let mut rng = StdRng::seed_from_u64(6);
        let a = [true; STEPS];
        let b = [false; STEPS];
        for _ in 0..20 {
            let child = crossover(&a, &b, &mut rng);
            let cut = child.iter().take_while(|&&on| on).count();
            assert!(cut < STEPS);
            assert!(child[cut..].iter().all(|&on| !on));
        }
    }

    #[test]
    fn test_complementary_of_full_pattern_is_sparse() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut hits = 0;
        for _ in 0..100 {
            hits += complementary(&[true; STEPS], &mut rng)
                .iter()
                .filter(|&&on| on)
                .count();
        }
        // Expected 160 out of 1600
        assert!(hits > 80 && hits < 260, "hits = {}", hits);
    }
}
