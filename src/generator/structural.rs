// Structural generators - Whole patterns built from parameters
//
// Euclidean spacing, recursive bisection, golden-ratio stepping and cellular
// automata. Everything here is deterministic except the random-walk generator
// in the interference module.

use crate::sequencer::pattern::{STEPS, Steps};

/// Golden ratio
pub const PHI: f64 = 1.618033988749895;

/// Bisection depth of `fractal`
pub const FRACTAL_DEPTH: u32 = 4;

/// Number of golden-ratio jumps in `golden_ratio`
pub const GOLDEN_RATIO_HITS: usize = 6;

/// Wolfram rules the chaos director picks from
pub const CA_RULES: [u8; 5] = [30, 90, 110, 150, 184];

/// Rows of the Conway grid (one per voice)
pub const GRID_ROWS: usize = 3;

/// `hits` onsets at `floor(i * 16 / hits)`.
///
/// This is plain even spacing, not Bjorklund: for some hit counts the
/// rotation differs from the canonical Euclidean necklace. `hits` is capped
/// at 16; zero hits gives an empty pattern.
pub fn euclidean(hits: usize) -> Steps {
    let hits = hits.min(STEPS);
    let mut steps = [false; STEPS];
    for i in 0..hits {
        steps[i * STEPS / hits] = true;
    }
    steps
}

/// Mark the midpoint of [0, 15], then recurse into both halves
pub fn fractal() -> Steps {
    fn bisect(steps: &mut Steps, start: usize, end: usize, depth: u32) {
        if depth == 0 {
            return;
        }
        let mid = (start + end) / 2;
        steps[mid] = true;
        bisect(steps, start, mid, depth - 1);
        bisect(steps, mid, end, depth - 1);
    }

    let mut steps = [false; STEPS];
    bisect(&mut steps, 0, STEPS - 1, FRACTAL_DEPTH);
    steps
}

/// Walk around the loop in jumps of 2φ steps, marking where each jump lands
pub fn golden_ratio() -> Steps {
    let mut steps = [false; STEPS];
    let mut position = 0.0_f64;
    for _ in 0..GOLDEN_RATIO_HITS {
        position = (position + PHI * 2.0) % STEPS as f64;
        steps[position.floor() as usize] = true;
    }
    steps
}

/// One generation of an elementary (Wolfram) cellular automaton on a ring
pub fn cellular_automaton_1d(steps: &Steps, rule: u8) -> Steps {
    std::array::from_fn(|i| {
        let left = steps[(i + STEPS - 1) % STEPS] as u8;
        let center = steps[i] as u8;
        let right = steps[(i + 1) % STEPS] as u8;
        let index = (left << 2) | (center << 1) | right;
        (rule >> index) & 1 == 1
    })
}

/// One Game-of-Life generation on the toroidal 3x16 voice grid.
/// Survival with 2 or 3 live neighbours, birth with exactly 3.
pub fn conway_step(grid: &[Steps; GRID_ROWS]) -> [Steps; GRID_ROWS] {
    std::array::from_fn(|row| {
        std::array::from_fn(|col| {
            let neighbours = live_neighbours(grid, row, col);
            if grid[row][col] {
                neighbours == 2 || neighbours == 3
            } else {
                neighbours == 3
            }
        })
    })
}

fn live_neighbours(grid: &[Steps; GRID_ROWS], row: usize, col: usize) -> usize {
    let mut count = 0;
    for dr in [GRID_ROWS - 1, 0, 1] {
        for dc in [STEPS - 1, 0, 1] {
            if dr == 0 && dc == 0 {
                continue;
            }
            if grid[(row + dr) % GRID_ROWS][(col + dc) % STEPS] {
                count += 1;
            }
        }
    }
    count
}
