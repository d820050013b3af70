// Tap tempo - BPM from the spacing of user taps

use crate::sequencer::timeline::{MAX_BPM, MIN_BPM};
use std::collections::VecDeque;

/// Silence after which a new tap starts a fresh measurement (seconds)
const TAP_TIMEOUT_SECS: f64 = 2.0;

/// Number of most recent taps averaged
const MAX_TAPS: usize = 8;

/// Averages the interval between recent taps
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: VecDeque<f64>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at clock time `now` (seconds).
    /// Returns the tempo once at least two taps are in the window.
    pub fn tap(&mut self, now: f64) -> Option<f64> {
        if let Some(&last) = self.taps.back() {
            if now - last > TAP_TIMEOUT_SECS || now < last {
                self.taps.clear();
            }
        }

        self.taps.push_back(now);
        if self.taps.len() > MAX_TAPS {
            self.taps.pop_front();
        }

        self.tempo()
    }

    /// Tempo implied by the current taps, rounded to whole BPM and clamped
    pub fn tempo(&self) -> Option<f64> {
        let (first, last) = (self.taps.front()?, self.taps.back()?);
        let intervals = self.taps.len() - 1;
        if intervals == 0 {
            return None;
        }

        let average = (last - first) / intervals as f64;
        if average <= 0.0 {
            return None;
        }
        Some((60.0 / average).round().clamp(MIN_BPM, MAX_BPM))
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tap_has_no_tempo() {
        let mut tap = TapTempo::new();
        assert_eq!(tap.tap(1.0), None);
        assert_eq!(tap.tap_count(), 1);
    }

    #[test]
    fn test_steady_taps() {
        let mut tap = TapTempo::new();
        tap.tap(0.0);
        assert_eq!(tap.tap(0.5), Some(120.0));
        assert_eq!(tap.tap(1.0), Some(120.0));
    }

    #[test]
    fn test_timeout_resets() {
        let mut tap = TapTempo::new();
        tap.tap(0.0);
        tap.tap(0.5);
        assert_eq!(tap.tap(3.0), None);
        assert_eq!(tap.tap_count(), 1);
    }

    #[test]
    fn test_window_keeps_last_taps() {
        let mut tap = TapTempo::new();
        // Slow taps first, then fast ones push them out of the window
        let mut now = 0.0;
        for _ in 0..3 {
            tap.tap(now);
            now += 1.0;
        }
        for _ in 0..MAX_TAPS {
            tap.tap(now);
            now += 0.25;
        }
        assert_eq!(tap.tap_count(), MAX_TAPS);
        assert_eq!(tap.tempo(), Some(240.0));
    }

    #[test]
    fn test_tempo_is_clamped() {
        let mut tap = TapTempo::new();
        tap.tap(0.0);
        assert_eq!(tap.tap(0.1), Some(MAX_BPM));

        tap.reset();
        tap.tap(0.0);
        assert_eq!(tap.tap(1.9), Some(MIN_BPM));
    }
}
