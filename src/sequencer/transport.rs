// Transport - Playhead, tempo and lookahead dispatch
//
// Holds the step cursor and the absolute time of the next step. Each poll
// dispatches every step whose time falls inside [.., now + lookahead), so a
// late or jittery timer never skips a step; it just dispatches several at once.

use crate::messaging::note::{NoteEvent, NoteSink, step_velocity};
use crate::sequencer::bank::PatternBank;
use crate::sequencer::pattern::{STEPS, VoiceId};
use crate::sequencer::timeline::{Swing, Tempo};
use std::sync::Arc;
use std::time::Duration;

/// Default scheduling window ahead of "now"
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.1;

/// Default re-arm period of the poll timer
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Transport state (play/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Transport controller
/// Owns the musical time context and a handle to the patterns it plays
#[derive(Debug)]
pub struct Transport {
    patterns: Arc<PatternBank>,
    state: TransportState,
    tempo: Tempo,
    swing: Swing,
    current_step: usize,
    /// Unswung grid time of `current_step`, in clock seconds
    next_step_time: f64,
    lookahead: f64,
    poll_interval: Duration,
}

impl Transport {
    /// Create a stopped transport at 120 BPM with the reference lookahead
    pub fn new(patterns: Arc<PatternBank>) -> Self {
        Self {
            patterns,
            state: TransportState::Stopped,
            tempo: Tempo::default(),
            swing: Swing::default(),
            current_step: 0,
            next_step_time: 0.0,
            lookahead: DEFAULT_LOOKAHEAD_SECS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the lookahead window and poll period.
    ///
    /// The poll period must be shorter than the window, otherwise steps would
    /// be dispatched after their time; invalid pairs are ignored.
    pub fn set_timing(&mut self, lookahead_secs: f64, poll_interval: Duration) -> bool {
        if !(lookahead_secs > 0.0) || poll_interval.as_secs_f64() >= lookahead_secs {
            log::warn!(
                "Ignoring scheduler timing: lookahead {}s, poll {:?}",
                lookahead_secs,
                poll_interval
            );
            return false;
        }
        self.lookahead = lookahead_secs;
        self.poll_interval = poll_interval;
        true
    }

    pub fn patterns(&self) -> &Arc<PatternBank> {
        &self.patterns
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Rewind to step 0 at `now` and start playing
    pub fn start(&mut self, now: f64) {
        self.current_step = 0;
        self.next_step_time = now;
        self.state = TransportState::Playing;
    }

    /// Stop. The cursor stays where it was; the next start rewinds it.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    /// Set tempo (clamped to [60, 240]).
    /// Only steps computed after this call use the new spacing.
    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo.set_bpm(bpm);
    }

    pub fn swing(&self) -> &Swing {
        &self.swing
    }

    /// Set swing ratio (clamped to [0, MAX_SWING])
    pub fn set_swing(&mut self, ratio: f64) {
        self.swing = Swing::new(ratio);
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn next_step_time(&self) -> f64 {
        self.next_step_time
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Dispatch every step due before `now + lookahead`.
    /// Returns the number of steps dispatched (0 while stopped).
    pub fn dispatch_due(&mut self, now: f64, sink: &mut dyn NoteSink) -> usize {
        if !self.is_playing() {
            return 0;
        }

        let horizon = now + self.lookahead;
        let mut dispatched = 0;
        while self.next_step_time < horizon {
            self.dispatch_current(sink);
            dispatched += 1;
        }
        dispatched
    }

    /// Fire the current step, then advance the cursor by one step
    fn dispatch_current(&mut self, sink: &mut dyn NoteSink) {
        let step = self.current_step;
        let time = self.next_step_time + self.swing.offset_seconds(step, &self.tempo);
        let velocity = step_velocity(step);

        sink.step_advanced(step, time);
        for voice in VoiceId::ALL {
            // Copy under the voice's lock: a concurrent mutation is either
            // fully visible or not at all
            if self.patterns.pattern(voice).is_step_active(step) {
                log::trace!("{} fires step {} at {:.4}s", voice, step, time);
                sink.note(NoteEvent {
                    voice,
                    step,
                    time,
                    velocity,
                });
            }
        }

        self.current_step = (step + 1) % STEPS;
        self.next_step_time += self.tempo.step_duration_seconds();
    }
}
