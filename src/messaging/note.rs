// Note events - Scheduler → rendering collaborator

use crate::sequencer::pattern::VoiceId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// One voice firing at one step, at an absolute clock time (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub voice: VoiceId,
    pub step: usize,
    pub time: f64,
    /// Always in (0, 1]
    pub velocity: f32,
}

/// Accent by position in the bar: downbeats loudest, off-beats softest
pub fn step_velocity(step: usize) -> f32 {
    if step % 4 == 0 {
        1.0
    } else if step % 2 == 0 {
        0.8
    } else {
        0.6
    }
}

/// Consumer of dispatched notes (audio renderer, MIDI bridge, test recorder)
///
/// Called from the scheduler thread while the transport lock is held, so
/// implementations must not call back into the scheduler.
pub trait NoteSink: Send {
    /// A voice fires
    fn note(&mut self, event: NoteEvent);

    /// The playhead reached `step`, whether or not any voice fired
    fn step_advanced(&mut self, _step: usize, _time: f64) {}
}

impl NoteSink for Vec<NoteEvent> {
    fn note(&mut self, event: NoteEvent) {
        self.push(event);
    }
}

/// Cloneable recording sink; every clone sees the same event list
#[derive(Debug, Clone, Default)]
pub struct NoteRecorder {
    events: Arc<Mutex<Vec<NoteEvent>>>,
    steps: Arc<Mutex<Vec<(usize, f64)>>>,
}

impl NoteRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every note received so far
    pub fn events(&self) -> Vec<NoteEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every playhead position received so far, as (step, time)
    pub fn steps(&self) -> Vec<(usize, f64)> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NoteSink for NoteRecorder {
    fn note(&mut self, event: NoteEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn step_advanced(&mut self, step: usize, time: f64) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((step, time));
    }
}

impl<S: NoteSink + ?Sized> NoteSink for Box<S> {
    fn note(&mut self, event: NoteEvent) {
        (**self).note(event);
    }

    fn step_advanced(&mut self, step: usize, time: f64) {
        (**self).step_advanced(step, time);
    }
}
