// Snapshot timeline - Rewindable record of whole-bank states
//
// Frames are appended as the patterns change (edits, chaos ticks, quantum
// observations). A cursor marks the frame last recorded or travelled to;
// rewinding and fast-forwarding move the cursor without dropping frames.

use crate::sequencer::bank::PatternSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Frames kept when no length is configured
pub const DEFAULT_TIMELINE_LENGTH: usize = 100;

/// One recorded state of all three voices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineFrame {
    /// Clock time of the recording (seconds)
    pub time: f64,
    pub patterns: PatternSnapshot,
}

#[derive(Debug, Clone)]
pub struct SnapshotTimeline {
    frames: VecDeque<TimelineFrame>,
    cursor: usize,
    max_frames: usize,
    recording: bool,
}

impl SnapshotTimeline {
    /// Empty timeline keeping at most `max_frames` frames (at least 1)
    pub fn new(max_frames: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            cursor: 0,
            max_frames: max_frames.max(1),
            recording: true,
        }
    }

    /// Append a frame and move the cursor onto it. Once full, the oldest
    /// frame is dropped. Does nothing while recording is paused.
    pub fn record(&mut self, patterns: PatternSnapshot, time: f64) -> bool {
        if !self.recording {
            return false;
        }

        self.frames.push_back(TimelineFrame { time, patterns });
        if self.frames.len() > self.max_frames {
            self.frames.pop_front();
        }
        self.cursor = self.frames.len() - 1;
        log::trace!("Timeline frame {} at {:.3}s", self.cursor, time);
        true
    }

    /// Move the cursor to `index` and return that frame's patterns.
    /// Out-of-range indices leave the cursor where it is.
    pub fn travel_to(&mut self, index: usize) -> Option<PatternSnapshot> {
        let frame = self.frames.get(index)?;
        self.cursor = index;
        log::debug!("Travelled to timeline frame {} ({:.3}s)", index, frame.time);
        Some(frame.patterns)
    }

    /// Step the cursor back `steps` frames
    pub fn rewind(&mut self, steps: usize) -> Option<PatternSnapshot> {
        let index = self.cursor.checked_sub(steps)?;
        self.travel_to(index)
    }

    /// Step the cursor forward `steps` frames
    pub fn fast_forward(&mut self, steps: usize) -> Option<PatternSnapshot> {
        let index = self.cursor.checked_add(steps)?;
        self.travel_to(index)
    }

    /// Pause or resume recording
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Index of the current frame
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn frame(&self, index: usize) -> Option<&TimelineFrame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }
}

impl Default for SnapshotTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_TIMELINE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::pattern::STEPS;

    fn frame_with_drum_step(step: usize) -> PatternSnapshot {
        let mut snapshot = PatternSnapshot::default();
        snapshot.drum[step] = true;
        snapshot
    }

    #[test]
    fn test_rewind_and_fast_forward() {
        let mut timeline = SnapshotTimeline::default();
        for step in 0..4 {
            timeline.record(frame_with_drum_step(step), step as f64);
        }
        assert_eq!(timeline.position(), 3);

        assert_eq!(timeline.rewind(2), Some(frame_with_drum_step(1)));
        assert_eq!(timeline.position(), 1);
        assert_eq!(timeline.fast_forward(1), Some(frame_with_drum_step(2)));
        assert_eq!(timeline.position(), 2);
    }

    #[test]
    fn test_out_of_range_travel_keeps_cursor() {
        let mut timeline = SnapshotTimeline::default();
        timeline.record(frame_with_drum_step(0), 0.0);
        timeline.record(frame_with_drum_step(1), 1.0);

        assert_eq!(timeline.rewind(5), None);
        assert_eq!(timeline.fast_forward(1), None);
        assert_eq!(timeline.travel_to(2), None);
        assert_eq!(timeline.fast_forward(usize::MAX), None);
        assert_eq!(timeline.position(), 1);
    }

    #[test]
    fn test_oldest_frames_are_dropped() {
        let mut timeline = SnapshotTimeline::new(3);
        for step in 0..5 {
            timeline.record(frame_with_drum_step(step), step as f64);
        }
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.position(), 2);
        assert_eq!(timeline.frame(0).map(|f| f.time), Some(2.0));
        assert_eq!(timeline.travel_to(0), Some(frame_with_drum_step(2)));
    }

    #[test]
    fn test_recording_after_rewind_appends() {
        let mut timeline = SnapshotTimeline::default();
        timeline.record(frame_with_drum_step(0), 0.0);
        timeline.record(frame_with_drum_step(1), 1.0);
        timeline.rewind(1);

        timeline.record(frame_with_drum_step(STEPS - 1), 2.0);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.position(), 2);
        assert_eq!(timeline.travel_to(1), Some(frame_with_drum_step(1)));
    }

    #[test]
    fn test_paused_timeline_ignores_frames() {
        let mut timeline = SnapshotTimeline::new(0);
        assert_eq!(timeline.max_frames(), 1);

        timeline.set_recording(false);
        assert!(!timeline.record(PatternSnapshot::default(), 0.0));
        assert!(timeline.is_empty());

        timeline.set_recording(true);
        assert!(timeline.record(PatternSnapshot::default(), 0.0));
        timeline.clear();
        assert!(timeline.is_empty());
        assert_eq!(timeline.position(), 0);
    }
}
