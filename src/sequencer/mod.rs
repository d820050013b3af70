// Sequencer module
// Pattern model, musical time, the clock-driven step scheduler and the
// rewindable snapshot timeline

pub mod bank;
pub mod clock;
pub mod pattern;
pub mod scheduler;
pub mod snapshot_timeline;
pub mod tap_tempo;
pub mod timeline;
pub mod transport;

pub use bank::{PatternBank, PatternSnapshot, preset, preset_names};
pub use clock::{AudioClock, Clock, SystemClock};
pub use pattern::{Pattern, STEPS, Steps, VoiceId};
pub use scheduler::Scheduler;
pub use snapshot_timeline::{SnapshotTimeline, TimelineFrame};
pub use tap_tempo::TapTempo;
pub use timeline::{MAX_SWING, Swing, Tempo};
pub use transport::{Transport, TransportState};
