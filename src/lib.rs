// Nexus Seq - Library exports for the demo binary, tests and benchmarks

pub mod chaos;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod messaging;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use chaos::{ChaosDirector, MutationKind};
pub use command::{CommandManager, PatternCommand};
pub use config::{ChaosConfig, EngineConfig};
pub use engine::SequencerEngine;
pub use error::{EngineError, EngineResult};
pub use generator::{Constraints, EntanglementKind, MarkovGenerator, QuantumRegistry};
pub use messaging::{
    EngineEvent, EngineObserver, NoteConsumer, NoteEvent, NoteRecorder, NoteSink, ObserverList,
    create_note_channel,
};
pub use sequencer::{
    AudioClock, Clock, Pattern, PatternBank, PatternSnapshot, STEPS, Scheduler, SnapshotTimeline,
    Steps, SystemClock, TapTempo, Tempo, TimelineFrame, Transport, TransportState, VoiceId,
};
