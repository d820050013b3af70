// Messaging - Everything that leaves the core
// Note events go to the rendering collaborator, engine events to observers.

pub mod channels;
pub mod events;
pub mod note;

pub use channels::{NoteConsumer, NoteProducer, create_note_channel};
pub use events::{EngineEvent, EngineObserver, ObserverList};
pub use note::{NoteEvent, NoteRecorder, NoteSink, step_velocity};
