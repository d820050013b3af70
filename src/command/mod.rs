// Edit history for the pattern grid
//
// Every user edit routed through the engine becomes a PatternCommand, so it
// can be undone and redone. Chaos mutations and quantum observations are not
// recorded; they are part of the performance, not the edit.
//
// - PatternCommand trait: execute(), undo(), description()
// - CommandManager: capped undo/redo stacks
// - Concrete commands: ToggleStepCommand, SetPatternCommand, SnapshotCommand

pub mod commands;
pub mod manager;
pub mod trait_def;

pub use commands::{SetPatternCommand, SnapshotCommand, ToggleStepCommand};
pub use manager::CommandManager;
pub use trait_def::{CommandError, CommandResult, PatternCommand};
