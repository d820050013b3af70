// PatternCommand trait definition

use crate::sequencer::bank::PatternBank;
use thiserror::Error;

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur during command execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Undo failed: {0}")]
    UndoFailed(String),

    #[error("Pattern needs {expected} steps, got {actual}")]
    InvalidPattern { expected: usize, actual: usize },
}

/// An edit to the live pattern bank that can be taken back
///
/// Commands store whatever they overwrite during `execute()` so that `undo()`
/// puts it back. Redo calls `execute()` again on the same instance.
///
/// # Example
/// ```no_run
/// use nexus_seq::command::trait_def::{CommandResult, PatternCommand};
/// use nexus_seq::sequencer::{PatternBank, VoiceId};
///
/// struct ClearDrumCommand {
///     previous: Option<[bool; 16]>,
/// }
///
/// impl PatternCommand for ClearDrumCommand {
///     fn execute(&mut self, bank: &PatternBank) -> CommandResult<()> {
///         self.previous = Some(bank.steps(VoiceId::Drum));
///         bank.with_pattern(VoiceId::Drum, |p| p.clear());
///         Ok(())
///     }
///
///     fn undo(&mut self, bank: &PatternBank) -> CommandResult<()> {
///         if let Some(previous) = self.previous {
///             bank.with_pattern(VoiceId::Drum, |p| p.set_pattern(&previous));
///         }
///         Ok(())
///     }
///
///     fn description(&self) -> String {
///         "Clear drum".to_string()
///     }
/// }
/// ```
pub trait PatternCommand: Send {
    fn execute(&mut self, bank: &PatternBank) -> CommandResult<()>;

    /// Restore what `execute()` overwrote
    fn undo(&mut self, bank: &PatternBank) -> CommandResult<()>;

    /// Human-readable label, e.g. "Toggle drum step 4"
    fn description(&self) -> String;
}
