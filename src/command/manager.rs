// CommandManager - Capped undo/redo stacks over the pattern bank

use crate::command::trait_def::{CommandError, CommandResult, PatternCommand};
use crate::sequencer::bank::PatternBank;
use std::collections::VecDeque;

/// Default maximum number of commands to keep in history
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Runs pattern edits and keeps them for undo/redo
///
/// Executing a new command clears the redo stack. Once the undo stack holds
/// `max_history` commands the oldest one is dropped.
pub struct CommandManager {
    /// Most recent at the back
    undo_stack: VecDeque<Box<dyn PatternCommand>>,
    redo_stack: VecDeque<Box<dyn PatternCommand>>,
    max_history: usize,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    /// Create a manager keeping at most `max_history` undo steps (at least 1).
    /// The stacks grow as commands arrive.
    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    /// Execute a command and push it onto the undo stack.
    ///
    /// # Errors
    /// A failed command is not recorded and the redo stack is kept.
    pub fn execute(
        &mut self,
        mut command: Box<dyn PatternCommand>,
        bank: &PatternBank,
    ) -> CommandResult<()> {
        command.execute(bank)?;
        log::debug!("Executed: {}", command.description());

        self.undo_stack.push_back(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }

        Ok(())
    }

    /// Undo the most recent command. Returns its description.
    pub fn undo(&mut self, bank: &PatternBank) -> CommandResult<String> {
        let mut command = self
            .undo_stack
            .pop_back()
            .ok_or_else(|| CommandError::UndoFailed("Nothing to undo".into()))?;

        let description = command.description();
        if let Err(e) = command.undo(bank) {
            // Keep it where it was so history stays consistent
            self.undo_stack.push_back(command);
            return Err(e);
        }

        self.redo_stack.push_back(command);
        log::debug!("Undone: {}", description);
        Ok(description)
    }

    /// Redo the most recently undone command. Returns its description.
    pub fn redo(&mut self, bank: &PatternBank) -> CommandResult<String> {
        let mut command = self
            .redo_stack
            .pop_back()
            .ok_or_else(|| CommandError::ExecutionFailed("Nothing to redo".into()))?;

        let description = command.description();
        if let Err(e) = command.execute(bank) {
            self.redo_stack.push_back(command);
            return Err(e);
        }

        self.undo_stack.push_back(command);
        log::debug!("Redone: {}", description);
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the command `undo()` would take back
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|cmd| cmd.description())
    }

    /// Description of the command `redo()` would replay
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|cmd| cmd.description())
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("max_history", &self.max_history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::commands::{SetPatternCommand, ToggleStepCommand};
    use crate::sequencer::pattern::{STEPS, VoiceId};

    #[test]
    fn test_execute_command() {
        let mut manager = CommandManager::new();
        let bank = PatternBank::new();

        manager
            .execute(Box::new(ToggleStepCommand::new(VoiceId::Drum, 0)), &bank)
            .unwrap();

        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
        assert!(manager.can_undo());
        assert!(!manager.can_redo());
        assert!(bank.pattern(VoiceId::Drum).is_step_active(0));
    }

    #[test]
    fn test_undo_and_redo() {
        let mut manager = CommandManager::new();
        let bank = PatternBank::new();

        manager
            .execute(Box::new(ToggleStepCommand::new(VoiceId::Drum, 4)), &bank)
            .unwrap();

        let description = manager.undo(&bank).unwrap();
        assert_eq!(description, "Toggle drum step 4");
        assert!(!bank.pattern(VoiceId::Drum).is_step_active(4));
        assert_eq!(manager.redo_description().as_deref(), Some("Toggle drum step 4"));

        manager.redo(&bank).unwrap();
        assert!(bank.pattern(VoiceId::Drum).is_step_active(4));
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(manager.redo_count(), 0);
    }

    #[test]
    fn test_redo_stack_cleared_on_new_command() {
        let mut manager = CommandManager::new();
        let bank = PatternBank::new();

        manager
            .execute(Box::new(ToggleStepCommand::new(VoiceId::Drum, 1)), &bank)
            .unwrap();
        manager.undo(&bank).unwrap();
        manager
            .execute(Box::new(ToggleStepCommand::new(VoiceId::Drum, 2)), &bank)
            .unwrap();

        assert!(!manager.can_redo());
    }

    #[test]
    fn test_failed_command_is_not_recorded() {
        let mut manager = CommandManager::new();
        let bank = PatternBank::new();

        manager
            .execute(Box::new(ToggleStepCommand::new(VoiceId::Drum, 1)), &bank)
            .unwrap();
        manager.undo(&bank).unwrap();

        let result = manager.execute(
            Box::new(SetPatternCommand::new(VoiceId::Drum, &[true; 3])),
            &bank,
        );
        assert!(result.is_err());
        assert_eq!(manager.undo_count(), 0);
        // The failed edit did not start a new timeline
        assert!(manager.can_redo());
    }

    #[test]
    fn test_history_limit() {
        let mut manager = CommandManager::with_capacity(3);
        let bank = PatternBank::new();

        for step in 0..5 {
            manager
                .execute(Box::new(ToggleStepCommand::new(VoiceId::Synth1, step)), &bank)
                .unwrap();
        }
        assert_eq!(manager.undo_count(), 3);

        while manager.can_undo() {
            manager.undo(&bank).unwrap();
        }
        // The two oldest edits fell out of history and stay applied
        assert_eq!(bank.pattern(VoiceId::Synth1).active_steps(), vec![0, 1]);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let mut manager = CommandManager::with_capacity(usize::MAX);
        let bank = PatternBank::new();
        assert_eq!(manager.max_history(), usize::MAX);

        manager
            .execute(Box::new(ToggleStepCommand::new(VoiceId::Drum, 0)), &bank)
            .unwrap();
        assert_eq!(manager.undo_count(), 1);
        assert_eq!(CommandManager::with_capacity(0).max_history(), 1);
    }

    #[test]
    fn test_undo_restores_full_pattern() {
        let mut manager = CommandManager::new();
        let bank = PatternBank::new();

        manager
            .execute(Box::new(SetPatternCommand::new(VoiceId::Synth2, &[true; STEPS])), &bank)
            .unwrap();
        manager.undo(&bank).unwrap();
        assert_eq!(bank.steps(VoiceId::Synth2), [false; STEPS]);
    }

    #[test]
    fn test_empty_stacks() {
        let mut manager = CommandManager::new();
        let bank = PatternBank::new();

        assert!(manager.undo(&bank).is_err());
        assert!(manager.redo(&bank).is_err());
        assert_eq!(manager.undo_description(), None);
    }
}
