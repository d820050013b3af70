// Concrete command implementations

use crate::command::trait_def::{CommandError, CommandResult, PatternCommand};
use crate::sequencer::bank::{PatternBank, PatternSnapshot};
use crate::sequencer::pattern::{STEPS, Steps, VoiceId};

/// Flip a single step of one voice
///
/// Toggling is its own inverse, so no previous state is stored.
pub struct ToggleStepCommand {
    voice: VoiceId,
    step: usize,
}

impl ToggleStepCommand {
    /// Create a new ToggleStepCommand
    ///
    /// # Arguments
    /// * `voice` - The voice to edit
    /// * `step` - Step index, must be below 16
    pub fn new(voice: VoiceId, step: usize) -> Self {
        Self { voice, step }
    }
}

impl PatternCommand for ToggleStepCommand {
    fn execute(&mut self, bank: &PatternBank) -> CommandResult<()> {
        if self.step >= STEPS {
            return Err(CommandError::ExecutionFailed(format!(
                "Step {} out of range",
                self.step
            )));
        }
        bank.with_pattern(self.voice, |p| p.toggle_step(self.step));
        Ok(())
    }

    fn undo(&mut self, bank: &PatternBank) -> CommandResult<()> {
        bank.with_pattern(self.voice, |p| p.toggle_step(self.step));
        Ok(())
    }

    fn description(&self) -> String {
        format!("Toggle {} step {}", self.voice, self.step)
    }
}

/// Replace one voice's whole sequence
pub struct SetPatternCommand {
    voice: VoiceId,
    new_steps: Vec<bool>,
    old_steps: Option<Steps>,
}

impl SetPatternCommand {
    /// Create a new SetPatternCommand
    ///
    /// The length is checked on execute, not here, so malformed input from a
    /// control surface still produces a command that fails cleanly.
    pub fn new(voice: VoiceId, steps: &[bool]) -> Self {
        Self {
            voice,
            new_steps: steps.to_vec(),
            old_steps: None,
        }
    }
}

impl PatternCommand for SetPatternCommand {
    fn execute(&mut self, bank: &PatternBank) -> CommandResult<()> {
        if self.new_steps.len() != STEPS {
            // Pattern::set_pattern would ignore it too; this just keeps it
            // out of the history
            return Err(CommandError::InvalidPattern {
                expected: STEPS,
                actual: self.new_steps.len(),
            });
        }

        self.old_steps = Some(bank.with_pattern(self.voice, |p| {
            let old = p.get_pattern();
            p.set_pattern(&self.new_steps);
            old
        }));
        Ok(())
    }

    fn undo(&mut self, bank: &PatternBank) -> CommandResult<()> {
        let old_steps = self
            .old_steps
            .ok_or_else(|| CommandError::UndoFailed("No previous pattern stored".into()))?;

        bank.with_pattern(self.voice, |p| p.set_pattern(&old_steps));
        Ok(())
    }

    fn description(&self) -> String {
        format!("Set {} pattern", self.voice)
    }
}

type BankTransform = Box<dyn FnOnce(&PatternBank) + Send>;

/// Wrap an arbitrary bank transform (randomize, preset, AI generation, ...)
///
/// The first execute runs the transform and records the bank before and after.
/// Undo writes the before-image back; redo writes the after-image, so a random
/// transform redoes to exactly what it produced the first time.
///
/// A command scoped to one voice only reads and writes that voice, leaving
/// concurrent edits to the other voices alone.
pub struct SnapshotCommand {
    description: String,
    scope: Option<VoiceId>,
    transform: Option<BankTransform>,
    before: Option<PatternSnapshot>,
    after: Option<PatternSnapshot>,
}

impl SnapshotCommand {
    /// A transform that may touch every voice
    pub fn new(
        description: impl Into<String>,
        transform: impl FnOnce(&PatternBank) + Send + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            scope: None,
            transform: Some(Box::new(transform)),
            before: None,
            after: None,
        }
    }

    /// A transform confined to `voice`
    pub fn for_voice(
        voice: VoiceId,
        description: impl Into<String>,
        transform: impl FnOnce(&PatternBank) + Send + 'static,
    ) -> Self {
        Self {
            scope: Some(voice),
            ..Self::new(description, transform)
        }
    }

    fn capture(&self, bank: &PatternBank) -> PatternSnapshot {
        match self.scope {
            Some(voice) => {
                let mut snapshot = PatternSnapshot::default();
                *snapshot.get_mut(voice) = bank.steps(voice);
                snapshot
            }
            None => bank.snapshot_all(),
        }
    }

    fn write(&self, bank: &PatternBank, snapshot: &PatternSnapshot) {
        match self.scope {
            Some(voice) => {
                bank.with_pattern(voice, |p| p.set_pattern(snapshot.get(voice)));
            }
            None => bank.restore(snapshot),
        }
    }
}

impl PatternCommand for SnapshotCommand {
    fn execute(&mut self, bank: &PatternBank) -> CommandResult<()> {
        if let Some(after) = self.after {
            self.write(bank, &after);
            return Ok(());
        }

        let transform = self.transform.take().ok_or_else(|| {
            CommandError::ExecutionFailed("Transform already consumed".into())
        })?;
        self.before = Some(self.capture(bank));
        transform(bank);
        self.after = Some(self.capture(bank));
        Ok(())
    }

    fn undo(&mut self, bank: &PatternBank) -> CommandResult<()> {
        let before = self
            .before
            .ok_or_else(|| CommandError::UndoFailed("Command was never executed".into()))?;
        self.write(bank, &before);
        Ok(())
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
