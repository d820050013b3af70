// SequencerEngine - Control surface over scheduler, generators and chaos
//
// The engine owns the live pattern bank and everything that reads or writes it.
// User edits go through the edit history; chaos mutations and quantum
// observations write the bank directly. Every change, whatever its source, is
// also recorded as a frame of the rewindable snapshot timeline.

use crate::chaos::director::ChaosDirector;
use crate::chaos::transform::MutationKind;
use crate::command::{
    CommandManager, PatternCommand, SetPatternCommand, SnapshotCommand, ToggleStepCommand,
};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::generator::evolution::{self, Constraints};
use crate::generator::interference::{
    EntanglementId, EntanglementKind, QuantumRegistry, SuperpositionId,
    create_quantum_interference,
};
use crate::generator::markov::MarkovGenerator;
use crate::messaging::channels::{NoteConsumer, create_note_channel};
use crate::messaging::events::{EngineEvent, EngineObserver, ObserverList};
use crate::messaging::note::NoteSink;
use crate::sequencer::bank::{PatternBank, PatternSnapshot, preset};
use crate::sequencer::clock::{Clock, SystemClock};
use crate::sequencer::pattern::{Pattern, STEPS, Steps, VoiceId};
use crate::sequencer::scheduler::Scheduler;
use crate::sequencer::snapshot_timeline::SnapshotTimeline;
use crate::sequencer::tap_tempo::TapTempo;
use crate::sequencer::transport::TransportState;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The whole sequencer behind one handle
pub struct SequencerEngine {
    bank: Arc<PatternBank>,
    scheduler: Scheduler,
    chaos: ChaosDirector,
    markov: MarkovGenerator,
    quantum: QuantumRegistry,
    history: CommandManager,
    tap: TapTempo,
    /// Shared with the chaos thread, which records a frame per mutation
    timeline: Arc<Mutex<SnapshotTimeline>>,
    observers: ObserverList,
    rng: StdRng,
    config: EngineConfig,
}

fn lock_timeline(timeline: &Mutex<SnapshotTimeline>) -> MutexGuard<'_, SnapshotTimeline> {
    timeline.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record_frame(bank: &PatternBank, timeline: &Mutex<SnapshotTimeline>, time: f64) {
    let patterns = bank.snapshot_all();
    lock_timeline(timeline).record(patterns, time);
}

/// Observer that records a timeline frame after each chaos mutation and when
/// playback starts
fn timeline_recorder(
    bank: Arc<PatternBank>,
    timeline: Arc<Mutex<SnapshotTimeline>>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn EngineObserver> {
    Arc::new(move |event: EngineEvent| {
        if matches!(event, EngineEvent::Mutated(_) | EngineEvent::PlaybackStarted) {
            record_frame(&bank, &timeline, clock.now());
        }
    })
}

impl SequencerEngine {
    /// Build a stopped engine with empty patterns.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the config fails validation. Musical values
    /// out of range are clamped, not rejected.
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        sink: Box<dyn NoteSink>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let config = config.sanitized();

        let bank = Arc::new(PatternBank::new());
        let observers = ObserverList::new();

        let scheduler = Scheduler::new(Arc::clone(&bank), clock, sink)
            .with_observers(observers.clone());
        scheduler.set_timing(config.lookahead_secs, config.poll_interval());
        scheduler.set_tempo(config.tempo_bpm);
        scheduler.set_swing(config.swing);

        let mut chaos = ChaosDirector::new(Arc::clone(&bank), observers.clone());
        chaos.set_intensity(config.chaos.intensity);
        chaos.set_interval_ms(config.chaos.interval_ms)?;

        let timeline = Arc::new(Mutex::new(SnapshotTimeline::new(config.timeline_capacity)));
        let clock = Arc::clone(scheduler.clock());
        record_frame(&bank, &timeline, clock.now());
        observers.subscribe(timeline_recorder(
            Arc::clone(&bank),
            Arc::clone(&timeline),
            clock,
        ));

        let rng = match config.seed {
            Some(seed) => {
                chaos = chaos.with_seed(seed.wrapping_add(1));
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        log::info!(
            "Engine ready: {} BPM, swing {:.2}, markov order {}",
            config.tempo_bpm,
            config.swing,
            config.markov_order
        );

        Ok(Self {
            markov: MarkovGenerator::new(config.markov_order),
            quantum: QuantumRegistry::new(config.superposition_capacity),
            history: CommandManager::with_capacity(config.history_capacity),
            tap: TapTempo::new(),
            timeline,
            bank,
            scheduler,
            chaos,
            observers,
            rng,
            config,
        })
    }

    /// Engine on the system clock
    pub fn with_system_clock(config: EngineConfig, sink: Box<dyn NoteSink>) -> EngineResult<Self> {
        Self::new(config, Arc::new(SystemClock::new()), sink)
    }

    /// Engine whose notes go into a lock-free queue of
    /// `note_queue_capacity` events. The consumer belongs on the audio thread.
    pub fn with_note_channel(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<(Self, NoteConsumer)> {
        config.validate()?;
        let (producer, consumer) = create_note_channel(config.note_queue_capacity);
        let engine = Self::new(config, clock, Box::new(producer))?;
        Ok((engine, consumer))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live patterns, shared with the scheduler and chaos threads
    pub fn bank(&self) -> &Arc<PatternBank> {
        &self.bank
    }

    pub fn subscribe(&self, observer: Arc<dyn EngineObserver>) {
        self.observers.subscribe(observer);
    }

    // ---- Transport ----

    pub fn start(&mut self) -> EngineResult<()> {
        self.scheduler.start()
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn toggle_play(&mut self) -> EngineResult<bool> {
        self.scheduler.toggle_play()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.scheduler.state()
    }

    /// Dispatch due steps now instead of waiting for the poll thread
    pub fn poll(&self) -> usize {
        self.scheduler.poll()
    }

    pub fn current_step(&self) -> usize {
        self.scheduler.current_step()
    }

    /// Takes effect from the next scheduled step
    pub fn set_tempo(&self, bpm: f64) {
        self.scheduler.set_tempo(bpm);
    }

    pub fn tempo(&self) -> f64 {
        self.scheduler.tempo()
    }

    pub fn set_swing(&self, ratio: f64) {
        self.scheduler.set_swing(ratio);
    }

    pub fn swing(&self) -> f64 {
        self.scheduler.swing()
    }

    /// Register a tap at the scheduler clock's current time. Once two taps
    /// are close enough together the tempo is updated and returned.
    pub fn tap_tempo(&mut self) -> Option<f64> {
        let now = self.scheduler.clock().now();
        let bpm = self.tap.tap(now)?;
        self.scheduler.set_tempo(bpm);
        Some(bpm)
    }

    // ---- Pattern edits (undoable) ----

    fn record(&mut self, command: Box<dyn PatternCommand>) -> bool {
        match self.history.execute(command, &self.bank) {
            Ok(()) => {
                self.record_frame();
                true
            }
            Err(e) => {
                log::warn!("Edit rejected: {}", e);
                false
            }
        }
    }

    /// Flip one step. Out-of-range steps are ignored and return false.
    pub fn toggle_step(&mut self, voice: VoiceId, step: usize) -> bool {
        self.record(Box::new(ToggleStepCommand::new(voice, step)))
    }

    /// Replace a voice's steps. Input that is not exactly 16 long is ignored
    /// and returns false.
    pub fn set_pattern(&mut self, voice: VoiceId, steps: &[bool]) -> bool {
        self.record(Box::new(SetPatternCommand::new(voice, steps)))
    }

    pub fn randomize(&mut self, voice: VoiceId) {
        let mut pattern = Pattern::new(voice);
        pattern.randomize(&mut self.rng);
        let steps = pattern.get_pattern();
        self.record(Box::new(SnapshotCommand::for_voice(
            voice,
            format!("Randomize {}", voice),
            move |bank: &PatternBank| {
                bank.with_pattern(voice, |p| p.set_pattern(&steps));
            },
        )));
    }

    pub fn invert(&mut self, voice: VoiceId) {
        self.record(Box::new(SnapshotCommand::for_voice(
            voice,
            format!("Invert {}", voice),
            move |bank: &PatternBank| bank.with_pattern(voice, |p| p.invert()),
        )));
    }

    /// Rotate left by `n` (negative rotates right)
    pub fn shift(&mut self, voice: VoiceId, n: i32) {
        self.record(Box::new(SnapshotCommand::for_voice(
            voice,
            format!("Shift {} by {}", voice, n),
            move |bank: &PatternBank| bank.with_pattern(voice, |p| p.shift(n)),
        )));
    }

    pub fn clear(&mut self, voice: VoiceId) {
        self.record(Box::new(SnapshotCommand::for_voice(
            voice,
            format!("Clear {}", voice),
            move |bank: &PatternBank| bank.with_pattern(voice, |p| p.clear()),
        )));
    }

    /// Overwrite every voice with the values of `snapshot`
    pub fn restore(&mut self, snapshot: &PatternSnapshot) {
        let snapshot = *snapshot;
        self.record(Box::new(SnapshotCommand::new(
            "Restore patterns",
            move |bank: &PatternBank| bank.restore(&snapshot),
        )));
    }

    /// Load a built-in preset by name. Unknown names return false.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(snapshot) = preset(name) else {
            log::warn!("Unknown preset '{}'", name);
            return false;
        };
        self.record(Box::new(SnapshotCommand::new(
            format!("Load preset {}", name),
            move |bank: &PatternBank| bank.restore(&snapshot),
        )))
    }

    /// Copy of the live patterns
    pub fn snapshot(&self) -> PatternSnapshot {
        self.bank.snapshot_all()
    }

    pub fn pattern(&self, voice: VoiceId) -> Pattern {
        self.bank.pattern(voice)
    }

    fn record_frame(&self) {
        record_frame(&self.bank, &self.timeline, self.scheduler.clock().now());
    }

    /// Take back the last edit. Returns its description.
    pub fn undo(&mut self) -> Option<String> {
        self.history
            .undo(&self.bank)
            .map_err(|e| log::debug!("Undo: {}", e))
            .ok()
    }

    /// Replay the last undone edit. Returns its description.
    pub fn redo(&mut self) -> Option<String> {
        self.history
            .redo(&self.bank)
            .map_err(|e| log::debug!("Redo: {}", e))
            .ok()
    }

    pub fn history(&self) -> &CommandManager {
        &self.history
    }

    // ---- Snapshot timeline ----
    //
    // Travelling writes the recorded patterns straight into the bank. It is
    // not an undoable edit and records no frame of its own.

    fn load_frame(&self, frame: Option<PatternSnapshot>) -> Option<PatternSnapshot> {
        let patterns = frame?;
        self.bank.restore(&patterns);
        Some(patterns)
    }

    /// Load the frame `steps` before the current one
    pub fn rewind(&mut self, steps: usize) -> Option<PatternSnapshot> {
        let frame = lock_timeline(&self.timeline).rewind(steps);
        self.load_frame(frame)
    }

    /// Load the frame `steps` after the current one
    pub fn fast_forward(&mut self, steps: usize) -> Option<PatternSnapshot> {
        let frame = lock_timeline(&self.timeline).fast_forward(steps);
        self.load_frame(frame)
    }

    /// Load frame `index`. Out-of-range indices change nothing.
    pub fn travel_to(&mut self, index: usize) -> Option<PatternSnapshot> {
        let frame = lock_timeline(&self.timeline).travel_to(index);
        self.load_frame(frame)
    }

    /// Pause or resume timeline recording
    pub fn set_timeline_recording(&self, recording: bool) {
        lock_timeline(&self.timeline).set_recording(recording);
    }

    /// Copy of the timeline as it stands
    pub fn timeline(&self) -> SnapshotTimeline {
        lock_timeline(&self.timeline).clone()
    }

    // ---- Generators ----

    /// Replace all voices with fresh Markov output
    pub fn generate_ai_patterns(&mut self) -> PatternSnapshot {
        let generated = self.markov.generate_all(&mut self.rng);
        log::debug!("Generated Markov patterns");
        self.record(Box::new(SnapshotCommand::new(
            "Generate patterns",
            move |bank: &PatternBank| bank.restore(&generated),
        )));
        generated
    }

    /// Markov output shaped by density, syncopation and polyrhythm
    pub fn generate_with_constraints(&mut self, constraints: &Constraints) -> PatternSnapshot {
        let generated = self
            .markov
            .generate_with_constraints(constraints, &mut self.rng);
        self.record(Box::new(SnapshotCommand::new(
            "Generate constrained patterns",
            move |bank: &PatternBank| bank.restore(&generated),
        )));
        generated
    }

    /// Run `generations` rounds of evolution on the live patterns
    pub fn evolve(&mut self, generations: usize) -> PatternSnapshot {
        let evolved = self
            .markov
            .evolve(&self.bank.snapshot_all(), generations, &mut self.rng);
        self.record(Box::new(SnapshotCommand::new(
            format!("Evolve {} generations", generations),
            move |bank: &PatternBank| bank.restore(&evolved),
        )));
        evolved
    }

    /// Write a counterpart of `source` into `target`: hits mostly where
    /// `source` rests
    pub fn generate_complementary(&mut self, source: VoiceId, target: VoiceId) -> Steps {
        let generated = evolution::complementary(&self.bank.steps(source), &mut self.rng);
        self.record(Box::new(SnapshotCommand::for_voice(
            target,
            format!("Complement {} into {}", source, target),
            move |bank: &PatternBank| {
                bank.with_pattern(target, |p| p.set_pattern(&generated));
            },
        )));
        generated
    }

    pub fn markov(&self) -> &MarkovGenerator {
        &self.markov
    }

    // ---- Chaos ----

    pub fn activate_chaos(&mut self) -> EngineResult<()> {
        self.chaos.activate()
    }

    pub fn deactivate_chaos(&mut self) {
        self.chaos.deactivate();
    }

    pub fn is_chaos_active(&self) -> bool {
        self.chaos.is_active()
    }

    pub fn set_chaos_intensity(&self, intensity: f64) {
        self.chaos.set_intensity(intensity);
    }

    pub fn chaos_intensity(&self) -> f64 {
        self.chaos.intensity()
    }

    pub fn set_chaos_interval_ms(&mut self, interval_ms: u64) -> EngineResult<()> {
        self.chaos.set_interval_ms(interval_ms)
    }

    /// Apply one transform now, regardless of the intensity gate
    pub fn apply_mutation(&mut self, kind: MutationKind) {
        self.chaos.apply(kind, &mut self.rng);
    }

    // ---- Quantum ----

    /// Hold the drum in superposition of its current loop, a Markov loop and
    /// silence. The live drum pattern is untouched until observed.
    pub fn enable_quantum_mode(&mut self) -> Option<SuperpositionId> {
        let candidates = vec![
            self.bank.steps(VoiceId::Drum),
            self.markov.generate(VoiceId::Drum, &mut self.rng),
            [false; STEPS],
        ];
        self.quantum.create_superposition(VoiceId::Drum, candidates)
    }

    /// Hold `voice` in superposition of arbitrary candidates
    pub fn create_superposition(
        &mut self,
        voice: VoiceId,
        candidates: Vec<Steps>,
    ) -> Option<SuperpositionId> {
        self.quantum.create_superposition(voice, candidates)
    }

    pub fn entangle(
        &mut self,
        a: VoiceId,
        b: VoiceId,
        kind: EntanglementKind,
        strength: f64,
    ) -> Option<EntanglementId> {
        self.quantum.entangle(a, b, kind, strength)
    }

    /// Collapse one step of `voice`'s superposition into the live pattern
    pub fn observe(&mut self, voice: VoiceId, step: usize) -> Option<bool> {
        let result = self.quantum.observe(&self.bank, voice, step, &mut self.rng)?;
        self.record_frame();
        Some(result)
    }

    /// Observe every step of `voice`, then close its superposition
    pub fn collapse(&mut self, voice: VoiceId) -> Option<Steps> {
        let steps = self.quantum.collapse_all(&self.bank, voice, &mut self.rng)?;
        self.record_frame();
        Some(steps)
    }

    /// Write the interference of voices `a` and `b` into `target`
    pub fn interfere(&mut self, a: VoiceId, b: VoiceId, target: VoiceId) -> Steps {
        let combined =
            create_quantum_interference(&self.bank.steps(a), &self.bank.steps(b), &mut self.rng);
        self.record(Box::new(SnapshotCommand::for_voice(
            target,
            format!("Interfere {} and {} into {}", a, b, target),
            move |bank: &PatternBank| {
                bank.with_pattern(target, |p| p.set_pattern(&combined));
            },
        )));
        combined
    }

    pub fn quantum(&self) -> &QuantumRegistry {
        &self.quantum
    }

    /// Drop every superposition and entanglement
    pub fn clear_quantum(&mut self) {
        self.quantum.clear();
    }
}

impl std::fmt::Debug for SequencerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerEngine")
            .field("scheduler", &self.scheduler)
            .field("chaos", &self.chaos)
            .field("history", &self.history)
            .finish()
    }
}
