// Chaos Director - Timed, intensity-gated pattern mutation
//
// A worker thread wakes every interval and, with probability equal to the
// current intensity, applies one random transform to the live bank. The
// director's timer is independent of the scheduler's poll.

use crate::chaos::transform::MutationKind;
use crate::error::{EngineError, EngineResult};
use crate::messaging::events::{EngineEvent, ObserverList};
use crate::sequencer::bank::PatternBank;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const MIN_INTERVAL_MS: u64 = 100;
pub const MAX_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_INTENSITY: f64 = 0.5;

/// Intensity shared with the timer thread, stored as f64 bits
#[derive(Debug, Clone)]
pub struct SharedIntensity {
    inner: Arc<AtomicU64>,
}

impl SharedIntensity {
    pub fn new(value: f64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(clamp_intensity(value).to_bits())),
        }
    }

    /// Set (clamped to [0, 1]); the next tick sees the new value
    pub fn set(&self, value: f64) {
        self.inner
            .store(clamp_intensity(value).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for SharedIntensity {
    fn default() -> Self {
        Self::new(DEFAULT_INTENSITY)
    }
}

fn clamp_intensity(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Clamp a mutation interval to [100, 5000] ms
pub fn clamp_interval(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS))
}

/// One timer tick: pass the intensity gate, then apply and announce a
/// random transform. Returns the kind applied, if any.
pub fn tick(
    bank: &Arc<PatternBank>,
    observers: &ObserverList,
    intensity: f64,
    rng: &mut dyn RngCore,
) -> Option<MutationKind> {
    if rng.gen_range(0.0..1.0) >= intensity {
        return None;
    }
    let kind = MutationKind::random(rng);
    kind.apply(bank, intensity, rng);
    observers.publish(EngineEvent::Mutated(kind));
    Some(kind)
}

struct TimerWorker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl TimerWorker {
    fn shutdown(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            log::error!("Chaos timer thread panicked");
        }
    }
}

/// Periodically mutates the live patterns while active
pub struct ChaosDirector {
    bank: Arc<PatternBank>,
    observers: ObserverList,
    intensity: SharedIntensity,
    interval: Duration,
    /// Fixed seed for the timer's rng (reproducible runs)
    seed: Option<u64>,
    worker: Option<TimerWorker>,
}

impl ChaosDirector {
    /// Inactive director with the default interval and intensity
    pub fn new(bank: Arc<PatternBank>, observers: ObserverList) -> Self {
        Self {
            bank,
            observers,
            intensity: SharedIntensity::default(),
            interval: clamp_interval(DEFAULT_INTERVAL_MS),
            seed: None,
            worker: None,
        }
    }

    /// Seed the timer thread's rng instead of drawing from the OS
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the mutation timer. Already active is a no-op.
    pub fn activate(&mut self) -> EngineResult<()> {
        if self.is_active() {
            return Ok(());
        }
        self.worker = Some(self.spawn_worker()?);
        log::info!(
            "Chaos activated (every {:?}, intensity {:.2})",
            self.interval,
            self.intensity.get()
        );
        self.observers.publish(EngineEvent::Activated);
        Ok(())
    }

    /// Stop the mutation timer. No tick starts after this returns; a
    /// butterfly cascade already in flight still lands.
    pub fn deactivate(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
            log::info!("Chaos deactivated");
            self.observers.publish(EngineEvent::Deactivated);
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity.get()
    }

    /// Set gate probability and blend factor (clamped to [0, 1])
    pub fn set_intensity(&self, intensity: f64) {
        self.intensity.set(intensity);
        log::debug!("Chaos intensity set to {:.2}", self.intensity.get());
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the timer period (clamped to [100, 5000] ms). A running timer is
    /// restarted with the new period.
    ///
    /// # Errors
    /// If the restarted timer cannot be spawned the director ends up inactive
    /// and observers receive `Deactivated`.
    pub fn set_interval_ms(&mut self, interval_ms: u64) -> EngineResult<()> {
        self.interval = clamp_interval(interval_ms);
        log::debug!("Chaos interval set to {:?}", self.interval);

        if let Some(worker) = self.worker.take() {
            worker.shutdown();
            self.restart_worker()?;
        }
        Ok(())
    }

    fn restart_worker(&mut self) -> EngineResult<()> {
        self.restart_with(Self::spawn_worker)
    }

    fn restart_with(
        &mut self,
        spawn: impl FnOnce(&Self) -> EngineResult<TimerWorker>,
    ) -> EngineResult<()> {
        match spawn(self) {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                log::error!("Chaos timer restart failed: {}", e);
                self.observers.publish(EngineEvent::Deactivated);
                Err(e)
            }
        }
    }

    /// Run one gated tick right now, on the caller's thread
    pub fn mutate_now<R: RngCore>(&self, rng: &mut R) -> Option<MutationKind> {
        tick(&self.bank, &self.observers, self.intensity.get(), rng)
    }

    /// Apply a specific transform immediately, bypassing the gate
    pub fn apply<R: RngCore>(&self, kind: MutationKind, rng: &mut R) {
        kind.apply(&self.bank, self.intensity.get(), rng);
        self.observers.publish(EngineEvent::Mutated(kind));
    }

    fn spawn_worker(&self) -> EngineResult<TimerWorker> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let bank = Arc::clone(&self.bank);
        let observers = self.observers.clone();
        let intensity = self.intensity.clone();
        let interval = self.interval;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let handle = thread::Builder::new()
            .name("nexus-chaos".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            tick(&bank, &observers, intensity.get(), &mut rng);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        Ok(TimerWorker { stop_tx, handle })
    }
}

impl Drop for ChaosDirector {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

impl std::fmt::Debug for ChaosDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosDirector")
            .field("active", &self.is_active())
            .field("intensity", &self.intensity())
            .field("interval", &self.interval)
            .finish()
    }
}
