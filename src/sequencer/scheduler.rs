// Scheduler - Repeating poll timer driving one Transport
//
// A worker thread wakes every poll interval, reads the clock and lets the
// transport dispatch whatever is due. Dispatch happens under the same lock as
// stop(), so once stop() returns the sink never hears another note.

use crate::error::{EngineError, EngineResult};
use crate::messaging::events::{EngineEvent, ObserverList};
use crate::messaging::note::NoteSink;
use crate::sequencer::bank::PatternBank;
use crate::sequencer::clock::Clock;
use crate::sequencer::transport::{Transport, TransportState};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State touched by both the control side and the poll thread
struct Playback {
    transport: Transport,
    sink: Box<dyn NoteSink>,
}

type SharedPlayback = Arc<Mutex<Playback>>;

fn lock(playback: &Mutex<Playback>) -> MutexGuard<'_, Playback> {
    playback.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PollWorker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives a transport from a monotonic clock
pub struct Scheduler {
    playback: SharedPlayback,
    clock: Arc<dyn Clock>,
    observers: ObserverList,
    worker: Option<PollWorker>,
}

impl Scheduler {
    /// Create a stopped scheduler over `patterns`.
    ///
    /// The sink is called from the poll thread with the transport locked; it
    /// must not call back into the scheduler.
    pub fn new(patterns: Arc<PatternBank>, clock: Arc<dyn Clock>, sink: Box<dyn NoteSink>) -> Self {
        Self {
            playback: Arc::new(Mutex::new(Playback {
                transport: Transport::new(patterns),
                sink,
            })),
            clock,
            observers: ObserverList::new(),
            worker: None,
        }
    }

    /// Publish playback start/stop to these observers
    pub fn with_observers(mut self, observers: ObserverList) -> Self {
        self.observers = observers;
        self
    }

    /// Set lookahead window and poll period. Returns false if rejected.
    pub fn set_timing(&self, lookahead_secs: f64, poll_interval: Duration) -> bool {
        lock(&self.playback)
            .transport
            .set_timing(lookahead_secs, poll_interval)
    }

    /// Replace the note sink
    pub fn set_sink(&self, sink: Box<dyn NoteSink>) {
        lock(&self.playback).sink = sink;
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Start playback from step 0 at the clock's current time.
    /// Restarts from step 0 if already playing.
    pub fn start(&mut self) -> EngineResult<()> {
        {
            let mut playback = lock(&self.playback);
            let now = self.clock.now();
            playback.transport.start(now);
            log::info!(
                "Playback started at {:.3}s ({})",
                now,
                playback.transport.tempo()
            );
            // First window goes out right away, without waiting a poll period
            let Playback { transport, sink } = &mut *playback;
            transport.dispatch_due(now, sink.as_mut());
        }

        if self.worker.is_none() {
            self.worker = Some(self.spawn_worker()?);
        }
        self.observers.publish(EngineEvent::PlaybackStarted);
        Ok(())
    }

    /// Stop playback. No note reaches the sink after this returns.
    pub fn stop(&mut self) {
        let was_playing = {
            let mut playback = lock(&self.playback);
            let was_playing = playback.transport.is_playing();
            playback.transport.stop();
            was_playing
        };

        if let Some(worker) = self.worker.take() {
            // Dropping the sender would also wake the worker
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                log::error!("Scheduler poll thread panicked");
            }
        }

        if was_playing {
            log::info!("Playback stopped");
            self.observers.publish(EngineEvent::PlaybackStopped);
        }
    }

    /// Start if stopped, stop if playing. Returns whether it is now playing.
    pub fn toggle_play(&mut self) -> EngineResult<bool> {
        if self.is_playing() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Dispatch whatever is due right now, without waiting for the timer.
    /// Returns the number of steps dispatched.
    pub fn poll(&self) -> usize {
        poll_once(&self.playback, self.clock.as_ref()).0
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.playback).transport.is_playing()
    }

    pub fn state(&self) -> TransportState {
        lock(&self.playback).transport.state()
    }

    /// Set tempo in BPM (clamped to [60, 240])
    pub fn set_tempo(&self, bpm: f64) {
        let mut playback = lock(&self.playback);
        playback.transport.set_tempo(bpm);
        log::debug!("Tempo set to {}", playback.transport.tempo());
    }

    pub fn tempo(&self) -> f64 {
        lock(&self.playback).transport.tempo().bpm()
    }

    /// Set swing ratio (clamped)
    pub fn set_swing(&self, ratio: f64) {
        let mut playback = lock(&self.playback);
        playback.transport.set_swing(ratio);
        log::debug!("Swing set to {:.3}", playback.transport.swing().ratio());
    }

    pub fn swing(&self) -> f64 {
        lock(&self.playback).transport.swing().ratio()
    }

    /// The step the transport dispatches next
    pub fn current_step(&self) -> usize {
        lock(&self.playback).transport.current_step()
    }

    pub fn next_step_time(&self) -> f64 {
        lock(&self.playback).transport.next_step_time()
    }

    fn spawn_worker(&self) -> EngineResult<PollWorker> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let playback = Arc::clone(&self.playback);
        let clock = Arc::clone(&self.clock);

        let handle = thread::Builder::new()
            .name("nexus-scheduler".to_string())
            .spawn(move || {
                loop {
                    let (_, poll_interval) = poll_once(&playback, clock.as_ref());
                    match stop_rx.recv_timeout(poll_interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("Scheduler poll thread exiting");
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        Ok(PollWorker { stop_tx, handle })
    }
}

/// One poll: dispatch due steps, report the count and when to poll again
fn poll_once(playback: &Mutex<Playback>, clock: &dyn Clock) -> (usize, Duration) {
    let mut playback = lock(playback);
    let now = clock.now();
    let Playback { transport, sink } = &mut *playback;
    let dispatched = transport.dispatch_due(now, sink.as_mut());
    if dispatched > 1 {
        log::trace!("Caught up {} steps in one poll", dispatched);
    }
    (dispatched, transport.poll_interval())
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("tempo", &self.tempo())
            .field("current_step", &self.current_step())
            .finish()
    }
}
