// Engine events - Core → UI / voice collaborators
//
// A closed set of event kinds delivered to trait-typed listeners. Listeners run
// on the thread that raised the event (chaos timer, scheduler control, caller).

use crate::chaos::transform::MutationKind;
use std::sync::{Arc, Mutex, PoisonError};

/// Something observable happened in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Chaos director switched on
    Activated,
    /// Chaos director switched off
    Deactivated,
    /// A transform was applied to the live patterns
    Mutated(MutationKind),
    PlaybackStarted,
    PlaybackStopped,
}

/// Listener for engine events
pub trait EngineObserver: Send + Sync {
    fn on_event(&self, event: EngineEvent);
}

impl<F> EngineObserver for F
where
    F: Fn(EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: EngineEvent) {
        self(event)
    }
}

/// Shared, cloneable list of subscribers
#[derive(Clone, Default)]
pub struct ObserverList {
    observers: Arc<Mutex<Vec<Arc<dyn EngineObserver>>>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays subscribed for the life of the list.
    pub fn subscribe(&self, observer: Arc<dyn EngineObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Deliver an event to every listener, in subscription order
    pub fn publish(&self, event: EngineEvent) {
        // Copy the list first so a listener may subscribe without deadlocking
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}
