//! Testing utilities for signalbus.
//!
//! - [`CallLog`]: an ordered, thread-safe log of labels handlers can append to
//! - [`Recorder`]: a callback sink that keeps a clone of every event it receives

use crate::{EventBus, bus::CallbackOptions, descriptor::ListenerId};
use signalbus_core::{Event, RegistrationError};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// Call Log
// ============================================================================

/// An ordered log of labels, shared between clones.
///
/// # Example
///
/// ```rust,ignore
/// let log = CallLog::new();
/// let sink = log.clone();
/// bus.register_callback(move |_: &Ping| sink.record("ping"))?;
///
/// bus.dispatch(Ping)?;
/// assert_eq!(log.entries(), vec!["ping"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label.
    pub fn record(&self, label: impl Into<String>) {
        self.lock().push(label.into());
    }

    /// Get a copy of the labels in recording order.
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of times `label` was recorded.
    pub fn count(&self, label: &str) -> usize {
        self.lock().iter().filter(|entry| *entry == label).count()
    }

    /// Total number of labels recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget every label.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A panicking handler must not hide what was recorded before it
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// Records a clone of every event of type `E` it receives.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = Recorder::<DeadEvent>::new();
/// recorder.attach(&bus)?;
///
/// bus.dispatch(String::from("nobody listens"))?;
/// assert_eq!(recorder.count(), 1);
/// ```
pub struct Recorder<E: Clone> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone> Recorder<E> {
    /// Create a new recorder.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record an event.
    pub fn record(&self, event: &E) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<E> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<E: Event + Clone> Recorder<E> {
    /// Register the recorder on `bus` as a callback with the bus defaults.
    pub fn attach(&self, bus: &EventBus) -> Result<ListenerId, RegistrationError> {
        self.attach_with(bus, CallbackOptions::default())
    }

    /// Register the recorder on `bus` as a callback.
    pub fn attach_with(
        &self,
        bus: &EventBus,
        options: CallbackOptions,
    ) -> Result<ListenerId, RegistrationError> {
        let recorder = self.clone();
        bus.register_callback_with(move |event: &E| recorder.record(event), options)
    }
}

impl<E: Clone> Default for Recorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Clone for Recorder<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}
