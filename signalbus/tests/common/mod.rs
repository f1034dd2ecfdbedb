#![allow(dead_code)]

use signalbus::{Event, EventBus, testing::CallLog};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test output (`RUST_LOG=debug cargo test`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Test Event Types
// ============================================================================

/// Counts how many handlers touched it.
#[derive(Debug, Default, Event)]
pub struct SimpleEvent {
    pub counter: AtomicUsize,
}

impl SimpleEvent {
    pub fn hit(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Subtype of [`SimpleEvent`].
#[derive(Debug, Default, Event)]
#[event(supertype(SimpleEvent, field = base))]
pub struct SimpleEventSub {
    pub base: SimpleEvent,
}

/// An interface implemented by [`Tagged`] events.
#[derive(Debug, Default, Clone, Copy, Event)]
pub struct Audited;

#[derive(Debug, Clone, Event)]
#[event(supertype(Audited))]
pub struct Tagged {
    pub tag: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Event)]
pub struct Ping(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Event)]
pub struct Pong(pub u32);

// ============================================================================
// Helpers
// ============================================================================

/// Register a callback on `E` that appends `label` to `log`.
pub fn record<E: Event>(bus: &EventBus, log: &CallLog, label: &'static str, priority: i32) {
    let log = log.clone();
    bus.register_callback_with(
        move |_: &E| log.record(label),
        signalbus::CallbackOptions::new().priority(priority),
    )
    .expect("callback registration cannot fail");
}

/// Shared handle on a fresh [`SimpleEvent`], keeping it inspectable after dispatch.
pub fn simple_event() -> Arc<SimpleEvent> {
    Arc::new(SimpleEvent::default())
}
