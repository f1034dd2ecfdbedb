//! System events produced by the bus itself.
//!
//! - [`DeadEvent`] wraps an event that no handler received
//! - [`ExceptionEvent`] wraps an event together with the failure of one of its handlers
//!
//! Both are dispatched like any other event. When a system event finds no
//! handler, or one of its handlers fails, the bus only logs it and never
//! produces another system event.

use crate::bus::EventBus;
use signalbus_core::{BoxError, Event, EventType};
use std::{error::Error, fmt, sync::Arc};

/// Shared handle on a handler failure.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// An event that was dispatched without any handler receiving it.
#[derive(Clone)]
pub struct DeadEvent {
    bus: EventBus,
    event: Arc<dyn Event>,
}

impl DeadEvent {
    pub(crate) fn new(bus: EventBus, event: Arc<dyn Event>) -> Self {
        Self { bus, event }
    }

    /// The bus that dispatched the event.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The event nobody handled.
    pub fn event(&self) -> &(dyn Event + 'static) {
        self.event.as_ref()
    }

    /// Shared handle on the event nobody handled.
    pub fn shared_event(&self) -> Arc<dyn Event> {
        Arc::clone(&self.event)
    }
}

impl fmt::Debug for DeadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadEvent")
            .field("bus", &self.bus.name())
            .field("event", &self.event)
            .finish()
    }
}

impl Event for DeadEvent {}

/// An event whose handler failed with a recoverable error.
#[derive(Clone)]
pub struct ExceptionEvent {
    bus: EventBus,
    event: Arc<dyn Event>,
    cause: SharedError,
}

impl ExceptionEvent {
    pub(crate) fn new(bus: EventBus, event: Arc<dyn Event>, cause: BoxError) -> Self {
        Self {
            bus,
            event,
            cause: Arc::from(cause),
        }
    }

    /// The bus that dispatched the event.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The event being handled when the failure occurred.
    pub fn event(&self) -> &(dyn Event + 'static) {
        self.event.as_ref()
    }

    /// Shared handle on the event being handled when the failure occurred.
    pub fn shared_event(&self) -> Arc<dyn Event> {
        Arc::clone(&self.event)
    }

    /// The error returned by the handler.
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Shared handle on the error returned by the handler.
    pub fn shared_cause(&self) -> SharedError {
        Arc::clone(&self.cause)
    }
}

impl fmt::Debug for ExceptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionEvent")
            .field("bus", &self.bus.name())
            .field("event", &self.event)
            .field("cause", &format_args!("{}", self.cause))
            .finish()
    }
}

impl Event for ExceptionEvent {}

/// Check if `event_type` is one of the system events.
pub fn is_system_event(event_type: EventType) -> bool {
    event_type == EventType::of::<DeadEvent>() || event_type == EventType::of::<ExceptionEvent>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_event_detection() {
        assert!(is_system_event(EventType::of::<DeadEvent>()));
        assert!(is_system_event(EventType::of::<ExceptionEvent>()));
        assert!(!is_system_event(EventType::of::<String>()));
    }

    #[test]
    fn test_exception_event_accessors() {
        let bus = EventBus::new();
        let exception = ExceptionEvent::new(
            bus.clone(),
            Arc::new(String::from("payload")),
            "I failed".into(),
        );
        assert_eq!(exception.bus(), &bus);
        let payload = exception.event().downcast_ref::<String>();
        assert_eq!(payload.map(String::as_str), Some("payload"));
        assert_eq!(exception.cause().to_string(), "I failed");

        let debug = format!("{exception:?}");
        assert!(debug.contains("payload"));
        assert!(debug.contains("I failed"));
    }

    #[test]
    fn test_dead_event_shares_wrapped_event() {
        let event: Arc<dyn Event> = Arc::new(7_u32);
        let dead = DeadEvent::new(EventBus::new(), Arc::clone(&event));
        assert!(Arc::ptr_eq(&dead.shared_event(), &event));
        assert!(dead.event().is::<u32>());
    }
}
