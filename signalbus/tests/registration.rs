//! Registering, removing and introspecting listeners.

mod common;

use common::{Ping, Pong, init_tracing, record};
use signalbus::{
    Body, EventBus, EventType, HandlerDecl, HandlerResult, Handlers, Listener, RegistrationError,
    testing::CallLog,
};
use std::sync::Arc;

#[derive(Default)]
struct Counter {
    log: CallLog,
}

impl Listener for Counter {
    const PRIORITY: Option<i32> = Some(120);

    fn declare(handlers: &mut Handlers<Self>) {
        handlers
            .add(HandlerDecl::method("on_ping", |this: &Self, _: &Ping| {
                this.log.record("ping")
            }))
            .add(
                HandlerDecl::bare("on_any_pong", |this: &Self| this.log.record("pong"))
                    .event_type::<Pong>()
                    .priority(10),
            );
    }
}

struct MissingType;

impl Listener for MissingType {
    fn declare(handlers: &mut Handlers<Self>) {
        handlers.add(HandlerDecl::bare("on_nothing", |_: &Self| ()));
    }
}

struct AmbiguousType;

impl Listener for AmbiguousType {
    fn declare(handlers: &mut Handlers<Self>) {
        handlers.add(HandlerDecl::method("on_ping", |_: &Self, _: &Ping| ()).event_type::<Pong>());
    }
}

struct TwoParameters;

impl Listener for TwoParameters {
    fn declare(handlers: &mut Handlers<Self>) {
        handlers
            .add(HandlerDecl::method("on_ping", |_: &Self, _: &Ping| ()))
            .add(HandlerDecl::raw(
                "on_pair",
                vec![EventType::of::<Ping>(), EventType::of::<Pong>()],
                Body::Bare(Arc::new(|_: &Self| -> HandlerResult { Ok(()) })),
            ));
    }
}

struct Empty;

impl Listener for Empty {
    fn declare(_handlers: &mut Handlers<Self>) {}
}

#[test]
fn test_register_and_dispatch() {
    init_tracing();
    let bus = EventBus::new();
    let counter = Arc::new(Counter::default());

    let registration = bus.register_listener(counter.clone()).unwrap();
    assert_eq!(registration.bound(), 2);
    assert!(!registration.is_noop());
    assert!(bus.is_registered(&counter));

    bus.dispatch(Ping(1)).unwrap();
    bus.dispatch(Pong(1)).unwrap();
    assert_eq!(counter.log.entries(), vec!["ping", "pong"]);

    let order = bus.describe_execution_order(EventType::of::<Ping>());
    assert!(order.contains("priority=120"));
    assert!(order.contains("method="));
}

#[test]
fn test_duplicate_registration_is_rejected() {
    init_tracing();
    let bus = EventBus::new();
    let counter = Arc::new(Counter::default());
    bus.register_listener(counter.clone()).unwrap();

    let err = bus.register_listener(counter.clone()).unwrap_err();
    assert!(matches!(err, RegistrationError::AlreadyRegistered { .. }));
    assert!(err.to_string().ends_with("already registered"));

    // A second instance of the same type is a different listener
    bus.register_listener(Arc::new(Counter::default())).unwrap();
    assert_eq!(bus.registered_listeners().len(), 2);
}

#[test]
fn test_contract_violations_are_rejected() {
    init_tracing();
    let bus = EventBus::new();

    let err = bus.register_listener(Arc::new(MissingType)).unwrap_err();
    assert!(matches!(err, RegistrationError::MissingEventType { .. }));
    let message = err.to_string();
    assert!(message.ends_with("on_nothing does not define an event type"));

    let err = bus.register_listener(Arc::new(AmbiguousType)).unwrap_err();
    assert!(matches!(err, RegistrationError::AmbiguousEventType { .. }));

    let err = bus.register_listener(Arc::new(TwoParameters)).unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::TooManyParameters { count: 2, .. }
    ));

    // Nothing of the rejected listeners was bound
    assert!(bus.registered_listeners().is_empty());
    let order = bus.describe_execution_order(EventType::of::<Ping>());
    assert!(order.contains("(0 handler(s))"));
}

#[test]
fn test_listener_without_handlers_is_noop() {
    init_tracing();
    let bus = EventBus::new();
    let registration = bus.register_listener(Arc::new(Empty)).unwrap();
    assert!(registration.is_noop());
    assert_eq!(bus.registered_listeners().len(), 1);
}

#[test]
fn test_remove_listener() {
    init_tracing();
    let bus = EventBus::new();
    let counter = Arc::new(Counter::default());
    let other = Arc::new(Counter::default());
    bus.register_listener(counter.clone()).unwrap();
    bus.register_listener(other.clone()).unwrap();

    assert!(bus.remove_listener(&counter));
    assert!(!bus.is_registered(&counter));
    assert!(!bus.remove_listener(&counter));

    bus.dispatch(Ping(1)).unwrap();
    assert!(counter.log.is_empty());
    assert_eq!(other.log.count("ping"), 1);

    // A removed listener can come back
    bus.register_listener(counter.clone()).unwrap();
    bus.dispatch(Ping(2)).unwrap();
    assert_eq!(counter.log.count("ping"), 1);
}

#[test]
fn test_clear_listeners() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();
    bus.register_listener(Arc::new(Counter::default())).unwrap();
    record::<Ping>(&bus, &log, "callback", 100);

    bus.clear_listeners();
    assert!(bus.registered_listeners().is_empty());

    bus.dispatch(Ping(1)).unwrap();
    assert!(log.is_empty());
    assert!(
        bus.describe_execution_order(EventType::of::<Ping>())
            .contains("(0 handler(s))")
    );
}

#[test]
fn test_registered_listeners_snapshot() {
    init_tracing();
    let bus = EventBus::new();
    let counter = Arc::new(Counter::default());
    bus.register_listener(counter.clone()).unwrap();

    let listeners = bus.registered_listeners();
    assert_eq!(listeners.len(), 1);
    let registered = listeners[0].clone().downcast::<Counter>().unwrap();
    assert!(Arc::ptr_eq(&registered, &counter));
}

#[test]
fn test_callbacks_are_removable() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let sink = log.clone();
    let id = bus
        .register_callback(move |ping: &Ping| sink.record(format!("ping {}", ping.0)))
        .unwrap();
    bus.dispatch(Ping(1)).unwrap();
    assert!(bus.remove(id));
    bus.dispatch(Ping(2)).unwrap();

    assert_eq!(log.entries(), vec!["ping 1"]);
    assert!(!bus.remove(id));

    let order = bus.describe_execution_order(EventType::of::<Ping>());
    assert!(!order.contains("CallbackHandler"));
}

#[test]
fn test_builder_defaults() {
    init_tracing();
    let bus = EventBus::builder()
        .name("configured")
        .default_priority(7)
        .default_polymorphic(true)
        .build();
    assert_eq!(bus.name(), "configured");

    bus.register_callback(|_: &Pong| ()).unwrap();
    let order = bus.describe_execution_order(EventType::of::<Pong>());
    assert!(order.contains("CallbackHandler[event_type="));
    assert!(order.contains("polymorphic=true, priority=7]"));
}
