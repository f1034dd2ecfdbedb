//! Cancellation and nested dispatch.

mod common;

use common::{Ping, Pong, init_tracing, record};
use signalbus::{CallbackOptions, CancellationError, EventBus, testing::CallLog};
use std::thread;

fn on_ping<R, F>(bus: &EventBus, priority: i32, f: F)
where
    F: Fn(&Ping) -> R + Send + Sync + 'static,
    R: signalbus::IntoHandlerResult,
{
    bus.register_callback_with(f, CallbackOptions::new().priority(priority))
        .unwrap();
}

#[test]
fn test_cancel_skips_remaining_handlers() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let (canceller, sink) = (bus.clone(), log.clone());
    on_ping(&bus, 100, move |_| {
        sink.record("100");
        canceller.cancel()
    });
    record::<Ping>(&bus, &log, "50", 50);

    bus.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["100"]);

    // The request was consumed; the next dispatch starts clean
    bus.dispatch(Ping(2)).unwrap();
    assert_eq!(log.entries(), vec!["100", "100"]);
}

#[test]
fn test_cancel_outside_dispatch_is_misuse() {
    init_tracing();
    let bus = EventBus::new();
    assert_eq!(bus.cancel(), Err(CancellationError::NotDispatching));
}

#[test]
fn test_double_cancel_is_misuse() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let (canceller, sink) = (bus.clone(), log.clone());
    on_ping(&bus, 100, move |_| {
        canceller.cancel().unwrap();
        if canceller.cancel() == Err(CancellationError::AlreadyCancelled) {
            sink.record("rejected");
        }
    });

    bus.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["rejected"]);
}

#[test]
fn test_nested_dispatch_completes_before_outer_cancel() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let (nested, sink) = (bus.clone(), log.clone());
    on_ping(&bus, 100, move |ping| {
        sink.record("ping 100");
        nested.dispatch(Pong(ping.0))?;
        assert_eq!(nested.nesting_depth(), 1);
        nested.cancel()?;
        Ok::<(), signalbus::BoxError>(())
    });
    record::<Ping>(&bus, &log, "ping 50", 50);
    record::<Pong>(&bus, &log, "pong 100", 100);
    record::<Pong>(&bus, &log, "pong 50", 50);

    bus.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["ping 100", "pong 100", "pong 50"]);
}

#[test]
fn test_cancel_before_nested_dispatch_spares_nested_handlers() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let (nested, sink) = (bus.clone(), log.clone());
    on_ping(&bus, 100, move |ping| {
        sink.record("ping 100");
        nested.cancel()?;
        assert_eq!(nested.nesting_depth(), 1);
        nested.dispatch(Pong(ping.0))?;
        Ok::<(), signalbus::BoxError>(())
    });
    record::<Ping>(&bus, &log, "ping 50", 50);
    record::<Pong>(&bus, &log, "pong 100", 100);
    record::<Pong>(&bus, &log, "pong 50", 50);

    bus.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["ping 100", "pong 100", "pong 50"]);
}

#[test]
fn test_inner_cancel_does_not_leak_outward() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let nested = bus.clone();
    on_ping(&bus, 100, move |ping| nested.dispatch(Pong(ping.0)));
    record::<Ping>(&bus, &log, "ping 50", 50);

    // The last Pong handler cancels; nothing is left to skip in its dispatch
    let (canceller, sink) = (bus.clone(), log.clone());
    bus.register_callback(move |_: &Pong| {
        sink.record("pong");
        assert_eq!(canceller.nesting_depth(), 2);
        canceller.cancel()
    })
    .unwrap();

    bus.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["pong", "ping 50"]);
}

#[test]
fn test_cancellation_is_per_thread() {
    init_tracing();
    let bus = EventBus::new();
    let log = CallLog::new();

    let (remote, sink) = (bus.clone(), log.clone());
    on_ping(&bus, 100, move |_| {
        let other = remote.clone();
        let result = thread::spawn(move || other.cancel()).join().unwrap();
        if result == Err(CancellationError::NotDispatching) {
            sink.record("remote cancel rejected");
        }
    });
    record::<Ping>(&bus, &log, "ping 50", 50);

    bus.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["remote cancel rejected", "ping 50"]);
}

#[test]
fn test_cancellation_is_per_bus() {
    init_tracing();
    let first = EventBus::new();
    let second = EventBus::new();
    let log = CallLog::new();

    let (other, sink) = (second.clone(), log.clone());
    on_ping(&first, 100, move |_| {
        if other.cancel() == Err(CancellationError::NotDispatching) {
            sink.record("other bus idle");
        }
    });
    record::<Ping>(&first, &log, "ping 50", 50);

    first.dispatch(Ping(1)).unwrap();
    assert_eq!(log.entries(), vec!["other bus idle", "ping 50"]);
}
