//! Per-thread dispatch state.
//!
//! Every active `dispatch` call on a thread owns one frame in a stack kept
//! per bus. The stack height is the nesting depth; a cancellation request
//! always targets the top frame, which belongs to the innermost call.

use signalbus_core::CancellationError;
use std::{
    cell::RefCell,
    collections::HashMap,
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};

/// Identity of one event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(u64);

impl BusId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Default)]
struct Frame {
    cancel_requested: bool,
}

thread_local! {
    static FRAMES: RefCell<HashMap<BusId, Vec<Frame>>> = RefCell::new(HashMap::new());
}

/// Guard for one active dispatch call on the current thread.
///
/// Dropping the guard pops its frame, also while unwinding from a panicking
/// handler. Once the last frame of a bus is gone its state is discarded.
pub(crate) struct DispatchFrame {
    bus: BusId,
    _not_send: PhantomData<*const ()>,
}

impl DispatchFrame {
    pub(crate) fn enter(bus: BusId) -> Self {
        FRAMES.with(|frames| {
            frames
                .borrow_mut()
                .entry(bus)
                .or_default()
                .push(Frame::default());
        });
        Self {
            bus,
            _not_send: PhantomData,
        }
    }

    /// Consume a pending cancellation request of this frame.
    pub(crate) fn take_cancel(&self) -> bool {
        FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            match frames.get_mut(&self.bus).and_then(|stack| stack.last_mut()) {
                Some(frame) => std::mem::take(&mut frame.cancel_requested),
                None => false,
            }
        })
    }
}

impl Drop for DispatchFrame {
    fn drop(&mut self) {
        // The thread-local may already be gone during thread teardown
        let _ = FRAMES.try_with(|frames| {
            let mut frames = frames.borrow_mut();
            if let Some(stack) = frames.get_mut(&self.bus) {
                stack.pop();
                if stack.is_empty() {
                    frames.remove(&self.bus);
                }
            }
        });
    }
}

/// Ask the innermost dispatch of `bus` on this thread to stop.
pub(crate) fn request_cancel(bus: BusId) -> Result<(), CancellationError> {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let frame = frames
            .get_mut(&bus)
            .and_then(|stack| stack.last_mut())
            .ok_or(CancellationError::NotDispatching)?;
        if frame.cancel_requested {
            return Err(CancellationError::AlreadyCancelled);
        }
        frame.cancel_requested = true;
        Ok(())
    })
}

/// Number of active dispatch calls of `bus` on this thread.
pub(crate) fn depth(bus: BusId) -> usize {
    FRAMES.with(|frames| frames.borrow().get(&bus).map_or(0, Vec::len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_outside_dispatch() {
        let bus = BusId::next();
        assert_eq!(request_cancel(bus), Err(CancellationError::NotDispatching));
    }

    #[test]
    fn test_cancel_targets_innermost_frame() {
        let bus = BusId::next();
        let outer = DispatchFrame::enter(bus);
        {
            let inner = DispatchFrame::enter(bus);
            assert_eq!(depth(bus), 2);
            request_cancel(bus).unwrap();
            assert_eq!(
                request_cancel(bus),
                Err(CancellationError::AlreadyCancelled)
            );
            assert!(inner.take_cancel());
            assert!(!inner.take_cancel());
        }
        assert_eq!(depth(bus), 1);
        assert!(!outer.take_cancel());
        drop(outer);
        assert_eq!(depth(bus), 0);
    }

    #[test]
    fn test_unconsumed_request_dies_with_frame() {
        let bus = BusId::next();
        let outer = DispatchFrame::enter(bus);
        {
            let _inner = DispatchFrame::enter(bus);
            request_cancel(bus).unwrap();
        }
        assert!(!outer.take_cancel());
    }

    #[test]
    fn test_buses_are_independent() {
        let first = BusId::next();
        let second = BusId::next();
        let _frame = DispatchFrame::enter(first);
        assert_eq!(depth(second), 0);
        assert!(request_cancel(second).is_err());
        assert!(request_cancel(first).is_ok());
    }

    #[test]
    fn test_frame_popped_on_panic() {
        let bus = BusId::next();
        let result = std::panic::catch_unwind(|| {
            let _frame = DispatchFrame::enter(bus);
            panic!("handler blew up");
        });
        assert!(result.is_err());
        assert_eq!(depth(bus), 0);
    }
}
