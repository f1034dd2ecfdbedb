//! Logging listener for system events.

use crate::system::{DeadEvent, ExceptionEvent};
use signalbus_core::{HandlerDecl, Handlers, Listener};
use tracing::{info, warn};

/// A listener that logs every [`DeadEvent`] and [`ExceptionEvent`].
///
/// Its handlers run after every other handler of the same system event.
///
/// # Example
///
/// ```rust,ignore
/// bus.register_listener(Arc::new(SystemEventLogger))?;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEventLogger;

impl Listener for SystemEventLogger {
    const PRIORITY: Option<i32> = Some(i32::MIN);

    fn declare(handlers: &mut Handlers<Self>) {
        handlers
            .add(HandlerDecl::method(
                "on_dead_event",
                |_: &Self, dead: &DeadEvent| {
                    info!(bus = dead.bus().name(), event = ?dead.event(), "Dead event");
                },
            ))
            .add(HandlerDecl::method(
                "on_exception_event",
                |_: &Self, exception: &ExceptionEvent| {
                    warn!(
                        bus = exception.bus().name(),
                        event = ?exception.event(),
                        error = %exception.cause(),
                        "Event handler failed"
                    );
                },
            ));
    }
}
