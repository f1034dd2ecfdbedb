//! # signalbus - In-Process Event Dispatcher
//!
//! `signalbus` delivers events synchronously to every handler interested in
//! their type, in priority order. Handlers may cancel the rest of a delivery,
//! receive events of subtypes (polymorphic handlers), and dispatch further
//! events from inside a handler.
//!
//! Two system events report what would otherwise go unnoticed:
//! - [`DeadEvent`] - an event reached no handler
//! - [`ExceptionEvent`] - a handler returned an error
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use signalbus::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Event)]
//! struct OrderPlaced { total: u64 }
//!
//! #[derive(Default)]
//! struct Audit;
//!
//! #[listener]
//! impl Audit {
//!     #[handler(priority = 200)]
//!     pub fn on_order(&self, order: &OrderPlaced) {
//!         println!("order of {}", order.total);
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.register_listener(Arc::new(Audit))?;
//! bus.dispatch(OrderPlaced { total: 42 })?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Lets the macros' `::signalbus` paths resolve inside this crate's own tests
extern crate self as signalbus;

pub mod global;

// Core vocabulary
pub use signalbus_core::{
    Ancestor, AsEvent, Body, BoxError, CancellationError, DEFAULT_PRIORITY, Defaults,
    DispatchError, Event, EventType, Extends, HandlerDecl, HandlerResult, Handlers,
    IntoHandlerResult, InvocationError, Listener, PassThrough, RegistrationError, Supertype,
};

// Engine
pub use signalbus_std::{
    CallbackOptions, DeadEvent, EventBus, EventBusBuilder, ExceptionEvent, HandlerDescriptor,
    ListenerId, Registration, SharedError,
};

/// Standard listener implementations.
pub mod listeners {
    #![allow(clippy::wildcard_imports)]
    pub use signalbus_std::listeners::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use signalbus_std::testing::*;
}

/// Prelude module - common imports for signalbus.
///
/// # Usage
///
/// ```rust,ignore
/// use signalbus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, DeadEvent, DispatchError, Event, EventBus, ExceptionEvent, Extends, HandlerDecl,
        Handlers, Listener, PassThrough,
    };

    #[cfg(feature = "macros")]
    pub use crate::listener;
}

#[cfg(feature = "macros")]
pub use signalbus_macros::{Event, listener};
