//! # signalbus-core
//!
//! Core traits for the signalbus in-process event dispatcher.
//!
//! This crate has minimal dependencies and holds the vocabulary shared by
//! the engine, the macros and user code:
//!
//! - [`Event`], [`EventType`], [`Supertype`], [`Extends`] - dispatchable values and
//!   their explicit type hierarchy
//! - [`Listener`], [`Handlers`], [`HandlerDecl`] - how a type declares its handlers
//! - [`IntoHandlerResult`] - what a handler body may return
//!
//! # Error Types
//!
//! - [`RegistrationError`] - A listener violates the handler contract
//! - [`DispatchError`] - A pass-through failure escaped `dispatch`
//! - [`PassThrough`] - Marker for failures that bypass exception events
//! - [`CancellationError`] - `cancel` misuse
//! - [`InvocationError`] - A body was handed a value of the wrong type

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod event;
mod handler;
mod listener;

// Re-exports
pub use error::{
    BoxError, CancellationError, DispatchError, InvocationError, PassThrough, RegistrationError,
};
pub use event::{Ancestor, AsEvent, Event, EventType, Extends, Supertype, Upcast};
pub use handler::{
    BareFn, Body, DEFAULT_PRIORITY, Defaults, EventFn, HandlerDecl, HandlerResult,
    IntoHandlerResult, ValidHandler,
};
pub use listener::{Handlers, Listener};
