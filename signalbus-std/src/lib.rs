//! # signalbus-std
//!
//! The dispatch engine of signalbus.
//!
//! This crate provides:
//! - **Event bus**: [`EventBus`], [`EventBusBuilder`], [`CallbackOptions`]
//! - **Handler registry**: [`Registry`], ordered by [`OrderKey`]
//! - **Bound handlers**: [`HandlerDescriptor`], [`Invocation`]
//! - **System events**: [`DeadEvent`], [`ExceptionEvent`]
//! - **Standard listeners**: [`listeners::SystemEventLogger`]
//! - **Testing utilities**: [`testing::CallLog`], [`testing::Recorder`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use signalbus_core;

// Modules
pub mod bus;
mod context;
pub mod descriptor;
pub mod listeners;
pub mod registry;
pub mod system;
pub mod testing;

pub use bus::{CallbackOptions, EventBus, EventBusBuilder, Registration};
pub use descriptor::{HandlerDescriptor, HandlerFlags, HandlerId, Invocation, ListenerId, OrderKey};
pub use registry::{Registry, Resolved};
pub use system::{DeadEvent, ExceptionEvent, SharedError, is_system_event};
