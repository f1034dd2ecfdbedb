//! Error types for signalbus.
//!
//! This module provides the failure taxonomy using `thiserror`:
//!
//! - [`RegistrationError`] - A listener could not be registered
//! - [`DispatchError`] - A failure escaped a dispatch call
//! - [`PassThrough`] - Marker a handler returns to bypass exception events
//! - [`CancellationError`] - `cancel` was called outside of a cancellable dispatch
//! - [`InvocationError`] - A handler body could not be invoked with the event

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised synchronously while registering a listener.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The same listener instance is already registered at this bus.
    #[error("{listener} already registered")]
    AlreadyRegistered {
        /// Type name of the listener.
        listener: &'static str,
    },

    /// The handler has no parameter and no explicit event type.
    #[error("{handler} does not define an event type")]
    MissingEventType {
        /// Qualified handler name.
        handler: String,
    },

    /// The handler has an event parameter and an explicit event type.
    #[error("{handler} defines an ambiguous event type")]
    AmbiguousEventType {
        /// Qualified handler name.
        handler: String,
    },

    /// The handler declares more than one parameter.
    #[error("{handler} defines more than one parameter ({count})")]
    TooManyParameters {
        /// Qualified handler name.
        handler: String,
        /// Number of declared parameters.
        count: usize,
    },
}

/// A failure that escaped a dispatch call.
///
/// Recoverable handler failures never show up here; they are turned into
/// exception events. Only pass-through failures reach the caller.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler asked for its failure to be rethrown to the dispatching caller.
    #[error(transparent)]
    PassThrough(BoxError),
}

impl DispatchError {
    /// Consume the error, returning the cause raised by the handler.
    pub fn into_cause(self) -> BoxError {
        match self {
            DispatchError::PassThrough(cause) => cause,
        }
    }

    /// Borrow the cause raised by the handler.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            DispatchError::PassThrough(cause) => cause.as_ref(),
        }
    }
}

/// Wraps a handler failure so that it bypasses exception events.
///
/// A handler returning this error stops the current dispatch and makes
/// `dispatch` return [`DispatchError::PassThrough`] carrying the wrapped cause.
///
/// # Example
///
/// ```rust,ignore
/// fn on_order(&self, order: &Order) -> Result<(), BoxError> {
///     self.store.save(order).map_err(PassThrough::wrap)?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
#[error("pass-through: {0}")]
pub struct PassThrough(pub BoxError);

impl PassThrough {
    /// Wrap an error.
    pub fn new(cause: impl Into<BoxError>) -> Self {
        Self(cause.into())
    }

    /// Wrap an error and box the wrapper, ready to be returned from a handler.
    pub fn wrap(cause: impl Into<BoxError>) -> BoxError {
        Box::new(Self::new(cause))
    }

    /// Unwrap the cause.
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// Errors raised by `cancel`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationError {
    /// The calling thread has no active dispatch on this bus.
    #[error("calling thread not an active dispatching thread")]
    NotDispatching,

    /// The innermost dispatch was already cancelled and the request not yet consumed.
    #[error("dispatch already cancelled")]
    AlreadyCancelled,
}

/// Errors raised while invoking a handler body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// The body rejected the value it was handed.
    #[error("event handler rejected argument: expected {expected}")]
    ArgumentMismatch {
        /// Type name the body expected.
        expected: &'static str,
    },
}
