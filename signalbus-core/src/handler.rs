//! # Handler Declarations
//!
//! A [`HandlerDecl`] is one handler a listener type declares: a name, the
//! declared signature, optional metadata and a body. Declarations are plain
//! data until registration, where [`HandlerDecl::validate`] checks them
//! against the handler contract:
//!
//! - exactly one parameter supplies the event type, **or**
//! - zero parameters and an explicit event type
//!
//! Anything else is a [`RegistrationError`].

use crate::{
    error::{BoxError, InvocationError, RegistrationError},
    event::{Event, EventType},
};
use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};

/// The priority assigned to every handler without an explicit priority.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Result returned by a handler body.
pub type HandlerResult = Result<(), BoxError>;

/// Conversion of a handler's return value into a [`HandlerResult`].
///
/// Implemented for `()` (infallible handlers) and for `Result<(), E>`
/// whenever `E` converts into a [`BoxError`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid handler return type",
    label = "handlers must return `()` or `Result<(), E>`",
    note = "The error type must convert into `BoxError`."
)]
pub trait IntoHandlerResult {
    /// Perform the conversion.
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoHandlerResult for Result<(), E> {
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

/// Body taking the listener and the event.
pub type EventFn<L> = Arc<dyn Fn(&L, &dyn Any) -> HandlerResult + Send + Sync>;

/// Body taking only the listener.
pub type BareFn<L> = Arc<dyn Fn(&L) -> HandlerResult + Send + Sync>;

/// The callable part of a declaration.
pub enum Body<L> {
    /// Receives the event value.
    WithEvent(EventFn<L>),
    /// Ignores the event value.
    Bare(BareFn<L>),
}

impl<L> Clone for Body<L> {
    fn clone(&self) -> Self {
        match self {
            Body::WithEvent(f) => Body::WithEvent(Arc::clone(f)),
            Body::Bare(f) => Body::Bare(Arc::clone(f)),
        }
    }
}

impl<L> fmt::Debug for Body<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::WithEvent(_) => f.write_str("Body::WithEvent"),
            Body::Bare(_) => f.write_str("Body::Bare"),
        }
    }
}

/// A handler declared by listener type `L`.
///
/// # Example
///
/// ```rust,ignore
/// // Event type taken from the parameter
/// HandlerDecl::method("on_order", |this: &Shop, order: &OrderPlaced| this.record(order));
///
/// // No parameter, explicit event type, custom metadata
/// HandlerDecl::bare("on_tick", |this: &Shop| this.flush())
///     .event_type::<Tick>()
///     .priority(200)
///     .polymorphic(true);
/// ```
pub struct HandlerDecl<L> {
    name: &'static str,
    declared_by: &'static str,
    parameters: Vec<EventType>,
    event_type: Option<EventType>,
    priority: Option<i32>,
    polymorphic: Option<bool>,
    sealed: bool,
    body: Body<L>,
}

impl<L: 'static> HandlerDecl<L> {
    /// A handler taking the event as its single parameter.
    pub fn method<E, F, R>(name: &'static str, f: F) -> Self
    where
        E: Event,
        F: Fn(&L, &E) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let body: EventFn<L> = Arc::new(move |listener: &L, event: &dyn Any| {
            let Some(event) = event.downcast_ref::<E>() else {
                return Err(InvocationError::ArgumentMismatch {
                    expected: type_name::<E>(),
                }
                .into());
            };
            f(listener, event).into_handler_result()
        });
        Self::raw(name, vec![EventType::of::<E>()], Body::WithEvent(body))
    }

    /// A handler taking no parameter. Needs [`event_type`](Self::event_type).
    pub fn bare<F, R>(name: &'static str, f: F) -> Self
    where
        F: Fn(&L) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let body: BareFn<L> = Arc::new(move |listener: &L| f(listener).into_handler_result());
        Self::raw(name, Vec::new(), Body::Bare(body))
    }

    /// A handler with an arbitrary declared signature.
    ///
    /// Meant for generated or bridged code; the signature is checked at
    /// registration like any other.
    pub fn raw(name: &'static str, parameters: Vec<EventType>, body: Body<L>) -> Self {
        Self {
            name,
            declared_by: type_name::<L>(),
            parameters,
            event_type: None,
            priority: None,
            polymorphic: None,
            sealed: false,
            body,
        }
    }

    /// Set the event type explicitly.
    pub fn event_type<E: Event>(self) -> Self {
        self.with_event_type(EventType::of::<E>())
    }

    /// Set the event type explicitly from a runtime handle.
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Set the priority (higher runs earlier).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set whether the handler also receives events of subtypes.
    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.polymorphic = Some(polymorphic);
        self
    }

    /// Mark the handler as private to its declaring type.
    ///
    /// A sealed handler never overrides, and is never overridden by, a
    /// handler of the same name elsewhere in the listener hierarchy.
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    /// Re-target the declaration at a listener type `P` that reaches `L`
    /// through `project`.
    pub fn project<P: 'static>(self, project: fn(&P) -> &L) -> HandlerDecl<P> {
        let body = match self.body {
            Body::WithEvent(f) => {
                let f: EventFn<P> =
                    Arc::new(move |listener: &P, event: &dyn Any| f(project(listener), event));
                Body::WithEvent(f)
            }
            Body::Bare(f) => {
                let f: BareFn<P> = Arc::new(move |listener: &P| f(project(listener)));
                Body::Bare(f)
            }
        };
        HandlerDecl {
            name: self.name,
            declared_by: self.declared_by,
            parameters: self.parameters,
            event_type: self.event_type,
            priority: self.priority,
            polymorphic: self.polymorphic,
            sealed: self.sealed,
            body,
        }
    }

    /// Check the declaration against the handler contract and resolve its metadata.
    pub fn validate(self, defaults: Defaults) -> Result<ValidHandler<L>, RegistrationError> {
        let handler = || format!("{}::{}", self.declared_by, self.name);
        if self.parameters.len() > 1 {
            return Err(RegistrationError::TooManyParameters {
                handler: handler(),
                count: self.parameters.len(),
            });
        }
        let event_type = match (self.parameters.first(), self.event_type) {
            (None, None) => {
                return Err(RegistrationError::MissingEventType { handler: handler() });
            }
            (Some(_), Some(_)) => {
                return Err(RegistrationError::AmbiguousEventType { handler: handler() });
            }
            (Some(parameter), None) => *parameter,
            (None, Some(explicit)) => explicit,
        };

        Ok(ValidHandler {
            name: self.name,
            declared_by: self.declared_by,
            event_type,
            priority: self.priority.unwrap_or(defaults.priority),
            polymorphic: self.polymorphic.unwrap_or(defaults.polymorphic),
            uses_event: self.parameters.len() == 1,
            body: self.body,
        })
    }

    /// The handler name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the listener type that declared the handler.
    pub fn declared_by(&self) -> &'static str {
        self.declared_by
    }

    /// The declared parameter types.
    pub fn parameters(&self) -> &[EventType] {
        &self.parameters
    }

    /// Whether the handler is private to its declaring type.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn override_key(&self) -> (Option<&'static str>, &'static str) {
        (self.sealed.then_some(self.declared_by), self.name)
    }
}

impl<L> fmt::Debug for HandlerDecl<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDecl")
            .field("name", &self.name)
            .field("declared_by", &self.declared_by)
            .field("parameters", &self.parameters)
            .field("event_type", &self.event_type)
            .field("priority", &self.priority)
            .field("polymorphic", &self.polymorphic)
            .field("sealed", &self.sealed)
            .finish()
    }
}

/// Metadata applied to declarations that do not set their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    /// Priority for handlers without one.
    pub priority: i32,
    /// Polymorphism for handlers without one.
    pub polymorphic: bool,
}

impl Defaults {
    /// Layer a listener type's own defaults over these.
    pub fn for_listener<L: crate::Listener>(self) -> Self {
        Self {
            priority: L::PRIORITY.unwrap_or(self.priority),
            polymorphic: L::POLYMORPHIC.unwrap_or(self.polymorphic),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            polymorphic: false,
        }
    }
}

/// A declaration that passed validation, with its metadata resolved.
pub struct ValidHandler<L> {
    /// The handler name.
    pub name: &'static str,
    /// Type name of the declaring listener type.
    pub declared_by: &'static str,
    /// The event type the handler is bound to.
    pub event_type: EventType,
    /// Effective priority.
    pub priority: i32,
    /// Effective polymorphism.
    pub polymorphic: bool,
    /// Whether the body receives the event value.
    pub uses_event: bool,
    /// The body.
    pub body: Body<L>,
}

impl<L> fmt::Debug for ValidHandler<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidHandler")
            .field("name", &self.name)
            .field("declared_by", &self.declared_by)
            .field("event_type", &self.event_type)
            .field("priority", &self.priority)
            .field("polymorphic", &self.polymorphic)
            .field("uses_event", &self.uses_event)
            .finish()
    }
}

impl<L> ValidHandler<L> {
    /// Run the body against `listener`.
    pub fn call(&self, listener: &L, event: &dyn Any) -> HandlerResult {
        match &self.body {
            Body::WithEvent(f) => f(listener, event),
            Body::Bare(f) => f(listener),
        }
    }
}
