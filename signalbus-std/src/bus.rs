//! The event bus.
//!
//! [`EventBus`] ties the registry and the per-thread dispatch context
//! together. Dispatch is synchronous: every matched handler runs on the
//! calling thread, in priority order, before `dispatch` returns.
//!
//! # Failures
//!
//! - A handler returning an ordinary error produces an [`ExceptionEvent`]
//!   and delivery continues with the next handler.
//! - A handler returning [`PassThrough`] (or a [`DispatchError`] forwarded
//!   from a nested dispatch) stops delivery and is returned to the caller.
//! - A panicking handler unwinds through `dispatch` untouched.

use crate::{
    context::{self, BusId, DispatchFrame},
    descriptor::{HandlerDescriptor, ListenerId},
    registry::Registry,
    system::{DeadEvent, ExceptionEvent, is_system_event},
};
use signalbus_core::{
    BoxError, CancellationError, Defaults, DispatchError, Event, EventType, Handlers,
    IntoHandlerResult, InvocationError, Listener, PassThrough, RegistrationError,
};
use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};
use tracing::{debug, debug_span, info, warn};

const SEPARATOR_WIDTH: usize = 90;

struct Inner {
    id: BusId,
    name: String,
    defaults: Defaults,
    registry: Registry,
}

/// An in-process event dispatcher.
///
/// Cloning is cheap and yields a handle on the same bus; two handles
/// compare equal when they refer to the same bus.
///
/// # Example
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// bus.register_listener(Arc::new(Audit::default()))?;
/// bus.dispatch(OrderPlaced { total: 42 })?;
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// A bus with default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a bus.
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// The name used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Defaults applied to handlers that set no priority or polymorphism.
    pub fn defaults(&self) -> Defaults {
        self.inner.defaults
    }

    /// Register every handler `listener` declares.
    ///
    /// All declarations are checked before anything is bound, so a rejected
    /// listener leaves the bus untouched. A listener without handlers is
    /// accepted; the returned [`Registration`] reports it as a no-op.
    pub fn register_listener<L: Listener>(
        &self,
        listener: Arc<L>,
    ) -> Result<Registration, RegistrationError> {
        let id = ListenerId::of(&listener);
        let name = type_name::<L>();
        if self.inner.registry.contains(id) {
            return Err(RegistrationError::AlreadyRegistered { listener: name });
        }

        let defaults = self.inner.defaults.for_listener::<L>();
        let handlers = Handlers::<L>::of()
            .into_decls()
            .into_iter()
            .map(|decl| decl.validate(defaults))
            .collect::<Result<Vec<_>, _>>()?;

        let owner: Arc<dyn Any + Send + Sync> = listener.clone();
        self.inner.registry.admit(id, owner, name)?;

        let bound = handlers.len();
        for handler in handlers {
            self.inner
                .registry
                .bind(HandlerDescriptor::method(&listener, handler));
        }
        self.settle(id);

        if bound == 0 {
            warn!(bus = %self.inner.name, listener = name, "No event handlers bound for event listener");
        }
        info!(bus = %self.inner.name, listener = name, handlers = bound, "Registered event listener");

        Ok(Registration { id, bound })
    }

    /// Register a callback for events of type `E` with the bus defaults.
    pub fn register_callback<E, F, R>(&self, callback: F) -> Result<ListenerId, RegistrationError>
    where
        E: Event,
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.register_callback_with(callback, CallbackOptions::default())
    }

    /// Register a callback for events of type `E`.
    ///
    /// The callback becomes its own listener; remove it with the returned id.
    pub fn register_callback_with<E, F, R>(
        &self,
        callback: F,
        options: CallbackOptions,
    ) -> Result<ListenerId, RegistrationError>
    where
        E: Event,
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let callback = Arc::new(callback);
        let id = ListenerId::of(&callback);
        let owner: Arc<dyn Any + Send + Sync> = callback.clone();
        self.inner.registry.admit(id, owner, type_name::<F>())?;

        let defaults = self.inner.defaults;
        let polymorphic = options.polymorphic.unwrap_or(defaults.polymorphic);
        let priority = options.priority.unwrap_or(defaults.priority);
        self.inner.registry.bind(HandlerDescriptor::callback::<E, F, R>(
            id,
            callback,
            polymorphic,
            priority,
        ));
        self.settle(id);

        info!(bus = %self.inner.name, event = type_name::<E>(), "Registered callback");
        Ok(id)
    }

    /// Remove a listener and every handler it owns.
    ///
    /// Returns `false` if the listener was not registered.
    pub fn remove_listener<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.remove(ListenerId::of(listener))
    }

    /// Remove the listener or callback identified by `id`.
    ///
    /// Returns `false` if the listener was not registered and owned no handlers.
    pub fn remove(&self, id: ListenerId) -> bool {
        let (known, unbound) = self.inner.registry.remove_owner(id);
        if !known && unbound == 0 {
            return false;
        }
        info!(bus = %self.inner.name, ?id, handlers = unbound, "Removed event listener");
        true
    }

    // A remove or clear may run between admitting `id` and binding its
    // handlers. Undo whatever landed after the owner was forgotten.
    fn settle(&self, id: ListenerId) {
        if self.inner.registry.contains(id) {
            return;
        }
        let unbound = self.inner.registry.unbind_owner(id);
        debug!(bus = %self.inner.name, ?id, handlers = unbound, "Listener removed while binding");
    }

    /// Remove every listener and handler.
    pub fn clear_listeners(&self) {
        self.inner.registry.clear();
        info!(bus = %self.inner.name, "Cleared event listeners");
    }

    /// Snapshot of the registered listeners and callbacks.
    pub fn registered_listeners(&self) -> Vec<Arc<dyn Any + Send + Sync>> {
        self.inner.registry.listeners()
    }

    /// Check if `listener` is registered.
    pub fn is_registered<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.inner.registry.contains(ListenerId::of(listener))
    }

    /// Stop delivery of the innermost dispatch running on this thread.
    ///
    /// Handlers already invoked are unaffected; the remaining handlers of
    /// that dispatch are skipped. Enclosing dispatches continue normally.
    pub fn cancel(&self) -> Result<(), CancellationError> {
        context::request_cancel(self.inner.id)?;
        debug!(bus = %self.inner.name, "Cancellation requested");
        Ok(())
    }

    /// Number of dispatches of this bus active on the calling thread.
    pub fn nesting_depth(&self) -> usize {
        context::depth(self.inner.id)
    }

    /// Deliver `event` to every handler interested in its type.
    pub fn dispatch<E: Event>(&self, event: E) -> Result<(), DispatchError> {
        self.dispatch_shared(Arc::new(event))
    }

    /// Deliver an already shared event.
    pub fn dispatch_shared(&self, event: Arc<dyn Event>) -> Result<(), DispatchError> {
        let event_type = event.event_type();
        let span = debug_span!("dispatch", bus = %self.inner.name, event = %event_type);
        let _enter = span.enter();

        let frame = DispatchFrame::enter(self.inner.id);
        let handlers = self.inner.registry.resolve(event_type);
        let system = is_system_event(event_type);

        if handlers.is_empty() {
            if system {
                warn!(?event, "Unhandled system event");
            } else {
                debug!("No handlers, dispatching dead event");
                self.dispatch_shared(Arc::new(DeadEvent::new(self.clone(), Arc::clone(&event))))?;
            }
            return Ok(());
        }

        debug!(handlers = handlers.len(), "Dispatching event");
        for resolved in &handlers {
            if frame.take_cancel() {
                debug!("Dispatch cancelled");
                break;
            }

            let descriptor = resolved.descriptor();
            let result = match resolved.view(event.as_any()) {
                Some(view) => descriptor.invoke(view),
                None => Err(InvocationError::ArgumentMismatch {
                    expected: descriptor.event_type().name(),
                }
                .into()),
            };
            let Err(error) = result else {
                continue;
            };

            match classify(error) {
                Failure::PassThrough(cause) => {
                    debug!(handler = %descriptor, "Rethrowing pass-through failure");
                    return Err(DispatchError::PassThrough(cause));
                }
                Failure::Recoverable(cause) if system => {
                    warn!(handler = %descriptor, error = %cause, "Event handler of system event failed");
                }
                Failure::Recoverable(cause) => {
                    debug!(handler = %descriptor, error = %cause, "Event handler failed");
                    let exception = ExceptionEvent::new(self.clone(), Arc::clone(&event), cause);
                    self.dispatch_shared(Arc::new(exception))?;
                }
            }
        }

        Ok(())
    }

    /// A listing of the handlers an event of `event_type` would reach, in delivery order.
    pub fn describe_execution_order(&self, event_type: EventType) -> String {
        let handlers = self.inner.registry.resolve(event_type);
        let separator = "=".repeat(SEPARATOR_WIDTH);

        let mut lines = Vec::with_capacity(handlers.len() + 3);
        lines.push(format!(
            "Event handler execution order for {} ({} handler(s)):",
            event_type,
            handlers.len()
        ));
        lines.push(separator.clone());
        lines.extend(handlers.iter().map(|r| r.descriptor().to_string()));
        lines.push(separator);
        lines.join("\n")
    }
}

enum Failure {
    PassThrough(BoxError),
    Recoverable(BoxError),
}

fn classify(error: BoxError) -> Failure {
    let error = match error.downcast::<PassThrough>() {
        Ok(wrapper) => return Failure::PassThrough(wrapper.into_inner()),
        Err(error) => error,
    };
    match error.downcast::<DispatchError>() {
        Ok(nested) => Failure::PassThrough(nested.into_cause()),
        Err(error) => Failure::Recoverable(error),
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for EventBus {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EventBus {}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.inner.name)
            .field("listeners", &self.inner.registry.listener_count())
            .field("handlers", &self.inner.registry.handler_count())
            .finish()
    }
}

/// Builder for [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventBusBuilder {
    name: String,
    defaults: Defaults,
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            defaults: Defaults::default(),
        }
    }
}

impl EventBusBuilder {
    /// Name the bus in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Priority of handlers that set none (defaults to [`DEFAULT_PRIORITY`](signalbus_core::DEFAULT_PRIORITY)).
    pub fn default_priority(mut self, priority: i32) -> Self {
        self.defaults.priority = priority;
        self
    }

    /// Polymorphism of handlers that set none (defaults to `false`).
    pub fn default_polymorphic(mut self, polymorphic: bool) -> Self {
        self.defaults.polymorphic = polymorphic;
        self
    }

    /// Build the bus.
    pub fn build(self) -> EventBus {
        EventBus {
            inner: Arc::new(Inner {
                id: BusId::next(),
                name: self.name,
                defaults: self.defaults,
                registry: Registry::new(),
            }),
        }
    }
}

/// Outcome of a successful listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    id: ListenerId,
    bound: usize,
}

impl Registration {
    /// Identity of the registered listener.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Number of handlers bound.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Whether the listener declared no handlers at all.
    pub fn is_noop(&self) -> bool {
        self.bound == 0
    }
}

/// Metadata for a callback handler. Unset fields fall back to the bus defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackOptions {
    /// Also receive events of subtypes.
    pub polymorphic: Option<bool>,
    /// Priority (higher runs earlier).
    pub priority: Option<i32>,
}

impl CallbackOptions {
    /// Options that defer everything to the bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set polymorphism.
    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.polymorphic = Some(polymorphic);
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}
