//! Bound handlers and their total order.

use bitflags::bitflags;
use signalbus_core::{
    Event, EventType, HandlerResult, IntoHandlerResult, InvocationError, ValidHandler,
};
use std::{
    any::{Any, type_name},
    cmp::Reverse,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Identity of a registered listener (the address of its allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    /// The identity of the listener behind `listener`.
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }
}

/// Identity of a bound handler, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Total order over bound handlers.
///
/// Priority descending, then owner identity, then handler identity. Two
/// distinct handlers never compare equal. Only the priority part is
/// meaningful to callers; the order among equal priorities is unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    priority: Reverse<i32>,
    owner: ListenerId,
    handler: HandlerId,
}

impl OrderKey {
    /// The priority part of the key.
    pub fn priority(&self) -> i32 {
        self.priority.0
    }
}

bitflags! {
    /// Boolean properties of a bound handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HandlerFlags: u8 {
        /// Also receives events of subtypes.
        const POLYMORPHIC = 1;
        /// The body receives the event value.
        const USES_EVENT = 1 << 1;
    }
}

type Thunk = Box<dyn Fn(&dyn Any) -> HandlerResult + Send + Sync>;

/// How a bound handler is called.
pub enum Invocation {
    /// A handler declared by a listener type, bound to one listener value.
    Method {
        /// Type name of the registered listener.
        listener: &'static str,
        /// Type name of the type that declared the handler.
        declared_by: &'static str,
        /// The handler name.
        method: &'static str,
        /// Calls the handler on the bound listener.
        thunk: Thunk,
    },
    /// A free callback registered for one event type.
    Callback {
        /// Calls the callback.
        thunk: Thunk,
    },
}

impl Invocation {
    fn call(&self, event: &dyn Any) -> HandlerResult {
        match self {
            Invocation::Method { thunk, .. } | Invocation::Callback { thunk } => thunk(event),
        }
    }
}

/// One handler bound to one event type. Immutable once created.
pub struct HandlerDescriptor {
    id: HandlerId,
    owner: ListenerId,
    event_type: EventType,
    priority: i32,
    flags: HandlerFlags,
    invocation: Invocation,
}

impl HandlerDescriptor {
    /// Bind a validated declaration to `listener`.
    pub fn method<L: Send + Sync + 'static>(listener: &Arc<L>, handler: ValidHandler<L>) -> Self {
        let mut flags = HandlerFlags::empty();
        flags.set(HandlerFlags::POLYMORPHIC, handler.polymorphic);
        flags.set(HandlerFlags::USES_EVENT, handler.uses_event);

        let event_type = handler.event_type;
        let priority = handler.priority;
        let declared_by = handler.declared_by;
        let method = handler.name;
        let bound = Arc::clone(listener);

        Self {
            id: HandlerId::next(),
            owner: ListenerId::of(listener),
            event_type,
            priority,
            flags,
            invocation: Invocation::Method {
                listener: type_name::<L>(),
                declared_by,
                method,
                thunk: Box::new(move |event: &dyn Any| handler.call(&bound, event)),
            },
        }
    }

    /// Bind a callback for events of type `E`.
    pub fn callback<E, F, R>(
        owner: ListenerId,
        callback: Arc<F>,
        polymorphic: bool,
        priority: i32,
    ) -> Self
    where
        E: Event,
        F: Fn(&E) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let mut flags = HandlerFlags::USES_EVENT;
        flags.set(HandlerFlags::POLYMORPHIC, polymorphic);

        Self {
            id: HandlerId::next(),
            owner,
            event_type: EventType::of::<E>(),
            priority,
            flags,
            invocation: Invocation::Callback {
                thunk: Box::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
                    Some(event) => callback(event).into_handler_result(),
                    None => Err(InvocationError::ArgumentMismatch {
                        expected: type_name::<E>(),
                    }
                    .into()),
                }),
            },
        }
    }

    /// Run the handler. `event` must be a value of [`event_type`](Self::event_type).
    pub fn invoke(&self, event: &dyn Any) -> HandlerResult {
        self.invocation.call(event)
    }

    /// The position of this handler in the total order.
    pub fn key(&self) -> OrderKey {
        OrderKey {
            priority: Reverse(self.priority),
            owner: self.owner,
            handler: self.id,
        }
    }

    /// The handler's identity.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// The listener that owns the handler.
    pub fn owner(&self) -> ListenerId {
        self.owner
    }

    /// The exact event type the handler is bound to.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Effective priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the handler also receives events of subtypes.
    pub fn is_polymorphic(&self) -> bool {
        self.flags.contains(HandlerFlags::POLYMORPHIC)
    }

    /// Whether the body receives the event value.
    pub fn uses_event(&self) -> bool {
        self.flags.contains(HandlerFlags::USES_EVENT)
    }

    /// How the handler is called.
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.invocation {
            Invocation::Method {
                listener,
                declared_by,
                method,
                ..
            } => write!(
                f,
                "MethodHandler[event_type={}, polymorphic={}, priority={}, listener={}, method={}::{}, uses_event={}]",
                self.event_type,
                self.is_polymorphic(),
                self.priority,
                listener,
                declared_by,
                method,
                self.uses_event()
            ),
            Invocation::Callback { .. } => write!(
                f,
                "CallbackHandler[event_type={}, polymorphic={}, priority={}]",
                self.event_type,
                self.is_polymorphic(),
                self.priority
            ),
        }
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("event_type", &self.event_type)
            .field("priority", &self.priority)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
