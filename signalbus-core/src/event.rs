//! Event types and their hierarchy.
//!
//! Rust has no subtyping between structs, so an event type names its direct
//! supertypes explicitly through [`Event::supertypes`]. Each supertype comes
//! with an upcast that borrows the supertype view out of the event:
//!
//! - an ancestor type is usually embedded as a field (`&self.base`)
//! - an implemented interface is usually a unit-struct marker (`&Marker`)
//!
//! The relation is transitive. [`EventType::ancestry`] walks it once and
//! yields every proper supertype together with the upcast path leading to it.

use std::{
    any::{Any, TypeId, type_name},
    collections::{HashSet, VecDeque},
    fmt,
    hash::{Hash, Hasher},
};

/// Borrows a supertype view out of a value of the subtype.
pub type Upcast = fn(&dyn Any) -> Option<&dyn Any>;

/// A value that can be dispatched on an event bus.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug)]
/// struct BaseEvent { id: u64 }
/// impl Event for BaseEvent {}
///
/// #[derive(Debug)]
/// struct OrderPlaced { base: BaseEvent, total: u64 }
///
/// impl Event for OrderPlaced {
///     fn supertypes() -> Vec<Supertype> {
///         vec![Supertype::of::<Self, BaseEvent>()]
///     }
/// }
///
/// impl Extends<BaseEvent> for OrderPlaced {
///     fn upcast(&self) -> &BaseEvent { &self.base }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Event",
    label = "must implement `Event`",
    note = "Events must be `Send + Sync + Debug + 'static`; derive it with `#[derive(Event)]`."
)]
pub trait Event: AsEvent + Any + Send + Sync + fmt::Debug {
    /// The direct supertypes of this event type.
    fn supertypes() -> Vec<Supertype>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Object-safe accessors every [`Event`] gets for free.
pub trait AsEvent {
    /// The event as `&dyn Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The exact runtime type of the event.
    fn event_type(&self) -> EventType;
}

impl<T: Event> AsEvent for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn event_type(&self) -> EventType {
        EventType::of::<T>()
    }
}

impl dyn Event {
    /// Returns `true` if the event is exactly of type `T`.
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast the event to its exact type.
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Declares that `Self` is a subtype of `S`.
pub trait Extends<S: Event>: Event {
    /// Borrow the `S` view of this event.
    fn upcast(&self) -> &S;
}

fn upcast_via<E, S>(value: &dyn Any) -> Option<&dyn Any>
where
    E: Extends<S>,
    S: Event,
{
    value
        .downcast_ref::<E>()
        .map(|event| <E as Extends<S>>::upcast(event) as &dyn Any)
}

/// One direct supertype edge of an event type.
#[derive(Clone, Copy)]
pub struct Supertype {
    ty: EventType,
    upcast: Upcast,
}

impl Supertype {
    /// The edge `E -> S`.
    pub fn of<E, S>() -> Self
    where
        E: Extends<S>,
        S: Event,
    {
        Self {
            ty: EventType::of::<S>(),
            upcast: upcast_via::<E, S>,
        }
    }

    /// The supertype this edge leads to.
    pub fn event_type(&self) -> EventType {
        self.ty
    }
}

impl fmt::Debug for Supertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Supertype").field(&self.ty).finish()
    }
}

/// A runtime handle on an event type.
///
/// Equality, hashing and ordering only look at the `TypeId`.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<Supertype>,
}

impl EventType {
    /// The handle for `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: type_name::<E>(),
            supertypes: <E as Event>::supertypes,
        }
    }

    /// The `TypeId` of the event type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The direct supertypes.
    pub fn supertypes(&self) -> Vec<Supertype> {
        (self.supertypes)()
    }

    /// Every proper supertype, nearest first, each reached by its shortest path.
    pub fn ancestry(&self) -> Vec<Ancestor> {
        let mut seen = HashSet::from([self.id]);
        let mut ancestry = Vec::new();
        let mut queue: VecDeque<Ancestor> = self
            .supertypes()
            .into_iter()
            .map(|edge| Ancestor {
                ty: edge.ty,
                path: vec![edge.upcast],
            })
            .collect();

        while let Some(ancestor) = queue.pop_front() {
            if !seen.insert(ancestor.ty.id) {
                continue;
            }
            for edge in ancestor.ty.supertypes() {
                let mut path = ancestor.path.clone();
                path.push(edge.upcast);
                queue.push_back(Ancestor { ty: edge.ty, path });
            }
            ancestry.push(ancestor);
        }

        ancestry
    }

    /// Returns `true` if `self` is a proper subtype of `other`.
    pub fn is_subtype_of(&self, other: EventType) -> bool {
        self.ancestry().iter().any(|a| a.ty == other)
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for EventType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A proper supertype of some event type and the path that upcasts to it.
#[derive(Clone)]
pub struct Ancestor {
    ty: EventType,
    path: Vec<Upcast>,
}

impl Ancestor {
    /// The supertype.
    pub fn event_type(&self) -> EventType {
        self.ty
    }

    /// Number of edges between the subtype and this supertype.
    pub fn distance(&self) -> usize {
        self.path.len()
    }

    /// Borrow the supertype view of `value`.
    ///
    /// Returns `None` if `value` is not of the subtype this ancestry was computed for.
    pub fn view<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        self.path
            .iter()
            .try_fold(value, |current, upcast| upcast(current))
    }
}

impl fmt::Debug for Ancestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ancestor")
            .field("ty", &self.ty)
            .field("distance", &self.path.len())
            .finish()
    }
}

// Common Event implementations
macro_rules! impl_event {
    ($($ty:ty),* $(,)?) => {
        $(impl Event for $ty {})*
    };
}

impl_event!(
    (),
    bool,
    char,
    String,
    &'static str,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
);
