//! Procedural macros for signalbus.
//!
//! - `#[derive(Event)]` with `#[event(supertype(..))]` declares an event and its supertypes
//! - `#[listener]` on an inherent impl block implements `Listener` from its `#[handler]` methods
//! - `#[listener]` on a trait lets implementing listeners pull in the trait's handlers
//!
//! Use them through the `signalbus` crate; the generated code refers to `::signalbus`.

use proc_macro::TokenStream;

mod event;
mod handler;
mod listener;

/// Derive macro for implementing `Event`.
///
/// Supertypes are declared with `#[event(...)]`:
///
/// ```rust,ignore
/// #[derive(Debug, Event)]
/// struct Audited;
///
/// #[derive(Debug, Event)]
/// struct BaseEvent { id: u64 }
///
/// #[derive(Debug, Event)]
/// #[event(supertype(BaseEvent, field = base), supertype(Audited))]
/// struct OrderPlaced { base: BaseEvent, total: u64 }
/// ```
///
/// `field = member` upcasts by borrowing the field. Without a field the
/// supertype must be a unit struct, which is borrowed as a constant.
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    event::derive_event_impl(input)
}

/// Declare the handlers of a listener type or of a listener trait.
///
/// On an inherent impl block:
///
/// ```rust,ignore
/// #[listener(priority = 150, extends(base: AuditBase), implements(Greeter))]
/// impl OrderAudit {
///     #[handler]
///     pub fn on_order(&self, order: &OrderPlaced) { .. }
///
///     #[handler(event = Tick, priority = 200, polymorphic)]
///     fn on_tick(&self) -> Result<(), BoxError> { .. }
/// }
/// ```
///
/// Listener arguments:
/// - `priority = expr`, `polymorphic [= bool]` - defaults for this listener's handlers
/// - `extends(field: Type, ..)` - inherit the handlers of a listener embedded as a field
/// - `implements(Trait, ..)` - include the handlers of traits annotated with `#[listener]`
///
/// Handler arguments:
/// - `event = Type` - explicit event type, for handlers without a parameter
/// - `priority = expr`, `polymorphic [= bool]`
/// - `sealed [= bool]` - never overrides and is never overridden; defaults to
///   `true` for private methods of an impl block
///
/// A handler takes `&self` (or no receiver) and either one `&Event`
/// parameter or none plus `event = Type`. Anything else is a compile error.
#[proc_macro_attribute]
pub fn listener(attr: TokenStream, item: TokenStream) -> TokenStream {
    listener::listener_impl(attr, item)
}
