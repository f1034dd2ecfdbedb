//! # Listeners
//!
//! A [`Listener`] is a type whose values own handlers. Its handlers are
//! discovered once, at registration, by walking the listener's hierarchy
//! through a [`Handlers`] collector:
//!
//! - [`Handlers::add`] declares the type's own handlers
//! - [`Handlers::inherit`] pulls in an ancestor listener reached through a field
//! - [`Handlers::implement`] pulls in an interface's handlers (usually a trait)
//!
//! Declarations closer to the listener win: an own handler overrides an
//! inherited one of the same name and keeps its own metadata. Sealed
//! handlers are private to their declaring type and never override.

use crate::handler::HandlerDecl;

/// A type whose values declare event handlers.
///
/// Prefer `#[listener]` over implementing this by hand.
///
/// # Example
///
/// ```rust,ignore
/// struct Audit { log: Mutex<Vec<String>> }
///
/// impl Listener for Audit {
///     const PRIORITY: Option<i32> = Some(150);
///
///     fn declare(handlers: &mut Handlers<Self>) {
///         handlers.add(HandlerDecl::method("on_order", |this: &Self, e: &OrderPlaced| {
///             this.log.lock().unwrap().push(format!("{e:?}"));
///         }));
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Listener",
    label = "missing `Listener` implementation",
    note = "Annotate an `impl` block of `{Self}` with `#[listener]` or implement `Listener::declare`."
)]
pub trait Listener: Send + Sync + 'static {
    /// Priority for this listener's handlers that do not set their own.
    const PRIORITY: Option<i32> = None;

    /// Polymorphism for this listener's handlers that do not set their own.
    const POLYMORPHIC: Option<bool> = None;

    /// Declare the handlers of this listener type.
    fn declare(handlers: &mut Handlers<Self>)
    where
        Self: Sized;
}

struct Entry<L> {
    depth: usize,
    decl: HandlerDecl<L>,
}

/// Collects the handler declarations of a listener type and its hierarchy.
pub struct Handlers<L> {
    depth: usize,
    entries: Vec<Entry<L>>,
}

impl<L: 'static> Handlers<L> {
    /// An empty collector for the listener type itself.
    pub fn new() -> Self {
        Self::at_depth(0)
    }

    fn at_depth(depth: usize) -> Self {
        Self {
            depth,
            entries: Vec::new(),
        }
    }

    /// Collect every handler `L` declares.
    pub fn of() -> Self
    where
        L: Listener,
    {
        let mut handlers = Self::new();
        L::declare(&mut handlers);
        handlers
    }

    /// Declare a handler of this type.
    pub fn add(&mut self, decl: HandlerDecl<L>) -> &mut Self {
        self.insert(self.depth, decl);
        self
    }

    /// Pull in the handlers of ancestor `B`, reached through `project`.
    pub fn inherit<B: Listener>(&mut self, project: fn(&L) -> &B) -> &mut Self {
        let mut ancestor = Handlers::<B>::at_depth(self.depth + 1);
        B::declare(&mut ancestor);
        for entry in ancestor.entries {
            self.insert(entry.depth, entry.decl.project(project));
        }
        self
    }

    /// Pull in the handlers declared by an interface.
    pub fn implement(&mut self, declare: fn(&mut Handlers<L>)) -> &mut Self {
        let mut interface = Handlers::<L>::at_depth(self.depth + 1);
        declare(&mut interface);
        for entry in interface.entries {
            self.insert(entry.depth, entry.decl);
        }
        self
    }

    fn insert(&mut self, depth: usize, decl: HandlerDecl<L>) {
        let key = decl.override_key();
        match self
            .entries
            .iter()
            .position(|entry| entry.decl.override_key() == key)
        {
            Some(index) if self.entries[index].depth > depth => {
                self.entries[index] = Entry { depth, decl };
            }
            Some(_) => {}
            None => self.entries.push(Entry { depth, decl }),
        }
    }

    /// Number of distinct handlers collected.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the collected declarations.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerDecl<L>> {
        self.entries.iter().map(|entry| &entry.decl)
    }

    /// Consume the collector, yielding the declarations.
    pub fn into_decls(self) -> Vec<HandlerDecl<L>> {
        self.entries.into_iter().map(|entry| entry.decl).collect()
    }
}

impl<L: 'static> Default for Handlers<L> {
    fn default() -> Self {
        Self::new()
    }
}
