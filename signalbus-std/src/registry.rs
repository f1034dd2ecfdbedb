//! Concurrent handler registry.
//!
//! Handlers are stored in buckets keyed by the exact event type they were
//! bound to. Polymorphic handlers are found at lookup time by visiting the
//! buckets of every supertype of the queried type; nothing about that walk
//! is written back into the buckets.
//!
//! Readers see a weakly consistent view: a bind or unbind racing with a
//! lookup may or may not be part of its result.

use crate::descriptor::{HandlerDescriptor, ListenerId, OrderKey};
use dashmap::{DashMap, mapref::entry::Entry};
use signalbus_core::{Ancestor, EventType, RegistrationError};
use std::{any::Any, collections::BTreeMap, sync::Arc};
use tracing::debug;

type Bucket = BTreeMap<OrderKey, Arc<HandlerDescriptor>>;

/// A handler that applies to a queried event type.
#[derive(Debug, Clone)]
pub struct Resolved {
    descriptor: Arc<HandlerDescriptor>,
    via: Option<Ancestor>,
}

impl Resolved {
    /// The bound handler.
    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// The supertype through which a polymorphic handler matched, if any.
    pub fn via(&self) -> Option<EventType> {
        self.via.as_ref().map(Ancestor::event_type)
    }

    /// The view of `event` the handler expects.
    pub fn view<'a>(&self, event: &'a dyn Any) -> Option<&'a dyn Any> {
        match &self.via {
            Some(ancestor) => ancestor.view(event),
            None => Some(event),
        }
    }
}

/// Handler buckets plus the set of registered listeners.
#[derive(Default)]
pub struct Registry {
    buckets: DashMap<EventType, Bucket>,
    listeners: DashMap<ListenerId, Arc<dyn Any + Send + Sync>>,
    ancestry: DashMap<EventType, Arc<[Ancestor]>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `listener` as registered, failing if it already is.
    pub fn admit(
        &self,
        id: ListenerId,
        listener: Arc<dyn Any + Send + Sync>,
        name: &'static str,
    ) -> Result<(), RegistrationError> {
        match self.listeners.entry(id) {
            Entry::Occupied(_) => Err(RegistrationError::AlreadyRegistered { listener: name }),
            Entry::Vacant(slot) => {
                slot.insert(listener);
                Ok(())
            }
        }
    }

    /// Insert a handler into the bucket of its event type.
    pub fn bind(&self, descriptor: HandlerDescriptor) {
        debug!(handler = %descriptor, "Binding event handler");
        self.buckets
            .entry(descriptor.event_type())
            .or_default()
            .insert(descriptor.key(), Arc::new(descriptor));
    }

    /// Forget `id` and unbind every handler it owns.
    ///
    /// Returns whether `id` was registered and the number of handlers unbound.
    /// The listener is forgotten before the scan, so a registration still
    /// binding `id` either sees it gone and rolls back, or finished binding
    /// before the scan.
    pub fn remove_owner(&self, id: ListenerId) -> (bool, usize) {
        let known = self.listeners.remove(&id).is_some();
        (known, self.unbind_owner(id))
    }

    /// Unbind every handler owned by `id`, leaving the listener table alone.
    ///
    /// Returns the number of handlers unbound.
    pub fn unbind_owner(&self, id: ListenerId) -> usize {
        let mut unbound = 0;
        for mut bucket in self.buckets.iter_mut() {
            bucket.retain(|_, descriptor| {
                let owned = descriptor.owner() == id;
                if owned {
                    debug!(handler = %descriptor, "Unbinding event handler");
                    unbound += 1;
                }
                !owned
            });
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        unbound
    }

    /// Remove every registered listener and its handlers.
    pub fn clear(&self) {
        let ids: Vec<ListenerId> = self.listeners.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.remove_owner(id);
        }
    }

    /// The ordered handlers that must receive an event of type `event_type`:
    /// its own bucket plus the polymorphic handlers of every supertype bucket.
    pub fn resolve(&self, event_type: EventType) -> Vec<Resolved> {
        let mut ordered = BTreeMap::new();

        if let Some(bucket) = self.buckets.get(&event_type) {
            for (key, descriptor) in bucket.iter() {
                ordered.insert(
                    *key,
                    Resolved {
                        descriptor: Arc::clone(descriptor),
                        via: None,
                    },
                );
            }
        }

        for ancestor in self.ancestry_of(event_type).iter() {
            let Some(bucket) = self.buckets.get(&ancestor.event_type()) else {
                continue;
            };
            for (key, descriptor) in bucket.iter().filter(|(_, d)| d.is_polymorphic()) {
                ordered.entry(*key).or_insert_with(|| Resolved {
                    descriptor: Arc::clone(descriptor),
                    via: Some(ancestor.clone()),
                });
            }
        }

        ordered.into_values().collect()
    }

    fn ancestry_of(&self, event_type: EventType) -> Arc<[Ancestor]> {
        if let Some(cached) = self.ancestry.get(&event_type) {
            return Arc::clone(&cached);
        }
        let ancestry: Arc<[Ancestor]> = event_type.ancestry().into();
        self.ancestry.insert(event_type, Arc::clone(&ancestry));
        ancestry
    }

    /// Check if `id` is registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    /// Snapshot of the registered listeners.
    pub fn listeners(&self) -> Vec<Arc<dyn Any + Send + Sync>> {
        self.listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of bound handlers across all buckets.
    pub fn handler_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalbus_core::{Defaults, Event, Extends, HandlerDecl, Supertype};

    #[derive(Debug)]
    struct Base;
    impl Event for Base {}

    #[derive(Debug)]
    struct Sub {
        base: Base,
    }

    impl Event for Sub {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::of::<Self, Base>()]
        }
    }

    impl Extends<Base> for Sub {
        fn upcast(&self) -> &Base {
            &self.base
        }
    }

    struct Owner;

    fn on_base(owner: &Arc<Owner>, priority: i32, polymorphic: bool) -> HandlerDescriptor {
        let valid = HandlerDecl::method("on_base", |_: &Owner, _: &Base| ())
            .priority(priority)
            .polymorphic(polymorphic)
            .validate(Defaults::default())
            .unwrap();
        HandlerDescriptor::method(owner, valid)
    }

    fn on_sub(owner: &Arc<Owner>, priority: i32) -> HandlerDescriptor {
        let valid = HandlerDecl::method("on_sub", |_: &Owner, _: &Sub| ())
            .priority(priority)
            .validate(Defaults::default())
            .unwrap();
        HandlerDescriptor::method(owner, valid)
    }

    #[test]
    fn test_resolve_merges_polymorphic_supertype_handlers() {
        let registry = Registry::new();
        let owner = Arc::new(Owner);
        registry.bind(on_sub(&owner, 100));
        registry.bind(on_base(&owner, 200, true));
        registry.bind(on_base(&owner, 300, false));

        let resolved = registry.resolve(EventType::of::<Sub>());
        let priorities: Vec<_> = resolved.iter().map(|r| r.descriptor().priority()).collect();
        assert_eq!(priorities, vec![200, 100]);
        assert_eq!(resolved[0].via(), Some(EventType::of::<Base>()));
        assert_eq!(resolved[1].via(), None);

        let sub = Sub { base: Base };
        let view = resolved[0].view(&sub).unwrap();
        assert!(view.is::<Base>());
    }

    #[test]
    fn test_exact_bucket_includes_non_polymorphic() {
        let registry = Registry::new();
        let owner = Arc::new(Owner);
        registry.bind(on_base(&owner, 100, false));
        registry.bind(on_base(&owner, 100, true));
        assert_eq!(registry.resolve(EventType::of::<Base>()).len(), 2);
    }

    #[test]
    fn test_unbind_owner_only_touches_its_handlers() {
        let registry = Registry::new();
        let first = Arc::new(Owner);
        let second = Arc::new(Owner);
        registry.bind(on_sub(&first, 100));
        registry.bind(on_sub(&first, 50));
        registry.bind(on_sub(&second, 100));

        assert_eq!(registry.unbind_owner(ListenerId::of(&first)), 2);
        assert_eq!(registry.handler_count(), 1);
        assert_eq!(registry.unbind_owner(ListenerId::of(&second)), 1);
        assert_eq!(registry.handler_count(), 0);
        assert!(registry.resolve(EventType::of::<Sub>()).is_empty());
    }

    #[test]
    fn test_remove_owner_scans_even_when_forgotten() {
        let registry = Registry::new();
        let owner = Arc::new(Owner);
        let id = ListenerId::of(&owner);
        registry.admit(id, owner.clone(), "Owner").unwrap();
        assert_eq!(registry.remove_owner(id), (true, 0));

        // A bind that lands after the owner was forgotten is still reachable
        registry.bind(on_sub(&owner, 100));
        assert_eq!(registry.remove_owner(id), (false, 1));
        assert_eq!(registry.handler_count(), 0);
    }

    #[test]
    fn test_clear_unbinds_registered_owners() {
        let registry = Registry::new();
        let owner = Arc::new(Owner);
        let id = ListenerId::of(&owner);
        registry.admit(id, owner.clone(), "Owner").unwrap();
        registry.bind(on_sub(&owner, 100));
        registry.bind(on_base(&owner, 100, true));

        registry.clear();
        assert_eq!(registry.handler_count(), 0);
        assert!(registry.resolve(EventType::of::<Sub>()).is_empty());
    }

    #[test]
    fn test_admit_rejects_duplicates() {
        let registry = Registry::new();
        let owner = Arc::new(Owner);
        let id = ListenerId::of(&owner);
        registry.admit(id, owner.clone(), "Owner").unwrap();
        let err = registry.admit(id, owner.clone(), "Owner").unwrap_err();
        assert_eq!(
            err,
            RegistrationError::AlreadyRegistered { listener: "Owner" }
        );
        assert!(registry.contains(id));

        registry.clear();
        assert!(!registry.contains(id));
        assert_eq!(registry.listener_count(), 0);
    }
}
