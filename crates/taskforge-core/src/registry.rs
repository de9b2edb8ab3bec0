//! Typed service registry.
//!
//! The host-lifecycle framework and its dependency-injection container are
//! external collaborators (see `SPEC_FULL.md` §1). What the engine itself
//! needs is a way for a task body to reach shared services by type without
//! reflection — a typed registry with compile-time capability sets, per the
//! design note replacing "reflection-based service resolution".

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

/// A concurrent, type-keyed bag of shared services passed to every task
/// execution. Cheap to clone (`Arc`-backed internally via the caller).
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service instance under its concrete type.
    ///
    /// Overwrites any previously registered instance of the same type; use
    /// [`ServiceRegistry::try_register`] to reject duplicates.
    pub fn register<S: Any + Send + Sync>(&self, service: S) {
        self.services.insert(TypeId::of::<S>(), Arc::new(service));
    }

    /// Register a service instance, failing if one is already present.
    pub fn try_register<S: Any + Send + Sync>(
        &self,
        service: S,
    ) -> Result<(), crate::error::TaskforgeError> {
        use dashmap::mapref::entry::Entry;
        match self.services.entry(TypeId::of::<S>()) {
            Entry::Occupied(_) => Err(crate::error::TaskforgeError::AlreadyRegistered {
                name: std::any::type_name::<S>().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(service));
                Ok(())
            }
        }
    }

    /// Look up a previously registered service by concrete type.
    #[must_use]
    pub fn get<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        self.services
            .get(&TypeId::of::<S>())
            .and_then(|entry| Arc::clone(entry.value()).downcast::<S>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    #[test]
    fn register_and_get_roundtrip() {
        let registry = ServiceRegistry::new();
        registry.register(Counter(7));
        let found = registry.get::<Counter>().expect("service present");
        assert_eq!(found.0, 7);
    }

    #[test]
    fn missing_service_is_none() {
        let registry = ServiceRegistry::new();
        assert!(registry.get::<Counter>().is_none());
    }

    #[test]
    fn try_register_rejects_duplicate() {
        let registry = ServiceRegistry::new();
        registry.try_register(Counter(1)).unwrap();
        let err = registry.try_register(Counter(2));
        assert!(err.is_err());
    }
}
