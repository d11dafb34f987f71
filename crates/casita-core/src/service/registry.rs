// ── Service registry ──
//
// Explicit, composition-time registry of every data service instance.
// Its single job is the global reset at logout; it is injected where
// needed rather than living in a static.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// The reset surface every [`DataService`](super::DataService) exposes to
/// the registry.
pub trait ResettableService: Send + Sync {
    fn service_name(&self) -> &str;

    /// Restore the default value and forget all fetch state.
    fn reset(&self);
}

impl<T> ResettableService for super::DataService<T>
where
    T: Clone
        + serde::Serialize
        + serde::de::DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    fn service_name(&self) -> &str {
        self.name()
    }

    fn reset(&self) {
        Self::reset(self);
    }
}

/// Registry of all service instances, lifetime = application lifetime.
/// Services register themselves at construction.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Mutex<Vec<Arc<dyn ResettableService>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service: Arc<dyn ResettableService>) {
        self.services().push(service);
    }

    /// Reset every registered service to its default. Used exactly once
    /// per logout.
    pub fn reset_all(&self) {
        let services: Vec<Arc<dyn ResettableService>> = self.services().clone();
        for service in services {
            debug!(service = service.service_name(), "resetting");
            service.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.services().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services().is_empty()
    }

    fn services(&self) -> MutexGuard<'_, Vec<Arc<dyn ResettableService>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::service::{DataService, FetchFn, ServiceOptions};
    use casita_api::MemoryStore;
    use futures_util::FutureExt;

    fn fixed_fetch(value: Vec<u32>) -> FetchFn<Vec<u32>> {
        Arc::new(move || {
            let value = value.clone();
            async move { Ok(value) }.boxed()
        })
    }

    #[tokio::test]
    async fn services_register_at_construction() {
        let registry = ServiceRegistry::new();
        let store: Arc<dyn casita_api::KeyedStore> = Arc::new(MemoryStore::new());

        let _a = DataService::new(
            "A",
            Vec::new(),
            fixed_fetch(vec![1]),
            ServiceOptions::default(),
            Arc::clone(&store),
            &registry,
        );
        let _b = DataService::new(
            "B",
            Vec::new(),
            fixed_fetch(vec![2]),
            ServiceOptions::default(),
            store,
            &registry,
        );

        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn reset_all_reverts_every_service() {
        let registry = ServiceRegistry::new();
        let store: Arc<dyn casita_api::KeyedStore> = Arc::new(MemoryStore::new());

        let a = DataService::new(
            "A",
            Vec::new(),
            fixed_fetch(vec![1]),
            ServiceOptions::default(),
            Arc::clone(&store),
            &registry,
        );
        let b = DataService::new(
            "B",
            vec![9],
            fixed_fetch(vec![2]),
            ServiceOptions::default(),
            store,
            &registry,
        );

        a.get_data().await.unwrap();
        b.get_data().await.unwrap();
        assert!(a.fetched() && b.fetched());

        registry.reset_all();
        assert!(!a.fetched() && !b.fetched());
        assert_eq!(a.data(), Vec::<u32>::new());
        assert_eq!(b.data(), vec![9]);
    }
}
