//! The registry of registries.

use crate::error::{RegistryError, Result};
use crate::key::{RegistryKey, ROOT_REGISTRY_NAME};
use crate::name::ResourceName;
use crate::registry::Registry;
use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Holds registries of any value type, keyed by [`RegistryKey`].
///
/// Lookups are typed: a registry stored as `Registry<u32>` is only returned
/// for a `RegistryKey<u32>`.
#[derive(Default)]
pub struct RootRegistry {
    registries: DashMap<ResourceName, Arc<dyn Any + Send + Sync>>,
    locked: AtomicBool,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &ResourceName {
        &ROOT_REGISTRY_NAME
    }

    /// Adds `registry` under its own key.
    pub fn register<T>(&self, registry: Arc<Registry<T>>) -> Result<RegistryKey<T>>
    where
        T: Send + Sync + 'static,
    {
        if self.is_locked() {
            return Err(RegistryError::RegistryLocked(ROOT_REGISTRY_NAME.clone()));
        }
        let key = registry.key().clone();
        match self.registries.entry(key.location().clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::DuplicateRegistration {
                registry: ROOT_REGISTRY_NAME.clone(),
                name: key.location().clone(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(registry);
                debug!("📚 Added registry {} to {}", key.location(), *ROOT_REGISTRY_NAME);
                Ok(key)
            }
        }
    }

    /// Registry stored under `key`, if its value type matches.
    pub fn get<T>(&self, key: &RegistryKey<T>) -> Option<Arc<Registry<T>>>
    where
        T: Send + Sync + 'static,
    {
        let entry = self.registries.get(key.location())?.value().clone();
        entry.downcast::<Registry<T>>().ok()
    }

    pub fn contains(&self, name: &ResourceName) -> bool {
        self.registries.contains_key(name)
    }

    pub fn names(&self) -> Vec<ResourceName> {
        let mut names: Vec<ResourceName> =
            self.registries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Stops accepting new registries. Idempotent.
    pub fn lock(&self) {
        if !self.locked.swap(true, Ordering::AcqRel) {
            info!("🔒 Root registry locked with {} registries", self.len());
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for RootRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootRegistry")
            .field("registries", &self.names())
            .field("locked", &self.is_locked())
            .finish()
    }
}
