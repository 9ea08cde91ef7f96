//! Interned resource keys.
//!
//! A [`ResourceKey`] names "entry `location` inside registry `registry`". Keys
//! for the same pair are the same allocation while any clone is alive, so
//! hot lookups can compare them with [`ResourceKey::is_same`]. Structural
//! equality, hashing and ordering are always available and never disagree
//! with identity.

use crate::intern::{Interner, NamePair};
use crate::name::ResourceName;
use crate::registry::Registry;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

static RESOURCE_KEYS: Lazy<Interner<NamePair, NamePair>> = Lazy::new(Interner::new);

/// Name of the registry that holds every other registry.
pub static ROOT_REGISTRY_NAME: Lazy<ResourceName> =
    Lazy::new(|| ResourceName::from_static("core", "root"));

/// Key of a registry inside the root registry.
pub type RegistryKey<T> = ResourceKey<Registry<T>>;

/// Interned identity of one entry inside one named registry.
pub struct ResourceKey<T> {
    pair: Arc<NamePair>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceKey<T> {
    fn intern(registry: ResourceName, location: ResourceName) -> Self {
        let pair = RESOURCE_KEYS.intern(NamePair::new(registry, location), |pair| pair.clone());
        Self {
            pair,
            _marker: PhantomData,
        }
    }

    /// Name of the registry this key points into.
    pub fn registry(&self) -> &ResourceName {
        &self.pair.registry
    }

    /// Name of the entry inside that registry.
    pub fn location(&self) -> &ResourceName {
        &self.pair.location
    }

    /// True when both keys are the same interned instance.
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pair, &other.pair)
    }

    /// True when this key points into the registry named by `registry_key`.
    pub fn is_for<U>(&self, registry_key: &RegistryKey<U>) -> bool {
        self.pair.registry == *registry_key.location()
    }

    /// Retypes the key if it belongs to `registry_key`'s registry.
    pub fn cast<U>(&self, registry_key: &RegistryKey<U>) -> Option<ResourceKey<U>> {
        self.is_for(registry_key).then(|| ResourceKey {
            pair: self.pair.clone(),
            _marker: PhantomData,
        })
    }
}

impl<T> ResourceKey<T> {
    /// Interns the key for `location` inside the registry named by `registry_key`.
    pub fn create(registry_key: &RegistryKey<T>, location: ResourceName) -> Self {
        Self::intern(registry_key.location().clone(), location)
    }
}

impl<T> ResourceKey<Registry<T>> {
    /// Interns the key under which a registry is known to the root registry.
    pub fn create_registry_key(location: ResourceName) -> Self {
        Self::intern(ROOT_REGISTRY_NAME.clone(), location)
    }
}

/// Sweeps resource-key slots whose instances were all dropped.
pub fn purge_unused_keys() -> usize {
    RESOURCE_KEYS.purge_unused()
}

/// Number of resource keys currently referenced somewhere in the process.
pub fn live_key_count() -> usize {
    RESOURCE_KEYS.live_count()
}

impl<T> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        Self {
            pair: self.pair.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for ResourceKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pair, &other.pair) || *self.pair == *other.pair
    }
}

impl<T> Eq for ResourceKey<T> {}

impl<T> Hash for ResourceKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pair.hash(state);
    }
}

impl<T> PartialOrd for ResourceKey<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ResourceKey<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pair.cmp(&other.pair)
    }
}

impl<T> fmt::Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey[{} / {}]", self.pair.registry, self.pair.location)
    }
}

impl<T> fmt::Display for ResourceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
