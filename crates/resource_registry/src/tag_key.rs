//! Interned tag keys.

use crate::intern::{Interner, NamePair};
use crate::key::RegistryKey;
use crate::name::ResourceName;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

static TAG_KEYS: Lazy<Interner<NamePair, NamePair>> = Lazy::new(Interner::new);

/// Interned identity of a named tag applicable to one registry.
///
/// Same interning discipline as [`crate::ResourceKey`], kept in a separate
/// table so a tag and an entry sharing a name never share an instance.
pub struct TagKey<T> {
    pair: Arc<NamePair>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TagKey<T> {
    /// Interns the tag key `location` for the registry named by `registry_key`.
    pub fn create(registry_key: &RegistryKey<T>, location: ResourceName) -> Self {
        let pair = TAG_KEYS.intern(
            NamePair::new(registry_key.location().clone(), location),
            |pair| pair.clone(),
        );
        Self {
            pair,
            _marker: PhantomData,
        }
    }

    pub fn registry(&self) -> &ResourceName {
        &self.pair.registry
    }

    pub fn location(&self) -> &ResourceName {
        &self.pair.location
    }

    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pair, &other.pair)
    }

    pub fn is_for<U>(&self, registry_key: &RegistryKey<U>) -> bool {
        self.pair.registry == *registry_key.location()
    }
}

/// Sweeps tag-key slots whose instances were all dropped.
pub fn purge_unused_tag_keys() -> usize {
    TAG_KEYS.purge_unused()
}

/// Number of tag keys currently referenced somewhere in the process.
pub fn live_tag_key_count() -> usize {
    TAG_KEYS.live_count()
}

impl<T> Clone for TagKey<T> {
    fn clone(&self) -> Self {
        Self {
            pair: self.pair.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for TagKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pair, &other.pair) || *self.pair == *other.pair
    }
}

impl<T> Eq for TagKey<T> {}

impl<T> Hash for TagKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pair.hash(state);
    }
}

impl<T> PartialOrd for TagKey<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TagKey<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pair.cmp(&other.pair)
    }
}

impl<T> fmt::Debug for TagKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagKey[{} / {}]", self.pair.registry, self.pair.location)
    }
}

impl<T> fmt::Display for TagKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.pair.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ResourceKey;

    fn name(text: &str) -> ResourceName {
        ResourceName::parse(text).unwrap()
    }

    #[test]
    fn test_tag_keys_are_interned_per_registry() {
        let blocks = RegistryKey::<u8>::create_registry_key(name("tagkeytest:blocks"));
        let items = RegistryKey::<u8>::create_registry_key(name("tagkeytest:items"));

        let a = TagKey::create(&blocks, name("tagkeytest:soft"));
        let b = TagKey::create(&blocks, name("tagkeytest:soft"));
        let other = TagKey::create(&items, name("tagkeytest:soft"));

        assert!(a.is_same(&b));
        assert_ne!(a, other);
        assert!(a.is_for(&blocks));
        assert!(!a.is_for(&items));
        assert_eq!(a.to_string(), "#tagkeytest:soft");
    }

    #[test]
    fn test_tag_and_entry_keys_do_not_share_instances() {
        let registry = RegistryKey::<u8>::create_registry_key(name("tagkeytest:shared"));
        let entry = ResourceKey::create(&registry, name("tagkeytest:same"));
        let tag = TagKey::create(&registry, name("tagkeytest:same"));
        assert_eq!(entry.location(), tag.location());
        assert!(live_tag_key_count() >= 1);
    }
}
