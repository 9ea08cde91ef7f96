//! Lockable name → holder registries.

use crate::error::{RegistryError, Result};
use crate::holder::{Holder, HolderId};
use crate::key::{RegistryKey, ResourceKey};
use crate::name::ResourceName;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of a shared value, used for reverse lookups.
fn value_address<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

/// A mutable-until-locked mapping from [`ResourceName`] to [`Holder`].
///
/// Every holder reachable through the lookup methods is bound. Names are
/// registered at most once: a second `register` for the same name is
/// rejected with [`RegistryError::DuplicateRegistration`] instead of
/// overwriting the first value.
///
/// Reads are lock-free. Writers are serialised by an internal mutex so that
/// the name, value and holder tables always agree with each other.
pub struct Registry<T> {
    key: RegistryKey<T>,
    by_name: DashMap<ResourceName, HolderId>,
    by_value: DashMap<usize, HolderId>,
    holders: DashMap<HolderId, Arc<Holder<T>>>,
    /// Forward references handed out before their name was registered
    pending: DashMap<ResourceName, Arc<Holder<T>>>,
    next_id: AtomicU32,
    locked: AtomicBool,
    write_lock: Mutex<()>,
    /// Shared with every holder and tag; a tag bind holds the write side
    tag_gate: Arc<RwLock<()>>,
}

impl<T> Registry<T> {
    /// Key under which this registry is known to the root registry.
    pub fn key(&self) -> &RegistryKey<T> {
        &self.key
    }

    pub fn name(&self) -> &ResourceName {
        self.key.location()
    }

    pub(crate) fn tag_gate(&self) -> &Arc<RwLock<()>> {
        &self.tag_gate
    }
}

impl<T> Registry<T>
where
    T: Send + Sync + 'static,
{
    /// Creates an empty, unlocked registry named `name`.
    pub fn new(name: ResourceName) -> Self {
        Self::with_key(RegistryKey::<T>::create_registry_key(name))
    }

    pub fn with_key(key: RegistryKey<T>) -> Self {
        Self {
            key,
            by_name: DashMap::new(),
            by_value: DashMap::new(),
            holders: DashMap::new(),
            pending: DashMap::new(),
            next_id: AtomicU32::new(0),
            locked: AtomicBool::new(false),
            write_lock: Mutex::new(()),
            tag_gate: Arc::new(RwLock::new(())),
        }
    }

    fn allocate(&self) -> Arc<Holder<T>> {
        let id = HolderId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Arc::new(Holder::unbound(id, self.name().clone(), self.tag_gate.clone()))
    }

    /// Registers `value` under `name` and returns its holder.
    pub fn register(&self, name: ResourceName, value: T) -> Result<Arc<Holder<T>>> {
        self.register_shared(name, Arc::new(value))
    }

    /// Registers an already shared value under `name`.
    ///
    /// If a forward reference for `name` was handed out earlier, that same
    /// holder is bound and returned.
    pub fn register_shared(&self, name: ResourceName, value: Arc<T>) -> Result<Arc<Holder<T>>> {
        let _guard = self.write_lock.lock();

        if self.is_locked() {
            return Err(RegistryError::RegistryLocked(self.name().clone()));
        }
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateRegistration {
                registry: self.name().clone(),
                name,
            });
        }
        let address = value_address(&value);
        if let Some(existing) = self.by_value.get(&address).map(|id| *id) {
            let existing = self
                .holders
                .get(&existing)
                .and_then(|entry| entry.value().key().ok())
                .map(|key| key.location().clone())
                .unwrap_or_else(|| name.clone());
            return Err(RegistryError::DuplicateValue {
                registry: self.name().clone(),
                name,
                existing,
            });
        }

        let holder = match self.pending.remove(&name) {
            Some((_, reference)) => reference,
            None => self.allocate(),
        };
        holder.bind(ResourceKey::create(&self.key, name.clone()), value);

        self.holders.insert(holder.id(), holder.clone());
        self.by_value.insert(address, holder.id());
        self.by_name.insert(name.clone(), holder.id());

        debug!("📝 Registered {} in {} as {}", name, self.name(), holder.id());
        Ok(holder)
    }

    /// Returns a holder for `name` even if nothing is registered there yet.
    ///
    /// The returned holder stays unbound until `register` is called for the
    /// same name and is not visible through [`Registry::get`] until then.
    pub fn get_or_create_reference(&self, name: ResourceName) -> Result<Arc<Holder<T>>> {
        let _guard = self.write_lock.lock();

        if let Some(holder) = self.get(&name) {
            return Ok(holder);
        }
        if let Some(reference) = self.pending.get(&name) {
            return Ok(reference.value().clone());
        }
        if self.is_locked() {
            return Err(RegistryError::RegistryLocked(self.name().clone()));
        }

        let reference = self.allocate();
        self.pending.insert(name.clone(), reference.clone());
        debug!("🔗 Created forward reference {} for {} in {}", reference.id(), name, self.name());
        Ok(reference)
    }

    pub fn get(&self, name: &ResourceName) -> Option<Arc<Holder<T>>> {
        let id = *self.by_name.get(name)?;
        self.holder(id)
    }

    /// Looks up by key; keys of other registries never match.
    pub fn get_by_key(&self, key: &ResourceKey<T>) -> Option<Arc<Holder<T>>> {
        if !key.is_for(&self.key) {
            return None;
        }
        self.get(key.location())
    }

    pub fn get_value(&self, name: &ResourceName) -> Option<Arc<T>> {
        self.get(name).and_then(|holder| holder.value().ok())
    }

    pub fn contains(&self, name: &ResourceName) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn holder(&self, id: HolderId) -> Option<Arc<Holder<T>>> {
        self.holders.get(&id).map(|holder| holder.value().clone())
    }

    /// Reverse lookup from a registered value back to its holder.
    ///
    /// Matches on the identity of the shared allocation, never on `T`'s own
    /// equality.
    pub fn get_delegate(&self, value: &Arc<T>) -> Option<Arc<Holder<T>>> {
        let id = *self.by_value.get(&value_address(value))?;
        self.holder(id)
    }

    /// All bound holders in registration order.
    pub fn holders(&self) -> Vec<Arc<Holder<T>>> {
        let mut holders: Vec<Arc<Holder<T>>> =
            self.holders.iter().map(|entry| entry.value().clone()).collect();
        holders.sort_by_key(|holder| holder.id());
        holders
    }

    /// All registered names in name order.
    pub fn names(&self) -> Vec<ResourceName> {
        let mut names: Vec<ResourceName> =
            self.by_name.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Freezes the registry. Idempotent.
    ///
    /// Forward references that were never registered stay unbound forever;
    /// they are reported once here.
    pub fn lock(&self) {
        let _guard = self.write_lock.lock();
        if self.locked.swap(true, Ordering::AcqRel) {
            return;
        }

        if !self.pending.is_empty() {
            let mut dangling: Vec<String> =
                self.pending.iter().map(|entry| entry.key().to_string()).collect();
            dangling.sort();
            warn!(
                "⚠️ Registry {} locked with {} unbound references: {}",
                self.name(),
                dangling.len(),
                dangling.join(", ")
            );
        }
        info!("🔒 Registry {} locked with {} entries", self.name(), self.len());
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", self.key.location())
            .field("entries", &self.by_name.len())
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> ResourceName {
        ResourceName::parse(text).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new(name("regtest:numbers"));
        let one = registry.register(name("regtest:one"), 1u32).unwrap();

        let found = registry.get(&name("regtest:one")).unwrap();
        assert!(Arc::ptr_eq(&one, &found));
        assert_eq!(*found.value().unwrap(), 1);
        assert!(registry.get(&name("regtest:two")).is_none());
        assert_eq!(registry.len(), 1);

        let key = one.key().unwrap();
        assert!(Arc::ptr_eq(&registry.get_by_key(&key).unwrap(), &one));
    }

    #[test]
    fn test_duplicate_name_is_rejected_without_overwrite() {
        let registry = Registry::new(name("regtest:dupes"));
        registry.register(name("regtest:a"), 1u32).unwrap();

        let err = registry.register(name("regtest:a"), 2u32).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
        assert_eq!(*registry.get_value(&name("regtest:a")).unwrap(), 1);
    }

    #[test]
    fn test_same_shared_value_cannot_be_registered_twice() {
        let registry = Registry::new(name("regtest:shared"));
        let value = Arc::new(5u32);
        registry.register_shared(name("regtest:first"), value.clone()).unwrap();

        let err = registry
            .register_shared(name("regtest:second"), value)
            .unwrap_err();
        match err {
            RegistryError::DuplicateValue { existing, .. } => {
                assert_eq!(existing, name("regtest:first"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_locked_registry_rejects_registration_and_keeps_contents() {
        let registry = Registry::new(name("regtest:locked"));
        registry.register(name("regtest:a"), 1u32).unwrap();
        registry.lock();
        registry.lock();

        let err = registry.register(name("regtest:b"), 2u32).unwrap_err();
        assert_eq!(err, RegistryError::RegistryLocked(name("regtest:locked")));
        assert_eq!(registry.names(), vec![name("regtest:a")]);
        assert!(registry.is_locked());
    }

    #[test]
    fn test_get_delegate_uses_identity() {
        let registry = Registry::new(name("regtest:identity"));
        let holder = registry.register(name("regtest:a"), String::from("same")).unwrap();
        registry.register(name("regtest:b"), String::from("same")).unwrap();

        let value = holder.value().unwrap();
        let delegate = registry.get_delegate(&value).unwrap();
        assert!(Arc::ptr_eq(&delegate, &holder));

        let lookalike = Arc::new(String::from("same"));
        assert!(registry.get_delegate(&lookalike).is_none());
    }

    #[test]
    fn test_forward_reference_is_bound_by_registration() {
        let registry = Registry::new(name("regtest:forward"));
        let reference = registry.get_or_create_reference(name("regtest:later")).unwrap();
        assert!(!reference.is_bound());
        assert!(registry.get(&name("regtest:later")).is_none());

        let again = registry.get_or_create_reference(name("regtest:later")).unwrap();
        assert!(Arc::ptr_eq(&reference, &again));

        let registered = registry.register(name("regtest:later"), 9u32).unwrap();
        assert!(Arc::ptr_eq(&reference, &registered));
        assert_eq!(*reference.value().unwrap(), 9);
    }

    #[test]
    fn test_no_new_references_after_lock() {
        let registry: Registry<u32> = Registry::new(name("regtest:forward_locked"));
        registry.lock();
        assert!(registry.get_or_create_reference(name("regtest:x")).is_err());
    }

    #[test]
    fn test_holders_are_in_registration_order() {
        let registry = Registry::new(name("regtest:order"));
        for (path, value) in [("c", 3u32), ("a", 1), ("b", 2)] {
            registry.register(name(&format!("regtest:{path}")), value).unwrap();
        }
        let values: Vec<u32> = registry
            .holders()
            .iter()
            .map(|holder| *holder.value().unwrap())
            .collect();
        assert_eq!(values, vec![3, 1, 2]);
    }
}
