//! Weakly cached interning tables.
//!
//! An [`Interner`] hands out one canonical `Arc` per key for as long as any
//! clone of that `Arc` is alive elsewhere. The table itself only stores
//! `Weak` handles, so dropping every external clone lets the value go; the
//! stale table slot stays behind until [`Interner::purge_unused`] sweeps it.

use crate::name::ResourceName;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

/// Concurrent map from structural key to a weakly held canonical instance.
pub struct Interner<K, V> {
    table: DashMap<K, Weak<V>>,
}

impl<K, V> Interner<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }

    /// Returns the live instance for `key`, or builds and records a new one.
    ///
    /// The lookup and the insert happen under the same shard lock, so two
    /// threads racing on a missing key always end up with the same `Arc`.
    pub fn intern(&self, key: K, make: impl FnOnce(&K) -> V) -> Arc<V> {
        match self.table.entry(key) {
            Entry::Occupied(mut slot) => {
                if let Some(live) = slot.get().upgrade() {
                    return live;
                }
                let fresh = Arc::new(make(slot.key()));
                slot.insert(Arc::downgrade(&fresh));
                fresh
            }
            Entry::Vacant(slot) => {
                let fresh = Arc::new(make(slot.key()));
                slot.insert(Arc::downgrade(&fresh));
                fresh
            }
        }
    }

    /// Number of table slots, including ones whose value was dropped.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of slots whose value is still referenced somewhere.
    pub fn live_count(&self) -> usize {
        self.table
            .iter()
            .filter(|slot| slot.value().strong_count() > 0)
            .count()
    }

    /// Drops every slot whose value is gone and returns how many were removed.
    pub fn purge_unused(&self) -> usize {
        let before = self.table.len();
        self.table.retain(|_, weak| weak.strong_count() > 0);
        before.saturating_sub(self.table.len())
    }
}

impl<K, V> Default for Interner<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Structural identity shared by resource keys and tag keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NamePair {
    pub(crate) registry: ResourceName,
    pub(crate) location: ResourceName,
}

impl NamePair {
    pub(crate) fn new(registry: ResourceName, location: ResourceName) -> Self {
        Self { registry, location }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_key_yields_same_instance_while_alive() {
        let interner: Interner<&'static str, String> = Interner::new();
        let first = interner.intern("a", |k| k.to_string());
        let second = interner.intern("a", |_| unreachable!("live value must be reused"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(interner.live_count(), 1);
    }

    #[test]
    fn test_collected_value_is_recreated_and_purged() {
        let interner: Interner<&'static str, String> = Interner::new();
        let first = interner.intern("a", |k| k.to_string());
        let snapshot = (*first).clone();
        drop(first);

        assert_eq!(interner.len(), 1);
        assert_eq!(interner.live_count(), 0);

        let again = interner.intern("a", |k| k.to_string());
        assert_eq!(*again, snapshot);
        drop(again);

        assert_eq!(interner.purge_unused(), 1);
        assert!(interner.is_empty());
    }

    #[test]
    fn test_concurrent_interning_converges_on_one_instance() {
        let interner: Arc<Interner<u32, u32>> = Arc::new(Interner::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = interner.clone();
                thread::spawn(move || interner.intern(7, |k| *k))
            })
            .collect();

        let results: Vec<Arc<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
