//! Derived, rebindable views over a subset of a registry's holders.

use crate::holder::{Holder, HolderId};
use crate::tag_key::TagKey;
use arc_swap::ArcSwapOption;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Ordered, duplicate-free collection of holders.
///
/// Order is the order in which holders were supplied; a holder listed twice
/// keeps its first position.
pub struct HolderSet<T> {
    holders: Vec<Arc<Holder<T>>>,
    index: HashSet<HolderId>,
}

impl<T> HolderSet<T> {
    pub fn new(holders: impl IntoIterator<Item = Arc<Holder<T>>>) -> Self {
        let mut index = HashSet::new();
        let holders = holders
            .into_iter()
            .filter(|holder| index.insert(holder.id()))
            .collect();
        Self { holders, index }
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Holder<T>>> {
        self.holders.iter()
    }

    pub fn contains_id(&self, id: HolderId) -> bool {
        self.index.contains(&id)
    }
}

/// One generation of a tag's membership.
///
/// Readers that keep an `Arc<TagContents>` keep a consistent snapshot even
/// if the tag is rebound meanwhile.
pub struct TagContents<T> {
    holders: HolderSet<T>,
    values: OnceCell<Vec<Arc<T>>>,
}

impl<T> TagContents<T> {
    pub(crate) fn new(holders: HolderSet<T>) -> Self {
        Self {
            holders,
            values: OnceCell::new(),
        }
    }

    pub fn holders(&self) -> &HolderSet<T> {
        &self.holders
    }

    /// Member values, computed on first use and cached for this generation.
    pub fn values(&self) -> &[Arc<T>] {
        self.values.get_or_init(|| {
            self.holders
                .iter()
                .filter_map(|holder| holder.value().ok())
                .collect()
        })
    }
}

/// A named tag of one registry.
///
/// The tag never owns its membership; the tag manager binds a
/// [`TagContents`] generation into it. An unbound tag is empty.
pub struct Tag<T> {
    key: TagKey<T>,
    contents: ArcSwapOption<TagContents<T>>,
    gate: Arc<RwLock<()>>,
}

impl<T> Tag<T> {
    pub(crate) fn new(key: TagKey<T>, gate: Arc<RwLock<()>>) -> Self {
        Self {
            key,
            contents: ArcSwapOption::empty(),
            gate,
        }
    }

    pub fn key(&self) -> &TagKey<T> {
        &self.key
    }

    /// Current generation, or `None` while unbound.
    ///
    /// Waits for a bind in progress to finish, so a tag is never observed
    /// between its unbind and its rebind.
    pub fn contents(&self) -> Option<Arc<TagContents<T>>> {
        let _read = self.gate.read();
        self.contents.load_full()
    }

    pub fn is_bound(&self) -> bool {
        self.contents().is_some()
    }

    pub fn len(&self) -> usize {
        self.contents().map_or(0, |contents| contents.holders.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `holder` is a member of the current generation.
    pub fn contains(&self, holder: &Holder<T>) -> bool {
        holder.registry_name() == self.key.registry()
            && self
                .contents()
                .is_some_and(|contents| contents.holders.contains_id(holder.id()))
    }

    /// True when the exact shared value is a member of the current generation.
    pub fn contains_value(&self, value: &Arc<T>) -> bool {
        self.contents().is_some_and(|contents| {
            contents
                .values()
                .iter()
                .any(|member| Arc::ptr_eq(member, value))
        })
    }

    /// Members in bound order; empty while unbound.
    pub fn holders(&self) -> Vec<Arc<Holder<T>>> {
        self.contents()
            .map(|contents| contents.holders.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Member values in bound order; empty while unbound.
    pub fn values(&self) -> Vec<Arc<T>> {
        self.contents()
            .map(|contents| contents.values().to_vec())
            .unwrap_or_default()
    }

    /// For callers already holding the read side of the gate.
    pub(crate) fn is_bound_unguarded(&self) -> bool {
        self.contents.load().is_some()
    }

    pub(crate) fn bind(&self, contents: Arc<TagContents<T>>) {
        self.contents.store(Some(contents));
    }

    pub(crate) fn unbind(&self) {
        self.contents.store(None);
    }
}

impl<T> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contents = self.contents.load();
        f.debug_struct("Tag")
            .field("key", &self.key)
            .field("bound", &contents.is_some())
            .field("len", &contents.as_ref().map_or(0, |c| c.holders.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{RegistryKey, ResourceKey};
    use crate::name::ResourceName;

    fn name(text: &str) -> ResourceName {
        ResourceName::parse(text).unwrap()
    }

    fn bound_holder(registry: &RegistryKey<u32>, id: u32, path: &str, value: u32) -> Arc<Holder<u32>> {
        let holder = Holder::unbound(HolderId(id), registry.location().clone(), Arc::new(RwLock::new(())));
        holder.bind(ResourceKey::create(registry, name(path)), Arc::new(value));
        Arc::new(holder)
    }

    #[test]
    fn test_fresh_tag_is_unbound_and_empty() {
        let registry = RegistryKey::<u32>::create_registry_key(name("tagtest:fresh"));
        let tag = Tag::new(
            TagKey::create(&registry, name("tagtest:any")),
            Arc::new(RwLock::new(())),
        );
        assert!(!tag.is_bound());
        assert_eq!(tag.len(), 0);
        assert!(tag.holders().is_empty());
        assert!(tag.values().is_empty());
    }

    #[test]
    fn test_holder_set_keeps_first_position_of_duplicates() {
        let registry = RegistryKey::<u32>::create_registry_key(name("tagtest:dupes"));
        let a = bound_holder(&registry, 0, "tagtest:a", 1);
        let b = bound_holder(&registry, 1, "tagtest:b", 2);
        let set = HolderSet::new(vec![b.clone(), a.clone(), b.clone()]);

        let order: Vec<HolderId> = set.iter().map(|holder| holder.id()).collect();
        assert_eq!(order, vec![b.id(), a.id()]);
    }

    #[test]
    fn test_unbind_empties_a_bound_tag() {
        let registry = RegistryKey::<u32>::create_registry_key(name("tagtest:unbind"));
        let a = bound_holder(&registry, 0, "tagtest:a", 1);
        let tag = Tag::new(
            TagKey::create(&registry, name("tagtest:some")),
            Arc::new(RwLock::new(())),
        );

        tag.bind(Arc::new(TagContents::new(HolderSet::new([a.clone()]))));
        assert!(tag.contains(&a));
        assert!(tag.contains_value(&a.value().unwrap()));
        assert_eq!(tag.values().iter().map(|v| **v).collect::<Vec<_>>(), vec![1]);

        tag.unbind();
        assert!(!tag.is_bound());
        assert!(!tag.contains(&a));
        assert_eq!(tag.len(), 0);
    }

    #[test]
    fn test_snapshot_survives_rebind() {
        let registry = RegistryKey::<u32>::create_registry_key(name("tagtest:snapshot"));
        let a = bound_holder(&registry, 0, "tagtest:a", 1);
        let b = bound_holder(&registry, 1, "tagtest:b", 2);
        let tag = Tag::new(
            TagKey::create(&registry, name("tagtest:rebound")),
            Arc::new(RwLock::new(())),
        );

        tag.bind(Arc::new(TagContents::new(HolderSet::new([a.clone()]))));
        let old = tag.contents().unwrap();
        tag.bind(Arc::new(TagContents::new(HolderSet::new([b.clone()]))));

        assert!(old.holders().contains_id(a.id()));
        assert!(!tag.contains(&a));
        assert!(tag.contains(&b));
    }
}
