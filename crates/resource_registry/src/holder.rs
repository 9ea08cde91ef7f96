//! Stable per-entry indirection cells and their reverse-tag view.

use crate::error::{RegistryError, Result};
use crate::key::ResourceKey;
use crate::name::ResourceName;
use crate::tag_key::TagKey;
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Opaque index of a holder inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HolderId(pub(crate) u32);

impl HolderId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Binding<T> {
    key: ResourceKey<T>,
    value: Arc<T>,
}

/// Tag keys a holder currently belongs to, in key order.
pub type TagSet<T> = BTreeSet<TagKey<T>>;

/// Indirection cell for one registry slot.
///
/// A holder is either unbound (no key, no value) or bound to a key and a
/// value. The `Arc<Holder<T>>` handed out by the registry keeps its identity
/// for the lifetime of the registry, so callers can hold on to it across
/// tag rebinds. Key and value are swapped in together as one binding.
///
/// Tag reads wait for a bind in progress on the owning registry, so the
/// reverse view always agrees with the tags themselves.
pub struct Holder<T> {
    id: HolderId,
    owner: ResourceName,
    binding: ArcSwapOption<Binding<T>>,
    tags: ArcSwap<TagSet<T>>,
    gate: Arc<RwLock<()>>,
}

impl<T> Holder<T> {
    pub(crate) fn unbound(id: HolderId, owner: ResourceName, gate: Arc<RwLock<()>>) -> Self {
        Self {
            id,
            owner,
            binding: ArcSwapOption::empty(),
            tags: ArcSwap::from_pointee(TagSet::new()),
            gate,
        }
    }

    pub fn id(&self) -> HolderId {
        self.id
    }

    /// Name of the registry owning this holder.
    pub fn registry_name(&self) -> &ResourceName {
        &self.owner
    }

    pub fn is_bound(&self) -> bool {
        self.binding.load().is_some()
    }

    fn bound(&self) -> Result<Arc<Binding<T>>> {
        self.binding.load_full().ok_or_else(|| {
            RegistryError::UnboundAccess(format!(
                "holder {} of registry {} has no key or value yet",
                self.id, self.owner
            ))
        })
    }

    pub fn key(&self) -> Result<ResourceKey<T>> {
        Ok(self.bound()?.key.clone())
    }

    pub fn value(&self) -> Result<Arc<T>> {
        Ok(self.bound()?.value.clone())
    }

    /// True when the bound entry is named `name`.
    pub fn is_name(&self, name: &ResourceName) -> Result<bool> {
        Ok(self.bound()?.key.location() == name)
    }

    /// True when the bound entry has exactly `key`.
    pub fn is_key(&self, key: &ResourceKey<T>) -> Result<bool> {
        Ok(self.bound()?.key == *key)
    }

    /// Tests the bound key against an arbitrary predicate.
    pub fn is_matching(&self, predicate: impl FnOnce(&ResourceKey<T>) -> bool) -> Result<bool> {
        Ok(predicate(&self.bound()?.key))
    }

    /// True when the last tag bind placed this holder in `tag`. Never fails.
    pub fn is_in(&self, tag: &TagKey<T>) -> bool {
        self.tags().contains(tag)
    }

    /// Snapshot of the tags this holder belongs to.
    pub fn tags(&self) -> Arc<TagSet<T>> {
        let _read = self.gate.read();
        self.tags.load_full()
    }

    pub fn tag_keys(&self) -> Vec<TagKey<T>> {
        self.tags().iter().cloned().collect()
    }

    pub(crate) fn bind(&self, key: ResourceKey<T>, value: Arc<T>) {
        self.binding.store(Some(Arc::new(Binding { key, value })));
    }

    pub(crate) fn bind_tags(&self, tags: TagSet<T>) {
        self.tags.store(Arc::new(tags));
    }
}

impl<T> fmt::Debug for Holder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.binding.load() {
            Some(binding) => write!(f, "Holder{{{} {:?}}}", self.id, binding.key),
            None => write!(f, "Holder{{{} unbound in {}}}", self.id, self.owner),
        }
    }
}

/// "Which tags contain me" view over one holder.
pub struct ReverseTag<T> {
    holder: Arc<Holder<T>>,
}

impl<T> ReverseTag<T> {
    pub(crate) fn new(holder: Arc<Holder<T>>) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> &Arc<Holder<T>> {
        &self.holder
    }

    pub fn contains(&self, tag: &TagKey<T>) -> bool {
        self.holder.is_in(tag)
    }

    pub fn tag_keys(&self) -> Vec<TagKey<T>> {
        self.holder.tag_keys()
    }

    pub fn len(&self) -> usize {
        self.holder.tags().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for ReverseTag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseTag")
            .field("holder", &self.holder)
            .field("tags", &self.holder.tag_keys())
            .finish()
    }
}
