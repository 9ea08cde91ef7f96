//! Tag indexes for one registry, rebound as a whole.

use crate::error::{RegistryError, Result};
use crate::holder::{Holder, HolderId, ReverseTag, TagSet};
use crate::name::ResourceName;
use crate::registry::Registry;
use crate::tag::{HolderSet, Tag, TagContents};
use crate::tag_key::TagKey;
use dashmap::DashMap;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Tuning for [`TagManager::bind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagManagerConfig {
    /// Number of tags from which unbinding and binding run on the rayon pool
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_parallel_threshold() -> usize {
    64
}

impl Default for TagManagerConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

/// Owns every [`Tag`] of one registry and rebinds them together.
///
/// `Tag` instances are created on first request and live as long as the
/// manager. A bind replaces the membership of every tag at once: readers
/// see either the complete previous generation or the complete new one.
pub struct TagManager<T> {
    registry: Arc<Registry<T>>,
    tags: DashMap<TagKey<T>, Arc<Tag<T>>>,
    gate: Arc<RwLock<()>>,
    config: TagManagerConfig,
    generation: AtomicU64,
}

impl<T> TagManager<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(registry: Arc<Registry<T>>) -> Self {
        Self::with_config(registry, TagManagerConfig::default())
    }

    pub fn with_config(registry: Arc<Registry<T>>, config: TagManagerConfig) -> Self {
        let gate = registry.tag_gate().clone();
        Self {
            registry,
            tags: DashMap::new(),
            gate,
            config,
            generation: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<Registry<T>> {
        &self.registry
    }

    pub fn create_tag_key(&self, name: ResourceName) -> TagKey<T> {
        TagKey::create(self.registry.key(), name)
    }

    /// Parses `text` as a tag name of this registry.
    pub fn parse_tag_key(&self, text: &str) -> Result<TagKey<T>> {
        let name = ResourceName::parse(text)
            .map_err(|err| RegistryError::InvalidTagKey(format!("'{text}': {err}")))?;
        Ok(self.create_tag_key(name))
    }

    /// Stable tag instance for `key`, created unbound on first request.
    pub fn get_tag(&self, key: &TagKey<T>) -> Arc<Tag<T>> {
        if let Some(tag) = self.tags.get(key) {
            return tag.value().clone();
        }
        self.tags
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Tag::new(key.clone(), self.gate.clone())))
            .value()
            .clone()
    }

    /// True only for a tag that already exists and is currently bound.
    pub fn is_known_tag_key(&self, key: &TagKey<T>) -> bool {
        let tag = self.tags.get(key).map(|entry| entry.value().clone());
        tag.is_some_and(|tag| tag.is_bound())
    }

    /// Every tag key seen so far, bound or not, in key order.
    pub fn tag_keys(&self) -> Vec<TagKey<T>> {
        let mut keys: Vec<TagKey<T>> = self.tags.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn bound_tag_keys(&self) -> Vec<TagKey<T>> {
        let _read = self.gate.read();
        let mut keys: Vec<TagKey<T>> = self
            .tags
            .iter()
            .filter(|entry| entry.value().is_bound_unguarded())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of completed binds.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn validate(&self, definitions: &HashMap<TagKey<T>, Vec<Arc<Holder<T>>>>) -> Result<()> {
        for (key, holders) in definitions {
            if !key.is_for(self.registry.key()) {
                return Err(RegistryError::InvalidTagKey(format!(
                    "{key:?} does not belong to registry {}",
                    self.registry.name()
                )));
            }
            for holder in holders {
                let owned = self
                    .registry
                    .holder(holder.id())
                    .is_some_and(|own| Arc::ptr_eq(&own, holder));
                if !owned {
                    return Err(RegistryError::ForeignHolder {
                        registry: self.registry.name().clone(),
                        holder: format!("{holder:?}"),
                    });
                }
            }
        }
        Ok(())
    }

    fn for_each_tag(&self, tags: &[Arc<Tag<T>>], op: impl Fn(&Arc<Tag<T>>) + Sync + Send) {
        if tags.len() >= self.config.parallel_threshold {
            tags.par_iter().for_each(op);
        } else {
            tags.iter().for_each(op);
        }
    }

    /// Replaces the membership of every tag of this manager.
    ///
    /// Tags absent from `definitions` end up unbound. Nothing is changed
    /// when validation fails: a key of another registry yields
    /// [`RegistryError::InvalidTagKey`], a holder this registry does not
    /// own (or has not bound) yields [`RegistryError::ForeignHolder`].
    pub fn bind(&self, definitions: HashMap<TagKey<T>, Vec<Arc<Holder<T>>>>) -> Result<()> {
        self.validate(&definitions)?;

        let mut memberships: BTreeMap<HolderId, TagSet<T>> = BTreeMap::new();
        let staged: Vec<(Arc<Tag<T>>, Arc<TagContents<T>>)> = definitions
            .into_iter()
            .map(|(key, holders)| {
                let set = HolderSet::new(holders);
                for holder in set.iter() {
                    memberships.entry(holder.id()).or_default().insert(key.clone());
                }
                (self.get_tag(&key), Arc::new(TagContents::new(set)))
            })
            .collect();

        let _write = self.gate.write();

        // Taken under the gate so tags created by a concurrent bind are unbound too
        let tracked: Vec<Arc<Tag<T>>> = self.tags.iter().map(|entry| entry.value().clone()).collect();
        let holders = self.registry.holders();

        self.for_each_tag(&tracked, |tag| tag.unbind());

        if staged.len() >= self.config.parallel_threshold {
            staged
                .par_iter()
                .for_each(|(tag, contents)| tag.bind(contents.clone()));
        } else {
            for (tag, contents) in &staged {
                tag.bind(contents.clone());
            }
        }

        for holder in &holders {
            holder.bind_tags(memberships.remove(&holder.id()).unwrap_or_default());
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        for (tag, contents) in &staged {
            debug!("🏷️ Bound {} to {} holders", tag.key(), contents.holders().len());
        }
        info!(
            "🏷️ Tag bind #{} for registry {}: {} of {} tags bound",
            generation,
            self.registry.name(),
            staged.len(),
            self.tags.len()
        );
        Ok(())
    }

    /// Tag membership view for a registered value, by identity.
    pub fn get_reverse_tag(&self, value: &Arc<T>) -> Option<ReverseTag<T>> {
        self.registry.get_delegate(value).map(ReverseTag::new)
    }
}

impl<T> fmt::Debug for TagManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagManager")
            .field("registry", &format_args!("{}", self.registry.name()))
            .field("tags", &self.tags.len())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
