//! # Resource Registry
//!
//! Namespaced, lockable registries with interned keys and atomically
//! rebindable tag indexes.
//!
//! ## Key Features
//!
//! - **Interned keys**: `ResourceKey` and `TagKey` instances for the same
//!   name pair are shared while alive and swept on demand
//! - **Stable holders**: every registry slot is an `Arc<Holder<T>>` whose
//!   identity survives tag rebinding
//! - **Lockable registries**: registration is rejected once a registry is
//!   frozen
//! - **Tag generations**: `TagManager::bind` swaps the membership of every
//!   tag at once; readers never see a half-applied bind
//!
//! ## Usage
//!
//! ```rust
//! use resource_registry::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new(ResourceName::parse("demo:numbers")?));
//! let two = registry.register(ResourceName::parse("demo:two")?, 2u32)?;
//! registry.lock();
//!
//! let tags = TagManager::new(registry.clone());
//! let evens = tags.parse_tag_key("demo:evens")?;
//! tags.bind(HashMap::from([(evens.clone(), vec![two.clone()])]))?;
//!
//! assert!(tags.get_tag(&evens).contains(&two));
//! assert!(two.is_in(&evens));
//! # Ok::<(), RegistryError>(())
//! ```

pub mod error;
pub mod holder;
pub mod intern;
pub mod key;
pub mod name;
pub mod registry;
pub mod root;
pub mod tag;
pub mod tag_key;
pub mod tag_manager;

pub use error::{RegistryError, Result};
pub use holder::{Holder, HolderId, ReverseTag, TagSet};
pub use intern::Interner;
pub use key::{live_key_count, purge_unused_keys, RegistryKey, ResourceKey, ROOT_REGISTRY_NAME};
pub use name::{ResourceName, DEFAULT_NAMESPACE, SEPARATOR};
pub use registry::Registry;
pub use root::RootRegistry;
pub use tag::{HolderSet, Tag, TagContents};
pub use tag_key::{live_tag_key_count, purge_unused_tag_keys, TagKey};
pub use tag_manager::{TagManager, TagManagerConfig};
