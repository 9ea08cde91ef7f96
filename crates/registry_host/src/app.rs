//! Application state and bootstrap sequence.

use crate::config::AppConfig;
use crate::error::HostError;
use crate::events::{EntryRegisteredEvent, LifecycleLogger, RegistryLockedEvent, TagsBoundEvent};
use event_bus::{Event, EventBus};
use resource_registry::{Registry, RegistryKey, ResourceName, RootRegistry, TagManager};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Value stored in the bootstrap registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub name: ResourceName,
    /// Position in the configured entry list
    pub ordinal: usize,
}

/// Outcome of [`Application::bootstrap`].
#[derive(Debug)]
pub struct BootstrapReport {
    pub registry_key: RegistryKey<RegistryEntry>,
    pub registry: Arc<Registry<RegistryEntry>>,
    pub tags: Arc<TagManager<RegistryEntry>>,
    /// Entries whose registration was vetoed by a listener
    pub skipped: Vec<ResourceName>,
    pub bound_tags: Vec<ResourceName>,
}

/// The host: a root registry plus the bus its lifecycle events go through.
pub struct Application {
    config: AppConfig,
    root: RootRegistry,
    bus: Arc<EventBus>,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        let bus = Arc::new(EventBus::with_config(config.event_bus.clone()));
        bus.register_static::<LifecycleLogger>();
        Self {
            config,
            root: RootRegistry::new(),
            bus,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bus on which lifecycle events are posted; add listeners before
    /// calling [`Application::bootstrap`] to observe or veto entries.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn root(&self) -> &RootRegistry {
        &self.root
    }

    /// Creates the configured registry, registers its entries, optionally
    /// locks it and binds the configured tags.
    ///
    /// Members of a tag whose entry was vetoed are left out of that tag.
    pub fn bootstrap(&self) -> Result<BootstrapReport, HostError> {
        let settings = &self.config.bootstrap;
        let registry_name = ResourceName::parse(&settings.registry)?;
        let registry = Arc::new(Registry::<RegistryEntry>::new(registry_name.clone()));

        let mut skipped = Vec::new();
        for (ordinal, entry) in settings.entries.iter().enumerate() {
            let name = ResourceName::parse(entry)?;
            let event = self
                .bus
                .post(EntryRegisteredEvent::new(registry_name.clone(), name.clone()))?;
            if event.is_canceled() {
                warn!("⚠️ Registration of {} into {} was vetoed", name, registry_name);
                skipped.push(name);
                continue;
            }
            registry.register(name.clone(), RegistryEntry { name, ordinal })?;
        }

        let registry_key = self.root.register(registry.clone())?;

        if settings.locked_after_bootstrap {
            registry.lock();
            self.bus
                .post(RegistryLockedEvent::new(registry_name.clone(), registry.len()))?;
        }

        let tags = Arc::new(TagManager::with_config(registry.clone(), self.config.tags.clone()));
        let mut definitions = HashMap::new();
        for (tag, members) in &settings.tags {
            let key = tags.parse_tag_key(tag)?;
            let mut holders = Vec::with_capacity(members.len());
            for member in members {
                let name = ResourceName::parse(member)?;
                match registry.get(&name) {
                    Some(holder) => holders.push(holder),
                    None => warn!("⚠️ Tag {} skips unregistered member {}", key, name),
                }
            }
            definitions.insert(key, holders);
        }
        tags.bind(definitions)?;

        let bound_tags: Vec<ResourceName> = tags
            .bound_tag_keys()
            .iter()
            .map(|key| key.location().clone())
            .collect();
        self.bus.post(TagsBoundEvent::new(
            registry_name,
            bound_tags.clone(),
            tags.generation(),
        ))?;

        Ok(BootstrapReport {
            registry_key,
            registry,
            tags,
            skipped,
            bound_tags,
        })
    }

    /// Bootstraps, logs a summary and shuts the bus down.
    pub fn run(self) -> Result<BootstrapReport, HostError> {
        info!("🚀 Bootstrapping registry {}", self.config.bootstrap.registry);
        let report = self.bootstrap()?;

        for name in report.registry.names() {
            let tags = report
                .registry
                .get(&name)
                .map(|holder| holder.tag_keys())
                .unwrap_or_default();
            let tags: Vec<String> = tags.iter().map(|key| key.location().to_string()).collect();
            info!("📦 {} tags=[{}]", name, tags.join(", "));
        }

        let stats = self.bus.stats();
        info!(
            "✅ Registry {} ready: {} entries, {} skipped, {} tags bound, {} events posted",
            report.registry.name(),
            report.registry.len(),
            report.skipped.len(),
            report.bound_tags.len(),
            stats.events_posted
        );

        self.bus.shutdown();
        Ok(report)
    }
}
