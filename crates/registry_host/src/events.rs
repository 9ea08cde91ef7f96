//! Lifecycle events posted while the host bootstraps its registry.

use event_bus::{impl_event, Event, EventPriority, EventState, StaticSubscriber, SubscriptionList};
use resource_registry::ResourceName;
use tracing::info;

/// Posted before an entry is registered. Canceling it skips the entry.
#[derive(Debug)]
pub struct EntryRegisteredEvent {
    state: EventState,
    pub registry: ResourceName,
    pub name: ResourceName,
}

impl EntryRegisteredEvent {
    pub fn new(registry: ResourceName, name: ResourceName) -> Self {
        Self {
            state: EventState::default(),
            registry,
            name,
        }
    }
}

impl_event!(EntryRegisteredEvent, cancelable);

/// Posted once the registry has been locked.
#[derive(Debug)]
pub struct RegistryLockedEvent {
    state: EventState,
    pub registry: ResourceName,
    pub entries: usize,
}

impl RegistryLockedEvent {
    pub fn new(registry: ResourceName, entries: usize) -> Self {
        Self {
            state: EventState::default(),
            registry,
            entries,
        }
    }
}

impl_event!(RegistryLockedEvent);

/// Posted after a successful tag bind.
#[derive(Debug)]
pub struct TagsBoundEvent {
    state: EventState,
    pub registry: ResourceName,
    pub bound_tags: Vec<ResourceName>,
    pub generation: u64,
}

impl TagsBoundEvent {
    pub fn new(registry: ResourceName, bound_tags: Vec<ResourceName>, generation: u64) -> Self {
        Self {
            state: EventState::default(),
            registry,
            bound_tags,
            generation,
        }
    }
}

impl_event!(TagsBoundEvent);

/// Logs every lifecycle event after all other listeners have run.
pub struct LifecycleLogger;

impl StaticSubscriber for LifecycleLogger {
    fn subscribe(subscriptions: &mut SubscriptionList) {
        subscriptions
            .on("log_entry", EventPriority::Lowest, true, |event: &mut EntryRegisteredEvent| {
                if event.is_canceled() {
                    info!("🚫 Entry {} vetoed for {}", event.name, event.registry);
                } else {
                    info!("📦 Entry {} accepted for {}", event.name, event.registry);
                }
                Ok(())
            })
            .on("log_lock", EventPriority::Lowest, true, |event: &mut RegistryLockedEvent| {
                info!("🔒 Registry {} locked with {} entries", event.registry, event.entries);
                Ok(())
            })
            .on("log_tags", EventPriority::Lowest, true, |event: &mut TagsBoundEvent| {
                info!(
                    "🏷️ Registry {} bound {} tags (generation {})",
                    event.registry,
                    event.bound_tags.len(),
                    event.generation
                );
                Ok(())
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_bus::EventBus;

    fn name(text: &str) -> ResourceName {
        ResourceName::parse(text).unwrap()
    }

    #[test]
    fn test_only_entry_event_is_cancelable() {
        assert!(EntryRegisteredEvent::CANCELABLE);
        assert!(!RegistryLockedEvent::CANCELABLE);
        assert!(!TagsBoundEvent::CANCELABLE);
    }

    #[test]
    fn test_logger_sees_canceled_entries() {
        let bus = EventBus::new();
        assert_eq!(bus.register_static::<LifecycleLogger>(), 3);
        bus.add_listener(EventPriority::High, false, |event: &mut EntryRegisteredEvent| {
            event.set_canceled(true)?;
            Ok(())
        });

        let event = bus
            .post(EntryRegisteredEvent::new(name("core:items"), name("core:stone")))
            .unwrap();
        assert!(event.is_canceled());
        assert_eq!(event.current_phase(), Some(EventPriority::Lowest));
        assert_eq!(bus.stats().listener_failures, 0);
    }
}
