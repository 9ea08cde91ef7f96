//! The event bus: listener tables and phased dispatch.

use crate::error::{EventError, ListenerFault, ListenerInvocationError};
use crate::event::{DynEvent, Event};
use crate::handler::{ExceptionHandler, LoggingExceptionHandler};
use crate::listener::{
    CancelFilter, ConsumerListener, Listener, ListenerId, ListenerInfo, ListenerResult,
    SubscriberListener,
};
use crate::priority::EventPriority;
use crate::stats::{BusStats, StatsCounters};
use crate::subscriber::{StaticSubscriber, Subscriber, SubscriberDescriptor, SubscriptionList, TargetId};
use compact_str::CompactString;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Name used in logs and listener failure reports
    #[serde(default = "default_bus_name")]
    pub name: String,
    /// Whether the bus accepts posts right after construction
    #[serde(default = "default_true")]
    pub start_running: bool,
    /// Turn listener panics into reported failures instead of unwinding
    /// through `post`
    #[serde(default = "default_true")]
    pub catch_panics: bool,
}

fn default_bus_name() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: default_bus_name(),
            start_running: true,
            catch_panics: true,
        }
    }
}

struct RegisteredListener {
    info: Arc<ListenerInfo>,
    listener: Arc<dyn Listener>,
}

/// Listeners of one event type, one slot per phase, in registration order.
type PhaseSlots = [SmallVec<[RegisteredListener; 4]>; EventPriority::COUNT];
type ListenerTable = Arc<RwLock<PhaseSlots>>;

/// Snapshot of one phase taken before its listeners run.
type PhaseSnapshot = SmallVec<[(Arc<ListenerInfo>, Arc<dyn Listener>); 8]>;

/// Synchronous, priority-phased event bus.
///
/// Listeners are keyed by the concrete event type. A post walks the phases
/// from [`EventPriority::Highest`] to [`EventPriority::Lowest`]; within a
/// phase listeners run in registration order. Each phase works on a snapshot
/// of its listeners, so listeners may register or unregister listeners
/// while an event is being dispatched; changes apply from the next phase
/// snapshot on.
pub struct EventBus {
    name: CompactString,
    config: BusConfig,
    listeners: DashMap<TypeId, ListenerTable>,
    /// Registered subscribers, with the instance kept alive while registered
    targets: DashMap<TargetId, Option<Arc<dyn Any + Send + Sync>>>,
    exception_handler: RwLock<Option<Arc<dyn ExceptionHandler>>>,
    running: AtomicBool,
    next_listener_id: AtomicU64,
    counters: StatsCounters,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            name: CompactString::from(config.name.as_str()),
            running: AtomicBool::new(config.start_running),
            config,
            listeners: DashMap::new(),
            targets: DashMap::new(),
            exception_handler: RwLock::new(None),
            next_listener_id: AtomicU64::new(1),
            counters: StatsCounters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Replaces the sink for listener failures. Without one, failures are
    /// logged by [`LoggingExceptionHandler`].
    pub fn set_exception_handler(&self, handler: Arc<dyn ExceptionHandler>) {
        *self.exception_handler.write() = Some(handler);
    }

    pub fn clear_exception_handler(&self) {
        *self.exception_handler.write() = None;
    }

    /// Starts accepting posts. Allowed again after [`EventBus::shutdown`].
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::AcqRel) {
            info!("🚀 Event bus '{}' started", self.name);
        }
    }

    /// Stops accepting posts; later posts return their event untouched.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("🛑 Event bus '{}' shut down - posts are ignored until restart", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed))
    }

    fn table(&self, event_type: TypeId) -> Option<ListenerTable> {
        self.listeners.get(&event_type).map(|entry| entry.value().clone())
    }

    fn table_or_create(&self, event_type: TypeId) -> ListenerTable {
        self.listeners.entry(event_type).or_default().value().clone()
    }

    fn tables(&self) -> Vec<ListenerTable> {
        self.listeners.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Installs `callback` for events of type `E` at `priority`.
    ///
    /// Unless `receive_canceled` is set the callback is skipped for events
    /// that are already canceled when its turn comes.
    pub fn add_listener<E, F>(&self, priority: EventPriority, receive_canceled: bool, callback: F) -> ListenerId
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        let id = self.next_id();
        let name = CompactString::from(std::any::type_name::<F>());
        let consumer: Arc<dyn Listener> = Arc::new(ConsumerListener::new(name.clone(), callback));
        let listener: Arc<dyn Listener> = if receive_canceled {
            consumer
        } else {
            Arc::new(CancelFilter::new(consumer))
        };
        let info = Arc::new(ListenerInfo {
            id,
            name,
            event_type: std::any::type_name::<E>(),
            priority,
            receive_canceled,
            target: None,
        });

        self.table_or_create(TypeId::of::<E>()).write()[priority.ordinal()]
            .push(RegisteredListener { info, listener });

        debug!(
            "📝 Registered listener {} for {} at {} on bus '{}'",
            id,
            std::any::type_name::<E>(),
            priority,
            self.name
        );
        id
    }

    /// [`EventBus::add_listener`] at `Normal` priority, skipping canceled events.
    pub fn listen<E, F>(&self, callback: F) -> ListenerId
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        self.add_listener(EventPriority::Normal, false, callback)
    }

    /// Installs every subscription of `subscriber`, keeping it alive until
    /// it is unregistered. Returns how many listeners were added; registering
    /// the same instance again adds none.
    pub fn register<S: Subscriber>(&self, subscriber: &Arc<S>) -> usize {
        let mut subscriptions = SubscriptionList::new();
        subscriber.clone().subscribe(&mut subscriptions);
        let keepalive: Arc<dyn Any + Send + Sync> = subscriber.clone();
        self.register_descriptors(
            TargetId::of_instance(subscriber),
            Some(keepalive),
            subscriptions.into_descriptors(),
        )
    }

    /// Installs the subscriptions of a type that needs no instance.
    pub fn register_static<S: StaticSubscriber>(&self) -> usize {
        let mut subscriptions = SubscriptionList::new();
        S::subscribe(&mut subscriptions);
        self.register_descriptors(TargetId::of_type::<S>(), None, subscriptions.into_descriptors())
    }

    /// Installs one listener per descriptor for `target`.
    ///
    /// A descriptor whose name is already installed for the same target and
    /// event type is skipped.
    pub fn register_descriptors(
        &self,
        target: TargetId,
        keepalive: Option<Arc<dyn Any + Send + Sync>>,
        descriptors: Vec<SubscriberDescriptor>,
    ) -> usize {
        let mut installed = 0;
        for descriptor in descriptors {
            let table = self.table_or_create(descriptor.event_type);
            let mut slots = table.write();
            let duplicate = slots
                .iter()
                .flatten()
                .any(|entry| entry.info.target == Some(target) && entry.info.name == descriptor.name);
            if duplicate {
                trace!("Skipping already installed {} for {}", descriptor.name, target);
                continue;
            }

            let info = Arc::new(ListenerInfo {
                id: self.next_id(),
                name: descriptor.name.clone(),
                event_type: descriptor.event_name,
                priority: descriptor.priority,
                receive_canceled: descriptor.receive_canceled,
                target: Some(target),
            });
            let listener = Arc::new(SubscriberListener::new(
                descriptor.name,
                descriptor.priority,
                descriptor.receive_canceled,
                descriptor.invoker,
            ));
            slots[descriptor.priority.ordinal()].push(RegisteredListener { info, listener });
            installed += 1;
        }
        self.targets.entry(target).or_insert(keepalive);

        debug!("📝 Registered {} with {} new listeners on bus '{}'", target, installed, self.name);
        installed
    }

    fn retain_listeners(&self, keep: impl Fn(&RegisteredListener) -> bool) -> usize {
        let mut removed = 0;
        for table in self.tables() {
            let mut slots = table.write();
            for slot in slots.iter_mut() {
                let before = slot.len();
                slot.retain(|entry| keep(entry));
                removed += before - slot.len();
            }
        }
        removed
    }

    pub fn unregister<S: Subscriber>(&self, subscriber: &Arc<S>) -> usize {
        self.unregister_target(TargetId::of_instance(subscriber))
    }

    pub fn unregister_static<S: StaticSubscriber>(&self) -> usize {
        self.unregister_target(TargetId::of_type::<S>())
    }

    /// Removes every listener installed for `target`; unknown targets are a
    /// no-op. Returns the number of listeners removed.
    pub fn unregister_target(&self, target: TargetId) -> usize {
        let removed = self.retain_listeners(|entry| entry.info.target != Some(target));
        let released = self.targets.remove(&target);
        if released.is_some() || removed > 0 {
            debug!("🗑️ Unregistered {} ({} listeners) from bus '{}'", target, removed, self.name);
        }
        removed
    }

    /// Removes a listener added with [`EventBus::add_listener`].
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.retain_listeners(|entry| entry.info.id != id) > 0
    }

    /// Delivers `event` through every phase and hands it back.
    pub fn post<E: Event>(&self, mut event: E) -> Result<E, EventError> {
        self.post_mut(&mut event)?;
        Ok(event)
    }

    /// Delivers `event` only to listeners registered at `phase`.
    pub fn post_to_phase<E: Event>(&self, phase: EventPriority, mut event: E) -> Result<E, EventError> {
        self.dispatch(TypeId::of::<E>(), &[phase], &mut event)?;
        Ok(event)
    }

    /// Delivers an event the caller keeps ownership of.
    pub fn post_mut<E: Event>(&self, event: &mut E) -> Result<(), EventError> {
        self.dispatch(TypeId::of::<E>(), &EventPriority::ALL, event)
    }

    fn dispatch(
        &self,
        event_type: TypeId,
        phases: &[EventPriority],
        event: &mut dyn DynEvent,
    ) -> Result<(), EventError> {
        if !self.is_running() {
            StatsCounters::bump(&self.counters.events_ignored);
            trace!("Bus '{}' is stopped, ignoring {}", self.name, event.type_name());
            return Ok(());
        }
        StatsCounters::bump(&self.counters.events_posted);

        let Some(table) = self.table(event_type) else {
            trace!("No listeners for {} on bus '{}'", event.type_name(), self.name);
            return Ok(());
        };

        for &phase in phases {
            let snapshot: PhaseSnapshot = table.read()[phase.ordinal()]
                .iter()
                .map(|entry| (entry.info.clone(), entry.listener.clone()))
                .collect();
            if snapshot.is_empty() {
                continue;
            }

            event.set_phase(phase)?;
            trace!(
                "📤 Dispatching {} to {} listeners in phase {}",
                event.type_name(),
                snapshot.len(),
                phase
            );
            for (info, listener) in snapshot {
                self.invoke(&info, listener.as_ref(), phase, event);
            }
        }
        Ok(())
    }

    fn invoke(&self, info: &ListenerInfo, listener: &dyn Listener, phase: EventPriority, event: &mut dyn DynEvent) {
        StatsCounters::bump(&self.counters.listener_invocations);

        let outcome = if self.config.catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.invoke(event))) {
                Ok(result) => result.map_err(ListenerFault::Failed),
                Err(payload) => Err(ListenerFault::Panicked(panic_message(payload.as_ref()))),
            }
        } else {
            listener.invoke(event).map_err(ListenerFault::Failed)
        };

        if let Err(fault) = outcome {
            StatsCounters::bump(&self.counters.listener_failures);
            let error = ListenerInvocationError {
                bus: self.name.clone(),
                event_type: event.type_name(),
                event: format!("{event:?}"),
                listener: info.clone(),
                phase,
                fault,
            };
            let handler = self.exception_handler.read().clone();
            match handler {
                Some(handler) => handler.handle_exception(event, &error),
                None => LoggingExceptionHandler.handle_exception(event, &error),
            }
        }
    }

    /// Number of listeners installed for `E`, across all phases.
    pub fn listener_count<E: Event>(&self) -> usize {
        self.table(TypeId::of::<E>())
            .map_or(0, |table| table.read().iter().map(|slot| slot.len()).sum())
    }

    /// Listeners for `E` in the order a post would reach them.
    pub fn listeners_of<E: Event>(&self) -> Vec<ListenerInfo> {
        self.table(TypeId::of::<E>())
            .map(|table| {
                table
                    .read()
                    .iter()
                    .flatten()
                    .map(|entry| (*entry.info).clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_registered(&self, target: TargetId) -> bool {
        self.targets.contains_key(&target)
    }

    /// Get current statistics
    pub fn stats(&self) -> BusStats {
        let total_listeners = self
            .tables()
            .iter()
            .map(|table| table.read().iter().map(|slot| slot.len()).sum::<usize>())
            .sum();
        self.counters.snapshot(total_listeners, self.targets.len())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("event_types", &self.listeners.len())
            .field("targets", &self.targets.len())
            .finish()
    }
}
