//! Listener trait and the three listener shapes installed by the bus.

use crate::event::{DynEvent, Event};
use crate::priority::EventPriority;
use crate::subscriber::TargetId;
use compact_str::CompactString;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Outcome of one listener invocation.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Type-erased callback that receives an event and may act on it.
pub trait Listener: Send + Sync {
    fn invoke(&self, event: &mut dyn DynEvent) -> ListenerResult;

    /// Name for diagnostics
    fn name(&self) -> &str;
}

/// Handle returned when a listener is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Where and why a listener was installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub name: CompactString,
    pub event_type: &'static str,
    pub priority: EventPriority,
    pub receive_canceled: bool,
    /// Subscriber the listener was installed for, `None` for direct listeners
    pub target: Option<TargetId>,
}

impl fmt::Display for ListenerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} ({} of {})", self.name, self.id, target),
            None => write!(f, "{} ({})", self.name, self.id),
        }
    }
}

fn wrong_event(expected: &'static str, event: &dyn DynEvent) -> Box<dyn std::error::Error + Send + Sync> {
    format!("listener for {expected} received {}", event.type_name()).into()
}

/// Plain callback for one event type.
pub struct ConsumerListener<E, F> {
    name: CompactString,
    callback: F,
    _event: PhantomData<fn(&mut E)>,
}

impl<E, F> ConsumerListener<E, F>
where
    E: Event,
    F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<CompactString>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
            _event: PhantomData,
        }
    }
}

impl<E, F> Listener for ConsumerListener<E, F>
where
    E: Event,
    F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
{
    fn invoke(&self, event: &mut dyn DynEvent) -> ListenerResult {
        if let Some(typed) = event.downcast_mut::<E>() {
            return (self.callback)(typed);
        }
        Err(wrong_event(std::any::type_name::<E>(), event))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Forwards to the wrapped listener only while the event is not canceled.
pub struct CancelFilter {
    inner: Arc<dyn Listener>,
}

impl CancelFilter {
    pub fn new(inner: Arc<dyn Listener>) -> Self {
        Self { inner }
    }
}

impl Listener for CancelFilter {
    fn invoke(&self, event: &mut dyn DynEvent) -> ListenerResult {
        if event.is_canceled() {
            return Ok(());
        }
        self.inner.invoke(event)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Type-erased invoker produced by a subscription.
pub type Invoker = Arc<dyn Fn(&mut dyn DynEvent) -> ListenerResult + Send + Sync>;

/// Listener built from a subscriber descriptor; carries its own priority and
/// cancellation visibility.
pub struct SubscriberListener {
    name: CompactString,
    priority: EventPriority,
    receive_canceled: bool,
    invoker: Invoker,
}

impl SubscriberListener {
    pub fn new(
        name: impl Into<CompactString>,
        priority: EventPriority,
        receive_canceled: bool,
        invoker: Invoker,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            receive_canceled,
            invoker,
        }
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    pub fn receives_canceled(&self) -> bool {
        self.receive_canceled
    }
}

impl Listener for SubscriberListener {
    fn invoke(&self, event: &mut dyn DynEvent) -> ListenerResult {
        if !self.receive_canceled && event.is_canceled() {
            return Ok(());
        }
        (self.invoker)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
