//! Explicit subscription descriptors.
//!
//! A subscriber lists its callbacks in a [`SubscriptionList`]; the bus turns
//! every descriptor into one [`crate::SubscriberListener`]. Nothing here
//! inspects types at runtime.

use crate::event::{DynEvent, Event, EventTreeNode};
use crate::listener::{Invoker, ListenerResult};
use crate::priority::EventPriority;
use compact_str::CompactString;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Identity of a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// A subscriber instance, identified by its allocation
    Instance(usize),
    /// A subscriber type registered without an instance
    Type(TypeId),
}

impl TargetId {
    pub fn of_instance<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        TargetId::Instance(Arc::as_ptr(subscriber) as *const () as usize)
    }

    pub fn of_type<S: 'static>() -> Self {
        TargetId::Type(TypeId::of::<S>())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Instance(address) => write!(f, "instance@{address:#x}"),
            TargetId::Type(type_id) => write!(f, "type {type_id:?}"),
        }
    }
}

/// One callback a subscriber wants installed.
#[derive(Clone)]
pub struct SubscriberDescriptor {
    pub event_type: TypeId,
    pub event_name: &'static str,
    /// Unique per subscriber; re-registering the same name is a no-op
    pub name: CompactString,
    pub priority: EventPriority,
    pub receive_canceled: bool,
    pub invoker: Invoker,
}

impl SubscriberDescriptor {
    pub fn new<E, F>(name: &str, priority: EventPriority, receive_canceled: bool, callback: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        let node = EventTreeNode::of::<E>();
        let event_name = node.type_name;
        let invoker: Invoker = Arc::new(move |event: &mut dyn DynEvent| {
            let actual = event.type_name();
            match event.downcast_mut::<E>() {
                Some(typed) => callback(typed),
                None => Err(format!("subscription for {event_name} received {actual}").into()),
            }
        });
        Self {
            event_type: node.type_id,
            event_name,
            name: name.into(),
            priority,
            receive_canceled,
            invoker,
        }
    }
}

impl fmt::Debug for SubscriberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberDescriptor")
            .field("event", &self.event_name)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("receive_canceled", &self.receive_canceled)
            .finish()
    }
}

/// Builder filled in by [`Subscriber::subscribe`].
#[derive(Debug, Default)]
pub struct SubscriptionList {
    descriptors: Vec<SubscriberDescriptor>,
}

impl SubscriptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback for events of type `E`.
    pub fn on<E, F>(
        &mut self,
        name: &str,
        priority: EventPriority,
        receive_canceled: bool,
        callback: F,
    ) -> &mut Self
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        self.descriptors
            .push(SubscriberDescriptor::new(name, priority, receive_canceled, callback));
        self
    }

    pub fn push(&mut self, descriptor: SubscriberDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn into_descriptors(self) -> Vec<SubscriberDescriptor> {
        self.descriptors
    }
}

/// An object whose callbacks are installed and removed as a unit.
///
/// Callbacks usually capture a clone of `self`, which the bus keeps alive
/// until the subscriber is unregistered.
pub trait Subscriber: Send + Sync + 'static {
    fn subscribe(self: Arc<Self>, subscriptions: &mut SubscriptionList);
}

/// A type whose callbacks need no instance.
pub trait StaticSubscriber: 'static {
    fn subscribe(subscriptions: &mut SubscriptionList);
}
