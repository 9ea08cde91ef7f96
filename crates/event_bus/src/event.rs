//! Event trait, per-event dispatch state and shared per-type metadata.

use crate::error::EventError;
use crate::priority::EventPriority;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Outcome a listener may attach to an event that carries a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventResult {
    Deny,
    #[default]
    Default,
    Allow,
}

/// Mutable dispatch state embedded in every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventState {
    canceled: bool,
    result: EventResult,
    phase: Option<EventPriority>,
}

impl EventState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn result(&self) -> EventResult {
        self.result
    }

    /// Phase the event was last delivered in, `None` before its first post.
    pub fn phase(&self) -> Option<EventPriority> {
        self.phase
    }

    fn set_canceled(&mut self, node: &EventTreeNode, canceled: bool) -> Result<(), EventError> {
        if !node.cancelable {
            return Err(EventError::NotCancelable(node.type_name));
        }
        self.canceled = canceled;
        Ok(())
    }

    fn set_result(&mut self, node: &EventTreeNode, result: EventResult) -> Result<(), EventError> {
        if !node.has_result {
            return Err(EventError::NoResult(node.type_name));
        }
        self.result = result;
        Ok(())
    }

    fn set_phase(&mut self, node: &EventTreeNode, phase: EventPriority) -> Result<(), EventError> {
        match self.phase {
            Some(current) if phase.ordinal() <= current.ordinal() => {
                Err(EventError::PhaseOrderViolation {
                    event: node.type_name,
                    current,
                    requested: phase,
                })
            }
            _ => {
                self.phase = Some(phase);
                Ok(())
            }
        }
    }
}

/// Metadata shared by every instance of one event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTreeNode {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub cancelable: bool,
    pub has_result: bool,
}

static EVENT_TREE: Lazy<DashMap<TypeId, Arc<EventTreeNode>>> = Lazy::new(DashMap::new);

impl EventTreeNode {
    /// Cached node for `E`, built on first use.
    pub fn of<E: Event>() -> Arc<EventTreeNode> {
        let type_id = TypeId::of::<E>();
        if let Some(node) = EVENT_TREE.get(&type_id) {
            return node.value().clone();
        }
        EVENT_TREE
            .entry(type_id)
            .or_insert_with(|| {
                Arc::new(EventTreeNode {
                    type_id,
                    type_name: std::any::type_name::<E>(),
                    cancelable: E::CANCELABLE,
                    has_result: E::HAS_RESULT,
                })
            })
            .value()
            .clone()
    }
}

/// Something that can be posted on an [`crate::EventBus`].
///
/// Implementors embed an [`EventState`] and usually use
/// [`crate::impl_event!`] instead of writing the impl by hand.
pub trait Event: Any + fmt::Debug + Send {
    /// Whether listeners may cancel this event
    const CANCELABLE: bool = false;
    /// Whether listeners may attach an [`EventResult`]
    const HAS_RESULT: bool = false;

    fn state(&self) -> &EventState;
    fn state_mut(&mut self) -> &mut EventState;

    fn tree_node() -> Arc<EventTreeNode>
    where
        Self: Sized,
    {
        EventTreeNode::of::<Self>()
    }

    fn is_canceled(&self) -> bool {
        self.state().is_canceled()
    }

    /// Fails with [`EventError::NotCancelable`] unless the type is cancelable.
    fn set_canceled(&mut self, canceled: bool) -> Result<(), EventError>
    where
        Self: Sized,
    {
        self.state_mut().set_canceled(&Self::tree_node(), canceled)
    }

    fn result(&self) -> EventResult {
        self.state().result()
    }

    /// Fails with [`EventError::NoResult`] unless the type carries a result.
    fn set_result(&mut self, result: EventResult) -> Result<(), EventError>
    where
        Self: Sized,
    {
        self.state_mut().set_result(&Self::tree_node(), result)
    }

    fn current_phase(&self) -> Option<EventPriority> {
        self.state().phase()
    }

    /// Moves the event to `phase`, which must come strictly after the
    /// current one in dispatch order.
    fn set_phase(&mut self, phase: EventPriority) -> Result<(), EventError>
    where
        Self: Sized,
    {
        self.state_mut().set_phase(&Self::tree_node(), phase)
    }
}

/// Object-safe face of [`Event`] used by listeners and the bus.
pub trait DynEvent: Any + fmt::Debug + Send {
    fn event_node(&self) -> Arc<EventTreeNode>;
    fn event_state(&self) -> &EventState;
    fn event_state_mut(&mut self) -> &mut EventState;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> DynEvent for E {
    fn event_node(&self) -> Arc<EventTreeNode> {
        EventTreeNode::of::<E>()
    }

    fn event_state(&self) -> &EventState {
        self.state()
    }

    fn event_state_mut(&mut self) -> &mut EventState {
        self.state_mut()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn DynEvent {
    pub fn type_name(&self) -> &'static str {
        self.event_node().type_name
    }

    pub fn is_canceled(&self) -> bool {
        self.event_state().is_canceled()
    }

    pub fn set_canceled(&mut self, canceled: bool) -> Result<(), EventError> {
        let node = self.event_node();
        self.event_state_mut().set_canceled(&node, canceled)
    }

    pub fn result(&self) -> EventResult {
        self.event_state().result()
    }

    pub fn set_result(&mut self, result: EventResult) -> Result<(), EventError> {
        let node = self.event_node();
        self.event_state_mut().set_result(&node, result)
    }

    pub fn current_phase(&self) -> Option<EventPriority> {
        self.event_state().phase()
    }

    pub fn set_phase(&mut self, phase: EventPriority) -> Result<(), EventError> {
        let node = self.event_node();
        self.event_state_mut().set_phase(&node, phase)
    }

    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    pub fn downcast_mut<E: Event>(&mut self) -> Option<&mut E> {
        self.as_any_mut().downcast_mut::<E>()
    }
}
