//! Error types for the event bus

use crate::listener::ListenerInfo;
use crate::priority::EventPriority;
use compact_str::CompactString;

/// Errors raised by events and the bus itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// An event was moved to a phase that does not come after its current one
    #[error("Phase order violation on {event}: cannot move from {current} to {requested}")]
    PhaseOrderViolation {
        event: &'static str,
        current: EventPriority,
        requested: EventPriority,
    },

    /// Cancellation requested on an event type that cannot be canceled
    #[error("Event {0} is not cancelable")]
    NotCancelable(&'static str),

    /// Result set on an event type that carries no result
    #[error("Event {0} has no result")]
    NoResult(&'static str),

    /// Priority name that does not match any phase
    #[error("Unknown event priority: {0}")]
    UnknownPriority(String),
}

/// What went wrong inside a single listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerFault {
    /// The listener returned an error
    #[error("{0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The listener panicked; the payload message is kept when it was a string
    #[error("panicked: {0}")]
    Panicked(String),
}

/// A listener failure, reported to the exception handler and never
/// propagated to the poster.
#[derive(Debug, thiserror::Error)]
#[error("Listener {listener} failed while handling {event_type} on bus '{bus}' in phase {phase}: {fault}")]
pub struct ListenerInvocationError {
    pub bus: CompactString,
    pub event_type: &'static str,
    /// Debug rendering of the event as it was when the listener failed
    pub event: String,
    pub listener: ListenerInfo,
    pub phase: EventPriority,
    #[source]
    pub fault: ListenerFault,
}

impl ListenerInvocationError {
    pub fn is_panic(&self) -> bool {
        matches!(self.fault, ListenerFault::Panicked(_))
    }
}
