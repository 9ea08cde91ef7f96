//! # Event Bus
//!
//! A synchronous publish/subscribe bus with fixed priority phases,
//! cooperative cancellation and per-listener failure isolation.
//!
//! ## Key Features
//!
//! - **Phased dispatch**: listeners run from `Highest` to `Lowest`, then in
//!   registration order within a phase
//! - **Cancellation**: cancelable events skip cancellation-filtered listeners
//!   once canceled
//! - **Explicit subscriptions**: subscribers describe their callbacks in a
//!   `SubscriptionList`; no runtime reflection is involved
//! - **Isolation**: a failing or panicking listener is reported to the
//!   exception handler and never stops the rest of the dispatch
//!
//! ## Usage
//!
//! ```rust
//! use event_bus::*;
//!
//! #[derive(Debug, Default)]
//! struct ChatMessage {
//!     state: EventState,
//!     text: String,
//! }
//! impl_event!(ChatMessage, cancelable);
//!
//! let bus = EventBus::new();
//! bus.add_listener(EventPriority::Highest, false, |msg: &mut ChatMessage| {
//!     if msg.text.contains("spam") {
//!         msg.set_canceled(true)?;
//!     }
//!     Ok(())
//! });
//! bus.listen(|msg: &mut ChatMessage| {
//!     msg.text.push_str(" (seen)");
//!     Ok(())
//! });
//!
//! let msg = bus.post(ChatMessage { text: "spam".into(), ..Default::default() })?;
//! assert!(msg.is_canceled());
//! assert_eq!(msg.text, "spam");
//! # Ok::<(), EventError>(())
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod handler;
pub mod listener;
pub mod macros;
pub mod priority;
pub mod stats;
pub mod subscriber;

pub use bus::{BusConfig, EventBus};
pub use error::{EventError, ListenerFault, ListenerInvocationError};
pub use event::{DynEvent, Event, EventResult, EventState, EventTreeNode};
pub use handler::{ExceptionHandler, LoggingExceptionHandler};
pub use listener::{
    CancelFilter, ConsumerListener, Invoker, Listener, ListenerId, ListenerInfo, ListenerResult,
    SubscriberListener,
};
pub use priority::EventPriority;
pub use stats::BusStats;
pub use subscriber::{StaticSubscriber, Subscriber, SubscriberDescriptor, SubscriptionList, TargetId};

#[cfg(test)]
mod tests;
