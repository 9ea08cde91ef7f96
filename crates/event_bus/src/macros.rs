//! Macros for declaring events and subscriptions

/// Implements [`crate::Event`] for a type with a `state: EventState` field.
///
/// Optional flags after the type enable cancellation and results:
///
/// ```rust
/// use event_bus::{impl_event, EventState};
///
/// #[derive(Debug, Default)]
/// struct BlockPlaced {
///     state: EventState,
///     block: String,
/// }
///
/// impl_event!(BlockPlaced, cancelable);
/// ```
#[macro_export]
macro_rules! impl_event {
    (@flag cancelable) => {
        const CANCELABLE: bool = true;
    };
    (@flag has_result) => {
        const HAS_RESULT: bool = true;
    };
    ($ty:ty $(, $flag:ident)* $(,)?) => {
        impl $crate::Event for $ty {
            $( $crate::impl_event!(@flag $flag); )*

            fn state(&self) -> &$crate::EventState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut $crate::EventState {
                &mut self.state
            }
        }
    };
}

/// Convenience macro for adding several listeners with clean syntax
///
/// Each entry is `Priority: EventType => callback`; every listener is
/// cancellation-filtered. Evaluates to the `Vec<ListenerId>` of the added
/// listeners, in order.
#[macro_export]
macro_rules! listen_all {
    ($bus:expr; $($priority:ident : $event:ty => $handler:expr),* $(,)?) => {{
        let mut ids = ::std::vec::Vec::new();
        $(
            ids.push($bus.add_listener::<$event, _>(
                $crate::EventPriority::$priority,
                false,
                $handler,
            ));
        )*
        ids
    }};
}
