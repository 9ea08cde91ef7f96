//! Sinks for listener failures.

use crate::error::ListenerInvocationError;
use crate::event::DynEvent;
use tracing::error;

/// Receives every listener failure caught by the bus.
///
/// Called synchronously on the posting thread, after the failing listener
/// and before the next one.
pub trait ExceptionHandler: Send + Sync {
    fn handle_exception(&self, event: &dyn DynEvent, error: &ListenerInvocationError);
}

/// Logs failures through `tracing`. Installed when no other handler is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExceptionHandler;

impl ExceptionHandler for LoggingExceptionHandler {
    fn handle_exception(&self, event: &dyn DynEvent, error: &ListenerInvocationError) {
        error!(
            "❌ Listener {} failed on {} ({:?}): {}",
            error.listener,
            error.event_type,
            event,
            error.fault
        );
    }
}

impl<F> ExceptionHandler for F
where
    F: Fn(&dyn DynEvent, &ListenerInvocationError) + Send + Sync,
{
    fn handle_exception(&self, event: &dyn DynEvent, error: &ListenerInvocationError) {
        self(event, error)
    }
}
