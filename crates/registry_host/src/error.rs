//! Error type for the host binary.

use event_bus::EventError;
use resource_registry::RegistryError;

/// Everything that can stop the host from starting or bootstrapping
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The configuration failed validation
    #[error("Configuration validation failed: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing or serialization failed
    #[error("TOML error: {0}")]
    Toml(String),

    /// Registry or tag operation rejected
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Event dispatch rejected
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<toml::de::Error> for HostError {
    fn from(err: toml::de::Error) -> Self {
        HostError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for HostError {
    fn from(err: toml::ser::Error) -> Self {
        HostError::Toml(err.to_string())
    }
}
