//! Error types for the registry core.

use crate::name::ResourceName;

/// Errors raised by registries, holders and tag managers.
///
/// Every variant describes a contract violation by the caller; none of them
/// is transient and nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A holder was read before it was bound to a key and value
    #[error("Unbound access: {0}")]
    UnboundAccess(String),

    /// The name is already bound in the registry
    #[error("Duplicate registration of {name} in registry {registry}")]
    DuplicateRegistration {
        registry: ResourceName,
        name: ResourceName,
    },

    /// The same shared value is already registered under another name
    #[error("Value registered as {name} is already present in registry {registry} as {existing}")]
    DuplicateValue {
        registry: ResourceName,
        name: ResourceName,
        existing: ResourceName,
    },

    /// The registry was locked and can no longer be modified
    #[error("Registry {0} is locked")]
    RegistryLocked(ResourceName),

    /// A tag key that cannot be used with this tag manager
    #[error("Invalid tag key: {0}")]
    InvalidTagKey(String),

    /// A malformed namespace or path
    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    /// A holder handed to a tag manager that its registry does not own
    #[error("Holder {holder} is not a bound holder of registry {registry}")]
    ForeignHolder {
        registry: ResourceName,
        holder: String,
    },
}

/// Result type used throughout the registry core
pub type Result<T> = std::result::Result<T, RegistryError>;
