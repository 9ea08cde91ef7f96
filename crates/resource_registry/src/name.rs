//! Namespaced two-segment identifiers.

use crate::error::{RegistryError, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace used when a textual name carries no `namespace:` prefix
pub const DEFAULT_NAMESPACE: &str = "core";

/// Separator between namespace and path in the textual form
pub const SEPARATOR: char = ':';

/// A `(namespace, path)` identifier such as `core:stone`.
///
/// Ordering compares the namespace first, then the path. Equality is
/// structural. The same type names registry entries and registries
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName {
    namespace: CompactString,
    path: CompactString,
}

impl ResourceName {
    /// Creates a name after validating both segments.
    pub fn new(namespace: &str, path: &str) -> Result<Self> {
        if !Self::is_valid_namespace(namespace) {
            return Err(RegistryError::InvalidResourceName(format!(
                "namespace '{namespace}' in {namespace}{SEPARATOR}{path}"
            )));
        }
        if !Self::is_valid_path(path) {
            return Err(RegistryError::InvalidResourceName(format!(
                "path '{path}' in {namespace}{SEPARATOR}{path}"
            )));
        }
        Ok(Self {
            namespace: CompactString::new(namespace),
            path: CompactString::new(path),
        })
    }

    /// Parses `namespace:path`, or `path` alone in the default namespace.
    pub fn parse(text: &str) -> Result<Self> {
        match text.split_once(SEPARATOR) {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, text),
        }
    }

    /// Creates a name in the default namespace.
    pub fn with_default_namespace(path: &str) -> Result<Self> {
        Self::new(DEFAULT_NAMESPACE, path)
    }

    /// Returns a name in the same namespace with a different path.
    pub fn with_path(&self, path: &str) -> Result<Self> {
        Self::new(&self.namespace, path)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_valid_namespace(namespace: &str) -> bool {
        !namespace.is_empty()
            && namespace
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-'))
    }

    pub fn is_valid_path(path: &str) -> bool {
        !path.is_empty()
            && path
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'/'))
    }

    /// Builds a name from literals known to be valid.
    pub(crate) fn from_static(namespace: &'static str, path: &'static str) -> Self {
        debug_assert!(Self::is_valid_namespace(namespace) && Self::is_valid_path(path));
        Self {
            namespace: CompactString::new(namespace),
            path: CompactString::new(path),
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, SEPARATOR, self.path)
    }
}

impl FromStr for ResourceName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceName {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_namespace() {
        let explicit = ResourceName::parse("mods:ore/copper").unwrap();
        assert_eq!(explicit.namespace(), "mods");
        assert_eq!(explicit.path(), "ore/copper");

        let implicit = ResourceName::parse("stone").unwrap();
        assert_eq!(implicit.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(implicit.to_string(), "core:stone");
    }

    #[test]
    fn test_rejects_invalid_segments() {
        assert!(ResourceName::new("Upper", "stone").is_err());
        assert!(ResourceName::new("core", "").is_err());
        assert!(ResourceName::new("core/sub", "stone").is_err());
        assert!(matches!(
            ResourceName::parse("core:a:b"),
            Err(RegistryError::InvalidResourceName(_))
        ));
    }

    #[test]
    fn test_ordering_is_namespace_then_path() {
        let mut names = vec![
            ResourceName::parse("b:a").unwrap(),
            ResourceName::parse("a:z").unwrap(),
            ResourceName::parse("a:b").unwrap(),
        ];
        names.sort();
        let rendered: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a:b", "a:z", "b:a"]);
    }

    #[test]
    fn test_serde_uses_textual_form() {
        let name = ResourceName::parse("core:dirt").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"core:dirt\"");

        let back: ResourceName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
        assert!(serde_json::from_str::<ResourceName>("\"Bad:Name\"").is_err());
    }
}
