//! Configuration management for the registry host.
//!
//! This module handles loading and validation of the host configuration
//! from TOML files.

use crate::error::HostError;
use event_bus::BusConfig;
use resource_registry::{ResourceName, TagManagerConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_registry() -> String {
    "core:items".to_string()
}

fn default_true() -> bool {
    true
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Event bus settings
    #[serde(default)]
    pub event_bus: BusConfig,
    /// Tag manager tuning
    #[serde(default)]
    pub tags: TagManagerConfig,
    /// Registry contents created at startup
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Registry, entries and tags created when the host starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Name of the registry to create
    #[serde(default = "default_registry")]
    pub registry: String,
    /// Entry names, registered in this order
    #[serde(default)]
    pub entries: Vec<String>,
    /// Lock the registry once every entry is registered
    #[serde(default = "default_true")]
    pub locked_after_bootstrap: bool,
    /// Tag name to member entry names
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            entries: vec!["core:stone".to_string(), "core:dirt".to_string()],
            locked_after_bootstrap: true,
            tags: BTreeMap::from([("core:soft".to_string(), vec!["core:dirt".to_string()])]),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            event_bus: BusConfig::default(),
            tags: TagManagerConfig::default(),
            bootstrap: BootstrapSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating a default one if it
    /// doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Self, HostError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content)?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration settings.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.event_bus.name.trim().is_empty() {
            return Err("event_bus.name cannot be empty".to_string());
        }

        if self.tags.parallel_threshold == 0 {
            return Err("tags.parallel_threshold must be greater than 0".to_string());
        }

        let bootstrap = &self.bootstrap;
        ResourceName::parse(&bootstrap.registry)
            .map_err(|e| format!("Invalid bootstrap.registry '{}': {e}", bootstrap.registry))?;

        let mut entries = BTreeSet::new();
        for entry in &bootstrap.entries {
            let name = ResourceName::parse(entry)
                .map_err(|e| format!("Invalid bootstrap entry '{entry}': {e}"))?;
            if !entries.insert(name) {
                return Err(format!("Duplicate bootstrap entry: {entry}"));
            }
        }

        for (tag, members) in &bootstrap.tags {
            ResourceName::parse(tag).map_err(|e| format!("Invalid tag name '{tag}': {e}"))?;
            for member in members {
                let name = ResourceName::parse(member)
                    .map_err(|e| format!("Invalid member '{member}' of tag {tag}: {e}"))?;
                if !entries.contains(&name) {
                    return Err(format!("Tag {tag} lists {member}, which is not a bootstrap entry"));
                }
            }
        }

        Ok(())
    }
}
