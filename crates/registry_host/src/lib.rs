//! # Registry Host
//!
//! Command-line host that builds a keyed registry from a TOML file, binds
//! its tags and reports every lifecycle step on an event bus.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (created on first start)
//! registry_host
//!
//! # Specify custom configuration
//! registry_host --config blocks.toml
//!
//! # Override the log level and emit JSON
//! registry_host --log-level debug --json-logs
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default:
//! `registry_host.toml`). If the file doesn't exist, a default configuration
//! is written and used.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use app::{Application, BootstrapReport, RegistryEntry};
pub use cli::CliArgs;
pub use config::{AppConfig, BootstrapSettings, LoggingSettings};
pub use error::HostError;
pub use events::{EntryRegisteredEvent, LifecycleLogger, RegistryLockedEvent, TagsBoundEvent};

/// Runs the host end to end.
///
/// 1. Command-line argument parsing
/// 2. Configuration loading, overrides and validation
/// 3. Logging system initialization
/// 4. Registry bootstrap and summary
pub fn init() -> Result<(), HostError> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path)?;
    args.apply_overrides(&mut config);
    config.validate().map_err(HostError::Config)?;

    logging::setup_logging(&config.logging, args.json_logs)?;
    logging::display_banner();

    let app = Application::new(config);
    if let Err(e) = app.run() {
        error!("❌ Application error: {e}");
        return Err(e);
    }
    Ok(())
}
