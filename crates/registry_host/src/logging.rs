//! Installs the host's global tracing subscriber.

use crate::config::LoggingSettings;
use crate::error::HostError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the subscriber that carries registry, tag and bus logs.
///
/// The `[logging]` level is the fallback filter; a `RUST_LOG` in the
/// environment replaces it. JSON lines are emitted when either the config
/// or the `--json-logs` flag asks for them. A second call returns
/// [`HostError::Logging`] instead of replacing the first subscriber.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), HostError> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
    };
    installed.map_err(|e| HostError::Logging(e.to_string()))?;

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the startup banner once the subscriber is in place.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║            📚 REGISTRY HOST 📚           ║");
    info!("║                 v{:<8}                ║", version);
    info!("║                                          ║");
    info!("║  🔑 Interned Resource Keys               ║");
    info!("║  🏷️  Atomic Tag Binding                   ║");
    info!("║  📣 Phased Event Dispatch                ║");
    info!("║                                          ║");
    info!("╚══════════════════════════════════════════╝");
}
