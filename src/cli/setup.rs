//! Config loading and tracing setup shared by every command

use anyhow::Context;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig, RelayConfig};

/// Load configuration with layered overrides.
///
/// File (or defaults when the file is missing), then `RELAY_*` environment
/// variables, then CLI flags. The result is validated.
pub fn load_config_with_overrides(
    path: &Path,
    log_level: Option<&str>,
) -> anyhow::Result<RelayConfig> {
    let mut config = if path.exists() {
        RelayConfig::load(Some(path))
            .with_context(|| format!("failed to load {}", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        RelayConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(level) = log_level {
        config.logging.level = level.to_string();
    }

    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Initialize tracing based on configuration.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}
