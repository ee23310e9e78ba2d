//! Logging initialisation
//!
//! Installs a `tracing` subscriber with a console layer on stderr and an
//! optional daily rolling file layer. `RUST_LOG` overrides the configured
//! filter.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Initialise the global subscriber
///
/// The returned guard flushes the file writer when dropped and must be held
/// for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config_filter(&config.filter)?,
    };

    let console = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).with_target(true).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).with_target(true).boxed()
    };

    let (file, guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Cannot create log directory {}", directory.display()))?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            let layer = if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::debug!(
        "[Logging] Initialised (json: {}, directory: {:?})",
        config.json,
        config.directory
    );
    Ok(guard)
}

fn config_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("Invalid log filter '{}'", directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(config_filter(&LoggingConfig::default().filter).is_ok());
        assert!(config_filter("agent_data_gate=debug,warn").is_ok());
    }
}
