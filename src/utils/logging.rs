//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level so a single run can
//! be made more verbose without editing the config file.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{level_name, LoggingConfig};
use crate::error::{Result, RpcError};

/// Install the global subscriber described by `config`.
///
/// Fails if a subscriber is already installed or the log file cannot be opened.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_name(config.log_level)));

    let file = match (config.log_to_file, &config.log_file_path) {
        (true, Some(path)) => Some(Arc::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| RpcError::Config(format!("Failed to open log file {path}: {e}")))?,
        )),
        (true, None) => {
            return Err(RpcError::Config(
                "log_file_path must be specified when log_to_file is true".to_string(),
            ))
        }
        (false, _) => None,
    };

    match (config.log_to_console, file) {
        (true, Some(file)) => install(config, filter, std::io::stderr.and(file)),
        (false, Some(file)) => install(config, filter, file),
        (true, None) => install(config, filter, std::io::stderr),
        (false, None) => Err(RpcError::Config(
            "At least one logging output (console or file) must be enabled".to_string(),
        )),
    }
}

fn install<W>(config: &LoggingConfig, filter: EnvFilter, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| RpcError::Config(format!("Failed to install log subscriber: {e}")))
}
