use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSettings;
use crate::error::{Error, Result};

/// Where log lines go: the configured file, else `tremolo.log` in the temp dir.
pub fn log_path(settings: &LogSettings) -> PathBuf {
    settings
        .file
        .clone()
        .unwrap_or_else(|| env::temp_dir().join("tremolo.log"))
}

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init(settings: &LogSettings) -> Result<PathBuf> {
    let path = log_path(settings);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.filter.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    Ok(path)
}
