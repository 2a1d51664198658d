//! Logging initialization.
//!
//! Installs a compact `tracing_subscriber` fmt subscriber writing to stderr so
//! that command output on stdout stays clean. `RUST_LOG` takes precedence over
//! the `--debug` flag.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Fails if one is already installed.
pub fn init(debug: bool) -> Result<()> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
