//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, key or salt material** may appear in any log field.
//! - Log level is configurable via `ROTACRYPT_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global JSON tracing subscriber, writing to stderr.
///
/// Stdout is left to the caller's data.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(log_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise tracing subscriber: {e}"))?;

    Ok(())
}
