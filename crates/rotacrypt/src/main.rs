//! `rotacrypt-rekey`: rotate a stream of envelopes onto the current key.
//!
//! Usage: `rotacrypt-rekey <prefix> < envelopes.txt > rotated.txt`
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging on stderr.
//! 3. Build the providers and the [`Crypto`] facade.
//! 4. Stream stdin to stdout, re-encrypting every stale envelope.

use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use tracing::info;

use rotacrypt::config::Config;
use rotacrypt::{rekey_stream, Crypto, KeyProvider};

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    rotacrypt::telemetry::init(&cfg.log_level)?;

    let prefix = std::env::args()
        .nth(1)
        .context("usage: rotacrypt-rekey <prefix>")?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = ?cfg.provider,
        prefix = %prefix,
        "rotacrypt-rekey starting"
    );

    // -----------------------------------------------------------------------
    // 3. Providers
    // -----------------------------------------------------------------------
    let crypto: Crypto = cfg.build_crypto()?;
    let current = crypto
        .key_provider()
        .current_key_version(&prefix)
        .with_context(|| format!("failed to resolve current key version for {prefix}"))?;
    info!(prefix = %prefix, key_version = current, "target key version resolved");

    // -----------------------------------------------------------------------
    // 4. Sweep
    // -----------------------------------------------------------------------
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let stats = rekey_stream(&crypto, &prefix, stdin, stdout)?;

    info!(
        rotated = stats.rotated,
        skipped = stats.skipped,
        blank = stats.blank,
        "rekey complete"
    );
    Ok(())
}
