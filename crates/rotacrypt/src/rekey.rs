//! Rotation sweep over a line-oriented stream of envelopes.
//!
//! Each input line holds one standard-base64 envelope. Lines already on the
//! prefix's current key are copied through; the rest are re-encrypted. Output
//! lines correspond one-to-one with input lines.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::facade::Crypto;

/// Per-sweep counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RekeyStats {
    /// Envelopes re-encrypted under the current key.
    pub rotated: u64,
    /// Envelopes already on the current key.
    pub skipped: u64,
    /// Blank lines passed through.
    pub blank: u64,
}

/// Rotate every envelope in `input` onto `prefix`'s current key, writing
/// the results to `output`.
///
/// # Errors
///
/// Stops at the first line that is not valid base64 or fails to decrypt,
/// naming the 1-based line number. Lines before it have already been
/// written.
pub fn rekey_stream<R: BufRead, W: Write>(
    crypto: &Crypto,
    prefix: &str,
    input: R,
    mut output: W,
) -> Result<RekeyStats> {
    let mut stats = RekeyStats::default();

    for (idx, line) in input.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.with_context(|| format!("failed to read line {lineno}"))?;
        let encoded = line.trim();

        if encoded.is_empty() {
            writeln!(output)?;
            stats.blank += 1;
            continue;
        }

        let envelope = STANDARD
            .decode(encoded)
            .with_context(|| format!("line {lineno}: invalid base64"))?;

        if crypto
            .is_current(prefix, &envelope)
            .with_context(|| format!("line {lineno}: cannot read envelope version"))?
        {
            writeln!(output, "{encoded}")?;
            stats.skipped += 1;
            continue;
        }

        let rotated = crypto
            .reencrypt(prefix, &envelope)
            .with_context(|| format!("line {lineno}: re-encryption failed"))?;
        writeln!(output, "{}", STANDARD.encode(rotated))?;
        stats.rotated += 1;
        debug!(line = lineno, "envelope rotated");
    }

    output.flush().context("failed to flush output")?;
    Ok(stats)
}
