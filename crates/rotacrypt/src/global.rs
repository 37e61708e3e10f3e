//! Process-wide default [`Crypto`] and free functions that use it.
//!
//! The default starts out as [`Crypto::dev`], which is **insecure**. Install
//! a real one once at startup with [`set_default`]. Reads are lock-free; the
//! slot lives until process exit and has no teardown.
//!
//! Prefer passing a [`Crypto`] explicitly where the call site allows it.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tracing::info;

use crate::facade::{Crypto, CryptoError};

fn slot() -> &'static ArcSwap<Crypto> {
    static DEFAULT: OnceLock<ArcSwap<Crypto>> = OnceLock::new();
    DEFAULT.get_or_init(|| ArcSwap::from_pointee(Crypto::dev()))
}

/// The current process-wide default.
pub fn default_crypto() -> Arc<Crypto> {
    slot().load_full()
}

/// Replace the process-wide default. Calls already in flight finish with
/// the previous one.
pub fn set_default(crypto: Crypto) {
    slot().store(Arc::new(crypto));
    info!("default crypto providers replaced");
}

/// [`Crypto::encrypt`] against the default.
pub fn encrypt(prefix: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    slot().load().encrypt(prefix, plaintext)
}

/// [`Crypto::encrypt_with_version`] against the default.
pub fn encrypt_with_version(prefix: &str, version: u64, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    slot().load().encrypt_with_version(prefix, version, plaintext)
}

/// [`Crypto::decrypt`] against the default.
pub fn decrypt(prefix: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    slot().load().decrypt(prefix, envelope)
}

/// [`Crypto::reencrypt`] against the default.
pub fn reencrypt(prefix: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    slot().load().reencrypt(prefix, envelope)
}

/// [`Crypto::envelope_version`] against the default.
pub fn envelope_version(envelope: &[u8]) -> Result<u64, CryptoError> {
    slot().load().envelope_version(envelope)
}

/// [`Crypto::is_current`] against the default.
pub fn is_current(prefix: &str, envelope: &[u8]) -> Result<bool, CryptoError> {
    slot().load().is_current(prefix, envelope)
}

/// [`Crypto::hash`] against the default.
pub fn hash(prefix: &str, value: &[u8]) -> Result<String, CryptoError> {
    slot().load().hash(prefix, value)
}

/// [`Crypto::hash_string`] against the default.
pub fn hash_string(prefix: &str, value: &str) -> Result<String, CryptoError> {
    slot().load().hash_string(prefix, value)
}

/// [`Crypto::hash_with_version`] against the default.
pub fn hash_with_version(prefix: &str, version: u64, value: &[u8]) -> Result<String, CryptoError> {
    slot().load().hash_with_version(prefix, version, value)
}

/// [`Crypto::current_hashes`] against the default.
pub fn current_hashes(prefix: &str, value: &[u8]) -> Result<Vec<String>, CryptoError> {
    slot().load().current_hashes(prefix, value)
}

/// [`Crypto::current_hashes_string`] against the default.
pub fn current_hashes_string(prefix: &str, value: &str) -> Result<Vec<String>, CryptoError> {
    slot().load().current_hashes_string(prefix, value)
}
