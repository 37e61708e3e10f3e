//! Key and salt lookup: the provider capabilities and their implementations.
//!
//! # Variants
//!
//! - [`dev`]: deterministic stubs derived from prefix + version. No I/O.
//!   **Never use in production.**
//! - [`remote`]: caching provider backed by an external [`SecretStore`].
//!
//! # Module invariants
//!
//! - A provider never returns a key or salt whose version differs from the
//!   one requested.
//! - Providers know nothing about the facade that calls them.
//!
//! [`SecretStore`]: crate::store::SecretStore

pub mod dev;
pub mod remote;

use std::sync::Arc;

use common::StoreError;
use thiserror::Error;

use crate::crypto::{CodecError, Key};

pub use dev::{DevKeyProvider, DevSaltProvider};
pub use remote::RemoteProvider;

/// Errors produced by providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The store returned a record for a different version than requested.
    #[error("{kind} for {prefix} returned version {found}, requested {requested}")]
    VersionMismatch {
        kind: &'static str,
        prefix: String,
        requested: u64,
        found: u64,
    },

    /// The salt pointer's `latest` is not the newest currently valid salt.
    #[error("salt pointer for {prefix} names latest {latest} but newest valid salt is {newest}")]
    InconsistentSaltPointer {
        prefix: String,
        latest: u64,
        newest: u64,
    },

    /// The external store failed or returned unusable data.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored key could not be turned into a usable [`Key`].
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Resolves versioned encryption keys for a prefix.
pub trait KeyProvider: Send + Sync {
    /// Fetch the key for `prefix` at exactly `version`.
    fn get_key(&self, prefix: &str, version: u64) -> Result<Arc<Key>, ProviderError>;

    /// The version new encryptions under `prefix` should use.
    fn current_key_version(&self, prefix: &str) -> Result<u64, ProviderError>;
}

/// Resolves versioned hashing salts for a prefix.
///
/// Unlike keys, several salt versions can be valid at once so lookups by hash
/// keep working across a rotation window.
pub trait SaltProvider: Send + Sync {
    /// Fetch the salt for `prefix` at exactly `version`.
    fn get_salt(&self, prefix: &str, version: u64) -> Result<Arc<[u8]>, ProviderError>;

    /// The version new hashes under `prefix` should use.
    fn current_salt_version(&self, prefix: &str) -> Result<u64, ProviderError>;

    /// Every salt version still valid for `prefix`, ascending.
    fn current_salts(&self, prefix: &str) -> Result<Vec<u64>, ProviderError>;
}
