//! Secret-store schema: the paths and fields `rotacrypt` expects to find.
//!
//! ```text
//! keys/<prefix>/<version>   version, cipher, block_mode, key (url-safe base64)
//! keys/<prefix>/current     latest
//! salts/<prefix>/<version>  version, salt (url-safe base64)
//! salts/<prefix>/current    salts (comma-separated), latest
//! ```
//!
//! Every field is stored as a string, which is how Vault KV and a JSON
//! `SecretString` both present them.

use std::collections::BTreeMap;

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig},
        DecodePaddingMode,
    },
    Engine as _,
};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Url-safe base64 that accepts both padded and unpadded input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Path of a versioned key secret.
pub fn key_path(prefix: &str, version: u64) -> String {
    format!("keys/{prefix}/{version}")
}

/// Path of the "latest key" pointer for a prefix.
pub fn key_pointer_path(prefix: &str) -> String {
    format!("keys/{prefix}/current")
}

/// Path of a versioned salt secret.
pub fn salt_path(prefix: &str, version: u64) -> String {
    format!("salts/{prefix}/{version}")
}

/// Path of the "currently valid salts" pointer for a prefix.
pub fn salt_pointer_path(prefix: &str) -> String {
    format!("salts/{prefix}/current")
}

// ---------------------------------------------------------------------------
// Raw secret
// ---------------------------------------------------------------------------

/// The string fields of a single secret, as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretData(pub BTreeMap<String, String>);

impl SecretData {
    /// Build a secret from `(field, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a field, failing with [`StoreError::Malformed`] if it is absent.
    pub fn field(&self, path: &str, name: &str) -> Result<&str, StoreError> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StoreError::malformed(path, format!("missing field `{name}`")))
    }

    fn version_field(&self, path: &str, name: &str) -> Result<u64, StoreError> {
        let raw = self.field(path, name)?;
        parse_version(raw)
            .ok_or_else(|| StoreError::malformed(path, format!("field `{name}` is not a version: {raw:?}")))
    }

    fn base64_field(&self, path: &str, name: &str) -> Result<Vec<u8>, StoreError> {
        let raw = self.field(path, name)?;
        let decoded = URL_SAFE_LENIENT
            .decode(raw.trim())
            .map_err(|e| StoreError::malformed(path, format!("field `{name}` is not url-safe base64: {e}")))?;
        Ok(trim_newlines(&decoded).to_vec())
    }
}

fn parse_version(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Strip `\n` bytes from both ends of decoded secret material.
fn trim_newlines(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b'\n').unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != b'\n').map_or(start, |i| i + 1);
    &bytes[start..end]
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// A versioned key as stored at [`key_path`].
///
/// `cipher` and `block_mode` are kept as the raw identifiers; mapping them to
/// supported algorithms is the caller's job.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub version: u64,
    pub cipher: String,
    pub block_mode: String,
    pub key: Vec<u8>,
}

impl KeyRecord {
    /// Parse the secret read from `path`.
    pub fn from_data(path: &str, data: &SecretData) -> Result<Self, StoreError> {
        Ok(Self {
            version: data.version_field(path, "version")?,
            cipher: data.field(path, "cipher")?.trim().to_owned(),
            block_mode: data.field(path, "block_mode")?.trim().to_owned(),
            key: data.base64_field(path, "key")?,
        })
    }
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("version", &self.version)
            .field("cipher", &self.cipher)
            .field("block_mode", &self.block_mode)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The pointer at [`key_pointer_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPointer {
    pub latest: u64,
}

impl KeyPointer {
    /// Parse the secret read from `path`.
    pub fn from_data(path: &str, data: &SecretData) -> Result<Self, StoreError> {
        Ok(Self {
            latest: data.version_field(path, "latest")?,
        })
    }
}

/// A versioned salt as stored at [`salt_path`].
#[derive(Clone, PartialEq, Eq)]
pub struct SaltRecord {
    pub version: u64,
    pub salt: Vec<u8>,
}

impl SaltRecord {
    /// Parse the secret read from `path`.
    pub fn from_data(path: &str, data: &SecretData) -> Result<Self, StoreError> {
        Ok(Self {
            version: data.version_field(path, "version")?,
            salt: data.base64_field(path, "salt")?,
        })
    }
}

impl std::fmt::Debug for SaltRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltRecord")
            .field("version", &self.version)
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

/// The pointer at [`salt_pointer_path`]: every salt version still valid for
/// lookups, plus the one new hashes should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltPointer {
    /// Valid versions, ascending and de-duplicated.
    pub salts: Vec<u64>,
    pub latest: u64,
}

impl SaltPointer {
    /// Parse the secret read from `path`.
    pub fn from_data(path: &str, data: &SecretData) -> Result<Self, StoreError> {
        let raw = data.field(path, "salts")?;
        let mut salts = raw
            .split(',')
            .map(|s| {
                parse_version(s).ok_or_else(|| {
                    StoreError::malformed(path, format!("field `salts` has a bad entry: {s:?}"))
                })
            })
            .collect::<Result<Vec<u64>, StoreError>>()?;
        salts.sort_unstable();
        salts.dedup();

        Ok(Self {
            salts,
            latest: data.version_field(path, "latest")?,
        })
    }
}
