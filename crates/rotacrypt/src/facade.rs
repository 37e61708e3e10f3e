//! [`Crypto`]: rotation-aware encrypt, decrypt, re-encrypt and hash
//! operations over a pair of providers.
//!
//! # Empty values
//!
//! Empty input short-circuits everywhere: encrypting, decrypting or hashing
//! an empty value yields an empty result without touching a provider. "No
//! value" and "encrypted empty value" are indistinguishable in storage.
//!
//! # Rotation
//!
//! - Keys: [`Crypto::reencrypt`] moves one envelope onto the prefix's current
//!   key. Callers sweep their records at their own pace; records re-encrypted
//!   while the current version changes may land on different versions, and
//!   all of them stay decryptable.
//! - Salts: [`Crypto::current_hashes`] yields one digest per still-valid salt
//!   so a lookup by hash can match values hashed before the rotation.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::crypto::{read_version, CodecError, VERSION_FIELD_LEN};
use crate::provider::{DevKeyProvider, DevSaltProvider, KeyProvider, ProviderError, SaltProvider};

/// Errors produced by facade operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The envelope is too short to hold a version field and a body.
    #[error("insufficient length: envelope of {0} bytes cannot hold a version field")]
    EnvelopeTooShort(usize),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Stateless orchestration over a key provider and a salt provider.
///
/// Cheap to clone; safe to share between threads.
#[derive(Clone)]
pub struct Crypto {
    keys: Arc<dyn KeyProvider>,
    salts: Arc<dyn SaltProvider>,
}

impl Crypto {
    /// Build a facade from separate key and salt providers.
    pub fn new(keys: Arc<dyn KeyProvider>, salts: Arc<dyn SaltProvider>) -> Self {
        Self { keys, salts }
    }

    /// Build a facade from one provider serving both keys and salts.
    pub fn with_provider<P>(provider: Arc<P>) -> Self
    where
        P: KeyProvider + SaltProvider + 'static,
    {
        Self {
            keys: provider.clone(),
            salts: provider,
        }
    }

    /// Facade over the insecure development providers.
    pub fn dev() -> Self {
        Self::new(
            Arc::new(DevKeyProvider::default()),
            Arc::new(DevSaltProvider::default()),
        )
    }

    pub fn key_provider(&self) -> &Arc<dyn KeyProvider> {
        &self.keys
    }

    pub fn salt_provider(&self) -> &Arc<dyn SaltProvider> {
        &self.salts
    }

    // -----------------------------------------------------------------------
    // Encryption
    // -----------------------------------------------------------------------

    /// Encrypt under the prefix's current key version.
    pub fn encrypt(&self, prefix: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if plaintext.is_empty() {
            return Ok(Vec::new());
        }
        let version = self.keys.current_key_version(prefix)?;
        self.encrypt_with_version(prefix, version, plaintext)
    }

    /// Encrypt under an explicit key version.
    pub fn encrypt_with_version(
        &self,
        prefix: &str,
        version: u64,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if plaintext.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.keys.get_key(prefix, version)?;
        Ok(key.encrypt(plaintext)?)
    }

    /// Decrypt a complete envelope with the key version embedded in it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EnvelopeTooShort`] for non-empty input of 8
    /// bytes or fewer.
    pub fn decrypt(&self, prefix: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if envelope.is_empty() {
            return Ok(Vec::new());
        }
        let version = envelope_version(envelope)?;
        let key = self.keys.get_key(prefix, version)?;
        Ok(key.decrypt(&envelope[VERSION_FIELD_LEN..])?)
    }

    /// Decrypt with whatever version the envelope names, then encrypt the
    /// plaintext under the prefix's current version.
    pub fn reencrypt(&self, prefix: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let plaintext = self.decrypt(prefix, envelope)?;
        self.encrypt(prefix, &plaintext)
    }

    /// Version of the key that produced `envelope`. No decryption happens.
    pub fn envelope_version(&self, envelope: &[u8]) -> Result<u64, CryptoError> {
        envelope_version(envelope)
    }

    /// Whether `envelope` is already under the prefix's current key.
    pub fn is_current(&self, prefix: &str, envelope: &[u8]) -> Result<bool, CryptoError> {
        let version = envelope_version(envelope)?;
        Ok(version == self.keys.current_key_version(prefix)?)
    }

    // -----------------------------------------------------------------------
    // Hashing
    // -----------------------------------------------------------------------

    /// Hash under the prefix's current salt version.
    pub fn hash(&self, prefix: &str, value: &[u8]) -> Result<String, CryptoError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        let version = self.salts.current_salt_version(prefix)?;
        self.hash_with_version(prefix, version, value)
    }

    /// [`Crypto::hash`] over a string value.
    pub fn hash_string(&self, prefix: &str, value: &str) -> Result<String, CryptoError> {
        self.hash(prefix, value.as_bytes())
    }

    /// `base64(SHA-256(salt ‖ value))` under an explicit salt version.
    pub fn hash_with_version(
        &self,
        prefix: &str,
        version: u64,
        value: &[u8],
    ) -> Result<String, CryptoError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        let salt = self.salts.get_salt(prefix, version)?;
        let digest = Sha256::new().chain_update(&*salt).chain_update(value).finalize();
        Ok(STANDARD.encode(digest))
    }

    /// One digest per currently valid salt version, in version order.
    pub fn current_hashes(&self, prefix: &str, value: &[u8]) -> Result<Vec<String>, CryptoError> {
        if value.is_empty() {
            return Ok(Vec::new());
        }
        self.salts
            .current_salts(prefix)?
            .into_iter()
            .map(|version| self.hash_with_version(prefix, version, value))
            .collect()
    }

    /// [`Crypto::current_hashes`] over a string value.
    pub fn current_hashes_string(
        &self,
        prefix: &str,
        value: &str,
    ) -> Result<Vec<String>, CryptoError> {
        self.current_hashes(prefix, value.as_bytes())
    }
}

/// Unsalted SHA-256 of `value` as lowercase hex. Needs no provider; not for
/// secrets.
pub fn sum256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

fn envelope_version(envelope: &[u8]) -> Result<u64, CryptoError> {
    if envelope.len() <= VERSION_FIELD_LEN {
        return Err(CryptoError::EnvelopeTooShort(envelope.len()));
    }
    Ok(read_version(envelope)?)
}
