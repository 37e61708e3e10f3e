//! Deterministic development providers.
//!
//! Keys and salts are derived purely from prefix and version, so anyone can
//! reproduce them. They exist for tests and local development only; every
//! lookup logs a warning unless `quiet` is set.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::warn;

use super::{KeyProvider, ProviderError, SaltProvider};
use crate::crypto::{BlockMode, Cipher, Key};

/// Stub [`KeyProvider`]: version 1 is AES-CFB, every other version AES-GCM.
#[derive(Debug, Clone)]
pub struct DevKeyProvider {
    /// Version reported by [`KeyProvider::current_key_version`].
    pub key_version: u64,
    /// Suppress the per-lookup warning.
    pub quiet: bool,
}

impl DevKeyProvider {
    pub fn new(key_version: u64) -> Self {
        Self {
            key_version,
            quiet: false,
        }
    }

    /// Same provider without the per-lookup warning.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

impl Default for DevKeyProvider {
    fn default() -> Self {
        Self::new(1)
    }
}

impl KeyProvider for DevKeyProvider {
    fn get_key(&self, prefix: &str, version: u64) -> Result<Arc<Key>, ProviderError> {
        if !self.quiet {
            warn!(prefix, version, "USING DEV KEY PROVIDER: keys are not secret");
        }
        let mode = if version == 1 {
            BlockMode::Cfb
        } else {
            BlockMode::Gcm
        };
        let material = Sha256::digest(format!("DEV KEY {prefix} {version}"));
        Ok(Arc::new(Key::new(version, Cipher::Aes, mode, &material)?))
    }

    fn current_key_version(&self, _prefix: &str) -> Result<u64, ProviderError> {
        Ok(self.key_version)
    }
}

/// Stub [`SaltProvider`]: the salt for a version is
/// `"DEV SALT <prefix> <version>"`.
#[derive(Debug, Clone)]
pub struct DevSaltProvider {
    /// Version reported by [`SaltProvider::current_salt_version`].
    pub salt_version: u64,
    /// Versions reported by [`SaltProvider::current_salts`].
    pub current_salts: Vec<u64>,
    /// Suppress the per-lookup warning.
    pub quiet: bool,
}

impl DevSaltProvider {
    pub fn new(salt_version: u64) -> Self {
        Self {
            salt_version,
            current_salts: vec![1, 2, 3],
            quiet: false,
        }
    }

    /// Same provider without the per-lookup warning.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Replace the set of currently valid salt versions.
    pub fn with_current_salts(mut self, salts: Vec<u64>) -> Self {
        self.current_salts = salts;
        self
    }
}

impl Default for DevSaltProvider {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SaltProvider for DevSaltProvider {
    fn get_salt(&self, prefix: &str, version: u64) -> Result<Arc<[u8]>, ProviderError> {
        if !self.quiet {
            warn!(prefix, version, "USING DEV SALT PROVIDER: salts are not secret");
        }
        Ok(Arc::from(format!("DEV SALT {prefix} {version}").into_bytes()))
    }

    fn current_salt_version(&self, _prefix: &str) -> Result<u64, ProviderError> {
        Ok(self.salt_version)
    }

    fn current_salts(&self, prefix: &str) -> Result<Vec<u64>, ProviderError> {
        if !self.quiet {
            warn!(prefix, "USING DEV SALT PROVIDER: salts are not secret");
        }
        Ok(self.current_salts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_one_is_cfb_others_gcm() {
        let kp = DevKeyProvider::default().quiet();
        let k1 = kp.get_key("test", 1).unwrap();
        assert_eq!(k1.version(), 1);
        assert_eq!(k1.block_mode(), BlockMode::Cfb);
        let k2 = kp.get_key("test", 2).unwrap();
        assert_eq!(k2.version(), 2);
        assert_eq!(k2.block_mode(), BlockMode::Gcm);
    }

    #[test]
    fn keys_are_deterministic() {
        let kp = DevKeyProvider::default().quiet();
        let env = kp.get_key("test", 3).unwrap().encrypt(b"hello").unwrap();
        let again = kp.get_key("test", 3).unwrap();
        assert_eq!(again.decrypt(&env[8..]).unwrap(), b"hello");
    }

    #[test]
    fn keys_differ_per_prefix() {
        let kp = DevKeyProvider::default().quiet();
        let env = kp.get_key("a", 2).unwrap().encrypt(b"hello").unwrap();
        assert!(kp.get_key("b", 2).unwrap().decrypt(&env[8..]).is_err());
    }

    #[test]
    fn current_versions_come_from_fields() {
        assert_eq!(DevKeyProvider::new(5).current_key_version("x").unwrap(), 5);
        let sp = DevSaltProvider::new(2).quiet();
        assert_eq!(sp.current_salt_version("x").unwrap(), 2);
        assert_eq!(sp.current_salts("x").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn salt_is_prefix_and_version() {
        let sp = DevSaltProvider::default().quiet();
        assert_eq!(&*sp.get_salt("fields/test", 2).unwrap(), b"DEV SALT fields/test 2");
    }

    #[test]
    fn current_salts_can_be_overridden() {
        let sp = DevSaltProvider::new(4).quiet().with_current_salts(vec![3, 4]);
        assert_eq!(sp.current_salts("p").unwrap(), vec![3, 4]);
    }
}
