//! [`RemoteProvider`]: key and salt lookups served from an external secret
//! store and memoised for the life of the process.
//!
//! # Caching
//!
//! Every successful fetch is cached indefinitely: there is no expiry and no
//! invalidation. Rotating a secret in the store has no effect on a running
//! process until it restarts.
//!
//! # Locking
//!
//! One mutex guards the whole cache and is held across the store round-trip
//! on a miss. Concurrent requests for the same uncached item therefore wait
//! for the first fetch instead of issuing their own, and two different values
//! can never race into the cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use common::protocol::{
    key_path, key_pointer_path, salt_path, salt_pointer_path, KeyPointer, KeyRecord,
    SaltPointer, SaltRecord,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{KeyProvider, ProviderError, SaltProvider};
use crate::crypto::{BlockMode, Cipher, Key};
use crate::store::SecretStore;

#[derive(Default)]
struct Cache {
    keys: HashMap<String, BTreeMap<u64, Arc<Key>>>,
    latest_key: HashMap<String, u64>,
    salts: HashMap<String, BTreeMap<u64, Arc<[u8]>>>,
    current_salts: HashMap<String, Vec<u64>>,
    latest_salt: HashMap<String, u64>,
}

/// Caching [`KeyProvider`] and [`SaltProvider`] over a [`SecretStore`].
pub struct RemoteProvider<S> {
    store: S,
    cache: Mutex<Cache>,
}

impl<S: SecretStore> RemoteProvider<S> {
    /// Create a provider with an empty cache.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn fetch_key(&self, prefix: &str, version: u64) -> Result<Key, ProviderError> {
        let path = key_path(prefix, version);
        debug!(prefix, version, "key cache miss; fetching");
        let record = KeyRecord::from_data(&path, &self.store.read(&path)?)?;
        check_version("key", prefix, version, record.version)?;

        let cipher: Cipher = record.cipher.parse()?;
        let block_mode: BlockMode = record.block_mode.parse()?;
        Ok(Key::new(version, cipher, block_mode, &record.key)?)
    }

    fn fetch_salt(&self, prefix: &str, version: u64) -> Result<Vec<u8>, ProviderError> {
        let path = salt_path(prefix, version);
        debug!(prefix, version, "salt cache miss; fetching");
        let record = SaltRecord::from_data(&path, &self.store.read(&path)?)?;
        check_version("salt", prefix, version, record.version)?;
        Ok(record.salt)
    }

    /// Fetch the salt pointer and cache the valid set and the latest version
    /// together, so the two can never disagree.
    fn load_salt_pointer(&self, cache: &mut Cache, prefix: &str) -> Result<SaltPointer, ProviderError> {
        let path = salt_pointer_path(prefix);
        debug!(prefix, "salt pointer cache miss; fetching");
        let pointer = SaltPointer::from_data(&path, &self.store.read(&path)?)?;

        let newest = pointer.salts.last().copied().unwrap_or(pointer.latest);
        if newest != pointer.latest {
            warn!(prefix, latest = pointer.latest, newest, "inconsistent salt pointer");
            return Err(ProviderError::InconsistentSaltPointer {
                prefix: prefix.to_owned(),
                latest: pointer.latest,
                newest,
            });
        }

        cache.latest_salt.insert(prefix.to_owned(), pointer.latest);
        cache
            .current_salts
            .insert(prefix.to_owned(), pointer.salts.clone());
        Ok(pointer)
    }
}

fn check_version(
    kind: &'static str,
    prefix: &str,
    requested: u64,
    found: u64,
) -> Result<(), ProviderError> {
    if found == requested {
        return Ok(());
    }
    warn!(kind, prefix, requested, found, "store returned wrong version");
    Err(ProviderError::VersionMismatch {
        kind,
        prefix: prefix.to_owned(),
        requested,
        found,
    })
}

impl<S: SecretStore + Send + Sync> KeyProvider for RemoteProvider<S> {
    fn get_key(&self, prefix: &str, version: u64) -> Result<Arc<Key>, ProviderError> {
        let mut cache = self.cache.lock();
        if let Some(key) = cache.keys.get(prefix).and_then(|m| m.get(&version)) {
            return Ok(Arc::clone(key));
        }

        let key = Arc::new(self.fetch_key(prefix, version)?);
        cache
            .keys
            .entry(prefix.to_owned())
            .or_default()
            .insert(version, Arc::clone(&key));
        Ok(key)
    }

    fn current_key_version(&self, prefix: &str) -> Result<u64, ProviderError> {
        let mut cache = self.cache.lock();
        if let Some(&version) = cache.latest_key.get(prefix) {
            return Ok(version);
        }

        let path = key_pointer_path(prefix);
        debug!(prefix, "key pointer cache miss; fetching");
        let pointer = KeyPointer::from_data(&path, &self.store.read(&path)?)?;
        cache.latest_key.insert(prefix.to_owned(), pointer.latest);
        Ok(pointer.latest)
    }
}

impl<S: SecretStore + Send + Sync> SaltProvider for RemoteProvider<S> {
    fn get_salt(&self, prefix: &str, version: u64) -> Result<Arc<[u8]>, ProviderError> {
        let mut cache = self.cache.lock();
        if let Some(salt) = cache.salts.get(prefix).and_then(|m| m.get(&version)) {
            return Ok(Arc::clone(salt));
        }

        let salt: Arc<[u8]> = Arc::from(self.fetch_salt(prefix, version)?);
        cache
            .salts
            .entry(prefix.to_owned())
            .or_default()
            .insert(version, Arc::clone(&salt));
        Ok(salt)
    }

    fn current_salt_version(&self, prefix: &str) -> Result<u64, ProviderError> {
        let mut cache = self.cache.lock();
        if let Some(&version) = cache.latest_salt.get(prefix) {
            return Ok(version);
        }
        Ok(self.load_salt_pointer(&mut cache, prefix)?.latest)
    }

    fn current_salts(&self, prefix: &str) -> Result<Vec<u64>, ProviderError> {
        let mut cache = self.cache.lock();
        if let Some(salts) = cache.current_salts.get(prefix) {
            return Ok(salts.clone());
        }
        Ok(self.load_salt_pointer(&mut cache, prefix)?.salts)
    }
}
