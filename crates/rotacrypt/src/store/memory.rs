//! [`MemoryStore`]: an in-process [`SecretStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{SecretData, SecretStore, StoreError};

/// Secrets held in memory, keyed by path.
///
/// Counts every read so tests can assert how often a provider went to the
/// store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: RwLock<HashMap<String, SecretData>>,
    reads: AtomicUsize,
}

impl MemoryStore {
    /// Create a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the secret at `path`.
    pub fn insert(&self, path: impl Into<String>, data: SecretData) {
        self.secrets.write().insert(path.into(), data);
    }

    /// Number of [`SecretStore::read`] calls served so far, hits and misses.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SecretStore for MemoryStore {
    fn read(&self, path: &str) -> Result<SecretData, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.read("keys/x/1").unwrap_err().is_not_found());
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn insert_replaces() {
        let store = MemoryStore::new();
        store.insert("keys/x/current", SecretData::from_pairs([("latest", "1")]));
        store.insert("keys/x/current", SecretData::from_pairs([("latest", "2")]));
        let data = store.read("keys/x/current").unwrap();
        assert_eq!(data.field("keys/x/current", "latest").unwrap(), "2");
    }
}
