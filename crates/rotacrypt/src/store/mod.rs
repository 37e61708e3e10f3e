//! The synchronous boundary to the external secret store.
//!
//! Everything behind [`SecretStore`] is transport: HTTP, authentication,
//! retries and timeouts belong to the adapter, not to the providers.
//!
//! # Adapters
//!
//! - [`MemoryStore`]: in-process map, for tests and local development.
//! - [`SecretsManagerStore`]: AWS Secrets Manager.

pub mod memory;
pub mod secrets_manager;

pub use common::protocol::SecretData;
pub use common::StoreError;
pub use memory::MemoryStore;
pub use secrets_manager::SecretsManagerStore;

/// Reads secrets by path from an external store.
///
/// Calls block the current thread until the store answers. Paths follow the
/// schema in [`common::protocol`].
#[cfg_attr(test, mockall::automock)]
pub trait SecretStore {
    /// Read every field of the secret at `path`.
    fn read(&self, path: &str) -> Result<SecretData, StoreError>;
}
