//! AWS Secrets Manager adapter for [`SecretStore`].
//!
//! Each schema path maps to the secret named `<root>/<path>`, whose
//! `SecretString` is a flat JSON object of string fields:
//!
//! ```text
//! secret/keys/ssn/3  ->  {"version":"3","cipher":"AES","block_mode":"GCM","key":"..."}
//! ```
//!
//! Credentials come from the standard AWS credential chain.

use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

use super::{SecretData, SecretStore, StoreError};

/// Blocking [`SecretStore`] over the async AWS SDK.
///
/// Owns a private current-thread Tokio runtime and blocks on it for every
/// read. Calls made from a thread already driving a Tokio runtime fail with
/// [`StoreError::Unavailable`]; move them onto `spawn_blocking`.
pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
    runtime: Runtime,
    root: String,
}

impl SecretsManagerStore {
    /// Load AWS configuration and build the client.
    ///
    /// `endpoint_url` overrides the service endpoint (local emulators,
    /// proxies).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if called from within an async
    /// runtime or if the private runtime cannot be started.
    pub fn connect(root: impl Into<String>, endpoint_url: Option<&str>) -> Result<Self, StoreError> {
        ensure_outside_runtime()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to start AWS runtime: {e}")))?;

        let config = runtime.block_on(aws_config::defaults(BehaviorVersion::latest()).load());
        let mut builder = aws_sdk_secretsmanager::config::Builder::from(&config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        let client = aws_sdk_secretsmanager::Client::from_conf(builder.build());

        Ok(Self {
            client,
            runtime,
            root: root.into(),
        })
    }
}

impl SecretStore for SecretsManagerStore {
    fn read(&self, path: &str) -> Result<SecretData, StoreError> {
        ensure_outside_runtime()?;
        let id = secret_id(&self.root, path);
        debug!(secret_id = %id, "reading secret from Secrets Manager");

        let output = self
            .runtime
            .block_on(self.client.get_secret_value().secret_id(&id).send())
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception());
                if missing {
                    StoreError::NotFound(path.to_owned())
                } else {
                    StoreError::Unavailable(format!(
                        "failed to read {id}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let text = output
            .secret_string()
            .ok_or_else(|| StoreError::malformed(path, "secret has no SecretString"))?;
        serde_json::from_str(text).map_err(|e| {
            StoreError::malformed(path, format!("SecretString is not a JSON object of strings: {e}"))
        })
    }
}

/// Blocking on the private runtime panics when the current thread already
/// drives one.
fn ensure_outside_runtime() -> Result<(), StoreError> {
    if Handle::try_current().is_ok() {
        return Err(StoreError::Unavailable(
            "called from within an async runtime".into(),
        ));
    }
    Ok(())
}

/// Secret name for a schema path under `root`.
fn secret_id(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        path.to_owned()
    } else {
        format!("{root}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_id_joins_root_and_path() {
        assert_eq!(secret_id("secret", "keys/ssn/1"), "secret/keys/ssn/1");
        assert_eq!(secret_id("secret/", "salts/ssn/current"), "secret/salts/ssn/current");
    }

    #[test]
    fn empty_root_uses_bare_path() {
        assert_eq!(secret_id("", "keys/ssn/current"), "keys/ssn/current");
    }

    #[test]
    fn blocking_is_allowed_outside_a_runtime() {
        assert!(ensure_outside_runtime().is_ok());
    }

    #[tokio::test]
    async fn connect_inside_async_runtime_returns_error() {
        let result = SecretsManagerStore::connect("secret", Some("http://127.0.0.1:1"));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn multi_thread_runtime_is_also_rejected() {
        assert!(matches!(
            ensure_outside_runtime(),
            Err(StoreError::Unavailable(msg)) if msg.contains("async runtime")
        ));
    }
}
