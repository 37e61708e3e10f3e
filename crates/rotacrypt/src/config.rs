//! Configuration loading and validation.
//!
//! All values are read from `ROTACRYPT_`-prefixed environment variables at
//! startup, e.g. `ROTACRYPT_PROVIDER=secrets_manager`. The process exits with
//! a clear error message if any variable is invalid.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::crypto::MAX_VERSION;
use crate::facade::Crypto;
use crate::provider::{DevKeyProvider, DevSaltProvider, RemoteProvider};
use crate::store::SecretsManagerStore;

/// Where keys and salts come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Deterministic, insecure providers for local use.
    #[default]
    Dev,
    /// [`RemoteProvider`] over AWS Secrets Manager.
    SecretsManager,
}

/// Validated configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Provider backend.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Prefix prepended to every secret name in Secrets Manager.
    #[serde(default = "default_secret_root")]
    pub secret_root: String,

    /// Override for the Secrets Manager endpoint.
    #[serde(default)]
    pub aws_endpoint_url: Option<String>,

    /// Current key version reported by the dev provider.
    #[serde(default = "default_dev_version")]
    pub dev_key_version: u64,

    /// Current salt version reported by the dev provider.
    #[serde(default = "default_dev_version")]
    pub dev_salt_version: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_secret_root() -> String {
    "secret".into()
}
fn default_dev_version() -> u64 {
    1
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix("ROTACRYPT"))
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        match self.provider {
            ProviderKind::Dev => {
                ensure_version(self.dev_key_version, "ROTACRYPT_DEV_KEY_VERSION")?;
                ensure_version(self.dev_salt_version, "ROTACRYPT_DEV_SALT_VERSION")?;
            }
            ProviderKind::SecretsManager => {
                if let Some(url) = &self.aws_endpoint_url {
                    if url.trim().is_empty() {
                        anyhow::bail!("ROTACRYPT_AWS_ENDPOINT_URL must not be empty when set");
                    }
                }
            }
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("ROTACRYPT_LOG_LEVEL must not be empty");
        }
        Ok(())
    }

    /// Construct the facade described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Secrets Manager client cannot be set up.
    pub fn build_crypto(&self) -> Result<Crypto> {
        match self.provider {
            ProviderKind::Dev => {
                info!(
                    key_version = self.dev_key_version,
                    salt_version = self.dev_salt_version,
                    "using dev providers"
                );
                Ok(Crypto::new(
                    Arc::new(DevKeyProvider::new(self.dev_key_version)),
                    Arc::new(DevSaltProvider::new(self.dev_salt_version)),
                ))
            }
            ProviderKind::SecretsManager => {
                let store = SecretsManagerStore::connect(
                    self.secret_root.clone(),
                    self.aws_endpoint_url.as_deref(),
                )
                .context("failed to set up Secrets Manager store")?;
                info!(secret_root = %self.secret_root, "using Secrets Manager provider");
                Ok(Crypto::with_provider(Arc::new(RemoteProvider::new(store))))
            }
        }
    }
}

fn ensure_version(value: u64, name: &str) -> Result<()> {
    if value == 0 || value > MAX_VERSION {
        anyhow::bail!("{name} must be between 1 and {MAX_VERSION}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        config::Environment::with_prefix("ROTACRYPT").source(Some(map))
    }

    fn dev_config() -> Config {
        Config {
            provider: ProviderKind::Dev,
            secret_root: default_secret_root(),
            aws_endpoint_url: None,
            dev_key_version: default_dev_version(),
            dev_salt_version: default_dev_version(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_secret_root(), "secret");
        assert_eq!(default_dev_version(), 1);
        assert_eq!(default_log_level(), "info");
        assert_eq!(ProviderKind::default(), ProviderKind::Dev);
    }

    #[test]
    fn empty_environment_yields_dev_defaults() {
        let cfg = Config::from_environment(env(&[])).unwrap();
        assert_eq!(cfg.provider, ProviderKind::Dev);
        assert_eq!(cfg.secret_root, "secret");
        assert!(cfg.aws_endpoint_url.is_none());
        assert_eq!(cfg.dev_key_version, 1);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn reads_prefixed_variables() {
        let cfg = Config::from_environment(env(&[
            ("ROTACRYPT_PROVIDER", "secrets_manager"),
            ("ROTACRYPT_SECRET_ROOT", "prod/secret"),
            ("ROTACRYPT_AWS_ENDPOINT_URL", "http://localhost:4566"),
            ("ROTACRYPT_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, ProviderKind::SecretsManager);
        assert_eq!(cfg.secret_root, "prod/secret");
        assert_eq!(cfg.aws_endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn parses_dev_versions() {
        let cfg = Config::from_environment(env(&[
            ("ROTACRYPT_DEV_KEY_VERSION", "2"),
            ("ROTACRYPT_DEV_SALT_VERSION", "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.dev_key_version, 2);
        assert_eq!(cfg.dev_salt_version, 3);
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Config::from_environment(env(&[("ROTACRYPT_PROVIDER", "vault")])).is_err());
    }

    #[test]
    fn validate_rejects_zero_dev_version() {
        let cfg = Config {
            dev_key_version: 0,
            ..dev_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_dev_version() {
        let cfg = Config {
            dev_salt_version: MAX_VERSION + 1,
            ..dev_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_endpoint() {
        let cfg = Config {
            provider: ProviderKind::SecretsManager,
            aws_endpoint_url: Some("  ".into()),
            ..dev_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn dev_config_builds_working_crypto() {
        let cfg = Config {
            dev_key_version: 2,
            ..dev_config()
        };
        let crypto = cfg.build_crypto().unwrap();
        let env = crypto.encrypt("test", b"Test Value").unwrap();
        assert_eq!(crypto.envelope_version(&env).unwrap(), 2);
        assert_eq!(crypto.decrypt("test", &env).unwrap(), b"Test Value");
    }
}
