//! Errors raised at the boundary with the external secret store.

use thiserror::Error;

/// Failure reading a secret from the external store.
///
/// Variants distinguish "the secret is absent" from "the store could not be
/// reached" from "the secret exists but does not match the expected schema":
/// - [`StoreError::NotFound`] → no secret at the requested path
/// - [`StoreError::Unavailable`] → transport, authentication, or other upstream failure
/// - [`StoreError::Malformed`] → missing or unparsable field
#[derive(Debug, Error)]
pub enum StoreError {
    /// No secret exists at the requested path.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The store could not be reached or rejected the request.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),

    /// The secret was read but its fields do not match the expected schema.
    #[error("malformed secret at {path}: {reason}")]
    Malformed {
        /// Store path of the offending secret.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl StoreError {
    /// Shorthand for building a [`StoreError::Malformed`].
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means the secret does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display_includes_path_and_reason() {
        let e = StoreError::malformed("keys/ssn/1", "missing field `key`");
        let msg = e.to_string();
        assert!(msg.contains("keys/ssn/1"));
        assert!(msg.contains("missing field `key`"));
    }

    #[test]
    fn not_found_is_detected() {
        assert!(StoreError::NotFound("salts/ssn/current".into()).is_not_found());
        assert!(!StoreError::Unavailable("timeout".into()).is_not_found());
    }
}
