//! Shared secret-store schema types and errors used across `rotacrypt` crates.

pub mod error;
pub mod protocol;

pub use error::StoreError;
