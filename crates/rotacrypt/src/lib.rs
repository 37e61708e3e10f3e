//! Versioned, rotatable field encryption and salted hashing.
//!
//! Values are sealed into self-describing envelopes that name the key
//! version that produced them, so keys can rotate without a flag day. Keys
//! and salts are looked up per prefix through [`provider`] implementations,
//! backed either by deterministic dev stubs or by an external secret
//! [`store`].
//!
//! Start with [`Crypto`]; [`global`] offers a process-wide default for call
//! sites that cannot carry one.

pub mod config;
pub mod crypto;
pub mod facade;
pub mod global;
pub mod provider;
pub mod rekey;
pub mod store;
pub mod telemetry;

pub use facade::{sum256_hex, Crypto, CryptoError};
pub use provider::{KeyProvider, ProviderError, SaltProvider};
pub use rekey::{rekey_stream, RekeyStats};
