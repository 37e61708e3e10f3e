//! Envelope codec: versioned AES encryption of individual buffers.
//!
//! This module is intentionally free of provider and secret-store
//! dependencies. A [`Key`] knows its own version and embeds it; what that
//! version means is decided elsewhere.
//!
//! # Envelope format
//!
//! ```text
//! [0..8)      key version, unsigned LEB128, zero-padded to 8 bytes
//! [8..8+n)    random nonce/IV (n = 16 for CFB/CTR/OFB, 12 for GCM)
//! [8+n..)     ciphertext (GCM: last 16 bytes are the tag)
//! ```
//!
//! CFB, CTR and OFB carry no integrity protection: a corrupted envelope
//! decrypts to garbage without error. Only GCM detects tampering.

pub mod cipher;
pub mod envelope;

use std::fmt;
use std::str::FromStr;

pub use cipher::{CodecError, Key};
pub use envelope::{read_version, MAX_VERSION, VERSION_FIELD_LEN};

/// AES block size in bytes; also the IV length of the stream modes.
pub const BLOCK_LEN: usize = 16;

/// GCM nonce length in bytes.
pub const GCM_NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const GCM_TAG_LEN: usize = 16;

/// Supported block cipher families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cipher {
    Aes,
}

impl FromStr for Cipher {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES" => Ok(Cipher::Aes),
            other => Err(CodecError::UnsupportedCipher(other.to_owned())),
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cipher::Aes => f.write_str("AES"),
        }
    }
}

/// Supported block modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMode {
    Cfb,
    Ctr,
    Ofb,
    Gcm,
}

impl BlockMode {
    /// Length of the nonce/IV this mode writes into an envelope.
    pub fn iv_len(self) -> usize {
        match self {
            BlockMode::Gcm => GCM_NONCE_LEN,
            BlockMode::Cfb | BlockMode::Ctr | BlockMode::Ofb => BLOCK_LEN,
        }
    }

    /// Bytes the mode adds on top of the plaintext length.
    pub fn overhead(self) -> usize {
        match self {
            BlockMode::Gcm => GCM_TAG_LEN,
            BlockMode::Cfb | BlockMode::Ctr | BlockMode::Ofb => 0,
        }
    }
}

impl FromStr for BlockMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CFB" => Ok(BlockMode::Cfb),
            "CTR" => Ok(BlockMode::Ctr),
            "OFB" => Ok(BlockMode::Ofb),
            "GCM" => Ok(BlockMode::Gcm),
            other => Err(CodecError::UnsupportedBlockMode(other.to_owned())),
        }
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockMode::Cfb => "CFB",
            BlockMode::Ctr => "CTR",
            BlockMode::Ofb => "OFB",
            BlockMode::Gcm => "GCM",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_identifiers() {
        assert_eq!("AES".parse::<Cipher>().unwrap(), Cipher::Aes);
        for (s, m) in [
            ("CFB", BlockMode::Cfb),
            ("CTR", BlockMode::Ctr),
            ("OFB", BlockMode::Ofb),
            ("GCM", BlockMode::Gcm),
        ] {
            assert_eq!(s.parse::<BlockMode>().unwrap(), m);
            assert_eq!(m.to_string(), s);
        }
    }

    #[test]
    fn rejects_unknown_identifiers() {
        assert!(matches!(
            "DES".parse::<Cipher>(),
            Err(CodecError::UnsupportedCipher(c)) if c == "DES"
        ));
        assert!(matches!(
            "ECB".parse::<BlockMode>(),
            Err(CodecError::UnsupportedBlockMode(m)) if m == "ECB"
        ));
        // Identifiers are case-sensitive.
        assert!("gcm".parse::<BlockMode>().is_err());
    }

    #[test]
    fn iv_lengths() {
        assert_eq!(BlockMode::Cfb.iv_len(), 16);
        assert_eq!(BlockMode::Ctr.iv_len(), 16);
        assert_eq!(BlockMode::Ofb.iv_len(), 16);
        assert_eq!(BlockMode::Gcm.iv_len(), 12);
    }
}
