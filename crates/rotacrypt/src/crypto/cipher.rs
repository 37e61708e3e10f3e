//! [`Key`]: a versioned AES key that seals and opens envelopes.

use aes::cipher::{AsyncStreamCipher, KeyIvInit, StreamCipher};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AesGcm, Nonce};
use thiserror::Error;
use zeroize::Zeroizing;

use super::envelope::{write_version, VERSION_FIELD_LEN};
use super::{BlockMode, Cipher, BLOCK_LEN};

/// Errors produced by the codec layer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Key material is not a valid AES key length.
    #[error("invalid key length: expected 16, 24 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The version cannot be represented in the 8-byte version field.
    #[error("key version {0} does not fit in the envelope version field")]
    VersionOutOfRange(u64),

    /// The store named a cipher this library does not implement.
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// The store named a block mode this library does not implement.
    #[error("unsupported cipher block mode: {0}")]
    UnsupportedBlockMode(String),

    /// Input is too short to contain a nonce (and, for stream modes, one block).
    #[error("insufficient length: need at least {required} bytes, got {actual}")]
    InsufficientLength { required: usize, actual: usize },

    /// The envelope's version field has no terminating byte.
    #[error("malformed envelope version field")]
    MalformedVersion,

    /// GCM tag verification failed: wrong key or tampered envelope.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// GCM refused to seal the plaintext.
    #[error("aead seal failed")]
    SealFailed,

    /// The system random source could not produce a nonce.
    #[error("random source failure: {0}")]
    RandomSource(String),
}

/// Key bytes, zeroed when dropped.
type KeyMaterial = Zeroizing<Box<[u8]>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AesVariant {
    Aes128,
    Aes192,
    Aes256,
}

/// Runs `$body` with `$C` bound to the AES type matching the key length.
macro_rules! with_aes {
    ($variant:expr, $C:ident => $body:expr) => {
        match $variant {
            AesVariant::Aes128 => {
                type $C = Aes128;
                $body
            }
            AesVariant::Aes192 => {
                type $C = Aes192;
                $body
            }
            AesVariant::Aes256 => {
                type $C = Aes256;
                $body
            }
        }
    };
}

/// An immutable, versioned symmetric key bound to a cipher and block mode.
///
/// Produced by a provider and shared read-only (behind `Arc`) between
/// concurrent callers.
pub struct Key {
    version: u64,
    cipher: Cipher,
    block_mode: BlockMode,
    variant: AesVariant,
    material: KeyMaterial,
}

impl Key {
    /// Bind `key` to a version, cipher and block mode.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidKeyLength`] unless `key` is 16, 24 or 32
    /// bytes, and [`CodecError::VersionOutOfRange`] if the version cannot be
    /// embedded in an envelope.
    pub fn new(
        version: u64,
        cipher: Cipher,
        block_mode: BlockMode,
        key: &[u8],
    ) -> Result<Self, CodecError> {
        write_version(version)?;
        let variant = match (cipher, key.len()) {
            (Cipher::Aes, 16) => AesVariant::Aes128,
            (Cipher::Aes, 24) => AesVariant::Aes192,
            (Cipher::Aes, 32) => AesVariant::Aes256,
            (_, n) => return Err(CodecError::InvalidKeyLength(n)),
        };
        Ok(Self {
            version,
            cipher,
            block_mode,
            variant,
            material: Zeroizing::new(key.into()),
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    pub fn block_mode(&self) -> BlockMode {
        self.block_mode
    }

    /// Length of the nonce/IV written after the version field.
    pub fn iv_len(&self) -> usize {
        self.block_mode.iv_len()
    }

    /// Total envelope length for a plaintext of `plaintext_len` bytes.
    pub fn envelope_len(&self, plaintext_len: usize) -> usize {
        VERSION_FIELD_LEN + self.iv_len() + plaintext_len + self.block_mode.overhead()
    }

    /// Encrypt `plaintext` into a complete envelope.
    ///
    /// A fresh nonce is drawn from the OS CSPRNG on every call.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::RandomSource`] if the random source fails, or
    /// [`CodecError::SealFailed`] if GCM rejects the input.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let header_len = VERSION_FIELD_LEN + self.iv_len();
        let mut out = Vec::with_capacity(self.envelope_len(plaintext.len()));
        out.extend_from_slice(&write_version(self.version)?);
        out.resize(header_len, 0);
        OsRng
            .try_fill_bytes(&mut out[VERSION_FIELD_LEN..])
            .map_err(|e| CodecError::RandomSource(e.to_string()))?;

        let key = &self.material[..];
        if self.block_mode == BlockMode::Gcm {
            let sealed = with_aes!(self.variant, C => {
                AesGcm::<C, U12>::new_from_slice(key)
                    .map_err(|_| CodecError::InvalidKeyLength(key.len()))?
                    .encrypt(Nonce::from_slice(&out[VERSION_FIELD_LEN..]), plaintext)
                    .map_err(|_| CodecError::SealFailed)?
            });
            out.extend_from_slice(&sealed);
            return Ok(out);
        }

        out.extend_from_slice(plaintext);
        let (header, body) = out.split_at_mut(header_len);
        self.apply_stream(&header[VERSION_FIELD_LEN..], body, true)?;
        Ok(out)
    }

    /// Decrypt an envelope body: everything after the 8-byte version field.
    ///
    /// An empty body decrypts to an empty plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InsufficientLength`] if the body is shorter than
    /// one block (CFB/CTR/OFB) or the nonce (GCM), and
    /// [`CodecError::AuthenticationFailed`] if GCM verification fails.
    /// Stream modes never detect corruption.
    pub fn decrypt(&self, body: &[u8]) -> Result<Vec<u8>, CodecError> {
        if body.is_empty() {
            return Ok(Vec::new());
        }
        let iv_len = self.iv_len();
        let required = match self.block_mode {
            BlockMode::Gcm => iv_len,
            BlockMode::Cfb | BlockMode::Ctr | BlockMode::Ofb => BLOCK_LEN,
        };
        if body.len() < required {
            return Err(CodecError::InsufficientLength {
                required,
                actual: body.len(),
            });
        }
        let (iv, text) = body.split_at(iv_len);

        let key = &self.material[..];
        if self.block_mode == BlockMode::Gcm {
            return with_aes!(self.variant, C => {
                AesGcm::<C, U12>::new_from_slice(key)
                    .map_err(|_| CodecError::InvalidKeyLength(key.len()))?
                    .decrypt(Nonce::from_slice(iv), text)
                    .map_err(|_| CodecError::AuthenticationFailed)
            });
        }

        let mut out = text.to_vec();
        self.apply_stream(iv, &mut out, false)?;
        Ok(out)
    }

    /// XOR the mode's keystream over `buf` in place. Only CFB distinguishes
    /// the two directions.
    fn apply_stream(&self, iv: &[u8], buf: &mut [u8], encrypting: bool) -> Result<(), CodecError> {
        let key = &self.material[..];
        let bad_key = |_| CodecError::InvalidKeyLength(key.len());
        match self.block_mode {
            BlockMode::Cfb if encrypting => with_aes!(self.variant, C => {
                cfb_mode::Encryptor::<C>::new_from_slices(key, iv)
                    .map_err(bad_key)?
                    .encrypt(buf)
            }),
            BlockMode::Cfb => with_aes!(self.variant, C => {
                cfb_mode::Decryptor::<C>::new_from_slices(key, iv)
                    .map_err(bad_key)?
                    .decrypt(buf)
            }),
            BlockMode::Ctr => with_aes!(self.variant, C => {
                ctr::Ctr128BE::<C>::new_from_slices(key, iv)
                    .map_err(bad_key)?
                    .apply_keystream(buf)
            }),
            BlockMode::Ofb => with_aes!(self.variant, C => {
                ofb::Ofb::<C>::new_from_slices(key, iv)
                    .map_err(bad_key)?
                    .apply_keystream(buf)
            }),
            BlockMode::Gcm => return Err(CodecError::UnsupportedBlockMode(
                "GCM has no keystream".into(),
            )),
        }
        Ok(())
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("Key")
            .field("version", &self.version)
            .field("cipher", &self.cipher)
            .field("block_mode", &self.block_mode)
            .field("material", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::read_version;

    const MODES: [BlockMode; 4] = [BlockMode::Cfb, BlockMode::Ctr, BlockMode::Ofb, BlockMode::Gcm];

    fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}

    #[test]
    fn key_material_is_wiped_on_drop() {
        assert_zeroize_on_drop::<KeyMaterial>();
    }

    fn key(version: u64, mode: BlockMode, len: usize) -> Key {
        let material: Vec<u8> = (0..len as u8).collect();
        Key::new(version, Cipher::Aes, mode, &material).unwrap()
    }

    #[test]
    fn cfb_envelope_length() {
        let k = key(1, BlockMode::Cfb, 32);
        let env = k.encrypt(b"0123456789").unwrap();
        assert_eq!(env.len(), 10 + 8 + 16);
    }

    #[test]
    fn gcm_envelope_length() {
        let k = key(2, BlockMode::Gcm, 32);
        let env = k.encrypt(b"0123456789").unwrap();
        assert_eq!(env.len(), 10 + 8 + 12 + 16);
        assert_eq!(env.len(), k.envelope_len(10));
    }

    #[test]
    fn round_trip_every_mode_and_key_size() {
        for mode in MODES {
            for key_len in [16, 24, 32] {
                let k = key(7, mode, key_len);
                for len in [1usize, 15, 16, 17, 100] {
                    let plaintext = vec![0xA5u8; len];
                    let env = k.encrypt(&plaintext).unwrap();
                    assert_eq!(env.len(), k.envelope_len(len));
                    let decrypted = k.decrypt(&env[VERSION_FIELD_LEN..]).unwrap();
                    assert_eq!(decrypted, plaintext, "{mode} aes-{} len {len}", key_len * 8);
                }
            }
        }
    }

    #[test]
    fn envelope_embeds_key_version() {
        for version in [1, 127, 128, 300, 1 << 40] {
            let k = key(version, BlockMode::Ctr, 16);
            let env = k.encrypt(b"payload").unwrap();
            assert_eq!(read_version(&env).unwrap(), version);
        }
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let k = key(1, BlockMode::Gcm, 32);
        let a = k.encrypt(b"same input").unwrap();
        let b = k.encrypt(b"same input").unwrap();
        assert_ne!(a[8..20], b[8..20]);
        assert_ne!(a, b);
    }

    #[test]
    fn gcm_tampering_fails_authentication() {
        let k = key(2, BlockMode::Gcm, 32);
        let env = k.encrypt(b"tamper me please").unwrap();
        for i in VERSION_FIELD_LEN..env.len() {
            let mut bad = env.clone();
            bad[i] ^= 0x01;
            assert!(
                matches!(
                    k.decrypt(&bad[VERSION_FIELD_LEN..]),
                    Err(CodecError::AuthenticationFailed)
                ),
                "byte {i} flipped but decryption succeeded"
            );
        }
    }

    #[test]
    fn gcm_wrong_key_fails() {
        let k1 = key(2, BlockMode::Gcm, 32);
        let k2 = Key::new(2, Cipher::Aes, BlockMode::Gcm, &[9u8; 32]).unwrap();
        let env = k1.encrypt(b"secret").unwrap();
        assert!(k2.decrypt(&env[VERSION_FIELD_LEN..]).is_err());
    }

    #[test]
    fn stream_corruption_is_not_detected() {
        let k = key(1, BlockMode::Ctr, 16);
        let mut env = k.encrypt(b"no integrity here").unwrap();
        let last = env.len() - 1;
        env[last] ^= 0xFF;
        let garbled = k.decrypt(&env[VERSION_FIELD_LEN..]).unwrap();
        assert_ne!(garbled, b"no integrity here");
        assert_eq!(garbled.len(), 17);
    }

    #[test]
    fn empty_body_decrypts_to_empty() {
        let k = key(1, BlockMode::Cfb, 16);
        assert!(k.decrypt(&[]).unwrap().is_empty());
    }

    #[test]
    fn short_bodies_are_rejected() {
        let k = key(1, BlockMode::Ofb, 16);
        assert!(matches!(
            k.decrypt(&[0u8; 15]),
            Err(CodecError::InsufficientLength { required: 16, actual: 15 })
        ));

        let g = key(2, BlockMode::Gcm, 16);
        assert!(matches!(
            g.decrypt(&[0u8; 11]),
            Err(CodecError::InsufficientLength { required: 12, actual: 11 })
        ));
        // Long enough for a nonce, too short for a tag.
        assert!(matches!(
            g.decrypt(&[0u8; 20]),
            Err(CodecError::AuthenticationFailed)
        ));
    }

    #[test]
    fn rejects_bad_key_lengths() {
        for len in [0, 15, 17, 31, 33] {
            assert!(matches!(
                Key::new(1, Cipher::Aes, BlockMode::Cfb, &vec![0u8; len]),
                Err(CodecError::InvalidKeyLength(n)) if n == len
            ));
        }
    }

    #[test]
    fn rejects_versions_outside_the_field() {
        assert!(matches!(
            Key::new(u64::MAX, Cipher::Aes, BlockMode::Gcm, &[0u8; 32]),
            Err(CodecError::VersionOutOfRange(_))
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let k = Key::new(1, Cipher::Aes, BlockMode::Cfb, b"sixteen byte key").unwrap();
        let dbg = format!("{k:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("sixteen"));
    }

    // NIST SP 800-38A, AES-128, first block of each mode.
    const NIST_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const NIST_PLAINTEXT: &str = "6bc1bee22e409f96e93d7e117393172a";

    fn nist_decrypt(mode: BlockMode, iv: &str, ciphertext: &str) -> Vec<u8> {
        let k = Key::new(1, Cipher::Aes, mode, &hex::decode(NIST_KEY).unwrap()).unwrap();
        let mut body = hex::decode(iv).unwrap();
        body.extend(hex::decode(ciphertext).unwrap());
        k.decrypt(&body).unwrap()
    }

    #[test]
    fn cfb128_known_answer() {
        let pt = nist_decrypt(
            BlockMode::Cfb,
            "000102030405060708090a0b0c0d0e0f",
            "3b3fd92eb72dad20333449f8e83cfb4a",
        );
        assert_eq!(hex::encode(pt), NIST_PLAINTEXT);
    }

    #[test]
    fn ofb_known_answer() {
        let pt = nist_decrypt(
            BlockMode::Ofb,
            "000102030405060708090a0b0c0d0e0f",
            "3b3fd92eb72dad20333449f8e83cfb4a",
        );
        assert_eq!(hex::encode(pt), NIST_PLAINTEXT);
    }

    #[test]
    fn ctr_known_answer() {
        let pt = nist_decrypt(
            BlockMode::Ctr,
            "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff",
            "874d6191b620e3261bef6864990db6ce",
        );
        assert_eq!(hex::encode(pt), NIST_PLAINTEXT);
    }

    #[test]
    fn gcm_known_answer() {
        // GCM test case 2: zero key, zero nonce, one zero block.
        let k = Key::new(2, Cipher::Aes, BlockMode::Gcm, &[0u8; 16]).unwrap();
        let mut body = vec![0u8; 12];
        body.extend(hex::decode("0388dace60b6a392f328c2b971b2fe78").unwrap());
        body.extend(hex::decode("ab6e47d42cec13bdf53a67b21257bddf").unwrap());
        assert_eq!(k.decrypt(&body).unwrap(), vec![0u8; 16]);
    }
}
