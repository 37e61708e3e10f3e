//! The fixed 8-byte version field at the head of every envelope.
//!
//! The version is written as an unsigned LEB128 varint, left-justified, with
//! the unused trailing bytes left zero. The field is always 8 bytes wide no
//! matter how short the varint is; envelope length arithmetic depends on it.

use super::cipher::CodecError;

/// Width of the version field.
pub const VERSION_FIELD_LEN: usize = 8;

/// Largest version that fits in the field (8 × 7 payload bits).
pub const MAX_VERSION: u64 = (1 << 56) - 1;

/// Encode `version` into the fixed-width field.
///
/// # Errors
///
/// Returns [`CodecError::VersionOutOfRange`] if `version` exceeds [`MAX_VERSION`].
pub fn write_version(version: u64) -> Result<[u8; VERSION_FIELD_LEN], CodecError> {
    if version > MAX_VERSION {
        return Err(CodecError::VersionOutOfRange(version));
    }
    let mut field = [0u8; VERSION_FIELD_LEN];
    let mut v = version;
    let mut i = 0;
    while v >= 0x80 {
        field[i] = (v as u8) | 0x80;
        v >>= 7;
        i += 1;
    }
    field[i] = v as u8;
    Ok(field)
}

/// Decode the version from the head of an envelope.
///
/// Only the first [`VERSION_FIELD_LEN`] bytes are consulted.
///
/// # Errors
///
/// Returns [`CodecError::MalformedVersion`] if no terminating byte appears
/// inside the field.
pub fn read_version(envelope: &[u8]) -> Result<u64, CodecError> {
    let field = &envelope[..envelope.len().min(VERSION_FIELD_LEN)];
    let mut version = 0u64;
    for (i, &b) in field.iter().enumerate() {
        version |= u64::from(b & 0x7f) << (7 * i);
        if b < 0x80 {
            return Ok(version);
        }
    }
    Err(CodecError::MalformedVersion)
}
