//! Blob Reference: a validated, fixed-length digest value.

use crate::error::Error;
use crate::hex;

/// A validated identifier for a blob: exactly `D` raw bytes, equivalently a
/// lowercase hex string of exactly `2D` characters. `D` is fixed by the store
/// that constructed it; references from one store are not portable to
/// another configured with a different algorithm.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BlobReference {
    digest: Vec<u8>,
}

impl BlobReference {
    /// Parse a hex string into a reference, validating it is exactly
    /// `2 * digest_len` lowercase-or-uppercase hex characters.
    pub fn from_hex(s: &str, digest_len: usize) -> Result<Self, Error> {
        let digest = hex::decode_strict(s, digest_len)?;
        Ok(Self { digest })
    }

    /// Build a reference directly from raw digest bytes, validating length.
    pub fn from_bytes(bytes: &[u8], digest_len: usize) -> Result<Self, Error> {
        if bytes.len() != digest_len {
            return Err(Error::BadIdentifier(format!(
                "expected {digest_len} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self { digest: bytes.to_vec() })
    }

    /// Lowercase hex form of this reference.
    pub fn id(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Raw digest bytes.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}
