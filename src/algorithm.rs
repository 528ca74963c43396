//! Digest algorithm selection.
//!
//! The store treats the hash function itself as a black box (`spec.md` §1):
//! all this module needs from `md5`/`sha1`/`sha2` is that each implements the
//! shared `digest::Digest` trait, so the staging pipeline in `incoming.rs` can
//! be written once and reused across algorithms.

use digest::Digest as _;

use crate::error::Error;

/// A digest algorithm recognized by the store, with its fixed output length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Algorithm {
    /// MD5, 16-byte digest.
    Md5,
    /// SHA-1, 20-byte digest.
    Sha1,
    /// SHA-256, 32-byte digest.
    Sha256,
}

impl Algorithm {
    /// Resolve an algorithm by its lowercase name, or `Error::UnknownAlgorithm`.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }

    /// Digest length in bytes (`D`).
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Start a fresh streaming hasher for this algorithm.
    pub(crate) fn hasher(self) -> StreamingHasher {
        match self {
            Self::Md5 => StreamingHasher::Md5(md5::Md5::new()),
            Self::Sha1 => StreamingHasher::Sha1(sha1::Sha1::new()),
            Self::Sha256 => StreamingHasher::Sha256(sha2::Sha256::new()),
        }
    }
}

/// A type-erased streaming hasher over one of the supported algorithms.
pub(crate) enum StreamingHasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
}

impl StreamingHasher {
    pub(crate) fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Md5(h) => h.update(bytes),
            Self::Sha1(h) => h.update(bytes),
            Self::Sha256(h) => h.update(bytes),
        }
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        match self {
            Self::Md5(h) => h.finalize().to_vec(),
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        assert_eq!(Algorithm::from_name("md5").unwrap().digest_len(), 16);
        assert_eq!(Algorithm::from_name("sha1").unwrap().digest_len(), 20);
        assert_eq!(Algorithm::from_name("sha256").unwrap().digest_len(), 32);
    }

    #[test]
    fn rejects_unknown_name() {
        assert!(matches!(Algorithm::from_name("sha3"), Err(Error::UnknownAlgorithm(_))));
    }

    #[test]
    fn sha256_matches_known_vector() {
        let mut h = Algorithm::Sha256.hasher();
        h.update(b"This is a test");
        let digest = h.finalize();
        assert_eq!(
            hex::encode(digest),
            "c7be1ed902fb8dd4d48997c6452f5d7e509fbcdbe2808b16bcf4edce4c07d14e"
        );
    }
}
