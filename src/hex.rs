//! Strict lowercase hex encode/decode with length validation.
//!
//! Unlike the general-purpose `hex` crate's `decode`, `decode_strict` rejects
//! anything but `[0-9a-f]` of exactly the expected length — no uppercase, no
//! surrounding whitespace, no short/long reads.

use crate::error::Error;

fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

/// Encode bytes as a lowercase hex string.
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode `s` into exactly `expected_len` bytes, accepting uppercase input but
/// rejecting any other deviation (wrong length, non-hex characters,
/// whitespace).
pub fn decode_strict(s: &str, expected_len: usize) -> Result<Vec<u8>, Error> {
    if s.len() != expected_len * 2 {
        return Err(Error::BadIdentifier(s.to_string()));
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::BadIdentifier(s.to_string()));
    }
    let lower = s.to_ascii_lowercase();
    let mut out = vec![0u8; expected_len];
    hex::decode_to_slice(&lower, &mut out).map_err(|_| Error::BadIdentifier(s.to_string()))?;
    Ok(out)
}

/// Whether `name` is exactly two lowercase hex digits (a subdirectory name).
pub fn is_subdir_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 2 && bytes.iter().all(|&b| is_lower_hex(b))
}

/// Whether `tail` (the portion of a blob filename past its directory's
/// prefix) is exactly `len` lowercase hex characters.
pub fn is_lower_hex_run(tail: &str, len: usize) -> bool {
    let bytes = tail.as_bytes();
    bytes.len() == len && bytes.iter().all(|&b| is_lower_hex(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let bytes = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let s = encode(&bytes);
        assert_eq!(s, "deadbeef");
        assert_eq!(decode_strict(&s, 4).unwrap(), bytes);
    }

    #[test]
    fn accepts_and_normalizes_uppercase() {
        assert_eq!(decode_strict("DEADBEEF", 4).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(decode_strict("dead", 4).is_err());
        assert!(decode_strict("deadbeefaa", 4).is_err());
        assert!(decode_strict("", 4).is_err());
    }

    #[test]
    fn rejects_non_hex_and_whitespace() {
        assert!(decode_strict("deadbeeg", 4).is_err());
        assert!(decode_strict(" eadbeef", 4).is_err());
        assert!(decode_strict("deadbeef ", 4).is_err());
    }

    #[test]
    fn subdir_name_validation() {
        assert!(is_subdir_name("ab"));
        assert!(!is_subdir_name("a"));
        assert!(!is_subdir_name("abc"));
        assert!(!is_subdir_name("AB"));
        assert!(!is_subdir_name("zz"));
        assert!(!is_subdir_name("a "));
    }
}
