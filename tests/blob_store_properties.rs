//! Boundary and round-trip properties for identifier parsing, independent
//! of any on-disk state.

use blob_store::{BlobReference, BlobStore, Error};
use proptest::prelude::*;

#[test]
fn reference_parsing_rejects_enumerated_boundaries() {
    assert!(BlobReference::from_hex("", 32).is_err());
    assert!(BlobReference::from_hex(&"a".repeat(63), 32).is_err());
    assert!(BlobReference::from_hex(&"a".repeat(65), 32).is_err());
    assert!(BlobReference::from_hex(&"g".repeat(64), 32).is_err());
    assert!(BlobReference::from_hex(&format!(" {}", "a".repeat(63)), 32).is_err());
}

#[test]
fn reference_parsing_accepts_and_normalizes_uppercase() {
    let lower = BlobReference::from_hex(&"ab".repeat(16), 16).unwrap();
    let upper = BlobReference::from_hex(&"AB".repeat(16), 16).unwrap();
    assert_eq!(lower, upper);
    assert_eq!(upper.id(), "ab".repeat(16));
}

#[test]
fn store_rejects_bad_identifiers_at_the_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlobStore::open_default(dir.path(), "sha256").unwrap();

    assert!(matches!(store.get(""), Err(Error::BadIdentifier(_))));
    assert!(matches!(store.get("not-hex-at-all"), Err(Error::BadIdentifier(_))));
    assert!(matches!(store.get(&"a".repeat(63)), Err(Error::BadIdentifier(_))));
    assert!(matches!(store.delete(&"a".repeat(63)), Err(Error::BadIdentifier(_))));
}

proptest! {
    #[test]
    fn hex_roundtrip_is_length_preserving(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let reference = BlobReference::from_bytes(&bytes, bytes.len()).unwrap();
        let round_tripped = BlobReference::from_hex(&reference.id(), bytes.len()).unwrap();
        prop_assert_eq!(reference, round_tripped);
    }

    #[test]
    fn arbitrary_strings_never_panic_reference_parsing(s in ".*") {
        // Must never panic, regardless of outcome.
        let _ = BlobReference::from_hex(&s, 32);
    }

    #[test]
    fn arbitrary_strings_never_panic_store_lookup(s in ".*") {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open_default(dir.path(), "sha256").unwrap();
        let _ = store.get(&s);
        let _ = store.delete(&s);
    }
}
