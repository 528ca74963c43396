//! Content-addressable, disk-backed blob store.
//!
//! Blobs are identified by the digest of their bytes under a configured
//! algorithm (MD5, SHA-1, or SHA-256). The store keeps exactly one copy of
//! any given content, laid out in a self-balancing, variable-depth directory
//! hierarchy keyed by the hex prefix of each blob's digest: a directory
//! descends one level only once it has filled up, so small stores stay
//! shallow and large ones never pay an unbounded per-directory listing cost.
//!
//! ```rust
//! use blob_store::BlobStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = BlobStore::open_default(dir.path(), "sha256").unwrap();
//!
//! let blob = store.add(b"hello world").unwrap();
//! assert!(store.get(blob.id()).unwrap().is_some());
//!
//! let mut buf = Vec::new();
//! std::io::Read::read_to_end(&mut blob.open().unwrap(), &mut buf).unwrap();
//! assert_eq!(buf, b"hello world");
//! ```

#![warn(missing_docs)]

mod algorithm;
mod blob;
mod directory;
mod error;
mod fs_ops;
mod hex;
mod incoming;
mod metrics;
mod reference;
mod store;

pub use algorithm::Algorithm;
pub use blob::Blob;
pub use error::Error;
pub use metrics::MetricsRegistry;
pub use reference::BlobReference;
pub use store::{BlobStore, BlobStoreConfig, DEFAULT_MAX_PER_DIR};
