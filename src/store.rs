//! Blob Store: the root of the hierarchy and the crate's public API.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::algorithm::Algorithm;
use crate::blob::Blob;
use crate::directory::{deep_scan_and_dedupe, BlobDirectory, DirCtx};
use crate::error::Error;
use crate::fs_ops::FsOps;
use crate::incoming::IncomingBlob;
use crate::metrics::MetricsRegistry;
use crate::reference::BlobReference;

/// Default blob-file capacity per directory level: 256 possible subdirs +
/// 254 blob files + the two dot-entries sum to 512, an empirically good
/// balance between tree depth and per-directory read cost.
pub const DEFAULT_MAX_PER_DIR: usize = 254;

/// Construction parameters for a [`BlobStore`], mirroring this codebase's
/// usual `Config` struct with a convenience constructor for the common case.
#[derive(Clone, Debug)]
pub struct BlobStoreConfig {
    /// Root directory for the store. `root/blobs` and `root/incoming` are
    /// created beneath it.
    pub root: PathBuf,
    /// Name of the digest algorithm: `"md5"`, `"sha1"`, or `"sha256"`.
    pub algorithm: String,
    /// Maximum blob files per directory level before descending.
    pub max_per_dir: usize,
}

impl BlobStoreConfig {
    /// Config with the default `max_per_dir` (254).
    pub fn with_root(root: PathBuf, algorithm: impl Into<String>) -> Self {
        Self { root, algorithm: algorithm.into(), max_per_dir: DEFAULT_MAX_PER_DIR }
    }
}

/// The content-addressable blob store: owns the root directory, the staging
/// directory, the metrics registry, and the structural lock serializing
/// every `add`/`get`/`delete`.
pub struct BlobStore {
    incoming_dir: PathBuf,
    digest_len: usize,
    max_per_dir: usize,
    algorithm: Algorithm,
    fs: FsOps,
    metrics: Arc<MetricsRegistry>,
    incoming_counter: AtomicU64,
    root: Mutex<BlobDirectory>,
    closed: AtomicBool,
}

impl BlobStore {
    /// Open (or create) a store at `path` using the named digest algorithm.
    pub fn open(path: impl AsRef<Path>, algorithm: &str, max_per_dir: usize) -> Result<Self, Error> {
        Self::with_config(BlobStoreConfig {
            root: path.as_ref().to_path_buf(),
            algorithm: algorithm.to_string(),
            max_per_dir,
        })
    }

    /// Open (or create) a store at `path` using the named digest algorithm
    /// and the default `max_per_dir` (254).
    pub fn open_default(path: impl AsRef<Path>, algorithm: &str) -> Result<Self, Error> {
        Self::with_config(BlobStoreConfig::with_root(path.as_ref().to_path_buf(), algorithm))
    }

    /// Open (or create) a store from an explicit [`BlobStoreConfig`].
    pub fn with_config(config: BlobStoreConfig) -> Result<Self, Error> {
        if config.max_per_dir < 1 {
            return Err(Error::InvalidArgument("max_per_dir must be >= 1".to_string()));
        }
        let algorithm = Algorithm::from_name(&config.algorithm)?;
        let digest_len = algorithm.digest_len();

        let metrics = Arc::new(MetricsRegistry::new());
        let fs = FsOps::new(metrics.clone());

        fs.ensure_directory(&config.root)?;
        let blobs_dir = config.root.join("blobs");
        let incoming_dir = config.root.join("incoming");
        fs.ensure_directory(&blobs_dir)?;
        fs.ensure_directory(&incoming_dir)?;

        deep_scan_and_dedupe(&blobs_dir, digest_len, &fs, &metrics)?;

        let root = BlobDirectory::new(blobs_dir, String::new());

        Ok(Self {
            incoming_dir,
            digest_len,
            max_per_dir: config.max_per_dir,
            algorithm,
            fs,
            metrics,
            incoming_counter: AtomicU64::new(0),
            root: Mutex::new(root),
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::StoreClosed)
        } else {
            Ok(())
        }
    }

    fn ctx(&self) -> DirCtx<'_> {
        DirCtx { digest_len: self.digest_len, max_per_dir: self.max_per_dir, fs: &self.fs, metrics: &self.metrics }
    }

    fn parse_id(&self, id: &str) -> Result<BlobReference, Error> {
        BlobReference::from_hex(id, self.digest_len)
    }

    /// Store `bytes`, returning a handle to the (possibly pre-existing)
    /// blob. Idempotent: repeated calls with identical content return
    /// handles to the same on-disk file.
    pub fn add(&self, bytes: &[u8]) -> Result<Blob, Error> {
        self.add_reader(Cursor::new(bytes))
    }

    /// Store the contents of the file at `path`.
    pub fn add_path(&self, path: impl AsRef<Path>) -> Result<Blob, Error> {
        self.add_reader(File::open(path)?)
    }

    /// Store the bytes read from `reader`. The read-and-digest pass runs
    /// outside the store's structural lock; only the final placement is
    /// serialized.
    pub fn add_reader<R: Read>(&self, reader: R) -> Result<Blob, Error> {
        self.check_open()?;
        let incoming =
            IncomingBlob::from_reader(reader, &self.incoming_dir, &self.incoming_counter, self.algorithm, &self.fs)?;
        let reference = BlobReference::from_bytes(incoming.digest(), self.digest_len)?;

        let mut root = self.root.lock().unwrap();
        root.add(&reference, incoming, &self.ctx())
    }

    /// Look up a blob by its hex identifier.
    pub fn get(&self, id: &str) -> Result<Option<Blob>, Error> {
        self.check_open()?;
        let reference = self.parse_id(id)?;
        let mut root = self.root.lock().unwrap();
        root.get(&reference, &self.ctx())
    }

    /// Delete a blob by its hex identifier. Returns whether anything was
    /// actually removed.
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        self.check_open()?;
        let reference = self.parse_id(id)?;
        let mut root = self.root.lock().unwrap();
        root.delete(&reference, &self.ctx())
    }

    /// Number of distinct blobs currently visible through `get`.
    pub fn blob_count(&self) -> i64 {
        self.metrics.get("blobCount")
    }

    /// Sum of the sizes of all blobs currently visible through `get`.
    pub fn byte_count(&self) -> i64 {
        self.metrics.get("byteCount")
    }

    /// Access to the in-process metrics registry (observability only; see
    /// `spec.md` §4.5 — not part of on-disk state).
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Clean shutdown: recursively deletes `incoming/`. Idempotent; after
    /// the first call, every operation but a second `close` fails with
    /// `Error::StoreClosed`.
    pub fn close(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match self.fs.delete_recursive(&self.incoming_dir) {
            Ok(()) => {
                tracing::info!(path = %self.incoming_dir.display(), "closed blob store");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %self.incoming_dir.display(), error = %e, "failed to clean incoming directory on close");
                Err(e)
            }
        }
    }
}

impl Drop for BlobStore {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            let _ = self.close();
        }
    }
}
