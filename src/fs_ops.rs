//! Thin wrappers over platform file operations.
//!
//! Each operation increments a named counter in the `MetricsRegistry` so the
//! store's I/O volume is observable without instrumenting every call site.

use std::fs::{self, DirEntry, File};
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::metrics::MetricsRegistry;

/// Filesystem helper layer shared by every `BlobDirectory` node and the
/// staging pipeline.
pub struct FsOps {
    metrics: Arc<MetricsRegistry>,
}

impl FsOps {
    /// Build a new helper writing counters into `metrics`.
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }

    /// Whether `path` exists (file or directory).
    pub fn exists(&self, path: &Path) -> bool {
        self.metrics.inc("fs.exists");
        path.exists()
    }

    /// Whether `path` exists and is a directory.
    pub fn is_directory(&self, path: &Path) -> bool {
        self.metrics.inc("fs.isDirectory");
        path.is_dir()
    }

    /// Create `path` and any missing ancestors.
    pub fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
        self.metrics.inc("fs.createDirectories");
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// Ensure `path` exists as a directory; fail if it exists as something
    /// else.
    pub fn ensure_directory(&self, path: &Path) -> Result<(), Error> {
        self.create_dir_all(path)?;
        if !self.is_directory(path) {
            return Err(Error::IoFailure(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} exists but is not a directory", path.display()),
            )));
        }
        Ok(())
    }

    /// List the immediate entries of a directory.
    pub fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, Error> {
        self.metrics.inc("fs.list");
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            out.push(entry?);
        }
        Ok(out)
    }

    /// Atomically move `from` to `to`. Both paths must live on the same
    /// filesystem (guaranteed here: `incoming/` is a child of the store
    /// root).
    pub fn atomic_move(&self, from: &Path, to: &Path) -> Result<(), Error> {
        self.metrics.inc("fs.atomicMove");
        fs::rename(from, to)?;
        Ok(())
    }

    /// Delete `path` if it exists; no-op (returns `false`) if it does not.
    pub fn delete_if_exists(&self, path: &Path) -> Result<bool, Error> {
        self.metrics.inc("fs.deleteIfExists");
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::IoFailure(e)),
        }
    }

    /// Recursively delete a directory tree. No-op if it does not exist.
    pub fn delete_recursive(&self, path: &Path) -> Result<(), Error> {
        self.metrics.inc("fs.deleteRecursive");
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::IoFailure(e)),
        }
    }

    /// Remove `path` if it is an empty directory. Returns whether it was
    /// removed.
    pub fn remove_dir_if_empty(&self, path: &Path) -> Result<bool, Error> {
        self.metrics.inc("fs.removeDirIfEmpty");
        match fs::remove_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            // A non-empty directory surfaces as `ErrorKind::Other` on most
            // platforms; treat any such failure as "left alone".
            Err(e) if e.raw_os_error() == Some(libc_enotempty()) => Ok(false),
            Err(e) => Err(Error::IoFailure(e)),
        }
    }

    /// Open `path` for writing, creating it (failing if it already exists).
    pub fn open_output(&self, path: &Path) -> Result<File, Error> {
        self.metrics.inc("fs.openOutput");
        Ok(fs::OpenOptions::new().write(true).create_new(true).open(path)?)
    }

    /// Size in bytes of the file at `path`.
    pub fn size_of(&self, path: &Path) -> Result<u64, Error> {
        self.metrics.inc("fs.size");
        Ok(fs::metadata(path)?.len())
    }
}

/// `ENOTEMPTY`'s numeric value on the platforms this crate targets (Linux
/// and macOS share it; Windows reports a different code, handled separately
/// by this returning a value `raw_os_error()` will never match there).
#[cfg(unix)]
fn libc_enotempty() -> i32 {
    39
}

#[cfg(not(unix))]
fn libc_enotempty() -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ops() -> FsOps {
        FsOps::new(Arc::new(MetricsRegistry::new()))
    }

    #[test]
    fn create_and_list_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops();
        let sub = dir.path().join("a").join("b");
        ops.create_dir_all(&sub).unwrap();
        assert!(ops.is_directory(&sub));
        File::create(sub.join("f.blob")).unwrap();
        let entries = ops.list_dir(&sub).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn atomic_move_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops();
        let src = dir.path().join("src.tmp");
        let dst = dir.path().join("dst.blob");
        fs::write(&src, b"hello").unwrap();
        ops.atomic_move(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(ops.size_of(&dst).unwrap(), 5);
        assert!(ops.delete_if_exists(&dst).unwrap());
        assert!(!ops.delete_if_exists(&dst).unwrap());
    }

    #[test]
    fn remove_dir_if_empty_respects_contents() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops();
        let sub = dir.path().join("d");
        ops.create_dir_all(&sub).unwrap();
        File::create(sub.join("x.blob")).unwrap();
        assert!(!ops.remove_dir_if_empty(&sub).unwrap());
        fs::remove_file(sub.join("x.blob")).unwrap();
        assert!(ops.remove_dir_if_empty(&sub).unwrap());
        assert!(!sub.exists());
    }

    #[test]
    fn ensure_directory_rejects_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops();
        let path = dir.path().join("not_a_dir");
        File::create(&path).unwrap();
        assert!(ops.ensure_directory(&path).is_err());
    }
}
