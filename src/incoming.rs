//! Incoming Blob: a staged temp file holding freshly written bytes and the
//! digest computed while writing them.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::algorithm::Algorithm;
use crate::error::Error;
use crate::fs_ops::FsOps;

const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// A transient record of bytes staged under the store's `incoming/`
/// directory: a unique temp filename, the size written, and the final
/// digest. Owns its temp file for its lifetime — adopted via [`mark_moved`]
/// or deleted on drop.
///
/// [`mark_moved`]: IncomingBlob::mark_moved
pub(crate) struct IncomingBlob {
    temp_path: PathBuf,
    size: u64,
    digest: Vec<u8>,
    moved: bool,
}

impl IncomingBlob {
    /// Stream `src` through a digest-and-copy pipeline into a fresh temp file
    /// under `incoming_dir`. Temp names use `counter` to stay unique across
    /// concurrent creations in the same process.
    pub(crate) fn from_reader<R: Read>(
        mut src: R,
        incoming_dir: &Path,
        counter: &AtomicU64,
        algorithm: Algorithm,
        fs: &FsOps,
    ) -> Result<Self, Error> {
        let n = counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = incoming_dir.join(format!("incoming-{n}.tmp"));

        match Self::write_staged(&mut src, &temp_path, algorithm, fs) {
            Ok((size, digest)) => Ok(Self { temp_path, size, digest, moved: false }),
            Err(e) => {
                tracing::warn!(path = %temp_path.display(), error = %e, "failed to stage incoming blob");
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    fn write_staged(
        src: &mut dyn Read,
        temp_path: &Path,
        algorithm: Algorithm,
        fs: &FsOps,
    ) -> Result<(u64, Vec<u8>), Error> {
        let file = fs.open_output(temp_path)?;
        let mut out = BufWriter::new(file);
        let mut hasher = algorithm.hasher();
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = src.read(&mut buf).map_err(Error::IoFailure)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n]).map_err(Error::IoFailure)?;
            total += n as u64;
        }
        out.flush().map_err(Error::IoFailure)?;
        out.into_inner().map_err(|e| Error::IoFailure(e.into_error())).map(|f| f.sync_all())??;

        Ok((total, hasher.finalize()))
    }

    /// Bytes written while staging.
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Final digest computed while staging.
    pub(crate) fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Path of the temp file, for the caller's atomic-move step.
    pub(crate) fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Mark the temp file as adopted: `Drop` will no longer delete it.
    pub(crate) fn mark_moved(&mut self) {
        self.moved = true;
    }
}

impl Drop for IncomingBlob {
    fn drop(&mut self) {
        if !self.moved {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use std::io::Cursor;
    use std::sync::Arc;

    fn fs_ops() -> FsOps {
        FsOps::new(Arc::new(MetricsRegistry::new()))
    }

    #[test]
    fn stages_and_digests_content() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let ops = fs_ops();
        let incoming = IncomingBlob::from_reader(
            Cursor::new(b"This is a test".to_vec()),
            dir.path(),
            &counter,
            Algorithm::Sha256,
            &ops,
        )
        .unwrap();
        assert_eq!(incoming.size(), 14);
        assert_eq!(
            hex::encode(incoming.digest()),
            "c7be1ed902fb8dd4d48997c6452f5d7e509fbcdbe2808b16bcf4edce4c07d14e"
        );
        assert!(incoming.temp_path().exists());
    }

    #[test]
    fn temp_names_are_disjoint_under_one_counter() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let ops = fs_ops();
        let a = IncomingBlob::from_reader(Cursor::new(b"a".to_vec()), dir.path(), &counter, Algorithm::Sha256, &ops).unwrap();
        let b = IncomingBlob::from_reader(Cursor::new(b"b".to_vec()), dir.path(), &counter, Algorithm::Sha256, &ops).unwrap();
        assert_ne!(a.temp_path(), b.temp_path());
    }

    #[test]
    fn drop_without_mark_moved_deletes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let ops = fs_ops();
        let path = {
            let incoming = IncomingBlob::from_reader(
                Cursor::new(b"abandoned".to_vec()),
                dir.path(),
                &counter,
                Algorithm::Sha256,
                &ops,
            )
            .unwrap();
            incoming.temp_path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn mark_moved_prevents_drop_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let ops = fs_ops();
        let mut incoming = IncomingBlob::from_reader(
            Cursor::new(b"adopted".to_vec()),
            dir.path(),
            &counter,
            Algorithm::Sha256,
            &ops,
        )
        .unwrap();
        incoming.mark_moved();
        let path = incoming.temp_path().to_path_buf();
        drop(incoming);
        assert!(path.exists());
        fs::remove_file(path).unwrap();
    }
}
