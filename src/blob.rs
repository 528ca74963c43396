//! Blob handle: a lightweight pointer to content that existed at the time it
//! was returned.

use std::fs::File;
use std::path::PathBuf;

use crate::error::Error;

/// A handle to a stored blob. Holds only a path and a size cached at
/// creation time — it does not own its backing file and may outlive it; a
/// handle returned before a concurrent delete may have its [`open`] call
/// fail afterward.
///
/// [`open`]: Blob::open
#[derive(Clone, Debug)]
pub struct Blob {
    id: String,
    size: u64,
    path: PathBuf,
}

impl Blob {
    pub(crate) fn new(id: String, size: u64, path: PathBuf) -> Self {
        Self { id, size, path }
    }

    /// Lowercase hex identifier of this blob.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Size in bytes, cached at handle creation.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open a fresh input stream over this blob's content.
    pub fn open(&self) -> Result<File, Error> {
        Ok(File::open(&self.path)?)
    }
}
