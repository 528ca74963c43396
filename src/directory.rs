//! Blob Directory: a node in the on-disk hierarchy, and the startup scan
//! that reconciles it.
//!
//! This is the core of the store. Each node lazily lists its own directory
//! once, caches the result, and owns the child nodes it has instantiated.
//! The whole tree lives behind the single structural lock `BlobStore` holds
//! per top-level operation, so plain `&mut self` recursion (no interior
//! mutability) is enough to keep the cache and the filesystem in sync.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::blob::Blob;
use crate::error::Error;
use crate::fs_ops::FsOps;
use crate::hex;
use crate::metrics::MetricsRegistry;
use crate::reference::BlobReference;

/// Everything a directory node needs to act, threaded through the recursion
/// rather than duplicated on every node.
pub(crate) struct DirCtx<'a> {
    pub digest_len: usize,
    pub max_per_dir: usize,
    pub fs: &'a FsOps,
    pub metrics: &'a MetricsRegistry,
}

/// A directory at some prefix depth in the hierarchy.
pub(crate) struct BlobDirectory {
    path: PathBuf,
    prefix: String,
    depth: usize,
    blobs: HashSet<String>,
    subdirs: HashSet<String>,
    children: HashMap<String, BlobDirectory>,
    loaded: bool,
}

impl BlobDirectory {
    pub(crate) fn new(path: PathBuf, prefix: String) -> Self {
        let depth = prefix.len() / 2;
        Self {
            path,
            prefix,
            depth,
            blobs: HashSet::new(),
            subdirs: HashSet::new(),
            children: HashMap::new(),
            loaded: false,
        }
    }

    fn tail_len(&self, ctx: &DirCtx) -> usize {
        2 * (ctx.digest_len - self.depth)
    }

    fn read_dir(&mut self, ctx: &DirCtx) -> Result<(), Error> {
        if self.loaded {
            return Ok(());
        }
        let tail_len = self.tail_len(ctx);
        let mut blobs = HashSet::new();
        let mut subdirs = HashSet::new();
        for entry in ctx.fs.list_dir(&self.path)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(_) => continue,
            };
            if file_type.is_file() {
                if is_blob_filename(&name, &self.prefix, tail_len) {
                    blobs.insert(name);
                }
            } else if file_type.is_dir() && hex::is_subdir_name(&name) {
                subdirs.insert(name);
            }
        }
        self.blobs = blobs;
        self.subdirs = subdirs;
        self.loaded = true;
        Ok(())
    }

    fn is_full(&self, ctx: &DirCtx) -> bool {
        self.blobs.len() >= ctx.max_per_dir
    }

    fn blob_basename(reference: &BlobReference) -> String {
        format!("{}.blob", reference.id())
    }

    /// The next path element to descend into for `reference`, or `None` if
    /// this node is already at the maximum possible depth (it holds at most
    /// one blob and so is never actually full before that blob exists).
    fn descend_name(&self, reference: &BlobReference, ctx: &DirCtx) -> Option<String> {
        if self.depth >= ctx.digest_len {
            return None;
        }
        Some(hex::encode(&reference.digest()[self.depth..=self.depth]))
    }

    fn child_path_and_prefix(&self, name: &str) -> (PathBuf, String) {
        (self.path.join(name), format!("{}{}", self.prefix, name))
    }

    /// Get or create (on disk and in the child map) the node for `name`,
    /// used by the `add` path when a vacancy requires descent.
    fn child_for_add(&mut self, name: &str, ctx: &DirCtx) -> Result<&mut BlobDirectory, Error> {
        if !self.subdirs.contains(name) {
            let (child_path, _) = self.child_path_and_prefix(name);
            ctx.fs.create_dir_all(&child_path)?;
            self.subdirs.insert(name.to_string());
        }
        Ok(self.existing_child(name).expect("just ensured subdir exists"))
    }

    /// Get the node for `name` if the subdirectory is known to exist;
    /// instantiates a fresh (unloaded) node on first access.
    fn existing_child(&mut self, name: &str) -> Option<&mut BlobDirectory> {
        if !self.subdirs.contains(name) {
            return None;
        }
        if !self.children.contains_key(name) {
            let (child_path, child_prefix) = self.child_path_and_prefix(name);
            self.children.insert(name.to_string(), BlobDirectory::new(child_path, child_prefix));
        }
        self.children.get_mut(name)
    }

    /// Place `reference` at the shallowest non-full directory, adopting
    /// `incoming`'s temp file. Idempotent: a pre-existing blob at this level
    /// short-circuits with a handle to it, dropping `incoming`.
    pub(crate) fn add(
        &mut self,
        reference: &BlobReference,
        mut incoming: crate::incoming::IncomingBlob,
        ctx: &DirCtx,
    ) -> Result<Blob, Error> {
        self.read_dir(ctx)?;
        let basename = Self::blob_basename(reference);
        let path = self.path.join(&basename);

        if self.blobs.contains(&basename) {
            let size = ctx.fs.size_of(&path)?;
            return Ok(Blob::new(reference.id(), size, path));
        }

        if !self.is_full(ctx) {
            ctx.fs.atomic_move(incoming.temp_path(), &path)?;
            incoming.mark_moved();
            self.blobs.insert(basename);
            ctx.metrics.inc("blobCount");
            // Spec §9: the authoritative byte count comes from a post-move
            // stat, to survive any storage anomaly between staging and move.
            let size = ctx.fs.size_of(&path).unwrap_or_else(|_| incoming.size());
            ctx.metrics.inc_by("byteCount", size as i64);
            let blob = Blob::new(reference.id(), size, path);

            // Promotion-induced cleanup: a vacancy here may have let this
            // blob rise above a deeper duplicate left by an earlier fill.
            if let Some(child_name) = self.descend_name(reference, ctx) {
                if let Some(child) = self.existing_child(&child_name) {
                    if let Err(e) = child.delete(reference, ctx) {
                        tracing::warn!(id = %reference.id(), error = %e, "promotion cleanup failed");
                    }
                }
            }
            return Ok(blob);
        }

        // A node can only be full here if it already holds the one blob a
        // max-depth leaf can ever hold, in which case the contains() check
        // above already returned — so descent is always possible.
        let child_name = self
            .descend_name(reference, ctx)
            .expect("a full directory below max depth always has a child to descend into");
        let child = self.child_for_add(&child_name, ctx)?;
        child.add(reference, incoming, ctx)
    }

    /// Look up `reference`, recursing into a child only if it already
    /// exists on disk.
    pub(crate) fn get(&mut self, reference: &BlobReference, ctx: &DirCtx) -> Result<Option<Blob>, Error> {
        self.read_dir(ctx)?;
        let basename = Self::blob_basename(reference);
        let path = self.path.join(&basename);
        if self.blobs.contains(&basename) {
            let size = ctx.fs.size_of(&path)?;
            return Ok(Some(Blob::new(reference.id(), size, path)));
        }
        match self.descend_name(reference, ctx).and_then(|name| self.existing_child(&name)) {
            Some(child) => child.get(reference, ctx),
            None => Ok(None),
        }
    }

    /// Delete `reference` from this node or any descendant. Returns whether
    /// any copy was actually removed. Prunes this directory (I4) if it
    /// becomes empty and is not the root.
    pub(crate) fn delete(&mut self, reference: &BlobReference, ctx: &DirCtx) -> Result<bool, Error> {
        self.read_dir(ctx)?;
        let basename = Self::blob_basename(reference);
        let path = self.path.join(&basename);

        let mut removed_here = false;
        if self.blobs.contains(&basename) {
            let size = match ctx.fs.size_of(&path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "stat failed before delete; byteCount may drift");
                    0
                }
            };
            ctx.fs.delete_if_exists(&path)?;
            self.blobs.remove(&basename);
            ctx.metrics.dec("blobCount");
            ctx.metrics.dec_by("byteCount", size as i64);
            removed_here = true;
        }

        let child_name = self.descend_name(reference, ctx);
        let removed_in_child = if let Some(child_name) = child_name.filter(|n| self.subdirs.contains(n)) {
            let child_removed = self
                .existing_child(&child_name)
                .expect("subdirs says it exists")
                .delete(reference, ctx)?;
            if child_removed {
                let (child_path, _) = self.child_path_and_prefix(&child_name);
                if !ctx.fs.exists(&child_path) {
                    self.subdirs.remove(&child_name);
                    self.children.remove(&child_name);
                }
            }
            child_removed
        } else {
            false
        };

        // A child's recursive prune can empty this directory even when the
        // deleted blob never lived here directly, so the check must run
        // unconditionally, not only on the local-removal branch.
        if self.depth > 0 {
            self.prune_if_empty(ctx)?;
        }

        Ok(removed_here || removed_in_child)
    }

    fn prune_if_empty(&mut self, ctx: &DirCtx) -> Result<(), Error> {
        if self.blobs.is_empty() && self.subdirs.is_empty() && ctx.fs.remove_dir_if_empty(&self.path)? {
            tracing::debug!(path = %self.path.display(), "pruned empty directory");
        }
        Ok(())
    }
}

fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

/// Whether `name` matches `^PREFIX[0-9a-f]{tail_len}\.blob$`.
fn is_blob_filename(name: &str, prefix: &str, tail_len: usize) -> bool {
    let expected_len = prefix.len() + tail_len + ".blob".len();
    if name.len() != expected_len || !name.ends_with(".blob") {
        return false;
    }
    let stem = &name[..name.len() - ".blob".len()];
    if !stem.starts_with(prefix) {
        return false;
    }
    let tail = &stem[prefix.len()..];
    tail.len() == tail_len && tail.bytes().all(is_lower_hex)
}

/// The startup scan (`spec.md` §4.2.1): rebuilds `blobCount`/`byteCount` from
/// disk, deletes any I2-violating deeper duplicates, and prunes empty
/// non-root directories uncovered along the way. Runs once, depth-first,
/// directly against the filesystem — independent of any `BlobDirectory`
/// instance, since its whole point is to make stale node caches irrelevant.
pub(crate) fn deep_scan_and_dedupe(
    root: &std::path::Path,
    digest_len: usize,
    fs: &FsOps,
    metrics: &MetricsRegistry,
) -> Result<(), Error> {
    metrics.set("blobCount", 0);
    metrics.set("byteCount", 0);
    let seen = ChainedSet::Root;
    scan_node(root, "", 0, digest_len, &seen, fs, metrics)?;
    Ok(())
}

/// A set that only needs to answer "present here or in an ancestor" and
/// "insert into this layer" — never iterated, never copied into children.
/// Implemented as a linked list of per-level sets with a custom `contains`
/// walk, giving O(total blobs) scan time overall.
enum ChainedSet<'a> {
    Root,
    Node { parent: &'a ChainedSet<'a>, local: std::cell::RefCell<HashSet<Vec<u8>>> },
}

impl<'a> ChainedSet<'a> {
    fn child(&'a self) -> ChainedSet<'a> {
        ChainedSet::Node { parent: self, local: std::cell::RefCell::new(HashSet::new()) }
    }

    fn contains(&self, key: &[u8]) -> bool {
        match self {
            ChainedSet::Root => false,
            ChainedSet::Node { parent, local } => local.borrow().contains(key) || parent.contains(key),
        }
    }

    fn insert(&self, key: Vec<u8>) {
        if let ChainedSet::Node { local, .. } = self {
            local.borrow_mut().insert(key);
        }
    }
}

fn scan_node(
    path: &std::path::Path,
    prefix: &str,
    depth: usize,
    digest_len: usize,
    seen: &ChainedSet,
    fs: &FsOps,
    metrics: &MetricsRegistry,
) -> Result<(), Error> {
    let tail_len = 2 * (digest_len - depth);
    let local = seen.child();
    let mut subdir_names = Vec::new();

    for entry in fs.list_dir(path)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(_) => continue,
        };
        if file_type.is_file() {
            if !is_blob_filename(&name, prefix, tail_len) {
                continue;
            }
            let stem = &name[..name.len() - ".blob".len()];
            let full_hex = stem; // prefix + tail, exactly 2*digest_len chars
            let digest = match hex::decode_strict(full_hex, digest_len) {
                Ok(d) => d,
                Err(_) => continue,
            };
            let entry_path = path.join(&name);
            if local.contains(&digest) {
                tracing::warn!(path = %entry_path.display(), "deleting deeper duplicate found during scan");
                fs.delete_if_exists(&entry_path)?;
                continue;
            }
            local.insert(digest);
            let size = fs.size_of(&entry_path)?;
            metrics.inc("blobCount");
            metrics.inc_by("byteCount", size as i64);
        } else if file_type.is_dir() && hex::is_subdir_name(&name) {
            subdir_names.push(name);
        }
    }

    for name in &subdir_names {
        let child_prefix = format!("{prefix}{name}");
        scan_node(&path.join(name), &child_prefix, depth + 1, digest_len, &local, fs, metrics)?;
    }

    if depth > 0 {
        let removed = fs.remove_dir_if_empty(path)?;
        if removed {
            tracing::debug!(path = %path.display(), "pruned empty directory during scan");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_filename_validator() {
        assert!(is_blob_filename(&format!("{}.blob", "ab".repeat(16)), "", 32));
        assert!(!is_blob_filename(&format!("{}.BLOB", "ab".repeat(16)), "", 32));
        assert!(!is_blob_filename(&format!("{}.blob", "AB".repeat(16)), "", 32));
        assert!(!is_blob_filename("short.blob", "", 32));
        assert!(!is_blob_filename(&format!("{}.blob", "ab".repeat(16)), "cd", 32));
        assert!(is_blob_filename(&format!("cd{}.blob", "ab".repeat(15)), "cd", 30));
        assert!(!is_blob_filename(&format!("{}blob", "ab".repeat(16)), "", 32));
    }
}
