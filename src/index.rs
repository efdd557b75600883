//! Tree indexing: bucket every file under a root by size or by digest.
//!
//! # Overview
//!
//! A [`TreeIndex`] maps a key (byte size or content digest) to the files
//! sharing it. Buckets remember the order in which their key was first seen,
//! and files inside a bucket keep discovery order, so a given tree always
//! produces the same index.
//!
//! Hashing runs on a bounded rayon pool. Workers only compute digests;
//! results are collected in input order and inserted by the calling thread.
//!
//! # Example
//!
//! ```no_run
//! use dupdiff::index::TreeIndexer;
//! use dupdiff::scanner::{HashMode, Hasher};
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! let indexer = TreeIndexer::new(Arc::new(Hasher::new()));
//! let index = indexer.index(Path::new("."), HashMode::Full).unwrap();
//! println!("{} files, {} distinct digests", index.total_files, index.len());
//! ```

use std::collections::HashMap;
use std::hash::Hash as StdHash;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::progress::ProgressCallback;
use crate::scanner::{FileEntry, Hash, HashError, HashMode, Hasher, ScanError, Walker, WalkerConfig};

/// Files bucketed by a shared key.
#[derive(Debug, Clone)]
pub struct TreeIndex<K> {
    buckets: HashMap<K, Vec<FileEntry>>,
    order: Vec<K>,
    /// Number of files discovered, including those that failed to index
    pub total_files: usize,
    /// Files that were discovered but could not be keyed
    pub errors: Vec<ScanError>,
    /// Whether indexing stopped early because shutdown was requested
    pub interrupted: bool,
}

impl<K> Default for TreeIndex<K> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            order: Vec::new(),
            total_files: 0,
            errors: Vec::new(),
            interrupted: false,
        }
    }
}

impl<K: StdHash + Eq + Clone> TreeIndex<K> {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file to the bucket for `key`.
    pub fn insert(&mut self, key: K, file: FileEntry) {
        match self.buckets.get_mut(&key) {
            Some(bucket) => bucket.push(file),
            None => {
                self.order.push(key.clone());
                self.buckets.insert(key, vec![file]);
            }
        }
    }

    /// Files sharing `key`, in discovery order.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&[FileEntry]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Whether any file carries `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.buckets.contains_key(key)
    }

    /// Number of files in the bucket for `key` (0 when absent).
    #[must_use]
    pub fn count(&self, key: &K) -> usize {
        self.buckets.get(key).map_or(0, Vec::len)
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter()
    }

    /// Buckets in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[FileEntry])> + '_ {
        self.order
            .iter()
            .filter_map(|k| self.buckets.get(k).map(|files| (k, files.as_slice())))
    }

    /// Consume the index, yielding buckets in first-seen key order.
    #[must_use]
    pub fn into_buckets(mut self) -> Vec<(K, Vec<FileEntry>)> {
        self.order
            .into_iter()
            .filter_map(|k| self.buckets.remove(&k).map(|files| (k, files)))
            .collect()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the index holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of files that made it into a bucket.
    #[must_use]
    pub fn indexed_files(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Bucket files by byte size. Metadata only, no I/O.
#[must_use]
pub fn index_by_size(files: Vec<FileEntry>) -> TreeIndex<u64> {
    let mut index = TreeIndex::new();
    index.total_files = files.len();
    for file in files {
        index.insert(file.size, file);
    }
    index
}

/// Settings shared by every hashing pass.
#[derive(Clone)]
pub struct HashingConfig {
    /// Worker threads for hashing. Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HashingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl HashingConfig {
    /// Set the number of hashing threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Run `job` on a pool limited to `threads` workers.
///
/// Falls back to the global pool if a dedicated pool cannot be built.
pub(crate) fn run_bounded<T, F>(threads: usize, job: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(job),
        Err(e) => {
            log::warn!(
                "Failed to create hashing pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            job()
        }
    }
}

/// Hash every file with `mode`, returning results in input order.
///
/// `phase` names the pass for the progress callback.
#[must_use]
pub fn hash_files(
    files: Vec<FileEntry>,
    hasher: &Hasher,
    mode: HashMode,
    config: &HashingConfig,
    phase: &str,
) -> Vec<(FileEntry, Result<Hash, HashError>)> {
    if files.is_empty() {
        return Vec::new();
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start(phase, files.len());
    }

    let results = run_bounded(config.io_threads, || {
        files
            .into_par_iter()
            .enumerate()
            .map(|(idx, file)| {
                if config.is_shutdown_requested() {
                    let err = HashError::Interrupted(file.path.clone());
                    return (file, Err(err));
                }

                if let Some(ref callback) = config.progress_callback {
                    callback.on_progress(idx + 1, file.path.to_string_lossy().as_ref());
                }

                let result = hasher.hash(&file.path, mode);
                match &result {
                    Ok(_) => {
                        log::trace!("Hashed ({:?}): {}", mode, file.path.display());
                        if let Some(ref callback) = config.progress_callback {
                            callback.on_item_completed(file.size);
                        }
                    }
                    Err(HashError::Interrupted(_)) => {}
                    Err(e) => log::warn!("Failed to hash {}: {}", file.path.display(), e),
                }
                (file, result)
            })
            .collect()
    });

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end(phase);
    }

    results
}

/// Bucket files by digest. Failures land in [`TreeIndex::errors`].
///
/// With [`HashMode::Full`] the digest is also attached to each entry.
#[must_use]
pub fn index_by_digest(
    files: Vec<FileEntry>,
    hasher: &Hasher,
    mode: HashMode,
    config: &HashingConfig,
) -> TreeIndex<Hash> {
    let mut index = TreeIndex::new();
    index.total_files = files.len();

    let phase = match mode {
        HashMode::Full => "fullhash",
        HashMode::Prefix(_) => "prefix",
    };

    for (file, result) in hash_files(files, hasher, mode, config, phase) {
        match result {
            Ok(digest) => {
                let file = match mode {
                    HashMode::Full => file.with_digest(digest),
                    HashMode::Prefix(_) => file,
                };
                index.insert(digest, file);
            }
            Err(HashError::Interrupted(_)) => index.interrupted = true,
            Err(e) => index.errors.push(ScanError::from(e)),
        }
    }

    if config.is_shutdown_requested() {
        index.interrupted = true;
    }

    index
}

/// Files found under a root, plus the walk errors met along the way.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Regular files in discovery order
    pub files: Vec<FileEntry>,
    /// Entries that could not be read
    pub errors: Vec<ScanError>,
}

/// Walks a tree and builds a [`TreeIndex`] over it.
pub struct TreeIndexer {
    walker_config: WalkerConfig,
    hasher: Arc<Hasher>,
    hashing: HashingConfig,
}

impl std::fmt::Debug for TreeIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeIndexer")
            .field("walker_config", &self.walker_config)
            .field("hasher", &self.hasher)
            .field("hashing", &self.hashing)
            .finish()
    }
}

impl TreeIndexer {
    /// Create an indexer with default walk and hashing settings.
    #[must_use]
    pub fn new(hasher: Arc<Hasher>) -> Self {
        Self {
            walker_config: WalkerConfig::default(),
            hasher,
            hashing: HashingConfig::default(),
        }
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the hashing configuration.
    #[must_use]
    pub fn with_hashing(mut self, config: HashingConfig) -> Self {
        self.hashing = config;
        self
    }

    /// The hashing configuration.
    #[must_use]
    pub fn hashing(&self) -> &HashingConfig {
        &self.hashing
    }

    /// Enumerate all regular files under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`] when
    /// `root` is unusable. Errors on individual entries are collected instead.
    pub fn collect(&self, root: &Path) -> Result<Collected, ScanError> {
        let root = validate_root(root)?;
        let root = root.as_path();

        if let Some(ref callback) = self.hashing.progress_callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", root.display()));
        }

        let mut walker = Walker::new(root, self.walker_config.clone());
        if let Some(ref flag) = self.hashing.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut collected = Collected::default();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    collected.files.push(file);
                    if let Some(ref callback) = self.hashing.progress_callback {
                        callback.on_progress(collected.files.len(), "");
                    }
                }
                Err(e) => collected.errors.push(e),
            }
        }

        if let Some(ref callback) = self.hashing.progress_callback {
            callback.on_phase_end("walking");
        }

        log::info!(
            "Found {} files under {} ({} unreadable)",
            collected.files.len(),
            root.display(),
            collected.errors.len()
        );

        Ok(collected)
    }

    /// Index every file under `root` by digest.
    ///
    /// # Errors
    ///
    /// Fails only when `root` itself is unusable; per-file problems are
    /// recorded in [`TreeIndex::errors`].
    pub fn index(&self, root: &Path, mode: HashMode) -> Result<TreeIndex<Hash>, ScanError> {
        let collected = self.collect(root)?;
        let walk_errors = collected.errors.len();

        let mut index = index_by_digest(collected.files, &self.hasher, mode, &self.hashing);
        index.total_files += walk_errors;
        index.errors.splice(0..0, collected.errors);

        log::debug!(
            "Indexed {}: {} files, {} digests, {} errors",
            root.display(),
            index.total_files,
            index.len(),
            index.errors.len()
        );
        Ok(index)
    }

    /// Index every file under `root` by byte size.
    ///
    /// # Errors
    ///
    /// Fails only when `root` itself is unusable.
    pub fn index_sizes(&self, root: &Path) -> Result<TreeIndex<u64>, ScanError> {
        let collected = self.collect(root)?;
        let walk_errors = collected.errors.len();

        let mut index = index_by_size(collected.files);
        index.total_files += walk_errors;
        index.errors = collected.errors;
        index.interrupted = self.hashing.is_shutdown_requested();
        Ok(index)
    }
}

/// Check that `root` exists and is a directory, returning its canonical form.
///
/// Every path derived from the walk inherits this root, so file records are
/// absolute even when the caller passed a relative root.
pub(crate) fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|e| root_error(root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    root.canonicalize().map_err(|e| root_error(root, e))
}

fn root_error(root: &Path, error: std::io::Error) -> ScanError {
    match error.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: Arc::new(error),
        },
    }
}
