//! Duplicate finder implementation with multi-phase detection.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Size grouping**: Group files by size (see [`crate::duplicates::groups`])
//! 2. **Prefix** (optional): Hash the first `n` bytes of same-size files
//! 3. **Full hash**: Hash entire content of the remaining candidates
//!
//! Each phase is a standalone function, so the pipeline can be run piece
//! by piece. The prefix phase only narrows candidates; group membership is
//! always decided by the full digest.
//!
//! # Example
//!
//! ```no_run
//! use dupdiff::scanner::{Walker, WalkerConfig, FileEntry, Hasher};
//! use dupdiff::duplicates::{group_by_size, phase_fullhash};
//! use dupdiff::index::HashingConfig;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let files: Vec<FileEntry> = walker.walk().filter_map(Result::ok).collect();
//! let (size_groups, _) = group_by_size(files);
//!
//! let hasher = Hasher::new();
//! let (groups, stats) = phase_fullhash(size_groups, &hasher, &HashingConfig::default());
//! println!("{} duplicate files in {} groups", stats.duplicate_files, groups.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::index::{hash_files, HashingConfig, TreeIndex, TreeIndexer};
use crate::progress::ProgressCallback;
use crate::scanner::{
    FileEntry, Hash, HashAlgorithm, HashError, HashMode, Hasher, ScanError, WalkerConfig,
    DEFAULT_BLOCK_SIZE,
};

use super::groups::{group_by_size, groups_from_index, DuplicateGroup, SizeGroup};

/// Files larger than this are logged when hashed.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Statistics from the prefix phase.
#[derive(Debug, Clone, Default)]
pub struct PrefixStats {
    /// Total files that entered the phase
    pub input_files: usize,
    /// Number of files successfully hashed
    pub hashed_files: usize,
    /// Number of files that failed to hash
    pub failed_files: usize,
    /// Errors encountered while hashing
    pub errors: Vec<HashError>,
    /// Files whose prefix matched no other file of the same size
    pub unique_prefixes: usize,
    /// Files that remain candidates after this phase
    pub potential_duplicates: usize,
    /// Buckets that remain after this phase
    pub candidate_groups: usize,
    /// Whether phase was interrupted by shutdown
    pub interrupted: bool,
}

impl PrefixStats {
    /// Percentage of input files eliminated by prefix comparison.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.input_files == 0 {
            0.0
        } else {
            (self.unique_prefixes as f64 / self.input_files as f64) * 100.0
        }
    }
}

/// Narrow size groups by comparing the first `prefix_len` bytes.
///
/// Returns buckets of files that share both size and prefix digest, in
/// first-seen order. This is a heuristic filter only; files that survive it
/// still need [`phase_fullhash`].
#[must_use]
pub fn phase_prefix(
    size_groups: Vec<SizeGroup>,
    hasher: &Hasher,
    prefix_len: usize,
    config: &HashingConfig,
) -> (Vec<SizeGroup>, PrefixStats) {
    let all_files: Vec<FileEntry> = size_groups.into_iter().flat_map(|g| g.files).collect();
    let mut stats = PrefixStats {
        input_files: all_files.len(),
        ..Default::default()
    };

    if all_files.is_empty() {
        log::debug!("Prefix phase: No files to process");
        return (Vec::new(), stats);
    }

    log::info!(
        "Prefix phase: Hashing first {} bytes of {} files",
        prefix_len,
        all_files.len()
    );

    let results = hash_files(
        all_files,
        hasher,
        HashMode::Prefix(prefix_len),
        config,
        "prefix",
    );

    let mut index: TreeIndex<(u64, Hash)> = TreeIndex::new();
    for (file, result) in results {
        match result {
            Ok(prefix) => {
                stats.hashed_files += 1;
                index.insert((file.size, prefix), file);
            }
            Err(HashError::Interrupted(_)) => stats.interrupted = true,
            Err(e) => {
                stats.failed_files += 1;
                stats.errors.push(e);
            }
        }
    }

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Prefix phase: Interrupted by shutdown signal");
    }

    let groups: Vec<SizeGroup> = index
        .into_buckets()
        .into_iter()
        .filter_map(|((size, _), files)| {
            if files.len() == 1 {
                stats.unique_prefixes += 1;
                log::trace!("Eliminated unique prefix: {}", files[0].path.display());
                None
            } else {
                stats.potential_duplicates += files.len();
                stats.candidate_groups += 1;
                Some(SizeGroup::with_files(size, files))
            }
        })
        .collect();

    log::info!(
        "Prefix phase complete: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.input_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (groups, stats)
}

/// Statistics from the full hash phase.
#[derive(Debug, Clone, Default)]
pub struct FullhashStats {
    /// Total files that entered the phase
    pub input_files: usize,
    /// Number of files successfully hashed
    pub hashed_files: usize,
    /// Number of files that failed to hash (I/O errors)
    pub failed_files: usize,
    /// Errors encountered during full hash
    pub errors: Vec<HashError>,
    /// Total bytes hashed across all files
    pub bytes_hashed: u64,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Number of confirmed duplicate files (excluding representatives)
    pub duplicate_files: usize,
    /// Total space wasted by duplicates
    pub wasted_space: u64,
    /// Whether phase was interrupted by shutdown
    pub interrupted: bool,
}

impl FullhashStats {
    /// Fill the group-derived totals.
    pub fn calculate_wasted_space(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.wasted_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    }
}

/// Confirm duplicates by full-content digest.
///
/// Candidates are re-bucketed by digest; buckets with two or more members
/// become [`DuplicateGroup`]s. Unreadable files are reported in the stats
/// and left out of every group.
#[must_use]
pub fn phase_fullhash(
    candidates: Vec<SizeGroup>,
    hasher: &Hasher,
    config: &HashingConfig,
) -> (Vec<DuplicateGroup>, FullhashStats) {
    let all_files: Vec<FileEntry> = candidates.into_iter().flat_map(|g| g.files).collect();
    let mut stats = FullhashStats {
        input_files: all_files.len(),
        ..Default::default()
    };

    if all_files.is_empty() {
        log::debug!("Full hash phase: No files to process");
        return (Vec::new(), stats);
    }

    log::info!(
        "Full hash phase: Computing full hashes for {} files",
        all_files.len()
    );
    for file in all_files.iter().filter(|f| f.size > LARGE_FILE_THRESHOLD) {
        log::debug!(
            "Large file queued ({} MB): {}",
            file.size / (1024 * 1024),
            file.path.display()
        );
    }

    let results = hash_files(all_files, hasher, HashMode::Full, config, "fullhash");

    let mut index: TreeIndex<Hash> = TreeIndex::new();
    for (file, result) in results {
        match result {
            Ok(digest) => {
                stats.hashed_files += 1;
                stats.bytes_hashed += file.size;
                index.insert(digest, file.with_digest(digest));
            }
            Err(HashError::Interrupted(_)) => stats.interrupted = true,
            Err(e) => {
                stats.failed_files += 1;
                stats.errors.push(e);
            }
        }
    }

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Full hash phase: Interrupted by shutdown signal");
    }

    let groups = groups_from_index(index);
    stats.calculate_wasted_space(&groups);

    log::info!(
        "Full hash phase complete: {} groups, {} duplicates, {} bytes reclaimable",
        stats.duplicate_groups,
        stats.duplicate_files,
        stats.wasted_space
    );

    (groups, stats)
}

// ============================================================================
// DuplicateFinder - Pipeline Orchestrator
// ============================================================================

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Fail-fast on any error during scan.
    pub strict: bool,
    /// Length of the optional prefix filter pass.
    pub prefix_len: Option<usize>,
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Read block size for hashing.
    pub block_size: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("strict", &self.strict)
            .field("prefix_len", &self.prefix_len)
            .field("algorithm", &self.algorithm)
            .field("block_size", &self.block_size)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            strict: false,
            prefix_len: None,
            algorithm: HashAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Create a new configuration with custom I/O thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set fail-fast on any error.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Enable the prefix filter pass with the given length.
    #[must_use]
    pub fn with_prefix_len(mut self, len: Option<usize>) -> Self {
        self.prefix_len = len.filter(|&n| n > 0);
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the hashing block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
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
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn hashing(&self) -> HashingConfig {
        HashingConfig {
            io_threads: self.io_threads,
            shutdown_flag: self.shutdown_flag.clone(),
            progress_callback: self.progress_callback.clone(),
        }
    }

    fn build_hasher(&self) -> Hasher {
        let mut hasher = Hasher::new()
            .with_algorithm(self.algorithm)
            .with_block_size(self.block_size)
            .with_mmap(true);
        if let Some(ref flag) = self.shutdown_flag {
            hasher = hasher.with_shutdown_flag(flag.clone());
        }
        hasher
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of files discovered
    pub total_files: usize,
    /// Total size of all discovered files in bytes
    pub total_size: u64,
    /// Files eliminated by size grouping (unique sizes)
    pub eliminated_by_size: usize,
    /// Files eliminated by the prefix pass
    pub eliminated_by_prefix: usize,
    /// Number of files whose full content was hashed
    pub hashed_files: usize,
    /// Number of confirmed duplicate groups (secondary figure)
    pub duplicate_groups: usize,
    /// Files removable while keeping one copy per group (primary figure)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Largest duplicated file (representative path and size)
    pub largest_duplicate: Option<(PathBuf, u64)>,
    /// Duration of the entire scan
    pub scan_duration: std::time::Duration,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Errors encountered during the scan
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Calculate the percentage of space that is wasted by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        format_size(self.reclaimable_space)
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        format_size(self.total_size)
    }

    /// Fill the group-derived fields from the final groups.
    pub fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
        self.largest_duplicate = groups
            .iter()
            .filter_map(|g| g.representative().map(|f| (f.path.clone(), g.size)))
            .fold(None, |best: Option<(PathBuf, u64)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            });
    }
}

/// Format a byte size as a human-readable string.
///
/// Divides by 1024 until the value drops below 1024, up to TB.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A scan error occurred (fatal only in strict mode or at the root).
    #[error(transparent)]
    ScanError(#[from] ScanError),
}

impl FinderError {
    fn from_root(error: ScanError) -> Self {
        match error {
            ScanError::NotFound(p) => Self::PathNotFound(p),
            ScanError::NotADirectory(p) => Self::NotADirectory(p),
            other => Self::ScanError(other),
        }
    }
}

/// Duplicate finder that orchestrates the multi-phase detection pipeline.
///
/// # Example
///
/// ```no_run
/// use dupdiff::duplicates::{DuplicateFinder, FinderConfig};
/// use std::path::Path;
///
/// let config = FinderConfig::default().with_io_threads(4);
/// let finder = DuplicateFinder::new(config);
///
/// let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
///
/// println!("{} removable files in {} groups", summary.duplicate_files, groups.len());
/// println!("Reclaimable space: {}", summary.reclaimable_display());
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Arc<Hasher>,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Arc::new(config.build_hasher());
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    fn indexer(&self) -> TreeIndexer {
        TreeIndexer::new(self.hasher.clone())
            .with_walker_config(self.config.walker_config.clone())
            .with_hashing(self.config.hashing())
    }

    /// Route per-file errors: abort in strict mode, otherwise record them.
    fn absorb_errors(
        &self,
        summary: &mut ScanSummary,
        errors: impl IntoIterator<Item = ScanError>,
    ) -> Result<(), FinderError> {
        for e in errors {
            if self.config.strict {
                return Err(FinderError::ScanError(e));
            }
            log::warn!("Skipping {}: {}", e.path().display(), e);
            summary.scan_errors.push(e);
        }
        Ok(())
    }

    /// Find all duplicate files under `path`.
    ///
    /// Runs size grouping, the optional prefix pass and the full hash pass.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory
    /// - The scan is interrupted by shutdown signal
    /// - Strict mode is on and any file could not be read
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = std::time::Instant::now();
        let mut summary = ScanSummary::default();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Starting duplicate scan of {}", path.display());

        let collected = self.indexer().collect(path).map_err(FinderError::from_root)?;
        summary.total_files = collected.files.len() + collected.errors.len();
        summary.total_size = collected.files.iter().map(|f| f.size).sum();
        self.absorb_errors(&mut summary, collected.errors)?;

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (size_groups, size_stats) = group_by_size(collected.files);
        summary.eliminated_by_size = size_stats.eliminated_unique;

        if size_groups.is_empty() {
            log::info!("No potential duplicates found after size grouping");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let hashing = self.config.hashing();

        let candidates = match self.config.prefix_len {
            Some(len) => {
                let (groups, stats) = phase_prefix(size_groups, &self.hasher, len, &hashing);
                summary.eliminated_by_prefix = stats.unique_prefixes;
                self.absorb_errors(
                    &mut summary,
                    stats.errors.into_iter().map(ScanError::from),
                )?;
                if stats.interrupted || self.config.is_shutdown_requested() {
                    return Err(FinderError::Interrupted);
                }
                groups
            }
            None => size_groups,
        };

        let (groups, stats) = phase_fullhash(candidates, &self.hasher, &hashing);
        summary.hashed_files = stats.hashed_files;
        self.absorb_errors(&mut summary, stats.errors.into_iter().map(ScanError::from))?;

        if stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        summary.record_groups(&groups);
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate files in {} groups, {} reclaimable",
            summary.duplicate_files,
            summary.duplicate_groups,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Find duplicates by hashing every file, with no size prefilter.
    ///
    /// Produces the same groups as [`find_duplicates`](Self::find_duplicates)
    /// at the cost of reading every file.
    ///
    /// # Errors
    ///
    /// Same conditions as [`find_duplicates`](Self::find_duplicates).
    pub fn find_duplicates_single_pass(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = std::time::Instant::now();
        let mut summary = ScanSummary::default();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Starting single-pass duplicate scan of {}", path.display());

        let index = self
            .indexer()
            .index(path, HashMode::Full)
            .map_err(FinderError::from_root)?;

        if index.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        summary.total_files = index.total_files;
        summary.total_size = index.iter().flat_map(|(_, f)| f).map(|f| f.size).sum();
        summary.hashed_files = index.indexed_files();

        let mut index = index;
        let errors = std::mem::take(&mut index.errors);
        self.absorb_errors(&mut summary, errors)?;

        let groups = groups_from_index(index);
        summary.record_groups(&groups);
        summary.scan_duration = start_time.elapsed();

        Ok((groups, summary))
    }
}
