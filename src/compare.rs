//! Two-tree content comparison.
//!
//! Both trees are indexed by full-content digest and compared as digest
//! sets. A file is "exclusive" to a side when no file on the other side has
//! the same content, wherever it lives and whatever it is called.
//!
//! A comparison is all-or-nothing: any unreadable file in either tree aborts
//! it, since a partial index would report false differences.
//!
//! # Example
//!
//! ```no_run
//! use dupdiff::compare::TreeComparator;
//! use std::path::Path;
//!
//! let result = TreeComparator::with_defaults()
//!     .compare(Path::new("/backup/old"), Path::new("/backup/new"))
//!     .unwrap();
//! for path in &result.exclusive_right {
//!     println!("only in new: {}", path.display());
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::index::{TreeIndex, TreeIndexer};
use crate::scanner::{Hash, HashMode, Hasher, ScanError};

/// Which of the two compared trees something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The first tree given
    Left,
    /// The second tree given
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Content present in both trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedContent {
    /// Digest shared by every listed file
    pub digest: Hash,
    /// Files with this content in the left tree, in discovery order
    pub left: Vec<PathBuf>,
    /// Files with this content in the right tree, in discovery order
    pub right: Vec<PathBuf>,
}

impl SharedContent {
    /// Left-tree files that have a counterpart on the right.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.left.len().min(self.right.len())
    }
}

/// Outcome of comparing two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Digests present in both trees
    pub shared_digests: BTreeSet<Hash>,
    /// Paths per shared digest, in left-tree first-seen order
    pub shared: Vec<SharedContent>,
    /// Left-tree files whose content is absent from the right tree
    pub exclusive_left: Vec<PathBuf>,
    /// Right-tree files whose content is absent from the left tree
    pub exclusive_right: Vec<PathBuf>,
    /// Files indexed in the left tree
    pub total_left: usize,
    /// Files indexed in the right tree
    pub total_right: usize,
    /// Distinct digests only found on the left
    pub exclusive_left_digests: usize,
    /// Distinct digests only found on the right
    pub exclusive_right_digests: usize,
    /// Σ over shared digests of min(left count, right count)
    pub count_equal: usize,
}

impl ComparisonResult {
    /// Files exclusive to `side`.
    #[must_use]
    pub fn exclusive(&self, side: Side) -> &[PathBuf] {
        match side {
            Side::Left => &self.exclusive_left,
            Side::Right => &self.exclusive_right,
        }
    }

    /// True when neither tree holds content the other lacks.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.exclusive_left.is_empty() && self.exclusive_right.is_empty()
    }
}

/// Sort paths by containing directory, then file name.
pub fn sort_by_dir_and_name(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| (a.parent(), a.file_name()).cmp(&(b.parent(), b.file_name())));
}

/// Compare two digest indexes.
#[must_use]
pub fn compare_indexes(left: &TreeIndex<Hash>, right: &TreeIndex<Hash>) -> ComparisonResult {
    let mut result = ComparisonResult {
        total_left: left.indexed_files(),
        total_right: right.indexed_files(),
        ..Default::default()
    };

    for (digest, files) in left.iter() {
        match right.get(digest) {
            Some(others) => {
                result.shared_digests.insert(*digest);
                let shared = SharedContent {
                    digest: *digest,
                    left: files.iter().map(|f| f.path.clone()).collect(),
                    right: others.iter().map(|f| f.path.clone()).collect(),
                };
                result.count_equal += shared.matched();
                result.shared.push(shared);
            }
            None => {
                result.exclusive_left_digests += 1;
                result
                    .exclusive_left
                    .extend(files.iter().map(|f| f.path.clone()));
            }
        }
    }

    for (digest, files) in right.iter() {
        if !left.contains_key(digest) {
            result.exclusive_right_digests += 1;
            result
                .exclusive_right
                .extend(files.iter().map(|f| f.path.clone()));
        }
    }

    sort_by_dir_and_name(&mut result.exclusive_left);
    sort_by_dir_and_name(&mut result.exclusive_right);

    log::debug!(
        "Comparison: {} shared digests, {} left-only files, {} right-only files, {} equal",
        result.shared_digests.len(),
        result.exclusive_left.len(),
        result.exclusive_right.len(),
        result.count_equal
    );

    result
}

/// Errors that abort a comparison.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// A root does not exist.
    #[error("{side} path not found: {path}")]
    PathNotFound {
        /// Tree the path was given for
        side: Side,
        /// The missing path
        path: PathBuf,
    },

    /// A root is not a directory.
    #[error("{side} path is not a directory: {path}")]
    NotADirectory {
        /// Tree the path was given for
        side: Side,
        /// The offending path
        path: PathBuf,
    },

    /// A file in one tree could not be read.
    #[error("Cannot compare, {side} tree is unreadable: {source}")]
    Scan {
        /// Tree the file belongs to
        side: Side,
        /// The underlying error, naming the file
        #[source]
        source: ScanError,
    },

    /// The comparison was interrupted by user.
    #[error("Comparison interrupted by user")]
    Interrupted,
}

impl CompareError {
    fn from_scan(side: Side, error: ScanError) -> Self {
        match error {
            ScanError::NotFound(path) => Self::PathNotFound { side, path },
            ScanError::NotADirectory(path) => Self::NotADirectory { side, path },
            source => Self::Scan { side, source },
        }
    }

    /// The tree the error came from, if any.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match self {
            Self::PathNotFound { side, .. }
            | Self::NotADirectory { side, .. }
            | Self::Scan { side, .. } => Some(*side),
            Self::Interrupted => None,
        }
    }
}

/// Indexes two trees and compares them by content.
#[derive(Debug)]
pub struct TreeComparator {
    indexer: TreeIndexer,
}

impl TreeComparator {
    /// Create a comparator around a configured indexer.
    #[must_use]
    pub fn new(indexer: TreeIndexer) -> Self {
        Self { indexer }
    }

    /// Create a comparator with default walk and hashing settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(TreeIndexer::new(Arc::new(Hasher::new())))
    }

    fn index_side(&self, side: Side, root: &Path) -> Result<TreeIndex<Hash>, CompareError> {
        log::info!("Indexing {} tree {}", side, root.display());
        if let Some(ref callback) = self.indexer.hashing().progress_callback {
            callback.on_message(&format!("{} tree", side));
        }

        let mut index = self
            .indexer
            .index(root, HashMode::Full)
            .map_err(|e| CompareError::from_scan(side, e))?;

        if index.interrupted || self.indexer.hashing().is_shutdown_requested() {
            return Err(CompareError::Interrupted);
        }

        if !index.errors.is_empty() {
            let first = index.errors.swap_remove(0);
            log::error!(
                "{} unreadable file(s) in {} tree, aborting comparison",
                index.errors.len() + 1,
                side
            );
            return Err(CompareError::Scan {
                side,
                source: first,
            });
        }

        Ok(index)
    }

    /// Compare the trees under `left` and `right`.
    ///
    /// # Errors
    ///
    /// Any missing root, unreadable file or interruption aborts the
    /// comparison with an error naming the side it occurred on.
    pub fn compare(&self, left: &Path, right: &Path) -> Result<ComparisonResult, CompareError> {
        let left_index = self.index_side(Side::Left, left)?;
        let right_index = self.index_side(Side::Right, right)?;
        Ok(compare_indexes(&left_index, &right_index))
    }
}
