//! Duplicate grouping and size-based file organization.
//!
//! # Overview
//!
//! Size grouping is the first pass of duplicate detection. Files with
//! different sizes cannot share content, so only sizes seen at least twice
//! go on to be hashed.
//!
//! Zero-byte files are grouped like any other size. They all hash to the
//! same digest and end up in one group that frees no space.
//!
//! # Example
//!
//! ```
//! use dupdiff::scanner::FileEntry;
//! use dupdiff::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileEntry::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     FileEntry::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     FileEntry::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::path::{Path, PathBuf};

use crate::index::{index_by_size, TreeIndex};
use crate::scanner::{FileEntry, Hash};

/// A bucket of files that share a size and may share content.
#[derive(Debug, Clone)]
pub struct SizeGroup {
    /// File size in bytes (shared by all files in this group)
    pub size: u64,
    /// Files with this exact size, in discovery order
    pub files: Vec<FileEntry>,
}

impl SizeGroup {
    /// Create a size group with initial files.
    #[must_use]
    pub fn with_files(size: u64, files: Vec<FileEntry>) -> Self {
        Self { size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check if this group has potential duplicates (2+ files).
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.files.len() > 1
    }

    /// Potential space savings (all copies minus one).
    #[must_use]
    pub fn potential_savings(&self) -> u64 {
        self.size * (self.files.len().saturating_sub(1) as u64)
    }
}

/// Confirmed duplicate group of files.
///
/// Members share a full-content digest. `files[0]` is the representative,
/// the member kept when duplicates are removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Full-content digest shared by every member
    pub hash: Hash,
    /// File size in bytes
    pub size: u64,
    /// Members in discovery order
    pub files: Vec<FileEntry>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(hash: Hash, size: u64, files: Vec<FileEntry>) -> Self {
        Self { hash, size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        match self.files.first() {
            Some(first) => self.total_size().saturating_sub(first.size),
            None => 0,
        }
    }

    /// Number of removable copies (total - 1 representative).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }

    /// The member that is always kept.
    #[must_use]
    pub fn representative(&self) -> Option<&FileEntry> {
        self.files.first()
    }

    /// Members eligible for removal.
    #[must_use]
    pub fn candidates(&self) -> &[FileEntry] {
        self.files.get(1..).unwrap_or(&[])
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Whether `path` is a member of this group.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of unique file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in groups of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton groups)
    pub eliminated_unique: usize,
    /// Number of zero-byte files encountered
    pub empty_files: usize,
    /// Number of size groups with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by size, keeping only sizes shared by two or more files.
///
/// Groups come back in the order their size was first seen, and files keep
/// their input order inside each group. No file I/O is performed.
///
/// # Example
///
/// ```
/// use dupdiff::scanner::FileEntry;
/// use dupdiff::duplicates::group_by_size;
/// use std::path::PathBuf;
/// use std::time::SystemTime;
///
/// let files = vec![
///     FileEntry::new(PathBuf::from("/a.txt"), 100, SystemTime::now()),
///     FileEntry::new(PathBuf::from("/b.txt"), 100, SystemTime::now()),
///     FileEntry::new(PathBuf::from("/c.txt"), 200, SystemTime::now()),
/// ];
///
/// let (groups, stats) = group_by_size(files);
///
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].size, 100);
/// assert_eq!(stats.eliminated_unique, 1);
/// ```
#[must_use]
pub fn group_by_size(files: Vec<FileEntry>) -> (Vec<SizeGroup>, GroupingStats) {
    let mut stats = GroupingStats {
        total_files: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
        empty_files: files.iter().filter(|f| f.size == 0).count(),
        ..Default::default()
    };

    let index = index_by_size(files);
    stats.unique_sizes = index.len();

    let groups = candidate_buckets(index, &mut stats);

    log::info!(
        "Size grouping: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (groups, stats)
}

/// Keep the size buckets that hold two or more files.
fn candidate_buckets(index: TreeIndex<u64>, stats: &mut GroupingStats) -> Vec<SizeGroup> {
    index
        .into_buckets()
        .into_iter()
        .filter_map(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                None
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                log::debug!(
                    "Size group {} bytes: {} potential duplicates",
                    size,
                    files.len()
                );
                Some(SizeGroup::with_files(size, files))
            }
        })
        .collect()
}

/// Turn a digest index into duplicate groups (buckets with 2+ members).
#[must_use]
pub fn groups_from_index(index: TreeIndex<Hash>) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = index
        .into_buckets()
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(hash, files)| {
            let size = files.first().map_or(0, |f| f.size);
            log::debug!(
                "Duplicate group {}: {} files, {} bytes each",
                crate::scanner::hash_to_hex(&hash),
                files.len(),
                size
            );
            DuplicateGroup::new(hash, size, files)
        })
        .collect();
    sort_groups(&mut groups);
    groups
}

/// Order groups by the path of their representative.
///
/// Both grouping strategies finish with this, so their output can be
/// compared directly.
pub fn sort_groups(groups: &mut [DuplicateGroup]) {
    groups.sort_by(|a, b| {
        let ka = a.representative().map(|f| f.path.as_path());
        let kb = b.representative().map(|f| f.path.as_path());
        ka.cmp(&kb)
    });
}
