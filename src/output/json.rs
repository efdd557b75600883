//! JSON output for duplicate scans and tree comparisons.
//!
//! # Output Schema
//!
//! Duplicate scan:
//!
//! ```json
//! {
//!   "duplicates": [
//!     { "hash": "abc123...", "size": 1024, "files": ["/a.txt", "/b.txt"] }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_files": 10,
//!     "duplicate_groups": 5,
//!     "reclaimable_space": 51200,
//!     "exit_code": 0,
//!     "exit_code_name": "DD000"
//!   }
//! }
//! ```
//!
//! Comparison:
//!
//! ```json
//! {
//!   "left": "/backup/old",
//!   "right": "/backup/new",
//!   "exclusive_left": [],
//!   "exclusive_right": ["/backup/new/r"],
//!   "summary": { "total_left": 1, "total_right": 2, "count_equal": 1 }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::compare::ComparisonResult;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::hash_to_hex;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content digest as hexadecimal string (64 characters)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Paths in discovery order; the first is the kept copy
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a DuplicateGroup.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash_hex(),
            size: group.size,
            files: group
                .files
                .iter()
                .map(|f| path_string(&f.path))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Files removable while keeping one copy per group
    pub duplicate_files: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total space that can be reclaimed by removing duplicates (bytes)
    pub reclaimable_space: u64,
    /// Largest duplicated file, if any
    pub largest_duplicate: Option<JsonLargest>,
    /// Files that could not be read
    pub errors: Vec<String>,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DD000")
    pub exit_code_name: String,
}

/// Path and size of the largest duplicated file.
#[derive(Debug, Clone, Serialize)]
pub struct JsonLargest {
    /// Path of the kept copy
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            duplicate_files: summary.duplicate_files,
            duplicate_groups: summary.duplicate_groups,
            reclaimable_space: summary.reclaimable_space,
            largest_duplicate: summary
                .largest_duplicate
                .as_ref()
                .map(|(path, size)| JsonLargest {
                    path: path_string(path),
                    size: *size,
                }),
            errors: summary.scan_errors.iter().map(ToString::to_string).collect(),
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output for a duplicate scan.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use dupdiff::duplicates::{DuplicateGroup, ScanSummary};
    /// use dupdiff::output::json::JsonOutput;
    /// use dupdiff::error::ExitCode;
    /// use dupdiff::scanner::FileEntry;
    /// use std::path::PathBuf;
    /// use std::time::SystemTime;
    ///
    /// let groups = vec![DuplicateGroup::new([0u8; 32], 1024, vec![
    ///     FileEntry::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
    ///     FileEntry::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
    /// ])];
    ///
    /// let output = JsonOutput::new(&groups, &ScanSummary::default(), ExitCode::Success);
    /// assert_eq!(output.duplicates.len(), 1);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// Content present in both trees, in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonShared {
    /// Digest as hexadecimal string
    pub hash: String,
    /// Matching paths in the left tree
    pub left: Vec<String>,
    /// Matching paths in the right tree
    pub right: Vec<String>,
}

/// Comparison counts in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonComparisonSummary {
    /// Files in the left tree
    pub total_left: usize,
    /// Files in the right tree
    pub total_right: usize,
    /// Files only in the left tree
    pub exclusive_left: usize,
    /// Files only in the right tree
    pub exclusive_right: usize,
    /// Distinct contents only in the left tree
    pub exclusive_left_digests: usize,
    /// Distinct contents only in the right tree
    pub exclusive_right_digests: usize,
    /// Digests present in both trees
    pub shared_digests: usize,
    /// Left files with an identical counterpart on the right
    pub count_equal: usize,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name
    pub exit_code_name: String,
}

/// Complete JSON output for a tree comparison.
#[derive(Debug, Clone, Serialize)]
pub struct JsonComparison {
    /// Left root
    pub left: String,
    /// Right root
    pub right: String,
    /// Left-only files sorted by directory then name
    pub exclusive_left: Vec<String>,
    /// Right-only files sorted by directory then name
    pub exclusive_right: Vec<String>,
    /// Shared content, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<Vec<JsonShared>>,
    /// Counts
    pub summary: JsonComparisonSummary,
}

impl JsonComparison {
    /// Build the JSON view of a comparison.
    #[must_use]
    pub fn new(
        left: &Path,
        right: &Path,
        result: &ComparisonResult,
        show_shared: bool,
        exit_code: ExitCode,
    ) -> Self {
        let to_strings =
            |paths: &[std::path::PathBuf]| paths.iter().map(|p| path_string(p)).collect();

        Self {
            left: path_string(left),
            right: path_string(right),
            exclusive_left: to_strings(&result.exclusive_left),
            exclusive_right: to_strings(&result.exclusive_right),
            shared: show_shared.then(|| {
                result
                    .shared
                    .iter()
                    .map(|s| JsonShared {
                        hash: hash_to_hex(&s.digest),
                        left: to_strings(&s.left),
                        right: to_strings(&s.right),
                    })
                    .collect()
            }),
            summary: JsonComparisonSummary {
                total_left: result.total_left,
                total_right: result.total_right,
                exclusive_left: result.exclusive_left.len(),
                exclusive_right: result.exclusive_right.len(),
                exclusive_left_digests: result.exclusive_left_digests,
                exclusive_right_digests: result.exclusive_right_digests,
                shared_digests: result.shared_digests.len(),
                count_equal: result.count_equal,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Paths arrive absolute from the indexer and are written as-is.
fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
