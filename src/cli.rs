//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # List duplicate files under a directory
//! dupdiff dupes ~/Downloads
//!
//! # Delete duplicates, confirming each one
//! dupdiff dupes ~/Downloads --delete
//!
//! # Report what differs between two trees
//! dupdiff compare /backup/old /backup/new --output json
//!
//! # Files in the second tree that are missing from the first
//! dupdiff compare /origin /destination --only right
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::compare::Side;
use crate::config::Config;
use crate::output::OutputFormat;
use crate::scanner::HashAlgorithm;

/// Find duplicate files in a tree and diff two trees by content.
#[derive(Debug, Parser)]
#[command(name = "dupdiff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate files under a directory
    Dupes(DupesArgs),
    /// Compare the content of two directory trees
    Compare(CompareArgs),
    /// Print the digest of a single file
    Hash(HashArgs),
}

/// Walker and hashing options shared by `dupes` and `compare`.
///
/// Unset options fall back to the configuration file and environment.
#[derive(Debug, Default, Args)]
pub struct ScanOptions {
    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links during the walk
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Number of hashing threads
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub io_threads: Option<u64>,

    /// Read block size (e.g., 4KiB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_nonzero_size)]
    pub block_size: Option<u64>,

    /// Digest algorithm
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,
}

impl ScanOptions {
    /// Layer the command-line values over `config`.
    #[must_use]
    pub fn apply(&self, mut config: Config) -> Config {
        if self.min_size.is_some() {
            config.min_size = self.min_size;
        }
        if self.max_size.is_some() {
            config.max_size = self.max_size;
        }
        config
            .ignore_patterns
            .extend(self.ignore_patterns.iter().cloned());
        config.follow_symlinks |= self.follow_symlinks;
        config.skip_hidden |= self.skip_hidden;
        if let Some(threads) = self.io_threads {
            config.io_threads = usize::try_from(threads).unwrap_or(usize::MAX);
        }
        if let Some(size) = self.block_size {
            config.block_size = usize::try_from(size).unwrap_or(usize::MAX);
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        config
    }
}

/// Arguments for the dupes subcommand.
#[derive(Debug, Args)]
pub struct DupesArgs {
    /// Directory to search
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Delete duplicates, keeping the first copy of each group
    #[arg(long, conflicts_with = "output")]
    pub delete: bool,

    /// Delete without asking (implies the answer "all" up front)
    #[arg(short = 'y', long, requires = "delete")]
    pub yes: bool,

    /// Remove files permanently instead of moving them to the trash
    #[arg(long, requires = "delete")]
    pub permanent: bool,

    /// Hash this many leading bytes first to narrow candidates (e.g., 4KiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_nonzero_size)]
    pub prefix: Option<u64>,

    /// Hash every file fully without grouping by size first
    #[arg(long)]
    pub single_pass: bool,

    /// Abort on the first file that cannot be read
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub scan: ScanOptions,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First (left) directory
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,

    /// Second (right) directory
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// List content present in both trees
    #[arg(long)]
    pub show_shared: bool,

    /// List the exclusive files of one side only
    #[arg(long, value_enum, value_name = "SIDE")]
    pub only: Option<Side>,

    #[command(flatten)]
    pub scan: ScanOptions,
}

/// Arguments for the hash subcommand.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// File to hash
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Hash only this many leading bytes
    #[arg(long, value_name = "SIZE", value_parser = parse_nonzero_size)]
    pub prefix: Option<u64>,

    /// Digest algorithm
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Read block size
    #[arg(long, value_name = "SIZE", value_parser = parse_nonzero_size)]
    pub block_size: Option<u64>,
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupdiff::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("4KiB").unwrap(), 4096);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

/// [`parse_size`] that also rejects zero.
///
/// # Errors
///
/// As [`parse_size`], plus an error for a zero size.
pub fn parse_nonzero_size(s: &str) -> Result<u64, String> {
    match parse_size(s)? {
        0 => Err("Size must be greater than zero".to_string()),
        n => Ok(n),
    }
}
