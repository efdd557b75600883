//! Block-wise file hasher.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing content digests
//! of files using memory-efficient streaming. Two modes are supported:
//!
//! - [`HashMode::Full`] reads the whole file in fixed-size blocks and folds
//!   each block into a running accumulator. The digest does not depend on the
//!   block size.
//! - [`HashMode::Prefix`] hashes only the first `n` bytes. This is a cheap
//!   heuristic equality test, never proof of full-content equality.
//!
//! # Example
//!
//! ```no_run
//! use dupdiff::scanner::{hash_to_hex, HashMode, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.hash(Path::new("Cargo.toml"), HashMode::Full).unwrap();
//! println!("{}", hash_to_hex(&digest));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use super::HashError;

/// A 256-bit content digest.
pub type Hash = [u8; 32];

/// Default read block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Files at or above this size are memory-mapped when mmap is enabled.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Digest algorithm used for content hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (fast, default)
    #[default]
    Blake3,
    /// SHA-256 (matches `sha256sum`)
    Sha256,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// How much of a file contributes to its digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// The entire file content.
    Full,
    /// Only the first `n` bytes (or fewer if the file is shorter).
    Prefix(usize),
}

/// Running digest state for either supported algorithm.
enum Accumulator {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
        }
    }

    fn finalize(self) -> Hash {
        match self {
            Self::Blake3(h) => *h.finalize().as_bytes(),
            Self::Sha256(h) => h.finalize().into(),
        }
    }
}

/// Streaming file hasher.
///
/// Cheap to clone and safe to share across rayon workers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    block_size: usize,
    use_mmap: bool,
    mmap_threshold: u64,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a BLAKE3 hasher with the default block size and mmap disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithm: HashAlgorithm::Blake3,
            block_size: DEFAULT_BLOCK_SIZE,
            use_mmap: false,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            shutdown_flag: None,
        }
    }

    /// Select the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the read block size. Zero is clamped to one byte.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Enable or disable memory-mapped hashing for large files.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    /// Minimum file size for memory mapping.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Set the shutdown flag checked between blocks.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured block size.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash a file according to `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, or if
    /// shutdown was requested while hashing.
    pub fn hash(&self, path: &Path, mode: HashMode) -> Result<Hash, HashError> {
        match mode {
            HashMode::Full => self.full_hash(path),
            HashMode::Prefix(n) => self.prefix_hash(path, n),
        }
    }

    /// Hash the entire file content.
    ///
    /// # Errors
    ///
    /// See [`Hasher::hash`].
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, None, e))?;

        if self.use_mmap {
            let len = file
                .metadata()
                .map_err(|e| HashError::from_io(path, None, e))?
                .len();
            if len > 0 && len >= self.mmap_threshold {
                match self.mmap_hash(&file) {
                    Ok(hash) => return Ok(hash),
                    Err(e) => {
                        log::debug!(
                            "mmap failed for {}, falling back to buffered read: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }

        self.stream(path, file, None)
    }

    /// Hash the first `len` bytes of the file.
    ///
    /// # Errors
    ///
    /// See [`Hasher::hash`].
    pub fn prefix_hash(&self, path: &Path, len: usize) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, None, e))?;
        self.stream(path, file, Some(len as u64))
    }

    fn mmap_hash(&self, file: &File) -> std::io::Result<Hash> {
        // SAFETY: the mapping is read-only and dropped before returning. Files
        // are assumed not to change during a run.
        let map = unsafe { memmap2::Mmap::map(file)? };
        let mut acc = Accumulator::new(self.algorithm);
        acc.update(&map);
        Ok(acc.finalize())
    }

    fn stream(&self, path: &Path, file: File, limit: Option<u64>) -> Result<Hash, HashError> {
        let mut acc = Accumulator::new(self.algorithm);
        let mut buffer = vec![0u8; self.block_size];
        let mut reader: Box<dyn Read> = match limit {
            Some(n) => Box::new(file.take(n)),
            None => Box::new(file),
        };
        let mut offset = 0u64;

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }

            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, Some(offset), e)),
            };

            acc.update(&buffer[..read]);
            offset += read as u64;
        }

        log::trace!("Hashed {} bytes of {}", offset, path.display());
        Ok(acc.finalize())
    }
}

/// Convert a digest to lowercase hexadecimal.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;

    hash.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Parse a 64-character hexadecimal string into a digest.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, byte) in hash.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(hash)
}
