//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing directories and
//! collecting file metadata. Children of every directory are sorted by file
//! name, so discovery order is identical across runs on an unchanged tree.
//!
//! # Features
//!
//! - Deterministic, sorted traversal
//! - Symlinks skipped unless explicitly followed
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Size filtering (min/max)
//! - Hidden file filtering
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupdiff::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a path should be ignored based on configured patterns.
    ///
    /// Parents are consulted too, so a pattern naming a directory excludes
    /// everything beneath it.
    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: &Option<Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if self.config.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.config.max_size.is_some_and(|max| size > max) {
            return false;
        }
        true
    }

    /// Walk the directory tree, yielding file entries in discovery order.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration; the caller decides whether they are fatal.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .sort(true);

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if path == self.root {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    if self.should_ignore(&path, false, &gitignore) {
                        log::trace!("Ignoring file: {}", path.display());
                        return None;
                    }

                    if file_type.is_symlink() && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    let metadata = if self.config.follow_symlinks {
                        std::fs::metadata(&path)
                    } else {
                        std::fs::symlink_metadata(&path)
                    };

                    match metadata {
                        Ok(m) if m.is_file() => self.process_file_entry(path, &m),
                        Ok(_) => None,
                        Err(e) => Some(Err(self.handle_io_error(&path, e))),
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(self.handle_jwalk_error(path, e)))
                }
            }
        })
    }

    fn process_file_entry(
        &self,
        path: PathBuf,
        metadata: &Metadata,
    ) -> Option<Result<FileEntry, ScanError>> {
        let size = metadata.len();

        if !self.passes_size_filter(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                path.display()
            );
            return None;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(Ok(FileEntry::new(path, size, modified)))
    }

    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: Arc::new(error),
                }
            }
        }
    }

    fn handle_jwalk_error(&self, path: PathBuf, error: jwalk::Error) -> ScanError {
        log::warn!("Walker error for {}: {}", path.display(), error);
        match error.io_error().map(std::io::Error::kind) {
            Some(std::io::ErrorKind::PermissionDenied) => ScanError::PermissionDenied(path),
            Some(std::io::ErrorKind::NotFound) => ScanError::NotFound(path),
            _ => ScanError::Io {
                path,
                source: Arc::new(std::io::Error::other(error.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        let mut f = File::create(dir.path().join("file1.txt")).unwrap();
        writeln!(f, "Hello, world!").unwrap();

        let mut f = File::create(dir.path().join("file2.txt")).unwrap();
        writeln!(f, "Another file").unwrap();

        let subdir = dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        let mut f = File::create(subdir.join("nested.txt")).unwrap();
        writeln!(f, "Nested file content").unwrap();

        dir
    }

    fn names(files: &[FileEntry]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_walker_finds_files() {
        let dir = create_test_dir();
        let walker = Walker::new(dir.path(), WalkerConfig::default());

        let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();

        assert_eq!(files.len(), 3);
        for file in &files {
            assert!(file.size > 0);
            assert!(file.path.exists());
            assert!(file.digest.is_none());
        }
    }

    #[test]
    fn test_walker_order_is_sorted_and_stable() {
        let dir = TempDir::new().unwrap();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs::write(dir.path().join(name), name).unwrap();
        }

        let first: Vec<_> = Walker::new(dir.path(), WalkerConfig::default())
            .walk()
            .filter_map(Result::ok)
            .collect();
        let second: Vec<_> = Walker::new(dir.path(), WalkerConfig::default())
            .walk()
            .filter_map(Result::ok)
            .collect();

        assert_eq!(names(&first), vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_walker_keeps_empty_files() {
        let dir = create_test_dir();
        File::create(dir.path().join("empty.txt")).unwrap();

        let walker = Walker::new(dir.path(), WalkerConfig::default());
        let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();

        assert_eq!(files.len(), 4);
        assert!(files.iter().any(|f| f.size == 0));
    }

    #[test]
    fn test_walker_size_filters() {
        let dir = create_test_dir();
        fs::write(dir.path().join("tiny.txt"), b"X").unwrap();

        let config = WalkerConfig::default().with_size_range(Some(10), Some(14));
        let files: Vec<_> = Walker::new(dir.path(), config)
            .walk()
            .filter_map(Result::ok)
            .collect();

        for file in &files {
            assert!((10..=14).contains(&file.size), "{}", file.path.display());
        }
        assert!(!names(&files).contains(&"tiny.txt".to_string()));
    }

    #[test]
    fn test_walker_skip_hidden_files() {
        let dir = create_test_dir();
        fs::write(dir.path().join(".hidden"), b"Hidden content").unwrap();

        let config = WalkerConfig::default().with_skip_hidden(true);
        let files: Vec<_> = Walker::new(dir.path(), config)
            .walk()
            .filter_map(Result::ok)
            .collect();

        assert!(names(&files).iter().all(|n| !n.starts_with('.')));
    }

    #[test]
    fn test_walker_ignore_patterns() {
        let dir = create_test_dir();
        fs::write(dir.path().join("temp.tmp"), b"Temporary file").unwrap();
        fs::write(dir.path().join("debug.log"), b"Log content").unwrap();

        let config = WalkerConfig::default()
            .with_ignore_patterns(vec!["*.tmp".to_string(), "subdir/".to_string()]);
        let files: Vec<_> = Walker::new(dir.path(), config)
            .walk()
            .filter_map(Result::ok)
            .collect();

        let names = names(&files);
        assert!(!names.contains(&"temp.tmp".to_string()));
        assert!(!names.contains(&"nested.txt".to_string()));
        assert!(names.contains(&"debug.log".to_string()));
    }

    #[test]
    #[cfg(unix)]
    fn test_walker_skips_symlinks_by_default() {
        let dir = create_test_dir();
        std::os::unix::fs::symlink(dir.path().join("file1.txt"), dir.path().join("link.txt"))
            .unwrap();

        let files: Vec<_> = Walker::new(dir.path(), WalkerConfig::default())
            .walk()
            .filter_map(Result::ok)
            .collect();
        assert!(!names(&files).contains(&"link.txt".to_string()));

        let config = WalkerConfig::default().with_follow_symlinks(true);
        let files: Vec<_> = Walker::new(dir.path(), config)
            .walk()
            .filter_map(Result::ok)
            .collect();
        assert!(names(&files).contains(&"link.txt".to_string()));
    }

    #[test]
    fn test_walker_shutdown_flag() {
        let dir = create_test_dir();
        for i in 0..10 {
            fs::write(dir.path().join(format!("file{}.dat", i)), i.to_string()).unwrap();
        }

        let shutdown = Arc::new(AtomicBool::new(true));
        let walker =
            Walker::new(dir.path(), WalkerConfig::default()).with_shutdown_flag(shutdown);

        let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
        assert!(files.is_empty());
    }

    #[test]
    fn test_walker_handles_nonexistent_path() {
        let walker = Walker::new(
            Path::new("/nonexistent/path/12345"),
            WalkerConfig::default(),
        );

        let results: Vec<_> = walker.walk().collect();
        assert!(results.is_empty() || results.iter().all(|r| r.is_err()));
    }
}
