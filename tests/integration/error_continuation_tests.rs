use dupdiff::duplicates::{phase_fullhash, DuplicateFinder, FinderConfig, FinderError, SizeGroup};
use dupdiff::index::{index_by_digest, HashingConfig};
use dupdiff::scanner::{FileEntry, HashError, HashMode, Hasher, ScanError, WalkerConfig};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::tempdir;

#[test]
fn test_fullhash_continues_past_missing_files() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();

    let now = SystemTime::now();
    let group = SizeGroup::with_files(
        4,
        vec![
            FileEntry::new(a, 4, now),
            FileEntry::new(PathBuf::from("nonexistent_1.txt"), 4, now),
            FileEntry::new(b, 4, now),
        ],
    );

    let (groups, stats) = phase_fullhash(vec![group], &Hasher::new(), &HashingConfig::default());

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(stats.failed_files, 1);
    assert!(matches!(stats.errors[0], HashError::NotFound(_)));
}

#[test]
fn test_index_records_errors_and_keeps_going() {
    let now = SystemTime::now();
    let files = vec![
        FileEntry::new(PathBuf::from("nonexistent_1.txt"), 100, now),
        FileEntry::new(PathBuf::from("nonexistent_2.txt"), 100, now),
    ];

    let index = index_by_digest(files, &Hasher::new(), HashMode::Full, &HashingConfig::default());

    assert!(index.is_empty());
    assert_eq!(index.errors.len(), 2);
    for err in &index.errors {
        match err {
            ScanError::HashError(HashError::NotFound(_)) => {}
            other => panic!("Expected NotFound HashError, got: {:?}", other),
        }
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_entry_recorded_in_lenient_mode() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

    let walker = WalkerConfig::default().with_follow_symlinks(true);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker));
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(summary.scan_errors.len(), 1);
    assert_eq!(summary.total_files, 3);
}

#[cfg(unix)]
#[test]
fn test_unreadable_entry_aborts_in_strict_mode() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

    let walker = WalkerConfig::default().with_follow_symlinks(true);
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_walker_config(walker)
            .with_strict(true),
    );

    match finder.find_duplicates(dir.path()) {
        Err(FinderError::ScanError(_)) => {}
        other => panic!("Expected strict failure, got: {:?}", other.map(|r| r.0.len())),
    }
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let result = DuplicateFinder::with_defaults().find_duplicates(&dir.path().join("missing"));
    assert!(matches!(result, Err(FinderError::PathNotFound(_))));

    let file = dir.path().join("file.txt");
    fs::write(&file, b"x").unwrap();
    let result = DuplicateFinder::with_defaults().find_duplicates(&file);
    assert!(matches!(result, Err(FinderError::NotADirectory(_))));
}
