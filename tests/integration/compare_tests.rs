use dupdiff::compare::{CompareError, Side, TreeComparator};
use dupdiff::index::{HashingConfig, TreeIndexer};
use dupdiff::scanner::{Hasher, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn rel(paths: &[PathBuf], root: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_one_extra_file_on_the_right() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    write(left.path(), "p", b"x");
    write(right.path(), "q", b"x");
    write(right.path(), "r", b"y");

    let result = TreeComparator::with_defaults()
        .compare(left.path(), right.path())
        .unwrap();

    assert!(result.exclusive_left.is_empty());
    assert_eq!(rel(&result.exclusive_right, right.path()), vec!["r"]);
    assert_eq!(result.count_equal, 1);
    assert_eq!(result.shared_digests.len(), 1);
    assert_eq!(result.total_left, 1);
    assert_eq!(result.total_right, 2);
    assert!(!result.is_identical());
}

#[test]
fn test_names_do_not_matter() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    write(left.path(), "photos/2019/img.jpg", b"pixels");
    write(right.path(), "backup/renamed.bin", b"pixels");

    let result = TreeComparator::with_defaults()
        .compare(left.path(), right.path())
        .unwrap();

    assert!(result.is_identical());
    assert_eq!(result.count_equal, 1);
}

#[test]
fn test_count_equal_uses_minimum_multiplicity() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    write(left.path(), "a1", b"same");
    write(left.path(), "a2", b"same");
    write(left.path(), "a3", b"same");
    write(right.path(), "b1", b"same");
    write(right.path(), "b2", b"same");

    let result = TreeComparator::with_defaults()
        .compare(left.path(), right.path())
        .unwrap();

    assert_eq!(result.count_equal, 2);
    assert!(result.exclusive_left.is_empty());
    assert_eq!(result.shared[0].left.len(), 3);
    assert_eq!(result.shared[0].right.len(), 2);
}

#[test]
fn test_comparison_is_symmetric() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    write(a.path(), "one", b"1");
    write(a.path(), "two", b"2");
    write(a.path(), "two_again", b"2");
    write(b.path(), "two", b"2");
    write(b.path(), "three", b"3");

    let comparator = TreeComparator::with_defaults();
    let ab = comparator.compare(a.path(), b.path()).unwrap();
    let ba = comparator.compare(b.path(), a.path()).unwrap();

    assert_eq!(ab.count_equal, ba.count_equal);
    assert_eq!(ab.shared_digests, ba.shared_digests);
    assert_eq!(ab.exclusive_left, ba.exclusive_right);
    assert_eq!(ab.exclusive_right, ba.exclusive_left);
    assert_eq!(ab.exclusive(Side::Left), ba.exclusive(Side::Right));
}

#[test]
fn test_exclusive_lists_sorted_by_directory_then_name() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    write(left.path(), "z", b"1");
    write(left.path(), "b/a", b"2");
    write(left.path(), "a/z", b"3");
    write(left.path(), "a/m", b"4");

    let result = TreeComparator::with_defaults()
        .compare(left.path(), right.path())
        .unwrap();

    assert_eq!(
        rel(&result.exclusive_left, left.path()),
        vec!["z", "a/m", "a/z", "b/a"]
    );
    assert_eq!(result.exclusive_left_digests, 4);
}

#[test]
fn test_empty_trees_are_identical() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();

    let result = TreeComparator::with_defaults()
        .compare(left.path(), right.path())
        .unwrap();

    assert!(result.is_identical());
    assert_eq!(result.count_equal, 0);
}

#[test]
fn test_missing_root_names_the_side() {
    let left = tempdir().unwrap();
    let missing = left.path().join("nope");

    let err = TreeComparator::with_defaults()
        .compare(left.path(), &missing)
        .unwrap_err();

    assert!(matches!(err, CompareError::PathNotFound { side: Side::Right, .. }));
    assert_eq!(err.side(), Some(Side::Right));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_aborts_comparison() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    write(left.path(), "ok", b"fine");
    write(right.path(), "ok", b"fine");
    std::os::unix::fs::symlink(right.path().join("gone"), right.path().join("dangling")).unwrap();

    let indexer = TreeIndexer::new(Arc::new(Hasher::new()))
        .with_walker_config(WalkerConfig::default().with_follow_symlinks(true));
    let err = TreeComparator::new(indexer)
        .compare(left.path(), right.path())
        .unwrap_err();

    assert!(matches!(err, CompareError::Scan { side: Side::Right, .. }));
}

#[test]
fn test_parallel_indexing_gives_same_result() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    for i in 0..30 {
        write(left.path(), &format!("d{}/f{}", i % 4, i), format!("{}", i % 7).as_bytes());
        write(right.path(), &format!("e{}/g{}", i % 3, i), format!("{}", i % 9).as_bytes());
    }

    let serial = TreeComparator::new(
        TreeIndexer::new(Arc::new(Hasher::new()))
            .with_hashing(HashingConfig::default().with_io_threads(1)),
    )
    .compare(left.path(), right.path())
    .unwrap();
    let parallel = TreeComparator::new(
        TreeIndexer::new(Arc::new(Hasher::new()))
            .with_hashing(HashingConfig::default().with_io_threads(8)),
    )
    .compare(left.path(), right.path())
    .unwrap();

    assert_eq!(serial, parallel);
    assert_eq!(serial.count_equal, 24);
}

#[test]
fn test_relative_roots_yield_absolute_paths() {
    figment::Jail::expect_with(|jail| {
        let base = jail.directory().to_path_buf();
        write(&base, "left/a", b"x");
        write(&base, "left/b", b"x");
        write(&base, "left/only-left", b"z");
        write(&base, "right/c", b"y");

        let result = TreeComparator::with_defaults()
            .compare(Path::new("left"), Path::new("right"))
            .unwrap();

        assert_eq!(result.exclusive_left.len(), 3);
        assert_eq!(result.exclusive_right.len(), 1);
        for path in result.exclusive_left.iter().chain(&result.exclusive_right) {
            assert!(path.is_absolute(), "{}", path.display());
        }
        Ok(())
    });
}
