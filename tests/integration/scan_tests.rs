use dupdiff::duplicates::{DuplicateFinder, FinderConfig};
use dupdiff::scanner::{HashAlgorithm, WalkerConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

fn names(paths: Vec<std::path::PathBuf>, root: &Path) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content b");
    write(&dir.path().join("c.txt"), b"content c");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_files, 0);
}

#[test]
fn test_scan_three_copies_count_two_duplicates() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"X");
    write(&dir.path().join("b.txt"), b"X");
    write(&dir.path().join("c.txt"), b"X");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(
        names(groups[0].paths(), dir.path()),
        vec!["a.txt", "b.txt", "c.txt"]
    );
    assert_eq!(summary.duplicate_files, 2);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.reclaimable_space, 2);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"dup");
    write(&dir.path().join("subdir/b.txt"), b"dup");
    write(&dir.path().join("subdir/deeper/c.txt"), b"dup");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 3);
    assert_eq!(summary.total_files, 3);
}

#[test]
fn test_scan_multiple_groups() {
    let dir = tempdir().unwrap();
    for name in ["1a.txt", "1b.txt", "1c.txt"] {
        write(&dir.path().join(name), b"group1");
    }
    for name in ["2a.txt", "2b.txt"] {
        write(&dir.path().join(name), b"group2");
    }

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(summary.duplicate_groups, 2);
    assert_eq!(summary.duplicate_files, 3);
}

#[test]
fn test_same_size_different_content() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"AAAA");
    write(&dir.path().join("b"), b"BBBB");
    write(&dir.path().join("c"), b"AAAA");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(names(groups[0].paths(), dir.path()), vec!["a", "c"]);
    assert_eq!(summary.eliminated_by_size, 0);
}

#[test]
fn test_empty_files_are_duplicates_of_each_other() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("e1"), b"");
    write(&dir.path().join("e2"), b"");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 0);
    assert_eq!(summary.reclaimable_space, 0);
}

#[test]
fn test_prefix_pass_and_single_pass_agree() {
    let dir = tempdir().unwrap();
    let mut big = vec![7u8; 10_000];
    write(&dir.path().join("big1"), &big);
    write(&dir.path().join("big2"), &big);
    big[9_999] = 8;
    write(&dir.path().join("big3_tail_differs"), &big);
    write(&dir.path().join("small1"), b"hello");
    write(&dir.path().join("sub/small2"), b"hello");
    write(&dir.path().join("lonely"), b"unique content");

    let staged = DuplicateFinder::new(FinderConfig::default())
        .find_duplicates(dir.path())
        .unwrap()
        .0;
    let prefixed = DuplicateFinder::new(FinderConfig::default().with_prefix_len(Some(4096)))
        .find_duplicates(dir.path())
        .unwrap()
        .0;
    let single = DuplicateFinder::with_defaults()
        .find_duplicates_single_pass(dir.path())
        .unwrap()
        .0;

    assert_eq!(staged, prefixed);
    assert_eq!(staged, single);
    assert_eq!(staged.len(), 2);
}

#[test]
fn test_sha256_finds_same_groups() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"abc");
    write(&dir.path().join("b"), b"abc");

    let config = FinderConfig::default().with_algorithm(HashAlgorithm::Sha256);
    let (groups, _) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].hash_hex(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_scan_size_filtering() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("10a.txt"), b"0123456789");
    write(&dir.path().join("10b.txt"), b"0123456789");
    write(&dir.path().join("20a.txt"), b"01234567890123456789");
    write(&dir.path().join("20b.txt"), b"01234567890123456789");

    let walker_config = WalkerConfig::default().with_size_range(Some(15), None);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker_config));

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 20);
}

#[test]
fn test_scan_multiple_ignore_patterns() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("test.tmp"), b"dup");
    write(&dir.path().join("test.log"), b"dup");
    write(&dir.path().join("keep.txt"), b"dup");
    write(&dir.path().join("keep2.txt"), b"dup");
    write(&dir.path().join("ignored/file.txt"), b"dup");

    let walker_config = WalkerConfig::default().with_ignore_patterns(vec![
        "*.tmp".to_string(),
        "*.log".to_string(),
        "ignored/**".to_string(),
    ]);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker_config));

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
}

#[test]
fn test_repeated_scans_are_identical() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        write(
            &dir.path().join(format!("d{}/f{}.txt", i % 3, i)),
            format!("content {}", i % 4).as_bytes(),
        );
    }

    let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(8));
    let first = finder.find_duplicates(dir.path()).unwrap().0;
    let second = finder.find_duplicates(dir.path()).unwrap().0;

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn test_relative_root_yields_absolute_paths() {
    figment::Jail::expect_with(|jail| {
        let root = Path::new("tree");
        write(&jail.directory().join("tree/a"), b"same");
        write(&jail.directory().join("tree/sub/b"), b"same");

        let (groups, summary) = DuplicateFinder::with_defaults().find_duplicates(root).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(summary.duplicate_files, 1);
        for file in &groups[0].files {
            assert!(file.path.is_absolute(), "{}", file.path.display());
        }
        let (path, _) = summary.largest_duplicate.unwrap();
        assert!(path.is_absolute());
        Ok(())
    });
}
