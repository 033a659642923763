use dupescan::duplicates::{DuplicateFinder, FinderConfig, GroupBy, GroupKey, Status};
use dupescan::scanner::WalkerConfig;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let report = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(report.classes.is_empty());
    assert_eq!(report.summary.files_scanned, 0);
    assert_eq!(report.summary.duplicates, 0);
}

#[test]
fn test_scan_hello_world() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "A.txt", b"hello");
    let b = write(dir.path(), "B.txt", b"hello");
    let c = write(dir.path(), "C.txt", b"world");

    let finder = DuplicateFinder::with_defaults();
    let report = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(report.classes.len(), 2);
    assert_eq!(report.summary.files_scanned, 3);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(report.summary.duplicate_classes, 1);
    assert_eq!(report.summary.wasted_space, 5);

    let dup = &report.classes[0];
    assert_eq!(dup.status(), Status::Duplicate);
    assert_eq!(
        dup.key,
        GroupKey::Fingerprint(xxhash_rust::xxh64::xxh64(b"hello", 0))
    );
    let paths: Vec<&Path> = dup.members.iter().map(|r| r.path.as_path()).collect();
    assert_eq!(paths, vec![a.as_path(), b.as_path()]);
    assert_eq!(dup.members[0].occurrence, 1);
    assert_eq!(dup.members[1].occurrence, 2);

    let unique = &report.classes[1];
    assert_eq!(unique.status(), Status::Unique);
    assert_eq!(unique.members[0].path, c);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"nested duplicate");
    write(dir.path(), "sub/deeper/b.txt", b"nested duplicate");

    let finder = DuplicateFinder::with_defaults();
    let report = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.duplicate_classes().count(), 1);
}

#[test]
fn test_scan_includes_empty_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.summary.duplicates, 1);
}

#[test]
fn test_group_by_name() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x/photo.jpg", b"first version");
    write(dir.path(), "y/photo.jpg", b"second version, different bytes");
    write(dir.path(), "y/other.jpg", b"first version");

    let config = FinderConfig::default().with_group_by(GroupBy::Name);
    let report = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.duplicates, 1);
    let dup: Vec<_> = report.duplicate_classes().collect();
    assert_eq!(dup.len(), 1);
    assert_eq!(dup[0].key.to_string(), "photo.jpg");
    assert_eq!(dup[0].len(), 2);
}

#[test]
fn test_oldest_first_picks_oldest_canonical() {
    let dir = tempdir().unwrap();
    let newer = write(dir.path(), "a.txt", b"same");
    let older = write(dir.path(), "b.txt", b"same");
    filetime::set_file_mtime(&newer, filetime::FileTime::from_unix_time(2_000_000, 0)).unwrap();
    filetime::set_file_mtime(&older, filetime::FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let default_order = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(default_order.classes[0].canonical().unwrap().path, newer);

    let config = FinderConfig::default().with_oldest_first(true);
    let report = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(report.classes[0].canonical().unwrap().path, older);
    assert_eq!(report.classes[0].redundant()[0].path, newer);
}

#[test]
fn test_emission_order_is_stable_across_concurrency() {
    let dir = tempdir().unwrap();
    for i in 0..40 {
        write(dir.path(), &format!("f{i:02}.bin"), format!("{}", i % 7).as_bytes());
    }
    let roots = [dir.path().to_path_buf()];

    let serial = DuplicateFinder::new(FinderConfig::default().with_concurrency_limit(1))
        .find_duplicates(&roots)
        .unwrap();
    let parallel = DuplicateFinder::new(FinderConfig::default().with_concurrency_limit(8))
        .find_duplicates(&roots)
        .unwrap();

    let flatten = |classes: &[dupescan::duplicates::EquivalenceClass]| -> Vec<PathBuf> {
        classes
            .iter()
            .flat_map(|c| c.members.iter().map(|r| r.path.clone()))
            .collect()
    };
    assert_eq!(flatten(&serial.classes), flatten(&parallel.classes));
    assert_eq!(serial.summary.duplicates, 33);
}

#[test]
fn test_size_and_ignore_filters() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small1", b"ab");
    write(dir.path(), "small2", b"ab");
    write(dir.path(), "big1.txt", &[1u8; 100]);
    write(dir.path(), "big2.txt", &[1u8; 100]);
    write(dir.path(), "big3.tmp", &[1u8; 100]);

    let walker = WalkerConfig::new(false, Some(10), None, vec!["*.tmp".to_string()]);
    let config = FinderConfig::default().with_walker_config(walker);
    let report = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.summary.duplicates, 1);
}

#[test]
fn test_skip_hidden() {
    let dir = tempdir().unwrap();
    write(dir.path(), "visible", b"x");
    write(dir.path(), ".hidden", b"x");
    write(dir.path(), ".git/config", b"x");

    let all = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(all.summary.files_scanned, 3);

    let config =
        FinderConfig::default().with_walker_config(WalkerConfig::new(true, None, None, Vec::new()));
    let visible = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(visible.summary.files_scanned, 1);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let target = write(dir.path(), "real.txt", b"content");
    std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.files_scanned, 1);
    assert_eq!(report.summary.duplicates, 0);
}
