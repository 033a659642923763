//! Unreadable files abort the scan unless `keep_going` is set.
//!
//! Permission bits do not stop root, so each test first checks that the
//! locked file really is unreadable and returns early otherwise.

#![cfg(unix)]

use dupescan::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupescan::scanner::HashError;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn locked_tree() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"readable").unwrap();
    fs::write(dir.path().join("c.txt"), b"readable").unwrap();
    let locked = dir.path().join("b.txt");
    fs::write(&locked, b"secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    (dir, locked)
}

fn is_readable(path: &Path) -> bool {
    File::open(path).is_ok()
}

fn unlock(path: &Path) {
    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_unreadable_file_aborts_by_default() {
    let (dir, locked) = locked_tree();
    if is_readable(&locked) {
        unlock(&locked);
        return;
    }

    let result = DuplicateFinder::with_defaults().find_duplicates(&[dir.path().to_path_buf()]);
    unlock(&locked);

    match result {
        Err(FinderError::Hash(HashError::PermissionDenied(path))) => assert_eq!(path, locked),
        other => panic!("Expected PermissionDenied, got {other:?}"),
    }
}

#[test]
fn test_keep_going_skips_unreadable_file() {
    let (dir, locked) = locked_tree();
    if is_readable(&locked) {
        unlock(&locked);
        return;
    }

    let config = FinderConfig::default().with_keep_going(true);
    let result = DuplicateFinder::new(config).find_duplicates(&[dir.path().to_path_buf()]);
    unlock(&locked);

    let report = result.unwrap();
    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.summary.skipped_files, 1);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(report.skipped[0].path(), locked.as_path());
}
