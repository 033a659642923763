use dupescan::actions::{execute_plan, plan_deletions, DeleteMode};
use dupescan::duplicates::{DuplicateFinder, FinderError};
use dupescan::scanner::ScanError;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_roots_are_walked_in_order_given() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let in_second = second.path().join("a.txt");
    let in_first = first.path().join("z.txt");
    fs::write(&in_second, b"shared").unwrap();
    fs::write(&in_first, b"shared").unwrap();

    let finder = DuplicateFinder::with_defaults();
    let report = finder
        .find_duplicates(&[second.path().to_path_buf(), first.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.classes.len(), 1);
    let paths: Vec<&PathBuf> = report.classes[0].members.iter().map(|r| &r.path).collect();
    assert_eq!(paths, vec![&in_second, &in_first]);
}

#[test]
fn test_duplicates_across_roots() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    fs::write(first.path().join("one"), b"backup").unwrap();
    fs::write(second.path().join("two"), b"backup").unwrap();
    fs::write(second.path().join("three"), b"other").unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[first.path().to_path_buf(), second.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.files_scanned, 3);
    assert_eq!(report.summary.duplicates, 1);
}

#[test]
fn test_missing_second_root_aborts() {
    let first = tempdir().unwrap();
    fs::write(first.path().join("file"), b"x").unwrap();
    let missing = first.path().join("does-not-exist");

    let result = DuplicateFinder::with_defaults()
        .find_duplicates(&[first.path().to_path_buf(), missing.clone()]);

    match result {
        Err(FinderError::Scan(ScanError::NotFound(path))) => assert_eq!(path, missing),
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_no_roots() {
    let result = DuplicateFinder::with_defaults().find_duplicates(&[]);
    assert!(matches!(result, Err(FinderError::NoRoots)));
}

#[test]
fn test_scan_overlapping_directories() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(dir.path().join("a.txt"), b"same content").unwrap();
    fs::write(sub.join("b.txt"), b"same content").unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf(), sub.clone()])
        .unwrap();

    assert_eq!(report.summary.files_scanned, 2);
    let groups: Vec<_> = report.classes.iter().filter(|c| c.is_duplicate()).collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 2);
}

#[test]
fn test_nested_root_does_not_duplicate_a_single_file() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("only.txt"), b"one copy").unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[sub.clone(), dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.files_scanned, 1);
    assert_eq!(report.summary.duplicates, 0);
}

#[test]
fn test_aliased_root_then_delete_keeps_only_copy() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let only = sub.join("only.txt");
    fs::write(&only, b"one copy").unwrap();
    let aliased = dir.path().join("sub").join("..").join("sub");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf(), aliased])
        .unwrap();
    assert_eq!(report.summary.files_scanned, 1);

    let plan = plan_deletions(&report.classes).unwrap();
    assert!(plan.is_empty());
    let result = execute_plan(&plan, DeleteMode::Permanent);
    assert_eq!(result.success_count(), 0);
    assert!(only.exists());
}
