use dupescan::actions::{execute_plan, plan_deletions, DeleteMode};
use dupescan::duplicates::{DuplicateFinder, FinderConfig};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_scan_then_delete_keeps_canonical() {
    let dir = tempdir().unwrap();
    let keep = dir.path().join("a.txt");
    let drop1 = dir.path().join("b.txt");
    let drop2 = dir.path().join("c.txt");
    let unique = dir.path().join("d.txt");
    for path in [&keep, &drop1, &drop2] {
        fs::write(path, b"triplicate").unwrap();
    }
    fs::write(&unique, b"unique").unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let plan = plan_deletions(&report.classes).unwrap();
    assert_eq!(plan.len(), 2);
    assert!(plan.targets.iter().all(|t| t.keep == keep));

    let result = execute_plan(&plan, DeleteMode::Permanent);
    assert!(result.all_succeeded());
    assert_eq!(result.bytes_freed, 20);

    assert!(keep.exists());
    assert!(unique.exists());
    assert!(!drop1.exists());
    assert!(!drop2.exists());
}

#[test]
fn test_modified_file_is_not_deleted() {
    let dir = tempdir().unwrap();
    let keep = dir.path().join("a.txt");
    let changed = dir.path().join("b.txt");
    fs::write(&keep, b"same").unwrap();
    fs::write(&changed, b"same").unwrap();

    let report = DuplicateFinder::new(FinderConfig::default())
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    let plan = plan_deletions(&report.classes).unwrap();

    fs::write(&changed, b"edited after the scan").unwrap();
    let result = execute_plan(&plan, DeleteMode::Permanent);

    assert_eq!(result.success_count(), 0);
    assert_eq!(result.failure_count(), 1);
    assert!(changed.exists());
}
