use dupescan::duplicates::{DuplicateFinder, FinderConfig};
use dupescan::scanner::SimhashWidth;
use dupescan::similarity::{Classification, Threshold};
use std::fs;
use tempfile::tempdir;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn test_identical_copies_score_100() {
    let dir = tempdir().unwrap();
    let content = sample(20_000);
    fs::write(dir.path().join("original.bin"), &content).unwrap();
    fs::write(dir.path().join("copy.bin"), &content).unwrap();

    let report = DuplicateFinder::with_defaults()
        .compare(&[dir.path().to_path_buf()], Threshold::new(90.0).unwrap())
        .unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.pairs.len(), 1);
    assert!((report.pairs[0].similarity - 1.0).abs() < f64::EPSILON);
    assert_eq!(report.pairs[0].classification, Classification::Similar);
    assert_eq!(report.summary.duplicates, 1);
}

#[test]
fn test_pair_count_is_n_choose_2() {
    let dir = tempdir().unwrap();
    for i in 0..5u8 {
        fs::write(dir.path().join(format!("f{i}")), vec![i; 5000]).unwrap();
    }

    let report = DuplicateFinder::with_defaults()
        .compare(&[dir.path().to_path_buf()], Threshold::disabled())
        .unwrap();

    assert_eq!(report.pairs.len(), 10);
    assert!(report.pairs.iter().all(|p| p.left < p.right));
    assert!(report.pairs.iter().all(|p| p.is_similar()));
}

#[test]
fn test_configured_width_is_used() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), sample(100)).unwrap();
    fs::write(dir.path().join("b"), sample(200)).unwrap();

    let config = FinderConfig::default().with_similarity(SimhashWidth::W32);
    let report = DuplicateFinder::new(config)
        .compare(&[dir.path().to_path_buf()], Threshold::disabled())
        .unwrap();

    for record in &report.records {
        assert_eq!(record.similarity.unwrap().width, SimhashWidth::W32);
    }
}

fn noise(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

#[test]
fn test_one_byte_edit_is_near_duplicate() {
    let dir = tempdir().unwrap();
    let content = noise(64 * 1024);
    let mut edited = content.clone();
    edited[40_000] ^= 0x01;
    fs::write(dir.path().join("a.bin"), &content).unwrap();
    fs::write(dir.path().join("b.bin"), &edited).unwrap();

    let report = DuplicateFinder::with_defaults()
        .compare(&[dir.path().to_path_buf()], Threshold::new(90.0).unwrap())
        .unwrap();

    assert_eq!(report.pairs.len(), 1);
    let pair = &report.pairs[0];
    assert!(pair.similarity >= 0.9, "similarity {}", pair.similarity);
    assert_eq!(pair.classification, Classification::Similar);
}
