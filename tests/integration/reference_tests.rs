use finddupe::actions::{Mode, Remedy};
use finddupe::duplicates::{EngineConfig, GroupKey, ScanSession};
use finddupe::scanner::compute_signature;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_reference_files_are_kept_and_work_copies_removed() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("archive");
    let work = dir.path().join("downloads");
    fs::create_dir(&reference).unwrap();
    fs::create_dir(&work).unwrap();
    fs::write(reference.join("photo.jpg"), "jpeg bytes").unwrap();
    fs::write(work.join("photo (1).jpg"), "jpeg bytes").unwrap();
    fs::write(work.join("notes.txt"), "unique").unwrap();

    let mut session: ScanSession<Vec<u8>> =
        ScanSession::new(EngineConfig::new(Mode::Eliminate(Remedy::Delete))).unwrap();
    session.scan_reference(&reference).unwrap();
    session.scan_path(&work).unwrap();
    let report = session.finish().unwrap();

    assert!(reference.join("photo.jpg").exists());
    assert!(!work.join("photo (1).jpg").exists());
    assert!(work.join("notes.txt").exists());
    assert_eq!(report.summary.reference_files, 1);
    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.eliminated_files, 1);
}

#[test]
fn test_reference_duplicates_are_all_stored_unverified() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("r1"), "twin").unwrap();
    fs::write(dir.path().join("r2"), "twin").unwrap();
    let (signature, _) = compute_signature(&dir.path().join("r1")).unwrap();

    let mut session: ScanSession<Vec<u8>> =
        ScanSession::new(EngineConfig::new(Mode::Eliminate(Remedy::Delete))).unwrap();
    session.scan_reference(dir.path()).unwrap();
    let report = session.finish().unwrap();

    assert!(dir.path().join("r1").exists());
    assert!(dir.path().join("r2").exists());
    assert_eq!(report.summary.duplicate_files, 0);
    assert_eq!(report.summary.byte_comparisons, 0);
    assert_eq!(report.index.chain(&GroupKey::Content(signature)).len(), 2);
}

#[test]
fn test_work_copy_matched_against_any_reference_member() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("ref");
    let work = dir.path().join("work");
    fs::create_dir(&reference).unwrap();
    fs::create_dir(&work).unwrap();
    // Same length and prefix region, different content at the end.
    let mut left = vec![b'x'; 33_000];
    let mut right = left.clone();
    left[32_999] = b'L';
    right[32_999] = b'R';
    fs::write(reference.join("a_left"), &left).unwrap();
    fs::write(reference.join("b_right"), &right).unwrap();
    fs::write(work.join("copy_of_right"), &right).unwrap();

    let mut session: ScanSession<Vec<u8>> =
        ScanSession::new(EngineConfig::new(Mode::Report)).unwrap();
    session.scan_reference(&reference).unwrap();
    session.scan_path(&work).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.signature_collisions, 1);
    assert_eq!(report.summary.duplicate_files, 1);
}
