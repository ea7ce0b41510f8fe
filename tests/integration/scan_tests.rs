use finddupe::actions::Mode;
use finddupe::duplicates::{EngineConfig, GroupKey, ScanSession};
use finddupe::scanner::{compute_signature, SIGNATURE_WINDOW};
use std::fs;
use tempfile::tempdir;

fn session(config: EngineConfig) -> ScanSession<Vec<u8>> {
    ScanSession::new(config).unwrap()
}

#[test]
fn test_report_mode_leaves_files_untouched() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "hello").unwrap();
    fs::write(dir.path().join("b"), "hello").unwrap();
    fs::write(dir.path().join("c"), "world").unwrap();

    let mut session = session(EngineConfig::new(Mode::Report));
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.duplicate_files, 1);
    for name in ["a", "b", "c"] {
        assert!(dir.path().join(name).exists());
    }
}

#[test]
fn test_prefix_collision_keeps_both_files() {
    let dir = tempdir().unwrap();
    let mut first = vec![0x5au8; 40_000];
    let mut second = first.clone();
    first[39_999] = 1;
    second[39_999] = 2;
    fs::write(dir.path().join("x1"), &first).unwrap();
    fs::write(dir.path().join("x2"), &second).unwrap();

    let (sig1, _) = compute_signature(&dir.path().join("x1")).unwrap();
    let (sig2, _) = compute_signature(&dir.path().join("x2")).unwrap();
    assert_eq!(sig1, sig2, "difference lies beyond the {} byte window", SIGNATURE_WINDOW);

    let mut session = session(EngineConfig::new(Mode::Report));
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.duplicate_files, 0);
    assert_eq!(report.summary.signature_collisions, 1);
    let chain = report.index.chain(&GroupKey::Content(sig1));
    assert_eq!(chain.len(), 2);
    let paths: Vec<_> = chain
        .iter()
        .map(|&id| report.index.get(id).unwrap().path.file_name().unwrap().to_owned())
        .collect();
    assert_eq!(paths, vec!["x1", "x2"]);
}

#[test]
fn test_zero_length_files_skipped_by_default() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("e1"), "").unwrap();
    fs::write(dir.path().join("e2"), "").unwrap();
    fs::write(dir.path().join("f"), "data").unwrap();

    let mut session = session(EngineConfig::default());
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.zero_length_files, 2);
    assert_eq!(report.summary.total_files, 1);
    assert_eq!(report.summary.duplicate_files, 0);
}

#[test]
fn test_zero_length_files_are_duplicates_when_kept() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("e1"), "").unwrap();
    fs::write(dir.path().join("e2"), "").unwrap();

    let mut session = session(EngineConfig::default().with_skip_zero_length(false));
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.zero_length_files, 0);
    assert_eq!(report.summary.total_files, 2);
    assert_eq!(report.summary.duplicate_files, 1);
    assert_eq!(report.summary.duplicate_bytes, 0);
}

#[test]
fn test_existing_hardlinks_need_no_comparison() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, "shared content").unwrap();
    if let Err(e) = fs::hard_link(&a, &b) {
        eprintln!("Skipping hardlink test: failed to create hardlink: {}", e);
        return;
    }

    let mut session = session(EngineConfig::default());
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.hardlinked_instances, 1);
    assert_eq!(report.summary.duplicate_files, 0);
    assert_eq!(report.summary.byte_comparisons, 0);
}

#[test]
fn test_multiple_roots_scanned_in_order() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    fs::create_dir(&first).unwrap();
    fs::create_dir(&second).unwrap();
    fs::write(second.join("copy"), "payload").unwrap();
    fs::write(first.join("orig"), "payload").unwrap();

    let mut session = session(EngineConfig::new(Mode::Report));
    session.scan_path(&first).unwrap();
    session.scan_path(&second).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(report.summary.duplicate_files, 1);
    let kept: Vec<_> = report.index.records().iter().map(|r| r.path.clone()).collect();
    assert_eq!(kept, vec![first.join("orig")]);
}

#[test]
fn test_ignored_files_not_scanned() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "x").unwrap();
    fs::write(dir.path().join("b.tmp"), "x").unwrap();

    let config = EngineConfig::default().with_walker_config(
        finddupe::scanner::WalkerConfig::default().with_ignore_patterns(vec!["*.tmp".into()]),
    );
    let mut session = session(config);
    assert_eq!(session.scan_path(dir.path()).unwrap(), 1);
    let report = session.finish().unwrap();

    assert_eq!(report.summary.total_files, 1);
    assert_eq!(report.summary.duplicate_files, 0);
}

#[test]
fn test_missing_root_counts_walk_error() {
    let dir = tempdir().unwrap();
    let mut session = session(EngineConfig::default());
    let matched = session.scan_path(&dir.path().join("nope")).unwrap();
    let report = session.finish().unwrap();

    assert_eq!(matched, 0);
    assert_eq!(report.summary.walk_errors, 1);
}
