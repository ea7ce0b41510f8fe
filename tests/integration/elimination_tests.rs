use finddupe::actions::{Mode, Remedy};
use finddupe::duplicates::{EngineConfig, ScanSession};
use finddupe::scanner::resolve_identity;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run(root: &Path, config: EngineConfig) -> finddupe::duplicates::ScanSummary {
    let mut session: ScanSession<Vec<u8>> = ScanSession::new(config).unwrap();
    session.scan_path(root).unwrap();
    session.finish().unwrap().summary
}

fn links(path: &Path) -> u64 {
    resolve_identity(path).unwrap().links
}

#[test]
fn test_delete_mode_removes_later_copy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "hello").unwrap();
    fs::write(dir.path().join("b"), "hello").unwrap();
    fs::write(dir.path().join("c"), "world").unwrap();

    let summary = run(dir.path(), EngineConfig::new(Mode::Eliminate(Remedy::Delete)));

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.eliminated_files, 1);
    assert_eq!(summary.reclaimed_bytes, 5);
    assert!(dir.path().join("a").exists());
    assert!(!dir.path().join("b").exists());
    assert!(dir.path().join("c").exists());
}

#[test]
fn test_hardlink_mode_links_later_copy() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, "same bytes").unwrap();
    fs::write(&b, "same bytes").unwrap();

    let summary = run(dir.path(), EngineConfig::new(Mode::Eliminate(Remedy::Hardlink)));

    assert_eq!(summary.eliminated_files, 1);
    assert_eq!(fs::read(&b).unwrap(), b"same bytes");
    let (ia, ib) = (resolve_identity(&a).unwrap(), resolve_identity(&b).unwrap());
    if ia.links > 0 {
        assert!(ia.same_file(&ib));
        assert_eq!(ia.links, 2);
    }
}

#[test]
fn test_second_hardlink_run_changes_nothing() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), "triplicate").unwrap();
    }
    let config = EngineConfig::new(Mode::Eliminate(Remedy::Hardlink));

    let first = run(dir.path(), config.clone());
    assert_eq!(first.eliminated_files, 2);
    if links(&dir.path().join("a")) == 0 {
        return;
    }

    let second = run(dir.path(), config);
    assert_eq!(second.eliminated_files, 0);
    assert_eq!(second.duplicate_files, 0);
    assert_eq!(second.hardlinked_instances, 2);
    assert_eq!(second.byte_comparisons, 0);
    assert_eq!(links(&dir.path().join("a")), 3);
}

#[test]
fn test_link_limit_leaves_duplicate_untouched() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, "limited").unwrap();
    fs::write(&b, "limited").unwrap();
    if let Err(e) = fs::hard_link(&a, outside.path().join("a_link")) {
        eprintln!("Skipping hardlink test: failed to create hardlink: {}", e);
        return;
    }
    if links(&a) != 2 {
        return;
    }

    let summary = run(
        dir.path(),
        EngineConfig::new(Mode::Eliminate(Remedy::Hardlink)).with_link_limit(2),
    );

    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.link_limit_skipped, 1);
    assert_eq!(summary.eliminated_files, 0);
    assert_eq!(links(&b), 1);
    assert_eq!(fs::read(&b).unwrap(), b"limited");
}

#[test]
fn test_link_limit_reached_during_run() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c", "d"] {
        fs::write(dir.path().join(name), "quad").unwrap();
    }
    if links(&dir.path().join("a")) == 0 {
        return;
    }

    let summary = run(
        dir.path(),
        EngineConfig::new(Mode::Eliminate(Remedy::Hardlink)).with_link_limit(2),
    );

    // a+b fill the cap; c is skipped and stays a link target for d.
    assert_eq!(summary.duplicate_files, 3);
    assert_eq!(summary.eliminated_files, 2);
    assert_eq!(summary.link_limit_skipped, 1);
    assert_eq!(links(&dir.path().join("a")), 2);
    assert_eq!(links(&dir.path().join("c")), 2);
    assert!(resolve_identity(&dir.path().join("c"))
        .unwrap()
        .same_file(&resolve_identity(&dir.path().join("d")).unwrap()));
}

#[cfg(unix)]
mod readonly {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn make_readonly(path: &Path) {
        fs::set_permissions(path, fs::Permissions::from_mode(0o444)).unwrap();
    }

    #[test]
    fn test_readonly_duplicate_skipped_by_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), "ro").unwrap();
        fs::write(dir.path().join("b"), "ro").unwrap();
        make_readonly(&dir.path().join("b"));

        let summary = run(dir.path(), EngineConfig::new(Mode::Eliminate(Remedy::Delete)));

        assert_eq!(summary.readonly_skipped, 1);
        assert_eq!(summary.eliminated_files, 0);
        assert!(dir.path().join("b").exists());
    }

    #[test]
    fn test_readonly_duplicate_relinked_when_allowed() {
        let dir = tempdir().unwrap();
        let b = dir.path().join("b");
        fs::write(dir.path().join("a"), "ro").unwrap();
        fs::write(&b, "ro").unwrap();
        make_readonly(&b);

        let summary = run(
            dir.path(),
            EngineConfig::new(Mode::Eliminate(Remedy::Hardlink)).with_allow_readonly(true),
        );

        assert_eq!(summary.eliminated_files, 1);
        assert_eq!(links(&b), 2);
        let mode = fs::metadata(&b).unwrap().permissions().mode();
        assert_eq!(mode & 0o200, 0, "read-only state restored");
    }

    #[test]
    fn test_deleting_extra_name_keeps_shared_inode_readonly() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "ro").unwrap();
        fs::hard_link(&a, &b).unwrap();
        make_readonly(&a);

        let summary = run(
            dir.path(),
            EngineConfig::new(Mode::Eliminate(Remedy::Delete)).with_allow_readonly(true),
        );

        assert_eq!(summary.eliminated_files, 1);
        assert!(!b.exists());
        let mode = fs::metadata(&a).unwrap().permissions().mode();
        assert_eq!(mode & 0o222, 0);
    }
}

#[test]
fn test_overlapping_roots_never_delete_the_only_copy() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let only = sub.join("only.txt");
    fs::write(&only, "irreplaceable").unwrap();

    let mut session: ScanSession<Vec<u8>> =
        ScanSession::new(EngineConfig::new(Mode::Eliminate(Remedy::Delete))).unwrap();
    session.scan_path(dir.path()).unwrap();
    session.scan_path(&sub).unwrap();
    let summary = session.finish().unwrap().summary;

    assert_eq!(summary.eliminated_files, 0);
    assert_eq!(summary.reclaimed_bytes, 0);
    assert_eq!(fs::read_to_string(&only).unwrap(), "irreplaceable");
}

#[test]
fn test_long_file_name_is_relinked() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let long = dir.path().join("n".repeat(250));
    fs::write(&a, "long name").unwrap();
    fs::write(&long, "long name").unwrap();

    let summary = run(dir.path(), EngineConfig::new(Mode::Eliminate(Remedy::Hardlink)));

    assert_eq!(summary.eliminated_files, 1);
    assert_eq!(links(&a), 2);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
}
