use finddupe::actions::{Mode, Remedy};
use finddupe::duplicates::{EngineConfig, FinderError, ScanSession};
use finddupe::output::script::{ScriptType, ScriptWriter};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scripted(root: &Path, remedy: Remedy, script_type: ScriptType) -> (String, usize) {
    let mut writer = ScriptWriter::new(Vec::new(), script_type);
    writer.write_header().unwrap();
    let mut session = ScanSession::new(EngineConfig::new(Mode::Script(remedy)))
        .unwrap()
        .with_script(writer);
    session.scan_path(root).unwrap();
    let report = session.finish().unwrap();
    let script = String::from_utf8(report.script.unwrap()).unwrap();
    (script, report.summary.eliminated_files)
}

#[test]
fn test_posix_delete_script_leaves_files_alone() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, "hello").unwrap();
    fs::write(&b, "hello").unwrap();

    let (script, eliminated) = scripted(dir.path(), Remedy::Delete, ScriptType::Posix);

    assert_eq!(eliminated, 1);
    assert!(script.starts_with("#!/bin/sh\n"));
    assert!(script.contains(&format!("rm -f '{}'\n", b.display())));
    assert!(script.contains(&format!("# duplicate of '{}'\n", a.display())));
    assert!(a.exists() && b.exists());
}

#[test]
fn test_batch_hardlink_script() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("100%.txt");
    let b = dir.path().join("copy.txt");
    fs::write(&a, "percent").unwrap();
    fs::write(&b, "percent").unwrap();

    let (script, _) = scripted(dir.path(), Remedy::Hardlink, ScriptType::Batch);

    let kept = a.display().to_string().replace('%', "%%");
    assert!(script.starts_with("@echo off\n"));
    assert!(script.contains(&format!("del \"{}\"\n", b.display())));
    assert!(script.contains(&format!(
        "fsutil hardlink create \"{}\" \"{}\"\n",
        b.display(),
        kept
    )));
}

#[test]
fn test_hardlink_script_counts_planned_links() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), "three").unwrap();
    }

    let mut writer = ScriptWriter::new(Vec::new(), ScriptType::Posix);
    writer.write_header().unwrap();
    let config = EngineConfig::new(Mode::Script(Remedy::Hardlink)).with_link_limit(2);
    let mut session = ScanSession::new(config).unwrap().with_script(writer);
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    // The script would give `a` a second name; `c` would exceed the cap.
    assert_eq!(report.summary.eliminated_files, 1);
    assert_eq!(report.summary.link_limit_skipped, 1);
    let script = String::from_utf8(report.script.unwrap()).unwrap();
    assert_eq!(script.matches("\nln ").count(), 1);
}

#[test]
fn test_script_mode_requires_writer() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "x").unwrap();

    let mut session: ScanSession<Vec<u8>> =
        ScanSession::new(EngineConfig::new(Mode::Script(Remedy::Delete))).unwrap();
    let result = session.scan_path(dir.path());

    assert!(matches!(result, Err(FinderError::InvalidConfig(_))));
}

#[cfg(unix)]
#[test]
fn test_readonly_link_restored_in_script() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let b = dir.path().join("b");
    fs::write(dir.path().join("a"), "ro").unwrap();
    fs::write(&b, "ro").unwrap();
    fs::set_permissions(&b, fs::Permissions::from_mode(0o444)).unwrap();

    let mut writer = ScriptWriter::new(Vec::new(), ScriptType::Posix);
    writer.write_header().unwrap();
    let config = EngineConfig::new(Mode::Script(Remedy::Hardlink)).with_allow_readonly(true);
    let mut session = ScanSession::new(config).unwrap().with_script(writer);
    session.scan_path(dir.path()).unwrap();
    let report = session.finish().unwrap();

    let script = String::from_utf8(report.script.unwrap()).unwrap();
    assert!(script.contains(&format!("chmod a-w '{}'\n", b.display())));
    // Script mode never changes permissions itself.
    let mode = fs::metadata(&b).unwrap().permissions().mode();
    assert_eq!(mode & 0o222, 0);
}

#[test]
fn test_overlapping_roots_script_no_removal() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("only.txt"), "irreplaceable").unwrap();

    let mut writer = ScriptWriter::new(Vec::new(), ScriptType::Posix);
    writer.write_header().unwrap();
    let mut session = ScanSession::new(EngineConfig::new(Mode::Script(Remedy::Delete)))
        .unwrap()
        .with_script(writer);
    session.scan_path(dir.path()).unwrap();
    session.scan_path(&sub).unwrap();
    let report = session.finish().unwrap();

    let script = String::from_utf8(report.script.unwrap()).unwrap();
    assert_eq!(report.summary.eliminated_files, 0);
    assert!(!script.contains("rm -f"));
}
