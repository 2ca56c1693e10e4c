//! End-to-end behaviour of template sync and self-update against a stub
//! upstream. No network.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;
use upkeep_sync::{
    self_update, sync_all, writer::list_backups, BackupPolicy, FetchResult, Fetcher,
    ReplaceOutcome, ScriptTarget, SyncOptions, UpdateOutcome,
};
use upkeep_core::{Manifest, ManifestEntry, VersionQualifier, DEFAULT_RAW_BASE};

const REPO: &str = "https://github.com/acme/doodba-template";
const BASE: &str = "https://raw.githubusercontent.com/acme/doodba-template";

/// In-memory upstream keyed by full address.
#[derive(Default)]
struct Upstream {
    files: RefCell<HashMap<String, String>>,
}

impl Upstream {
    fn put(&self, address: String, content: &str) {
        self.files.borrow_mut().insert(address, content.to_owned());
    }
}

impl Fetcher for Upstream {
    fn fetch(&self, address: &str) -> FetchResult {
        self.files.borrow().get(address).cloned().into()
    }
}

fn manifest() -> Manifest {
    Manifest::new(vec![
        ManifestEntry::new("repos.yaml", "odoo/custom/src/repos.yaml"),
        ManifestEntry::new("apt.txt", "odoo/custom/dependencies/apt.txt"),
        ManifestEntry::new("pip.txt", "odoo/custom/dependencies/pip.txt"),
    ])
    .expect("manifest")
}

fn options(policy: BackupPolicy) -> SyncOptions {
    SyncOptions {
        raw_base: DEFAULT_RAW_BASE.to_owned(),
        policy,
        dry_run: false,
    }
}

fn count_files(dir: &Path) -> usize {
    let mut n = 0;
    for entry in std::fs::read_dir(dir).expect("read_dir") {
        let entry = entry.expect("entry");
        if entry.file_type().expect("type").is_dir() {
            n += count_files(&entry.path());
        } else {
            n += 1;
        }
    }
    n
}

// ---------------------------------------------------------------------------
// 1. Template sync
// ---------------------------------------------------------------------------

#[test]
fn second_run_is_all_skipped_identical_and_creates_no_backups() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let upstream = Upstream::default();
    for entry in manifest().entries() {
        upstream.put(format!("{BASE}/16.0/{}", entry.remote_path()), &format!("# {}\n", entry.name));
    }
    let q = VersionQualifier::from("16.0");
    let backing_up = options(BackupPolicy::SELF_UPDATE);

    let first = sync_all(REPO, &q, &manifest(), root.path(), &upstream, &backing_up).expect("first");
    assert_eq!(first.count("written"), 3);
    let files_after_first = count_files(root.path());

    let second = sync_all(REPO, &q, &manifest(), root.path(), &upstream, &backing_up).expect("second");
    assert_eq!(second.count("skipped-identical"), 3);
    assert_eq!(count_files(root.path()), files_after_first, "no new backup files");
}

#[test]
fn matching_local_content_is_left_byte_identical() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let apt = root.child("odoo/custom/dependencies/apt.txt");
    apt.write_str("curl\r\ngit\n").unwrap();

    let upstream = Upstream::default();
    upstream.put(format!("{BASE}/16.0/odoo/custom/dependencies/apt.txt"), "curl\r\ngit\n");

    let report = sync_all(
        REPO,
        &VersionQualifier::from("16.0"),
        &manifest(),
        root.path(),
        &upstream,
        &options(BackupPolicy::SELF_UPDATE),
    )
    .expect("sync");

    assert!(matches!(
        report.outcome("apt.txt"),
        Some(Ok(ReplaceOutcome::SkippedIdentical { .. }))
    ));
    apt.assert("curl\r\ngit\n");
    assert!(list_backups(apt.path()).unwrap().is_empty());
}

#[test]
fn absent_middle_entry_does_not_block_the_others() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("odoo/custom/dependencies/pip.txt").write_str("requests\n").unwrap();

    let upstream = Upstream::default();
    upstream.put(format!("{BASE}/16.0/odoo/custom/src/repos.yaml"), "./odoo: {}\n");
    upstream.put(format!("{BASE}/16.0/odoo/custom/dependencies/pip.txt"), "requests\n");

    let report = sync_all(
        REPO,
        &VersionQualifier::from("16.0"),
        &manifest(),
        root.path(),
        &upstream,
        &options(BackupPolicy::TEMPLATES),
    )
    .expect("partial failure must not raise");

    let labels: Vec<_> = report
        .entries
        .iter()
        .map(|e| e.result.as_ref().map(|o| o.label()).unwrap_or("error"))
        .collect();
    assert_eq!(labels, ["written", "skipped-absent", "skipped-identical"]);
    root.child("odoo/custom/dependencies/apt.txt").assert(predicate::path::missing());
    root.child("odoo/custom/src/repos.yaml").assert("./odoo: {}\n");
}

#[test]
fn qualifier_selects_the_snapshot() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let upstream = Upstream::default();
    upstream.put(format!("{BASE}/15.0/odoo/custom/dependencies/apt.txt"), "v15\n");
    upstream.put(format!("{BASE}/16.0/odoo/custom/dependencies/apt.txt"), "v16\n");

    sync_all(
        REPO,
        &VersionQualifier::from("15.0"),
        &manifest(),
        root.path(),
        &upstream,
        &options(BackupPolicy::TEMPLATES),
    )
    .expect("sync");
    root.child("odoo/custom/dependencies/apt.txt").assert("v15\n");
}

#[test]
fn templates_with_backup_keep_the_previous_version() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let apt = root.child("odoo/custom/dependencies/apt.txt");
    apt.write_str("old\n").unwrap();

    let upstream = Upstream::default();
    upstream.put(format!("{BASE}/16.0/odoo/custom/dependencies/apt.txt"), "new\n");

    let report = sync_all(
        REPO,
        &VersionQualifier::from("16.0"),
        &manifest(),
        root.path(),
        &upstream,
        &options(BackupPolicy::SELF_UPDATE),
    )
    .expect("sync");

    let Some(Ok(ReplaceOutcome::Written { backup: Some(record), .. })) = report.outcome("apt.txt")
    else {
        panic!("expected backed-up write");
    };
    apt.assert("new\n");
    assert_eq!(std::fs::read_to_string(&record.backup).unwrap(), "old\n");
    assert!(predicate::str::is_match(r"apt\.txt\.bak\.\d{14}$")
        .unwrap()
        .eval(&record.backup.to_string_lossy()));
}

// ---------------------------------------------------------------------------
// 2. Self-update
// ---------------------------------------------------------------------------

fn script_target(root: &Path) -> ScriptTarget<'_> {
    ScriptTarget {
        root,
        script: Path::new("escodoo.py"),
        raw_base: DEFAULT_RAW_BASE,
    }
}

#[test]
fn self_update_replaces_changed_script_and_keeps_backup() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let script = root.child("escodoo.py");
    script.write_str("v1").unwrap();

    let upstream = Upstream::default();
    upstream.put(format!("{BASE}/main/escodoo.py"), "v2");

    let outcome = self_update(
        REPO,
        &VersionQualifier::from("main"),
        &script_target(root.path()),
        &upstream,
        false,
    )
    .expect("self-update");

    let UpdateOutcome::Updated { backup: Some(record), .. } = &outcome else {
        panic!("expected Updated with backup, got {outcome:?}");
    };
    script.assert("v2");
    assert_eq!(std::fs::read_to_string(&record.backup).unwrap(), "v1");
    assert_eq!(record.backup.parent(), Some(root.path()));
}

#[test]
fn self_update_with_unchanged_upstream_is_up_to_date() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let script = root.child("escodoo.py");
    script.write_str("v1").unwrap();

    let upstream = Upstream::default();
    upstream.put(format!("{BASE}/main/escodoo.py"), "v1");

    let outcome = self_update(
        REPO,
        &VersionQualifier::from("main"),
        &script_target(root.path()),
        &upstream,
        false,
    )
    .expect("self-update");

    assert_eq!(
        outcome,
        UpdateOutcome::UpToDate {
            path: script.path().to_path_buf()
        }
    );
    script.assert("v1");
    assert_eq!(count_files(root.path()), 1, "no backup file may be created");
}

#[test]
fn self_update_never_deletes_earlier_backups() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let script = root.child("escodoo.py");
    script.write_str("v1").unwrap();
    let upstream = Upstream::default();

    for next in ["v2", "v3"] {
        upstream.put(format!("{BASE}/main/escodoo.py"), next);
        self_update(
            REPO,
            &VersionQualifier::from("main"),
            &script_target(root.path()),
            &upstream,
            false,
        )
        .expect("self-update");
    }

    script.assert("v3");
    let backups = list_backups(script.path()).unwrap();
    assert_eq!(backups.len(), 2);
    let kept: Vec<_> = backups
        .iter()
        .map(|b| std::fs::read_to_string(b).unwrap())
        .collect();
    assert_eq!(kept, ["v1", "v2"]);
}
