//! Safe replace engine.
//!
//! ## `replace` — write protocol
//!
//! 1. `Absent` content → `SkippedAbsent`, nothing touched.
//! 2. Compare with the current bytes → `SkippedIdentical` if equal.
//! 3. Write the new content to `<path>.upkeep.tmp` (keeping the old mode).
//! 4. If backing up, rename the original to `<name>.bak.<YYYYMMDDHHMMSS>`.
//! 5. Rename the tmp file onto `<path>` (atomic on POSIX). On failure the
//!    backup is moved back, so `<path>` holds the old or the new content,
//!    never neither.
//!
//! Backups are never deleted by this crate.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{io_err, SyncError};
use crate::fetcher::FetchResult;

const TMP_SUFFIX: &str = ".upkeep.tmp";
const BACKUP_MARKER: &str = ".bak.";
const BACKUP_STAMP: &str = "%Y%m%d%H%M%S";

// ---------------------------------------------------------------------------
// Policy and outcomes
// ---------------------------------------------------------------------------

/// Whether to short-circuit on identical content and whether to keep the
/// previous version before overwriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupPolicy {
    pub compare_before_write: bool,
    pub backup_before_overwrite: bool,
}

impl BackupPolicy {
    /// Template files: skip identical content, overwrite without backup.
    pub const TEMPLATES: Self = Self {
        compare_before_write: true,
        backup_before_overwrite: false,
    };

    /// The automation script: skip identical content, always back up.
    pub const SELF_UPDATE: Self = Self {
        compare_before_write: true,
        backup_before_overwrite: true,
    };
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self::TEMPLATES
    }
}

/// A preserved prior version of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an individual replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplaceOutcome {
    /// New content is on disk; `backup` is set when the old file was kept.
    Written {
        path: PathBuf,
        backup: Option<BackupRecord>,
    },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
    /// Local content already matches upstream.
    SkippedIdentical { path: PathBuf },
    /// Nothing was fetched for this path.
    SkippedAbsent { path: PathBuf },
}

impl ReplaceOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ReplaceOutcome::Written { path, .. }
            | ReplaceOutcome::WouldWrite { path }
            | ReplaceOutcome::SkippedIdentical { path }
            | ReplaceOutcome::SkippedAbsent { path } => path,
        }
    }

    /// Short name for reports.
    pub fn label(&self) -> &'static str {
        match self {
            ReplaceOutcome::Written { backup: Some(_), .. } => "backed-up",
            ReplaceOutcome::Written { backup: None, .. } => "written",
            ReplaceOutcome::WouldWrite { .. } => "would-write",
            ReplaceOutcome::SkippedIdentical { .. } => "skipped-identical",
            ReplaceOutcome::SkippedAbsent { .. } => "skipped-absent",
        }
    }
}

// ---------------------------------------------------------------------------
// replace
// ---------------------------------------------------------------------------

/// Replace `path` with fetched `content` according to `policy`.
pub fn replace(
    path: &Path,
    content: &FetchResult,
    policy: BackupPolicy,
    dry_run: bool,
) -> Result<ReplaceOutcome, SyncError> {
    replace_at(path, content, policy, dry_run, Utc::now())
}

pub(crate) fn replace_at(
    path: &Path,
    content: &FetchResult,
    policy: BackupPolicy,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<ReplaceOutcome, SyncError> {
    replace_with_tmp(path, content, policy, dry_run, now, &tmp_path(path))
}

fn replace_with_tmp(
    path: &Path,
    content: &FetchResult,
    policy: BackupPolicy,
    dry_run: bool,
    now: DateTime<Utc>,
    tmp: &Path,
) -> Result<ReplaceOutcome, SyncError> {
    let Some(new) = content.content() else {
        tracing::debug!("absent: {}", path.display());
        return Ok(ReplaceOutcome::SkippedAbsent {
            path: path.to_path_buf(),
        });
    };
    let new = new.as_bytes();

    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(path, e)),
    };

    if policy.compare_before_write && existing.is_some() {
        let current = fs::read(path).map_err(|e| io_err(path, e))?;
        if current == new {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(ReplaceOutcome::SkippedIdentical {
                path: path.to_path_buf(),
            });
        }
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(ReplaceOutcome::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    // Step 3: full content to the tmp file first.
    if let Err(e) = write_tmp(tmp, new, existing.as_ref().map(|m| m.permissions())) {
        let _ = fs::remove_file(tmp);
        return Err(e);
    }

    // Step 4: move the original aside.
    let backup = match existing {
        Some(_) if policy.backup_before_overwrite => {
            let backup_path = backup_path_for(path, now);
            if let Err(e) = fs::rename(path, &backup_path) {
                let _ = fs::remove_file(tmp);
                return Err(io_err(&backup_path, e));
            }
            tracing::info!("backed up {} to {}", path.display(), backup_path.display());
            Some(BackupRecord {
                original: path.to_path_buf(),
                backup: backup_path,
                created_at: now,
            })
        }
        _ => None,
    };

    finish_rename(path, tmp, backup)
}

/// Step 5: rename into place, moving the backup back on failure.
fn finish_rename(
    path: &Path,
    tmp: &Path,
    backup: Option<BackupRecord>,
) -> Result<ReplaceOutcome, SyncError> {
    if let Err(e) = fs::rename(tmp, path) {
        if let Some(record) = &backup {
            if let Err(restore) = fs::rename(&record.backup, path) {
                tracing::error!(
                    "could not restore {} from {}: {restore}",
                    path.display(),
                    record.backup.display()
                );
            }
        }
        let _ = fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(ReplaceOutcome::Written {
        path: path.to_path_buf(),
        backup,
    })
}

fn write_tmp(tmp: &Path, content: &[u8], permissions: Option<fs::Permissions>) -> Result<(), SyncError> {
    if let Some(tmp_parent) = tmp.parent() {
        fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    if let Some(perms) = permissions {
        fs::set_permissions(tmp, perms).map_err(|e| io_err(tmp, e))?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()))
}

/// `<dir>/<name>.bak.<YYYYMMDDHHMMSS>`, with `-1`, `-2`, … appended while
/// the name is taken.
pub fn backup_path_for(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = format!("{name}{BACKUP_MARKER}{}", now.format(BACKUP_STAMP));
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut candidate = dir.join(&stem);
    let mut n = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}-{n}"));
        n += 1;
    }
    candidate
}

/// Backups of `path` currently on disk, oldest first.
pub fn list_backups(path: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(vec![]);
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.exists() {
        return Ok(vec![]);
    }
    let prefix = format!("{name}{BACKUP_MARKER}");
    let mut backups: Vec<(String, u32, PathBuf)> = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let file_name = e.file_name().to_string_lossy().into_owned();
            let suffix = file_name.strip_prefix(&prefix)?;
            let (stamp, n) = backup_order(suffix);
            Some((stamp.to_owned(), n, e.path()))
        })
        .collect();
    backups.sort();
    Ok(backups.into_iter().map(|(_, _, path)| path).collect())
}

/// Split a backup suffix into its stamp and collision counter, so that
/// `<stamp>-10` orders after `<stamp>-2`. A bare stamp counts as 0.
fn backup_order(suffix: &str) -> (&str, u32) {
    match suffix.rsplit_once('-') {
        Some((stamp, n)) => match n.parse() {
            Ok(n) => (stamp, n),
            Err(_) => (suffix, 0),
        },
        None => (suffix, 0),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
