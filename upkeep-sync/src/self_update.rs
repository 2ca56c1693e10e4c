//! Self-updater: keeps the project's automation script current with upstream.
//!
//! ```text
//! Idle --fetch--> Fetched | FetchFailed
//! Fetched --compare--> UpToDate | NeedsWrite
//! NeedsWrite --backup--> BackedUp --write--> Updated
//! ```
//!
//! Content is always compared first and the previous script is always kept
//! as a timestamped sibling. Backups are left for the operator to delete.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use upkeep_core::{check_relative_path, CoreError, RepositoryReference, VersionQualifier};

use crate::error::SyncError;
use crate::fetcher::Fetcher;
use crate::writer::{self, BackupPolicy, BackupRecord, ReplaceOutcome};

/// Terminal state of a self-update run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Upstream content matches the local script.
    UpToDate { path: PathBuf },
    /// The script was replaced. `backup` is `None` only when there was no
    /// previous script to keep.
    Updated {
        path: PathBuf,
        backup: Option<BackupRecord>,
    },
    /// `--dry-run`: the script differs and would be replaced.
    WouldUpdate { path: PathBuf },
    /// Nothing could be fetched from `address`.
    FetchFailed { address: String },
}

/// Where the script lives, locally and upstream.
#[derive(Debug, Clone)]
pub struct ScriptTarget<'a> {
    pub root: &'a Path,
    /// Relative to `root`; the same relative path is fetched upstream.
    pub script: &'a Path,
    pub raw_base: &'a str,
}

impl ScriptTarget<'_> {
    fn local_path(&self) -> PathBuf {
        self.root.join(self.script)
    }

    fn remote_path(&self) -> String {
        self.script
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Fetch the script at `branch` and replace the local copy if it changed.
///
/// The project root must already exist and the script path must stay under
/// it; both are checked before anything is fetched.
pub fn update_script<F: Fetcher>(
    repository: &RepositoryReference,
    branch: &VersionQualifier,
    target: &ScriptTarget<'_>,
    fetcher: &F,
    dry_run: bool,
) -> Result<UpdateOutcome, SyncError> {
    check_relative_path(target.script).map_err(|reason| CoreError::InvalidScriptPath {
        path: target.script.to_path_buf(),
        reason: reason.to_owned(),
    })?;
    if !target.root.is_dir() {
        return Err(CoreError::MissingProjectFile {
            path: target.root.to_path_buf(),
        }
        .into());
    }

    let address = repository.raw_address(target.raw_base, branch, &target.remote_path());
    let path = target.local_path();

    let fetched = fetcher.fetch(&address);
    if fetched.is_absent() {
        tracing::warn!("self-update: nothing fetched from {address}");
        return Ok(UpdateOutcome::FetchFailed { address });
    }

    let outcome = match writer::replace(&path, &fetched, BackupPolicy::SELF_UPDATE, dry_run)? {
        ReplaceOutcome::SkippedIdentical { path } => UpdateOutcome::UpToDate { path },
        ReplaceOutcome::Written { path, backup } => UpdateOutcome::Updated { path, backup },
        ReplaceOutcome::WouldWrite { path } => UpdateOutcome::WouldUpdate { path },
        ReplaceOutcome::SkippedAbsent { .. } => UpdateOutcome::FetchFailed { address },
    };
    Ok(outcome)
}

/// [`update_script`] from a repository URL; a malformed URL is fatal.
pub fn self_update<F: Fetcher>(
    repository_url: &str,
    branch: &VersionQualifier,
    target: &ScriptTarget<'_>,
    fetcher: &F,
    dry_run: bool,
) -> Result<UpdateOutcome, SyncError> {
    let repository = RepositoryReference::parse(repository_url)?;
    update_script(&repository, branch, target, fetcher, dry_run)
}

/// Shell command an operator can run to drop a backup once satisfied.
pub fn removal_command(backup: &Path) -> String {
    let shown = backup.display().to_string();
    if shown.chars().all(|c| c.is_ascii_alphanumeric() || "/._-".contains(c)) {
        format!("rm {shown}")
    } else {
        format!("rm '{}'", shown.replace('\'', r"'\''"))
    }
}
