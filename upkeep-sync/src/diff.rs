//! Preview support for `upkeep diff`: what a template sync would change.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use upkeep_core::{EntryName, Manifest, RepositoryReference, VersionQualifier};

use crate::{error::io_err, fetcher::Fetcher, SyncError};

/// A single entry whose upstream content differs from the local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub name: EntryName,
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Diff result for a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateDiff {
    pub diffs: Vec<FileDiff>,
    /// Entries for which nothing could be fetched.
    pub absent: Vec<EntryName>,
    /// Entries whose local file could not be read, with the error message.
    pub failed: Vec<(EntryName, String)>,
}

/// Fetch every manifest entry and compare it to current on-disk content.
///
/// No files are written. A local file that cannot be read is recorded in
/// [`TemplateDiff::failed`] and the remaining entries are still compared.
/// A missing local file always counts as a difference, since sync would
/// create it even when upstream is empty.
pub fn diff_templates<F: Fetcher>(
    repository: &RepositoryReference,
    qualifier: &VersionQualifier,
    manifest: &Manifest,
    root: &Path,
    fetcher: &F,
    raw_base: &str,
) -> Result<TemplateDiff, SyncError> {
    let mut result = TemplateDiff::default();

    for entry in manifest {
        let address = repository.raw_address(raw_base, qualifier, &entry.remote_path());
        let fetched = fetcher.fetch(&address);
        let Some(upstream) = fetched.content() else {
            result.absent.push(entry.name.clone());
            continue;
        };

        let path = entry.local_path(root);
        let existing = match read_existing(&path) {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!("{}: {err}", entry.name);
                result.failed.push((entry.name.clone(), err.to_string()));
                continue;
            }
        };
        if existing.as_deref().map(str::as_bytes) == Some(upstream.as_bytes()) {
            continue;
        }

        let remote = entry.remote_path();
        let old_header = match existing {
            Some(_) => format!("a/{remote}"),
            None => "/dev/null".to_owned(),
        };
        let new_header = format!("b/{remote}");
        let mut unified = TextDiff::from_lines(existing.as_deref().unwrap_or(""), upstream)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();
        // An empty new file has no hunks, so the header is written by hand.
        if unified.is_empty() {
            unified = format!("--- {old_header}\n+++ {new_header}\n");
        }

        result.diffs.push(FileDiff {
            name: entry.name.clone(),
            path,
            unified_diff: unified,
        });
    }

    Ok(result)
}

fn read_existing(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
