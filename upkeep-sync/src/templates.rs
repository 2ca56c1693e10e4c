//! Template set synchronizer.
//!
//! Resolves, fetches and replaces every manifest entry in order. Entries are
//! independent: an absent fetch or a filesystem error is recorded against
//! that entry and the run moves on.

use std::path::{Path, PathBuf};

use upkeep_core::{EntryName, Manifest, RepositoryReference, VersionQualifier};

use crate::error::SyncError;
use crate::fetcher::Fetcher;
use crate::writer::{self, BackupPolicy, ReplaceOutcome};

/// Knobs shared by every entry of one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub raw_base: String,
    pub policy: BackupPolicy,
    pub dry_run: bool,
}

/// What happened to one manifest entry.
#[derive(Debug)]
pub struct EntryReport {
    pub name: EntryName,
    pub address: String,
    pub path: PathBuf,
    pub result: Result<ReplaceOutcome, SyncError>,
}

/// Aggregate result of a template sync, in manifest order.
#[derive(Debug)]
pub struct TemplateSyncReport {
    pub repository: RepositoryReference,
    pub qualifier: VersionQualifier,
    pub entries: Vec<EntryReport>,
}

impl TemplateSyncReport {
    /// Result for the entry called `name`.
    pub fn outcome(&self, name: &str) -> Option<&Result<ReplaceOutcome, SyncError>> {
        self.entries
            .iter()
            .find(|e| e.name.0 == name)
            .map(|e| &e.result)
    }

    /// Number of entries whose outcome carries `label` (see [`ReplaceOutcome::label`]).
    pub fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.result, Ok(o) if o.label() == label))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| e.result.is_err())
    }
}

/// Sync every entry of `manifest` from `repository` at `qualifier` into `root`.
///
/// Never fails as a whole; per-entry errors live in the report.
pub fn sync_templates<F: Fetcher>(
    repository: &RepositoryReference,
    qualifier: &VersionQualifier,
    manifest: &Manifest,
    root: &Path,
    fetcher: &F,
    options: &SyncOptions,
) -> TemplateSyncReport {
    let mut entries = Vec::with_capacity(manifest.len());

    for entry in manifest {
        let address = repository.raw_address(&options.raw_base, qualifier, &entry.remote_path());
        let path = entry.local_path(root);
        let fetched = fetcher.fetch(&address);
        let result = writer::replace(&path, &fetched, options.policy, options.dry_run);

        match &result {
            Ok(outcome) => tracing::info!("{}: {}", entry.name, outcome.label()),
            Err(e) => tracing::error!("{}: {e}", entry.name),
        }

        entries.push(EntryReport {
            name: entry.name.clone(),
            address,
            path,
            result,
        });
    }

    TemplateSyncReport {
        repository: repository.clone(),
        qualifier: qualifier.clone(),
        entries,
    }
}

/// [`sync_templates`] from a repository URL; a malformed URL aborts before
/// any fetch.
pub fn sync_all<F: Fetcher>(
    repository_url: &str,
    qualifier: &VersionQualifier,
    manifest: &Manifest,
    root: &Path,
    fetcher: &F,
    options: &SyncOptions,
) -> Result<TemplateSyncReport, SyncError> {
    let repository = RepositoryReference::parse(repository_url)?;
    Ok(sync_templates(&repository, qualifier, manifest, root, fetcher, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchResult;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;
    use upkeep_core::{CoreError, ManifestEntry, DEFAULT_RAW_BASE};

    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl Fetcher for MapFetcher {
        fn fetch(&self, address: &str) -> FetchResult {
            self.calls.borrow_mut().push(address.to_owned());
            self.files.get(address).cloned().into()
        }
    }

    fn options() -> SyncOptions {
        SyncOptions {
            raw_base: DEFAULT_RAW_BASE.to_owned(),
            policy: BackupPolicy::TEMPLATES,
            dry_run: false,
        }
    }

    fn manifest() -> Manifest {
        Manifest::new(vec![
            ManifestEntry::new("repos.yaml", "odoo/custom/src/repos.yaml"),
            ManifestEntry::new("apt.txt", "odoo/custom/dependencies/apt.txt"),
        ])
        .unwrap()
    }

    #[test]
    fn fetches_in_manifest_order_from_qualified_addresses() {
        let root = TempDir::new().unwrap();
        let fetcher = MapFetcher::default();
        let report = sync_all(
            "https://github.com/acme/tpl",
            &VersionQualifier::from("16.0"),
            &manifest(),
            root.path(),
            &fetcher,
            &options(),
        )
        .unwrap();

        assert_eq!(
            *fetcher.calls.borrow(),
            vec![
                "https://raw.githubusercontent.com/acme/tpl/16.0/odoo/custom/src/repos.yaml",
                "https://raw.githubusercontent.com/acme/tpl/16.0/odoo/custom/dependencies/apt.txt",
            ]
        );
        assert_eq!(report.count("skipped-absent"), 2);
    }

    #[test]
    fn malformed_url_aborts_without_fetching() {
        let root = TempDir::new().unwrap();
        let fetcher = MapFetcher::default();
        let err = sync_all(
            "https://github.com/acme",
            &VersionQualifier::from("16.0"),
            &manifest(),
            root.path(),
            &fetcher,
            &options(),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::MalformedReference { .. })));
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn filesystem_error_on_one_entry_does_not_stop_the_next() {
        let root = TempDir::new().unwrap();
        // A directory where a file should be makes the first replace fail.
        fs::create_dir_all(root.path().join("odoo/custom/src/repos.yaml")).unwrap();

        let mut fetcher = MapFetcher::default();
        let base = "https://raw.githubusercontent.com/acme/tpl/16.0";
        fetcher.files.insert(format!("{base}/odoo/custom/src/repos.yaml"), "a".into());
        fetcher.files.insert(format!("{base}/odoo/custom/dependencies/apt.txt"), "b".into());

        let report = sync_all(
            "https://github.com/acme/tpl",
            &VersionQualifier::from("16.0"),
            &manifest(),
            root.path(),
            &fetcher,
            &options(),
        )
        .unwrap();

        assert!(report.outcome("repos.yaml").unwrap().is_err());
        assert!(matches!(
            report.outcome("apt.txt"),
            Some(Ok(ReplaceOutcome::Written { .. }))
        ));
        assert_eq!(report.failures().count(), 1);
    }
}
