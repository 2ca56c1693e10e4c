//! Settings-driven entrypoints used by the CLI.
//!
//! Ordering matters: the repository URL is parsed, then preflight and the
//! version gate run, and only then is anything fetched.

use upkeep_core::{preflight, Settings};

use crate::diff::{diff_templates, TemplateDiff};
use crate::fetcher::Fetcher;
use crate::self_update::{update_script, ScriptTarget, UpdateOutcome};
use crate::templates::{sync_templates, SyncOptions, TemplateSyncReport};
use crate::writer::BackupPolicy;
use crate::SyncError;

/// Run a template sync for the configured repository and manifest.
pub fn run_templates<F: Fetcher>(
    settings: &Settings,
    fetcher: &F,
    policy: BackupPolicy,
    dry_run: bool,
) -> Result<TemplateSyncReport, SyncError> {
    let repository = settings.repository()?;
    preflight(settings)?;
    let qualifier = settings.qualifier()?;
    tracing::info!("syncing templates from {repository} at {qualifier}");

    let options = SyncOptions {
        raw_base: settings.raw_base.clone(),
        policy,
        dry_run,
    };
    Ok(sync_templates(
        &repository,
        &qualifier,
        &settings.manifest,
        &settings.root,
        fetcher,
        &options,
    ))
}

/// Preview a template sync without writing.
pub fn run_diff<F: Fetcher>(settings: &Settings, fetcher: &F) -> Result<TemplateDiff, SyncError> {
    let repository = settings.repository()?;
    preflight(settings)?;
    let qualifier = settings.qualifier()?;
    diff_templates(
        &repository,
        &qualifier,
        &settings.manifest,
        &settings.root,
        fetcher,
        &settings.raw_base,
    )
}

/// Update the automation script from its configured branch.
pub fn run_self_update<F: Fetcher>(
    settings: &Settings,
    fetcher: &F,
    dry_run: bool,
) -> Result<UpdateOutcome, SyncError> {
    let repository = settings.repository()?;
    let branch = settings.script_qualifier();
    tracing::info!(
        "updating {} from {repository} at {branch}",
        settings.script.display()
    );
    let target = ScriptTarget {
        root: &settings.root,
        script: &settings.script,
        raw_base: &settings.raw_base,
    };
    update_script(&repository, &branch, &target, fetcher, dry_run)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use tempfile::TempDir;
    use upkeep_core::{CoreError, Overrides};

    use crate::fetcher::FetchResult;

    use super::*;

    #[derive(Default)]
    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, _address: &str) -> FetchResult {
            self.calls.set(self.calls.get() + 1);
            FetchResult::Absent
        }
    }

    fn settings(root: &TempDir, repo: &str) -> Settings {
        let overrides = Overrides {
            repository: Some(repo.to_owned()),
            ..Overrides::default()
        };
        Settings::resolve_with(root.path(), overrides, |_| None).expect("settings")
    }

    #[test]
    fn unsupported_platform_fails_before_any_fetch() {
        let root = TempDir::new().expect("root");
        fs::write(
            root.path().join("common.yaml"),
            "services:\n  odoo:\n    build:\n      args:\n        ODOO_VERSION: 10.0\n",
        )
        .unwrap();
        let fetcher = CountingFetcher::default();

        let err = run_templates(
            &settings(&root, "https://github.com/acme/tpl"),
            &fetcher,
            BackupPolicy::TEMPLATES,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::UnsupportedPlatform { .. })), "got: {err}");
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn missing_version_file_fails_preflight() {
        let root = TempDir::new().expect("root");
        let fetcher = CountingFetcher::default();
        let err = run_diff(&settings(&root, "https://github.com/acme/tpl"), &fetcher).unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::MissingProjectFile { .. })), "got: {err}");
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn self_update_is_not_version_gated() {
        let root = TempDir::new().expect("root");
        let fetcher = CountingFetcher::default();
        let outcome =
            run_self_update(&settings(&root, "https://github.com/acme/tpl"), &fetcher, false)
                .expect("self-update");
        assert!(matches!(outcome, UpdateOutcome::FetchFailed { .. }));
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn self_update_with_missing_root_fails_before_fetch() {
        let parent = TempDir::new().expect("parent");
        let root = parent.path().join("typo");
        let overrides = Overrides {
            repository: Some("https://github.com/acme/tpl".into()),
            ..Overrides::default()
        };
        let settings = Settings::resolve_with(&root, overrides, |_| None).expect("settings");
        let fetcher = CountingFetcher::default();

        let err = run_self_update(&settings, &fetcher, false).unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::MissingProjectFile { .. })), "got: {err}");
        assert_eq!(fetcher.calls.get(), 0);
        assert!(!root.exists());
    }
}
