//! Layered settings for one invocation.
//!
//! # Precedence
//!
//! For each setting: CLI flag > environment variable > `<root>/.upkeep.yaml`
//! > built-in default. [`Settings::resolve_with`] takes the environment as a
//! lookup function so tests never touch the process environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::address::{RepositoryReference, DEFAULT_RAW_BASE};
use crate::error::{io_err, CoreError};
use crate::types::{check_relative_path, Manifest, ManifestEntry, VersionQualifier};
use crate::version;

pub const CONFIG_FILE: &str = ".upkeep.yaml";
pub const REPOSITORY_ENV: &str = "UPKEEP_REPOSITORY";
pub const BRANCH_ENV: &str = "UPKEEP_BRANCH";

pub const DEFAULT_VERSION_FILE: &str = "common.yaml";
pub const DEFAULT_VERSION_KEY: &str = "services.odoo.build.args.ODOO_VERSION";
pub const DEFAULT_SCRIPT: &str = "escodoo.py";
pub const DEFAULT_SCRIPT_BRANCH: &str = "main";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// On-disk project configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub raw_base: Option<String>,
    pub version_file: Option<PathBuf>,
    pub version_key: Option<String>,
    pub script: Option<PathBuf>,
    pub script_branch: Option<String>,
    pub timeout_secs: Option<u64>,
    pub manifest: Option<Vec<ManifestEntry>>,
}

impl ProjectConfig {
    /// Load `<root>/.upkeep.yaml`, or the default config if it is absent.
    pub fn load_at(root: &Path) -> Result<Self, CoreError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub manifest_file: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub raw_base: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub repository: Option<String>,
    pub branch: Option<String>,
    /// `--branch` alone. Env and config `branch` pin templates only.
    pub branch_flag: Option<String>,
    pub raw_base: String,
    pub version_file: PathBuf,
    pub version_key: String,
    pub script: PathBuf,
    pub script_branch: String,
    pub timeout: Duration,
    pub manifest: Manifest,
}

impl Settings {
    /// Resolve against the real process environment.
    pub fn resolve(root: &Path, overrides: Overrides) -> Result<Self, CoreError> {
        Self::resolve_with(root, overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(root: &Path, overrides: Overrides, env: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = ProjectConfig::load_at(root)?;
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let repository = non_empty(overrides.repository)
            .or_else(|| non_empty(env(REPOSITORY_ENV)))
            .or_else(|| non_empty(file.repository));
        let branch_flag = non_empty(overrides.branch);
        let branch = branch_flag
            .clone()
            .or_else(|| non_empty(env(BRANCH_ENV)))
            .or_else(|| non_empty(file.branch));

        let script = overrides
            .script
            .or(file.script)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT));
        check_relative_path(&script).map_err(|reason| CoreError::InvalidScriptPath {
            path: script.clone(),
            reason: reason.to_owned(),
        })?;

        let manifest = match (overrides.manifest_file, file.manifest) {
            (Some(path), _) => load_manifest(&path)?,
            (None, Some(entries)) => Manifest::new(entries)?,
            (None, None) => Manifest::builtin(),
        };

        let version_file = file
            .version_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VERSION_FILE));

        Ok(Self {
            root: root.to_path_buf(),
            repository,
            branch,
            branch_flag,
            raw_base: overrides
                .raw_base
                .or(file.raw_base)
                .unwrap_or_else(|| DEFAULT_RAW_BASE.to_owned()),
            version_file: root.join(version_file),
            version_key: file
                .version_key
                .unwrap_or_else(|| DEFAULT_VERSION_KEY.to_owned()),
            script,
            script_branch: file
                .script_branch
                .unwrap_or_else(|| DEFAULT_SCRIPT_BRANCH.to_owned()),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            manifest,
        })
    }

    /// Parse the configured repository URL.
    pub fn repository(&self) -> Result<RepositoryReference, CoreError> {
        let url = self.repository.as_deref().ok_or(CoreError::MissingRepository)?;
        RepositoryReference::parse(url)
    }

    pub fn declared_version(&self) -> Result<f64, CoreError> {
        version::read_declared_version(&self.version_file, &self.version_key)
    }

    /// Qualifier for template sync: the branch override, or the gated
    /// declared version.
    pub fn qualifier(&self) -> Result<VersionQualifier, CoreError> {
        version::current_qualifier(|| self.declared_version(), self.branch.as_deref())
    }

    /// Branch the automation script is fetched from: `--branch`, else
    /// `script_branch`.
    pub fn script_qualifier(&self) -> VersionQualifier {
        VersionQualifier::from(
            self.branch_flag
                .clone()
                .unwrap_or_else(|| self.script_branch.clone()),
        )
    }
}

/// Fail fast, before any network access, when the project root or the
/// version file a version-gated command needs is missing.
pub fn preflight(settings: &Settings) -> Result<(), CoreError> {
    if !settings.root.is_dir() {
        return Err(CoreError::MissingProjectFile {
            path: settings.root.clone(),
        });
    }
    if settings.branch.is_none() && !settings.version_file.is_file() {
        return Err(CoreError::MissingProjectFile {
            path: settings.version_file.clone(),
        });
    }
    Ok(())
}

/// Load a manifest override: a YAML list of `{name, path}` entries.
pub fn load_manifest(path: &Path) -> Result<Manifest, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let entries: Vec<ManifestEntry> = serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Manifest::new(entries)
}
