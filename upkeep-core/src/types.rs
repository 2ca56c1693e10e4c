//! Domain types shared by the resolver, the oracle and the sync engine.
//!
//! All local path fields use `PathBuf`; manifest paths are always relative
//! to the project root.

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Branch or tag selecting which snapshot of the upstream repository is
/// addressed. Resolved once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionQualifier(String);

impl VersionQualifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for VersionQualifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VersionQualifier {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Logical name of a manifest entry (e.g. `repos.yaml`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryName(pub String);

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntryName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntryName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// One `{logical name → relative path}` mapping. The same relative path is
/// used upstream (inside the qualified snapshot) and locally (under the
/// project root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: EntryName,
    pub path: PathBuf,
}

impl ManifestEntry {
    pub fn new(name: impl Into<EntryName>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// The relative path with `/` separators, as used in content addresses.
    pub fn remote_path(&self) -> String {
        self.path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Absolute local target under `root`.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }
}

/// Ordered list of template files kept in sync with upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest, rejecting duplicate names and paths that are
    /// absolute or climb out of the project root.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.clone()) {
                return Err(invalid(entry, "duplicate name"));
            }
            check_relative_path(&entry.path).map_err(|reason| invalid(entry, reason))?;
        }
        Ok(Self { entries })
    }

    /// The template set a freshly scaffolded project carries.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                ManifestEntry::new("repos.yaml", "odoo/custom/src/repos.yaml"),
                ManifestEntry::new("addons.yaml", "odoo/custom/src/addons.yaml"),
                ManifestEntry::new("apt.txt", "odoo/custom/dependencies/apt.txt"),
                ManifestEntry::new("gem.txt", "odoo/custom/dependencies/gem.txt"),
                ManifestEntry::new("npm.txt", "odoo/custom/dependencies/npm.txt"),
                ManifestEntry::new("pip.txt", "odoo/custom/dependencies/pip.txt"),
            ],
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Accept only non-empty paths that stay under the project root once joined
/// to it. Returns the rejection reason otherwise.
pub fn check_relative_path(path: &Path) -> Result<(), &'static str> {
    if path.as_os_str().is_empty() {
        return Err("empty path");
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err("path contains '..'"),
            Component::RootDir | Component::Prefix(_) => return Err("path must be relative"),
        }
    }
    Ok(())
}

fn invalid(entry: &ManifestEntry, reason: &str) -> CoreError {
    CoreError::InvalidManifest {
        name: entry.name.0.clone(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_manifest_is_ordered_and_valid() {
        let manifest = Manifest::builtin();
        let names: Vec<_> = manifest.entries().iter().map(|e| e.name.0.as_str()).collect();
        assert_eq!(
            names,
            ["repos.yaml", "addons.yaml", "apt.txt", "gem.txt", "npm.txt", "pip.txt"]
        );
        assert!(Manifest::new(manifest.entries().to_vec()).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Manifest::new(vec![
            ManifestEntry::new("a", "x/a.txt"),
            ManifestEntry::new("a", "y/a.txt"),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidManifest { .. }), "got: {err}");
    }

    #[test]
    fn escaping_paths_are_rejected() {
        for bad in ["../outside.txt", "a/../../b.txt", "/etc/passwd", ""] {
            let err = Manifest::new(vec![ManifestEntry::new("bad", bad)]).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidManifest { .. }),
                "{bad:?} accepted: {err}"
            );
        }
    }

    #[test]
    fn remote_path_uses_forward_slashes() {
        let entry = ManifestEntry::new("pip.txt", PathBuf::from("odoo").join("custom").join("pip.txt"));
        assert_eq!(entry.remote_path(), "odoo/custom/pip.txt");
    }

    #[test]
    fn manifest_deserializes_from_yaml_list() {
        let yaml = "- name: repos.yaml\n  path: odoo/custom/src/repos.yaml\n";
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.entries()[0].name, EntryName::from("repos.yaml"));
    }
}
