//! Version oracle: which branch/tag of the upstream repository to address.
//!
//! The qualifier is either an operator override (used verbatim) or derived
//! from the platform version the project declares in its compose file.

use std::path::Path;

use serde_yaml::Value;

use crate::error::{io_err, CoreError};
use crate::types::VersionQualifier;

/// Oldest platform major version the templates are published for.
pub const MIN_SUPPORTED_VERSION: u32 = 11;

/// Pick the qualifier for this run.
///
/// A non-empty `override_branch` wins and `declared` is never evaluated, so
/// an operator can pin any branch without a readable version file. Otherwise
/// the declared version is gated and converted by [`qualifier_for`].
pub fn current_qualifier<F>(
    declared: F,
    override_branch: Option<&str>,
) -> Result<VersionQualifier, CoreError>
where
    F: FnOnce() -> Result<f64, CoreError>,
{
    if let Some(branch) = override_branch.filter(|b| !b.trim().is_empty()) {
        return Ok(VersionQualifier::from(branch));
    }
    qualifier_for(declared()?)
}

/// `16.0` → `"16.0"`, `14.3` → `"14.0"`. Versions below
/// [`MIN_SUPPORTED_VERSION`] are rejected.
pub fn qualifier_for(declared: f64) -> Result<VersionQualifier, CoreError> {
    ensure_supported(declared)?;
    Ok(VersionQualifier::from(format!("{}.0", declared.trunc() as u64)))
}

/// Fail with [`CoreError::UnsupportedPlatform`] for versions below the minimum.
pub fn ensure_supported(declared: f64) -> Result<(), CoreError> {
    if !declared.is_finite() || declared < f64::from(MIN_SUPPORTED_VERSION) {
        return Err(CoreError::UnsupportedPlatform {
            declared,
            minimum: MIN_SUPPORTED_VERSION,
        });
    }
    Ok(())
}

/// Read the platform version declared at the dotted `key` of a YAML file.
///
/// Accepts YAML numbers (`16.0`, `16`) and numeric strings (`"16.0"`).
pub fn read_declared_version(path: &Path, key: &str) -> Result<f64, CoreError> {
    if !path.exists() {
        return Err(CoreError::MissingProjectFile {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let doc: Value = serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let not_declared = || CoreError::VersionNotDeclared {
        path: path.to_path_buf(),
        key: key.to_owned(),
    };

    let mut node = &doc;
    for part in key.split('.') {
        node = node.get(part).ok_or_else(not_declared)?;
    }

    match node {
        Value::Number(n) => n.as_f64().ok_or_else(|| CoreError::InvalidVersion {
            value: n.to_string(),
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| CoreError::InvalidVersion {
            value: s.clone(),
        }),
        Value::Null => Err(not_declared()),
        other => Err(CoreError::InvalidVersion {
            value: format!("{other:?}"),
        }),
    }
}
