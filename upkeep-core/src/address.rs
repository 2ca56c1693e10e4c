//! Address resolution: repository URL + qualifier + relative path → raw
//! content address.
//!
//! Everything here is pure. No I/O happens until a fetcher is handed the
//! resulting address.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::VersionQualifier;

/// Raw-content host used when none is configured.
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// `{base URL, account, repository}` parsed from a source URL of the shape
/// `https://<host>/<account>/<repo>[/...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    pub base_url: String,
    pub account: String,
    pub repo: String,
}

impl RepositoryReference {
    /// Parse a repository URL. Fewer than five `/`-delimited segments, an
    /// empty host, account or repository is a hard error.
    pub fn parse(url: &str) -> Result<Self, CoreError> {
        let malformed = |reason: &str| CoreError::MalformedReference {
            url: url.to_owned(),
            reason: reason.to_owned(),
        };

        let parts: Vec<&str> = url.trim().split('/').collect();
        if parts.len() < 5 {
            return Err(malformed(&format!(
                "expected at least 5 '/'-separated segments, found {}",
                parts.len()
            )));
        }
        if !parts[0].ends_with(':') || !parts[1].is_empty() || parts[2].is_empty() {
            return Err(malformed("expected '<scheme>://<host>/...'"));
        }

        let account = parts[3];
        let repo = parts[4].strip_suffix(".git").unwrap_or(parts[4]);
        if account.is_empty() {
            return Err(malformed("account segment is empty"));
        }
        if repo.is_empty() {
            return Err(malformed("repository segment is empty"));
        }

        Ok(Self {
            base_url: format!("{}//{}", parts[0], parts[2]),
            account: account.to_owned(),
            repo: repo.to_owned(),
        })
    }

    /// `<raw_base>/<account>/<repo>/<qualifier>/<relative_path>`.
    pub fn raw_address(
        &self,
        raw_base: &str,
        qualifier: &VersionQualifier,
        relative_path: &str,
    ) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            raw_base.trim_end_matches('/'),
            self.account,
            self.repo,
            qualifier,
            relative_path.trim_start_matches('/'),
        )
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.base_url, self.account, self.repo)
    }
}

/// Resolve a fetchable address against the default raw-content host.
pub fn resolve(
    repository_url: &str,
    qualifier: &VersionQualifier,
    relative_path: &str,
) -> Result<String, CoreError> {
    let reference = RepositoryReference::parse(repository_url)?;
    Ok(reference.raw_address(DEFAULT_RAW_BASE, qualifier, relative_path))
}
