//! Error types for upkeep-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving configuration, addresses and
/// platform versions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The repository URL does not have the `https://<host>/<account>/<repo>` shape.
    #[error("malformed repository reference '{url}': {reason}")]
    MalformedReference { url: String, reason: String },

    /// The declared platform version is older than the oldest supported one.
    #[error("platform version {declared} is not supported (minimum is {minimum})")]
    UnsupportedPlatform { declared: f64, minimum: u32 },

    /// The declared version value could not be read as a number.
    #[error("invalid platform version '{value}'")]
    InvalidVersion { value: String },

    /// The version file exists but does not contain the configured key.
    #[error("no platform version declared at '{key}' in {path}")]
    VersionNotDeclared { path: PathBuf, key: String },

    /// A file the project root must provide is missing.
    #[error("missing project file: {path}")]
    MissingProjectFile { path: PathBuf },

    /// No repository URL was given on the command line, env or config file.
    #[error("no repository configured; pass --repo, set UPKEEP_REPOSITORY or add `repository:` to .upkeep.yaml")]
    MissingRepository,

    /// A manifest entry is unusable (duplicate name, escaping path, ...).
    #[error("invalid manifest entry '{name}': {reason}")]
    InvalidManifest { name: String, reason: String },

    /// The self-update script path is absolute or climbs out of the root.
    #[error("invalid script path '{path}': {reason}")]
    InvalidScriptPath { path: PathBuf, reason: String },

    /// An environment default could not be parsed.
    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },

    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML that failed to parse, with the file path and serde_yaml line context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
