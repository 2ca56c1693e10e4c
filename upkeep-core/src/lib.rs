//! upkeep core library — repository addressing, version selection,
//! manifest and settings types, errors.
//!
//! - [`address`] — parse repository URLs and build raw-content addresses
//! - [`version`] — the version oracle
//! - [`types`] — qualifier and manifest types
//! - [`config`] — layered settings and preflight checks
//! - [`env`] — runtime environment defaults for container commands
//! - [`error`] — [`CoreError`]

pub mod address;
pub mod config;
pub mod env;
pub mod error;
pub mod types;
pub mod version;

pub use address::{resolve, RepositoryReference, DEFAULT_RAW_BASE};
pub use config::{preflight, Overrides, ProjectConfig, Settings};
pub use env::RuntimeEnv;
pub use error::CoreError;
pub use types::{check_relative_path, EntryName, Manifest, ManifestEntry, VersionQualifier};
