//! # upkeep-sync
//!
//! Fetch-and-replace engine for project templates and the automation script.
//!
//! Call [`sync_all`] to bring every manifest entry in line with upstream, or
//! [`self_update`] to refresh the automation script. [`pipeline`] wires both
//! to resolved [`upkeep_core::Settings`].

pub mod diff;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod self_update;
pub mod templates;
pub mod writer;

pub use diff::{diff_templates, FileDiff, TemplateDiff};
pub use error::SyncError;
pub use fetcher::{FetchResult, Fetcher, HttpFetcher};
pub use self_update::{self_update, update_script, ScriptTarget, UpdateOutcome};
pub use templates::{sync_all, sync_templates, EntryReport, SyncOptions, TemplateSyncReport};
pub use writer::{replace, BackupPolicy, BackupRecord, ReplaceOutcome};
