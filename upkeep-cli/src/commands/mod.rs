pub mod diff;
pub mod env;
pub mod self_update;
pub mod sync;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use upkeep_core::{Overrides, Settings};

/// Where templates and the script come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Upstream repository URL, e.g. https://github.com/<account>/<repo>.
    #[arg(long = "repo", short = 'r', value_name = "URL")]
    pub repository: Option<String>,

    /// Branch or tag to use instead of the one derived from the platform version.
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Raw-content host serving the repository files.
    #[arg(long, value_name = "URL", hide = true)]
    pub raw_base: Option<String>,
}

impl SourceArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            raw_base: self.raw_base.clone(),
            ..Overrides::default()
        }
    }
}

/// Resolve settings for `root`, failing with the root in the message.
pub fn settings(root: &Path, overrides: Overrides) -> Result<Settings> {
    Settings::resolve(root, overrides)
        .with_context(|| format!("failed to load settings for '{}'", root.display()))
}

/// `--root`, or the current directory.
pub fn project_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("could not determine current directory"),
    }
}
