//! `upkeep self-update` — refresh the automation script from upstream.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use upkeep_sync::{pipeline, self_update::removal_command, HttpFetcher, UpdateOutcome};

use super::SourceArgs;

/// Arguments for `upkeep self-update`.
#[derive(Args, Debug)]
pub struct SelfUpdateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Script path relative to the project root (default: escodoo.py).
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Report whether an update is available without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SelfUpdateArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut overrides = self.source.overrides();
        overrides.script = self.script.clone();
        let settings = super::settings(root, overrides)?;

        let fetcher = HttpFetcher::new(settings.timeout);
        let outcome =
            pipeline::run_self_update(&settings, &fetcher, self.dry_run).context("self-update failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("failed to serialize outcome")?
            );
            return Ok(());
        }

        match outcome {
            UpdateOutcome::UpToDate { path } => {
                println!("✓ {} is already up to date", path.display());
            }
            UpdateOutcome::WouldUpdate { path } => {
                println!("[dry-run] ~ {} would be updated", path.display());
            }
            UpdateOutcome::Updated { path, backup: None } => {
                println!("{} {} installed", "✎".green(), path.display());
            }
            UpdateOutcome::Updated {
                path,
                backup: Some(record),
            } => {
                println!("{} {} updated", "✎".green(), path.display());
                println!("  previous version kept at {}", record.backup.display());
                println!(
                    "  once you are happy with the update, remove it with: {}",
                    removal_command(&record.backup).as_str().bold()
                );
            }
            UpdateOutcome::FetchFailed { address } => {
                println!(
                    "{} could not fetch {address}; script left unchanged",
                    "!".yellow().bold()
                );
            }
        }
        Ok(())
    }
}
