//! `upkeep diff` — show unified diffs for what sync would write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use upkeep_sync::{pipeline, HttpFetcher};

use super::SourceArgs;

/// Arguments for `upkeep diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// YAML list of `{name, path}` entries replacing the built-in manifest.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut overrides = self.source.overrides();
        overrides.manifest_file = self.manifest.clone();
        let settings = super::settings(root, overrides)?;

        let fetcher = HttpFetcher::new(settings.timeout);
        let result = pipeline::run_diff(&settings, &fetcher).context("diff failed")?;

        for name in &result.absent {
            println!("· {name}: nothing upstream, skipped");
        }

        for (name, error) in &result.failed {
            eprintln!("✗ {name}: {error}");
        }

        if result.diffs.is_empty() && result.failed.is_empty() {
            println!("No differences.");
            return Ok(());
        }

        for diff in result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
