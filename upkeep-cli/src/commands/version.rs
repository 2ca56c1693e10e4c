//! `upkeep version` — show the declared platform version and the qualifier
//! template sync would use.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use upkeep_core::preflight;

/// Arguments for `upkeep version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Branch or tag override to apply.
    #[arg(long, short = 'b')]
    pub branch: Option<String>,
}

impl VersionArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let overrides = upkeep_core::Overrides {
            branch: self.branch,
            ..Default::default()
        };
        let settings = super::settings(root, overrides)?;
        preflight(&settings).context("preflight failed")?;

        if let Some(branch) = &settings.branch {
            println!("qualifier: {branch} (pinned)");
            return Ok(());
        }

        let declared = settings.declared_version().with_context(|| {
            format!(
                "could not read platform version from {}",
                settings.version_file.display()
            )
        })?;
        let qualifier = settings.qualifier().context("unsupported platform")?;
        println!("declared version: {declared:.1}");
        println!("qualifier: {qualifier}");
        Ok(())
    }
}
