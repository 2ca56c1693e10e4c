//! `upkeep env` — print the runtime environment container commands receive.

use anyhow::{Context, Result};
use clap::Args;

use upkeep_core::RuntimeEnv;

/// Arguments for `upkeep env`.
#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Prefix every line with `export ` for shell evaluation.
    #[arg(long)]
    pub export: bool,
}

impl EnvArgs {
    pub fn run(self) -> Result<()> {
        let env = RuntimeEnv::from_process().context("invalid runtime environment")?;
        let prefix = if self.export { "export " } else { "" };
        for (key, value) in env.vars() {
            println!("{prefix}{key}={value}");
        }
        println!("{prefix}SERVICES_WAIT_TIME={}", env.services_wait_time);
        Ok(())
    }
}
