//! upkeep — keep a project's templates and automation script in sync with upstream.
//!
//! # Usage
//!
//! ```text
//! upkeep sync --repo <URL> [--branch <B>] [--manifest <FILE>] [--backup] [--dry-run] [--json]
//! upkeep diff --repo <URL> [--branch <B>] [--manifest <FILE>]
//! upkeep self-update --repo <URL> [--branch <B>] [--script <PATH>] [--dry-run] [--json]
//! upkeep version [--branch <B>]
//! upkeep env [--export]
//! ```
//!
//! Every command accepts `--root <DIR>` (default: current directory).

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, env::EnvArgs, self_update::SelfUpdateArgs, sync::SyncArgs,
    version::VersionArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "upkeep",
    version,
    about = "Keep project templates and the automation script in sync with upstream",
    long_about = None,
)]
struct Cli {
    /// Project root containing the compose files and templates.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Log debug detail to stderr (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Overwrite local template files with their upstream versions.
    Sync(SyncArgs),

    /// Show unified diff of what sync would write.
    Diff(DiffArgs),

    /// Update the automation script from upstream, keeping a backup.
    SelfUpdate(SelfUpdateArgs),

    /// Show the declared platform version and the derived qualifier.
    Version(VersionArgs),

    /// Print UID/GID/umask defaults for container commands.
    Env(EnvArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = commands::project_root(cli.root)?;
    match cli.command {
        Commands::Sync(args) => args.run(&root),
        Commands::Diff(args) => args.run(&root),
        Commands::SelfUpdate(args) => args.run(&root),
        Commands::Version(args) => args.run(&root),
        Commands::Env(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
