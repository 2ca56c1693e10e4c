//! `upkeep sync` — overwrite local template files with their upstream versions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use upkeep_sync::{
    pipeline, BackupPolicy, HttpFetcher, ReplaceOutcome, TemplateSyncReport,
};

use super::SourceArgs;

/// Arguments for `upkeep sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// YAML list of `{name, path}` entries replacing the built-in manifest.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Keep a timestamped copy of every file before overwriting it.
    #[arg(long)]
    pub backup: bool,

    /// Show what would be written without actually writing any files.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let mut overrides = self.source.overrides();
        overrides.manifest_file = self.manifest.clone();
        let settings = super::settings(root, overrides)?;

        let policy = BackupPolicy {
            backup_before_overwrite: self.backup,
            ..BackupPolicy::TEMPLATES
        };
        let fetcher = HttpFetcher::new(settings.timeout);
        let report = pipeline::run_templates(&settings, &fetcher, policy, self.dry_run)
            .context("template sync failed")?;

        if self.json {
            let payload = ReportJson::from_report(&report);
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize sync report")?
            );
        } else {
            print_report(&report, root, self.dry_run);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "entry")]
    name: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "path")]
    path: String,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    repository: String,
    qualifier: String,
    entries: Vec<EntryJson<'a>>,
}

/// One manifest entry. Successful outcomes serialize as the engine reports
/// them, so `outcome` values match `self-update --json`.
#[derive(Serialize)]
struct EntryJson<'a> {
    name: String,
    address: &'a str,
    #[serde(flatten)]
    result: EntryResultJson<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntryResultJson<'a> {
    Done(&'a ReplaceOutcome),
    Failed {
        outcome: &'static str,
        path: &'a Path,
        error: String,
    },
}

impl<'a> ReportJson<'a> {
    fn from_report(report: &'a TemplateSyncReport) -> Self {
        Self {
            repository: report.repository.to_string(),
            qualifier: report.qualifier.to_string(),
            entries: report
                .entries
                .iter()
                .map(|e| EntryJson {
                    name: e.name.to_string(),
                    address: &e.address,
                    result: match &e.result {
                        Ok(outcome) => EntryResultJson::Done(outcome),
                        Err(err) => EntryResultJson::Failed {
                            outcome: "failed",
                            path: &e.path,
                            error: err.to_string(),
                        },
                    },
                })
                .collect(),
        }
    }
}

fn backup_of(outcome: &ReplaceOutcome) -> Option<String> {
    match outcome {
        ReplaceOutcome::Written {
            backup: Some(record),
            ..
        } => Some(record.backup.display().to_string()),
        _ => None,
    }
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn print_report(report: &TemplateSyncReport, root: &Path, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let written = report.count("written") + report.count("backed-up") + report.count("would-write");
    let identical = report.count("skipped-identical");
    let absent = report.count("skipped-absent");
    let failed = report.failures().count();

    let rows: Vec<Row> = report
        .entries
        .iter()
        .map(|e| Row {
            name: e.name.to_string(),
            outcome: match &e.result {
                Ok(o) => colorize(o),
                Err(err) => format!("{} ({err})", "failed".red().bold()),
            },
            path: relative(&e.path, root),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for entry in &report.entries {
        if let Some(backup) = entry.result.as_ref().ok().and_then(backup_of) {
            println!("  backup of {}: {backup}", entry.name);
        }
    }

    println!(
        "{prefix}✓ templates from {} at {} ({written} written, {identical} unchanged, {absent} absent, {failed} failed)",
        report.repository, report.qualifier
    );
}

fn colorize(outcome: &ReplaceOutcome) -> String {
    let label = outcome.label();
    match outcome {
        ReplaceOutcome::Written { .. } => label.green().bold().to_string(),
        ReplaceOutcome::WouldWrite { .. } => label.cyan().to_string(),
        ReplaceOutcome::SkippedIdentical { .. } => label.bright_black().to_string(),
        ReplaceOutcome::SkippedAbsent { .. } => label.yellow().to_string(),
    }
}
