//! Argument parsing and command dispatch.

use anyhow::{bail, Result};
use burrow_core::{CreateOutcome, FolderRegistry, PathsConfig, ReconcileReport, RemoveOutcome};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(about = "Manage a self-healing set of folders under a sandbox root")]
pub struct Args {
    /// Sandbox root directory
    #[arg(long, default_value = PathsConfig::DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Keep a .bak copy of the previous snapshot on every save
    #[arg(long)]
    pub keep_backup: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create folders (or register existing ones) and track them
    Create {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Delete tracked folders and stop tracking them
    Remove {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Print tracked folders, one per line
    List,
    /// Restore missing folders and print a summary
    Check,
    /// Create `media` and `media/file`, then remove `media`
    Demo,
}

/// Open the registry described by `args` and run its command. Human-readable
/// results go to `out`; diagnostics go to the log.
pub fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    info!("Sandbox root: {}", args.root.display());
    let registry = FolderRegistry::builder(&args.root)
        .keep_backup(args.keep_backup)
        .build();

    // Every command starts from the self-healing pass.
    let report = registry.reconcile();

    let result = match &args.command {
        Command::Create { paths } => create(&registry, paths, out),
        Command::Remove { paths } => remove(&registry, paths, out),
        Command::List => list(&registry, out),
        Command::Check => print_report(&report, out),
        Command::Demo => {
            registry.create_folder("media");
            registry.create_folder("media/file");
            registry.remove_folder("media");
            list(&registry, out)
        }
    };

    // Only retries a failed save; `list` and `check` leave the snapshot as found.
    registry.shutdown();
    result
}

fn create(registry: &FolderRegistry, paths: &[String], out: &mut impl Write) -> Result<()> {
    let mut failed = 0;
    for path in paths {
        match registry.try_create_folder(path) {
            Ok(outcome) => {
                let label = match outcome {
                    CreateOutcome::Created => "created",
                    CreateOutcome::Adopted => "registered",
                    CreateOutcome::AlreadyTracked => "already tracked",
                };
                writeln!(out, "{} {}", label, path)?;
            }
            Err(e) => {
                error!("Failed to create folder {}: {}", path, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} folder(s) could not be created", failed, paths.len());
    }
    Ok(())
}

fn remove(registry: &FolderRegistry, paths: &[String], out: &mut impl Write) -> Result<()> {
    let mut failed = 0;
    for path in paths {
        match registry.try_remove_folder(path) {
            Ok(RemoveOutcome::Removed) => writeln!(out, "removed {}", path)?,
            Ok(RemoveOutcome::AlreadyAbsent) => writeln!(out, "absent {}", path)?,
            Err(e) => {
                error!("Failed to remove folder {}: {}", path, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} folder(s) could not be removed", failed, paths.len());
    }
    Ok(())
}

fn list(registry: &FolderRegistry, out: &mut impl Write) -> Result<()> {
    for path in registry.tracked_paths() {
        writeln!(out, "{}", path)?;
    }
    Ok(())
}

fn print_report(report: &ReconcileReport, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "checked {}, recreated {}, failed {}, rejected {} in {:?}",
        report.checked,
        report.recreated.len(),
        report.failed.len(),
        report.rejected.len(),
        report.elapsed
    )?;
    for path in &report.recreated {
        writeln!(out, "recreated {}", path)?;
    }
    for failure in &report.failed {
        writeln!(out, "failed {}: {}", failure.path, failure.error)?;
    }
    for path in &report.rejected {
        writeln!(out, "rejected {}", path)?;
    }
    if !report.is_clean() {
        bail!(
            "{} folder(s) could not be restored",
            report.failed.len() + report.rejected.len()
        );
    }
    Ok(())
}
