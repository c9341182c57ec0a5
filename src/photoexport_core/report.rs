use crate::photoexport_core::deps::{LISTING_TOOL, listing_tool_available};
use crate::photoexport_core::invocation::ExportInvocation;
use crate::photoexport_core::options::Options;
use crate::photoexport_core::symlinks::SymlinkStats;
use crate::photoexport_core::validate::ExportValidation;
use colored::Colorize;
use std::path::Path;
use std::process::Command;

const RULE_WIDTH: usize = 60;

/// Start-of-run panel with the configured locations.
pub fn print_banner(options: &Options) {
    if options.quiet {
        return;
    }
    let dry_run = if options.dry_run {
        "true".green()
    } else {
        "false".red()
    };
    println!("{}", "─".repeat(RULE_WIDTH).cyan());
    println!("{}", "OSXPhotos to Nextcloud Export".bold().cyan());
    println!("Export:    {}", options.export_dir.display().to_string().yellow());
    println!("Nextcloud: {}", options.nc_photos_dir.display().to_string().yellow());
    println!("Dry Run:   {}", dry_run);
    println!("{}", "─".repeat(RULE_WIDTH).cyan());
}

pub fn print_command(invocation: &ExportInvocation, quiet: bool) {
    if quiet {
        return;
    }
    println!("{}", "Export Command".bold().cyan());
    println!("{}", invocation.to_string().dimmed());
}

/// A read-only listing of the sync root: `tree -d -L 2`, else `ls -la`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Tree(String),
    Flat(String),
}

fn run_listing(program: &str, args: &[&str], dir: &Path) -> Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .arg(dir)
        .output()
        .map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(format!(
            "exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

/// List `dir`. Failures are advisory and only logged.
pub fn list_directory(dir: &Path) -> Option<Listing> {
    if !dir.is_dir() {
        log::warn!("Nothing to list at {}", dir.display());
        return None;
    }

    if listing_tool_available() {
        match run_listing(LISTING_TOOL, &["-d", "-L", "2"], dir) {
            Ok(out) => return Some(Listing::Tree(out)),
            Err(e) => log::warn!("{} command failed ({}), falling back to ls", LISTING_TOOL, e),
        }
    }

    match run_listing("ls", &["-la"], dir) {
        Ok(out) => Some(Listing::Flat(out)),
        Err(e) => {
            log::error!("Failed to list directory {}: {}", dir.display(), e);
            None
        }
    }
}

/// Final report: statistics, sync-root listing and the log location.
pub fn generate_report(options: &Options, export: &ExportValidation, links: &SymlinkStats) {
    log::info!("Generating final report...");

    if !options.quiet {
        println!();
        println!(
            "{} {} {}",
            "──────────".cyan(),
            "Export Summary".bold().cyan(),
            "─".repeat(RULE_WIDTH - 26).cyan()
        );
        match export {
            ExportValidation::DryRun => println!("Export:   {}", "[DRY RUN] not validated".yellow()),
            ExportValidation::Scanned(stats) => println!(
                "Export:   {} year directories, {} files ({:.1} MB)",
                stats.year_dirs,
                stats.total_files,
                stats.size_mb()
            ),
        }
        println!(
            "Symlinks: {} created, {} conflicts, {} failed",
            links.created, links.conflicts, links.failed
        );
    }

    if options.nc_photos_dir.exists() && !options.quiet {
        match list_directory(&options.nc_photos_dir) {
            Some(Listing::Tree(out)) => println!("\n{}\n{}", "Directory Structure:".bold(), out),
            Some(Listing::Flat(out)) => println!("\n{}\n{}", "Directory Contents:".bold(), out),
            None => {}
        }
    }

    log::info!("Full log available at: {}", options.log_file.display());
    if !options.quiet {
        println!("{}", format!("Log file: {}", options.log_file.display()).dimmed());
    }
}

pub fn print_completion(quiet: bool) {
    if quiet {
        return;
    }
    println!();
    println!("{}", "Photo export and sync completed successfully!".bold().green());
}
