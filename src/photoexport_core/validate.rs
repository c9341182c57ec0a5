use crate::photoexport_core::options::Options;
use crate::photoexport_core::symlinks::find_year_dirs;
use std::path::Path;
use walkdir::WalkDir;

/// Counts gathered from the export root after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub year_dirs: usize,
    pub total_files: u64,
    pub total_bytes: u64,
}

impl ExportStats {
    pub fn size_mb(&self) -> f64 {
        self.total_bytes as f64 / 1_048_576.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportValidation {
    DryRun,
    Scanned(ExportStats),
}

/// Count year directories and walk every file under `root`.
///
/// Unreadable entries are logged and skipped; whatever was counted is
/// returned.
pub fn scan_export(root: &Path) -> ExportStats {
    let mut stats = ExportStats::default();

    match find_year_dirs(root) {
        Ok(years) => stats.year_dirs = years.len(),
        Err(e) => {
            log::error!("Error validating export in {}: {}", root.display(), e);
            return stats;
        }
    }

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => {
                stats.total_files += 1;
                stats.total_bytes += meta.len();
            }
            Err(e) => log::warn!("Cannot stat {}: {}", entry.path().display(), e),
        }
    }

    stats
}

/// Post-export sanity check. Empty results are warnings, never failures.
pub fn validate_export(options: &Options) -> ExportValidation {
    if options.dry_run {
        log::info!("[DRY RUN] Skipping export validation");
        return ExportValidation::DryRun;
    }

    log::debug!("Validating export results...");
    let stats = scan_export(&options.export_dir);

    if stats.year_dirs == 0 {
        log::warn!("No year directories found in {}", options.export_dir.display());
    } else {
        log::info!("Found {} year directories", stats.year_dirs);
    }

    if stats.total_files == 0 {
        log::warn!("No files found in export (incremental export?)");
    } else {
        log::info!(
            "Total: {} files ({:.1} MB)",
            stats.total_files,
            stats.size_mb()
        );
    }

    ExportValidation::Scanned(stats)
}
