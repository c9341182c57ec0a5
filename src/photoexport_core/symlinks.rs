use crate::photoexport_core::options::Options;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A four-digit directory in the export root, one per calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearDirectory {
    pub year: String,
    pub path: PathBuf,
}

/// Outcome of linking one year directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymlinkResult {
    Created,
    SkippedConflict,
    Failed(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SymlinkStats {
    pub created: usize,
    pub conflicts: usize,
    pub failed: usize,
}

impl SymlinkStats {
    pub fn record(&mut self, result: &SymlinkResult) {
        match result {
            SymlinkResult::Created => self.created += 1,
            SymlinkResult::SkippedConflict => self.conflicts += 1,
            SymlinkResult::Failed(_) => self.failed += 1,
        }
    }

    /// Conflicts and failures together.
    pub fn errors(&self) -> usize {
        self.conflicts + self.failed
    }
}

pub fn is_year_name(name: &str) -> bool {
    name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Year directories directly under `root`, in no particular order.
pub fn find_year_dirs(root: &Path) -> io::Result<Vec<YearDirectory>> {
    let mut years = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let path = entry.path();
        if is_year_name(&name) && path.is_dir() {
            years.push(YearDirectory { year: name, path });
        }
    }
    Ok(years)
}

/// Point `sync_root/<year>` at `year_dir`.
///
/// An existing symlink is replaced. Anything else already at that path is
/// user data and is left alone.
pub fn link_year(year_dir: &YearDirectory, sync_root: &Path) -> SymlinkResult {
    let link = sync_root.join(&year_dir.year);

    match fs::symlink_metadata(&link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if let Err(e) = fs::remove_file(&link) {
                return SymlinkResult::Failed(format!("cannot remove old link: {}", e));
            }
        }
        Ok(_) => {
            log::warn!("Target exists and is not a symlink: {}", link.display());
            return SymlinkResult::SkippedConflict;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return SymlinkResult::Failed(e.to_string()),
    }

    match symlink_dir(&year_dir.path, &link) {
        Ok(()) => {
            log::debug!("Linked: {} -> {}", year_dir.year, link.display());
            SymlinkResult::Created
        }
        Err(e) => SymlinkResult::Failed(e.to_string()),
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Link every year directory of `export_root` into `sync_root`.
///
/// Per-directory failures are counted and never abort the pass.
pub fn reconcile(export_root: &Path, sync_root: &Path, show_progress: bool) -> SymlinkStats {
    let mut stats = SymlinkStats::default();

    let years = match find_year_dirs(export_root) {
        Ok(years) => years,
        Err(e) => {
            log::error!("Cannot read {}: {}", export_root.display(), e);
            stats.failed += 1;
            return stats;
        }
    };

    if years.is_empty() {
        log::warn!("No year directories to link");
        return stats;
    }

    let bar = if show_progress {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} Creating symlinks... [{bar:40.cyan/blue}] {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(years.len() as u64).with_style(style)
    } else {
        ProgressBar::hidden()
    };

    for year_dir in &years {
        let result = link_year(year_dir, sync_root);
        if let SymlinkResult::Failed(reason) = &result {
            log::error!("Failed to link {}: {}", year_dir.year, reason);
        }
        stats.record(&result);
        bar.inc(1);
    }
    bar.finish_and_clear();

    stats
}

/// The symlink stage of a run. A no-op for dry runs or with symlinks off.
pub fn manage_symlinks(options: &Options) -> SymlinkStats {
    if options.dry_run || !options.use_symlink {
        log::info!("Symlink step skipped");
        return SymlinkStats::default();
    }

    log::info!("Creating symlinks to Nextcloud...");
    let stats = reconcile(&options.export_dir, &options.nc_photos_dir, !options.quiet);

    if stats.errors() > 0 {
        log::warn!(
            "Symlinks completed with {} errors ({} conflicts, {} failures)",
            stats.errors(),
            stats.conflicts,
            stats.failed
        );
    } else {
        log::info!("Created {} symlinks successfully", stats.created);
    }

    stats
}
