use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// OSXPhotos to Nextcloud Export Tool
///
/// Exports photos from Apple Photos.app into a {year}/{month} folder tree and
/// links each year into a Nextcloud sync directory.
///
/// Command line arguments take precedence over configuration file values.
#[derive(Parser, Debug, Default)]
#[command(name = "photoexport", author, version)]
pub struct Cli {
    /// Path to YAML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Export destination directory
    #[arg(short = 'e', long)]
    pub export_dir: Option<PathBuf>,

    /// Nextcloud sync directory
    #[arg(short = 'n', long)]
    pub nc_photos_dir: Option<PathBuf>,

    /// Path to log file (e.g. ~/export_photos.log)
    #[arg(short = 'l', long)]
    pub log_file: Option<PathBuf>,

    /// Show what would happen, but don't write or link
    #[arg(long)]
    pub dry_run: bool,

    /// Do not create symlinks into Nextcloud
    #[arg(long, conflicts_with = "use_symlink")]
    pub no_symlink: bool,

    /// Create symlinks into Nextcloud (default)
    #[arg(long)]
    pub use_symlink: bool,

    /// Do automated cleanup tasks (orientation, keywords, etc.)
    #[arg(long)]
    pub cleanup: bool,

    /// Export AAE adjustments files detailing edits made to originals
    #[arg(long)]
    pub export_aae: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output (takes precedence over --verbose)
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    /// Symlink preference expressed on the command line, if any.
    pub fn symlink_override(&self) -> Option<bool> {
        if self.no_symlink {
            Some(false)
        } else if self.use_symlink {
            Some(true)
        } else {
            None
        }
    }
}
