use crate::photoexport_core::child::RUNNING_CHILD;
use crate::photoexport_core::deps;
use crate::photoexport_core::error::{ExportError, Result};
use crate::photoexport_core::invocation::ExportInvocation;
use crate::photoexport_core::options::Options;
use crate::photoexport_core::report;
use crate::photoexport_core::supervisor::{self, ExportOutcome};
use crate::photoexport_core::symlinks::{self, SymlinkStats};
use crate::photoexport_core::validate::{self, ExportValidation};
use std::fs;
use std::path::Path;

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub exporter_version: String,
    pub export: ExportValidation,
    pub symlinks: SymlinkStats,
}

/// Drives one export: dependencies, directories, exporter, validation,
/// symlinks, report. Each stage gates the next.
pub struct PhotoExporter {
    options: Options,
}

impl PhotoExporter {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let options = &self.options;
        report::print_banner(options);
        log::info!("Starting photo export and sync process...");

        let exporter_version = deps::validate_dependencies()?;
        self.setup_directories()?;

        let invocation = ExportInvocation::from_options(options);
        report::print_command(&invocation, options.quiet);

        match supervisor::run_export(&invocation, &RUNNING_CHILD, options.quiet)? {
            ExportOutcome::Succeeded => {}
            ExportOutcome::Failed(code) => {
                log::error!("Export failed, aborting");
                return Err(ExportError::ExportFailed(code));
            }
        }

        let export = validate::validate_export(options);
        let symlinks = symlinks::manage_symlinks(options);

        report::generate_report(options, &export, &symlinks);
        report::print_completion(options.quiet);
        log::info!("All operations completed successfully");

        Ok(RunSummary {
            exporter_version,
            export,
            symlinks,
        })
    }

    /// Create the export and sync roots. A dry run only reports them.
    pub fn setup_directories(&self) -> Result<()> {
        log::debug!("Setting up directories...");

        let dirs = [&self.options.export_dir, &self.options.nc_photos_dir];

        if self.options.dry_run {
            for dir in dirs {
                log::info!("[DRY RUN] Would create: {}", dir.display());
            }
            return Ok(());
        }

        for dir in dirs {
            create_dir(dir)?;
            log::debug!("Created/verified directory: {}", dir.display());
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| {
        log::error!("Failed to create directory {}: {}", dir.display(), source);
        ExportError::DirectorySetup {
            path: dir.to_path_buf(),
            source,
        }
    })
}
