use crate::photoexport_core::deps::EXPORTER;
use crate::photoexport_core::options::Options;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::Command;

/// Folder layout inside the export root.
pub const DIRECTORY_TEMPLATE: &str = "{created.year}/{created.month:02d}";

/// File naming: edited versions get an `E` marker before the numeric id.
pub const FILENAME_TEMPLATE: &str = "IMG_{edited_version?E,}{id:04d}";

pub const RETRY_COUNT: &str = "3";

/// The exporter command line for one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInvocation {
    program: OsString,
    args: Vec<OsString>,
}

impl ExportInvocation {
    pub fn from_options(options: &Options) -> Self {
        let mut args: Vec<OsString> = vec!["export".into(), options.export_dir.clone().into()];

        args.extend(
            [
                "--skip-original-if-edited",
                "--directory",
                DIRECTORY_TEMPLATE,
                "--update",
                "--verbose",
                "--download-missing",
                "--use-photokit",
                "--exiftool",
                "--retry",
                RETRY_COUNT,
                "--filename",
                FILENAME_TEMPLATE,
                "--edited-suffix",
                "",
                "--strip",
                "--ramdb",
                "--exiftool-option",
                "-m",
                "--exiftool-option",
                "-fast10",
            ]
            .map(OsString::from),
        );

        if options.verbose == 0 {
            args.extend(["--exiftool-option", "-q"].map(OsString::from));
        }

        if options.cleanup {
            args.extend(
                [
                    "--fix-orientation",
                    "--exiftool-merge-keywords",
                    "--exiftool-merge-persons",
                    "--cleanup",
                ]
                .map(OsString::from),
            );
        }

        if options.export_aae {
            args.push("--export-aae".into());
            log::debug!("AAE adjustments files will be exported");
        }

        if options.dry_run {
            args.push("--dry-run".into());
        }

        let invocation = Self {
            program: EXPORTER.into(),
            args,
        };
        log::debug!("Export command: {}", invocation);
        invocation
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// A fresh `Command` for this invocation. Stdio is left to the caller.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ExportInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(' ') {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
