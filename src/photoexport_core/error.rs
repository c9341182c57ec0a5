use std::path::PathBuf;
use thiserror::Error;

/// Exit code reported when the run was cut short by SIGINT/SIGTERM.
pub const INTERRUPT_EXIT_CODE: u8 = 130;

/// Exit code for every other failure.
pub const FAILURE_EXIT_CODE: u8 = 1;

#[derive(Error, Debug)]
pub enum ExportError {
    // Startup errors
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("Invalid settings file {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("Invalid path for {field}: {reason}")]
    InvalidPath { field: &'static str, reason: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Cannot create directory {path}: {source}")]
    DirectorySetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Dependency errors
    #[error("{0} not found. Install with: brew tap rhetbull/osxphotos && brew install osxphotos")]
    DependencyMissing(&'static str),

    #[error("{name} installation appears broken: {reason}")]
    DependencyBroken { name: &'static str, reason: String },

    // Child process errors
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Export failed with return code {}", .0.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string()))]
    ExportFailed(Option<i32>),

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),
}

impl ExportError {
    /// Process exit code this error should terminate with.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExportError::Interrupted => INTERRUPT_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }
}

/// Result type for photoexport operations.
pub type Result<T> = std::result::Result<T, ExportError>;
