pub mod child;
pub mod cli;
pub mod deps;
pub mod error;
pub mod exporter;
pub mod invocation;
pub mod logging;
pub mod options;
pub mod report;
pub mod settings;
pub mod supervisor;
pub mod symlinks;
pub mod validate;

pub use cli::Cli;
pub use error::{ExportError, Result};
pub use exporter::{PhotoExporter, RunSummary};
pub use options::{Options, Resolved};
