use clap::Parser;
use photoexport::photoexport_core::error::FAILURE_EXIT_CODE;
use photoexport::photoexport_core::{Cli, ExportError, Options, PhotoExporter, child, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let resolved = match Options::resolve(&cli) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, ExportError::MissingConfig(_)) {
                eprintln!("These can be provided via command line arguments or configuration file.");
            }
            return ExitCode::from(e.exit_code());
        }
    };
    let options = resolved.options;

    // Initialize loggers
    if let Err(e) = logging::init(&options) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(FAILURE_EXIT_CODE);
    }
    for notice in &resolved.notices {
        notice.emit();
    }

    if let Err(e) = child::install_interrupt_handler() {
        log::error!("{}", e);
        return ExitCode::from(e.exit_code());
    }

    let code = match PhotoExporter::new(options).run() {
        Ok(summary) => {
            log::debug!("Run summary: {:?}", summary);
            ExitCode::SUCCESS
        }
        Err(ExportError::Interrupted) => {
            log::warn!("Process interrupted by signal");
            ExitCode::from(ExportError::Interrupted.exit_code())
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    };

    log::logger().flush();
    code
}
