use crate::photoexport_core::child::{self, ChildSlot, SupervisorState};
use crate::photoexport_core::error::{ExportError, Result};
use crate::photoexport_core::invocation::ExportInvocation;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, BufReader, Read};
use std::process::Stdio;
use std::time::Duration;

/// Exporter output lines containing this advance the progress spinner.
pub const PROGRESS_MARKER: &str = "Processing";

/// How the exporter run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Succeeded,
    /// Nonzero exit; `None` when the child died from a signal.
    Failed(Option<i32>),
}

/// Tallies of the exporter's output stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: u64,
    pub progress_ticks: u64,
}

fn progress_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg} [{elapsed_precise}] {pos} processed")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::new_spinner().with_style(style);
    bar.set_message("Exporting photos...");
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Forward every non-empty line of `reader` to the debug log and tick `bar`
/// for each progress line. Reads until end of stream.
pub fn pump_output<R: Read>(reader: R, source: &str, bar: &ProgressBar) -> std::io::Result<StreamStats> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut stats = StreamStats::default();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        stats.lines += 1;
        // The console logger and the spinner share stderr.
        bar.suspend(|| log::debug!("{}: {}", source, line));

        if line.contains(PROGRESS_MARKER) {
            stats.progress_ticks += 1;
            bar.inc(1);
        }
    }

    Ok(stats)
}

/// Run the exporter to completion, publishing it in `slot` while it is alive.
///
/// A launch failure is fatal. A nonzero exit is returned as
/// [`ExportOutcome::Failed`]. If the interrupt path started terminating the
/// child, [`ExportError::Interrupted`] is returned instead.
pub fn run_export(invocation: &ExportInvocation, slot: &ChildSlot, quiet: bool) -> Result<ExportOutcome> {
    log::info!("Starting photo export...");

    let program = invocation.program().to_string_lossy().into_owned();

    // stdout and stderr share one pipe so lines keep their relative order.
    let (reader, writer) = std::io::pipe()?;
    let mut cmd = invocation.command();
    cmd.stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    slot.reserve();
    let spawned = cmd.spawn();
    // The command still owns the write ends; drop them so the reader sees EOF
    // when the child exits.
    drop(cmd);

    let mut child = match spawned {
        Ok(child) => child,
        Err(source) => {
            if slot.clear() == SupervisorState::Terminating {
                return Err(ExportError::Interrupted);
            }
            log::error!("Failed to launch {}: {}", program, source);
            return Err(ExportError::Launch { program, source });
        }
    };

    if !slot.register(child.id()) {
        // Interrupted while spawning; the child was never published.
        let _ = child.kill();
        let _ = child.wait();
        slot.clear();
        return Err(ExportError::Interrupted);
    }
    log::debug!("{} started with pid {}", program, child.id());

    let bar = progress_spinner(quiet);
    let pumped = pump_output(reader, &program, &bar);
    bar.finish_and_clear();

    // Withdraw the pid while the exited child is still unreaped.
    if let Err(e) = child::wait_exited(child.id()) {
        log::debug!("Waiting for {} without reaping failed: {}", program, e);
    }
    let previous = slot.clear();
    let status = child.wait()?;

    if previous == SupervisorState::Terminating {
        return Err(ExportError::Interrupted);
    }

    match pumped {
        Ok(stats) => log::debug!(
            "{} produced {} lines ({} progress)",
            program,
            stats.lines,
            stats.progress_ticks
        ),
        Err(e) => log::warn!("Error reading {} output: {}", program, e),
    }

    if status.success() {
        log::info!("Export completed successfully");
        Ok(ExportOutcome::Succeeded)
    } else {
        log::error!("Export failed with status {}", status);
        Ok(ExportOutcome::Failed(status.code()))
    }
}
