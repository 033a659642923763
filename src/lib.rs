//! dupescan - duplicate and near-duplicate file finder.
//!
//! Files under one or more roots are fingerprinted with xxHash64 on a bounded
//! worker pool and grouped into equivalence classes by content or by name.
//! The `compare` mode scores every pair of files with a simhash instead.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod similarity;

use std::io::{self, Write};

use anyhow::Context;

use crate::actions::{execute_plan, plan_deletions, DeleteMode};
use crate::cli::{Cli, Commands, OutputFormat};
use crate::config::{Config, ScanSettings};
use crate::duplicates::{CompareReport, DuplicateFinder, FinderConfig, ScanReport};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{
    spawn_reporter, Progress, ProgressReporter, DEFAULT_QUEUE_CAPACITY, DEFAULT_TICK,
};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns configuration, scan and output errors. The caller maps them to an
/// exit code with [`ExitCode::for_error`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?;
    let (config, format) = match &cli.command {
        Commands::Scan(args) => (config.with_scan_args(args), args.common.output),
        Commands::Compare(args) => (config.with_compare_args(args), args.common.output),
    };
    let settings = config.resolve()?;
    log::debug!("Resolved settings: {:?}", settings);
    if let Some(path) = cli.save_config.as_deref() {
        config.save(path)?;
        log::info!("Saved settings to {}", path.display());
    }

    let shutdown = match signal::install_handler() {
        Ok(handler) => Some(handler.get_flag()),
        Err(e) => {
            log::warn!("{e}; Ctrl+C will not stop the scan cleanly");
            None
        }
    };

    let mut finder_config = settings.finder_config();
    if let Some(flag) = shutdown {
        finder_config = finder_config.with_shutdown_flag(flag);
    }
    let color = !cli.no_color && format == OutputFormat::Text;

    match cli.command {
        Commands::Scan(args) => {
            let (report, reporter) = with_progress(&settings, cli.quiet, finder_config, |finder| {
                finder.find_duplicates(&settings.roots)
            });
            finish_progress(reporter);
            let report = report?;
            write_scan_report(&report, &settings, format, color)?;
            if settings.delete_duplicates {
                delete_duplicates(&report, &settings, args.yes, color)?;
            }
        }
        Commands::Compare(_) => {
            let finder_config = finder_config.with_similarity(settings.similarity_width);
            let (report, reporter) = with_progress(&settings, cli.quiet, finder_config, |finder| {
                finder.compare(&settings.roots, settings.threshold)
            });
            finish_progress(reporter);
            let report = report?;
            write_compare_report(&report, &settings, format, color)?;
        }
    }

    Ok(ExitCode::Success)
}

/// Run `scan` with a progress reporter attached when progress is enabled.
///
/// The finder, and with it the progress sender, is dropped before returning
/// so the reporter can drain and stop.
fn with_progress<T>(
    settings: &ScanSettings,
    quiet: bool,
    config: FinderConfig,
    scan: impl FnOnce(&DuplicateFinder) -> T,
) -> (T, Option<ProgressReporter>) {
    if !settings.progress || quiet {
        return (scan(&DuplicateFinder::new(config)), None);
    }
    let (sender, reporter) = spawn_reporter(
        Box::new(Progress::new(false)),
        DEFAULT_TICK,
        DEFAULT_QUEUE_CAPACITY,
    );
    let finder = DuplicateFinder::new(config.with_progress(sender));
    let result = scan(&finder);
    drop(finder);
    (result, Some(reporter))
}

fn finish_progress(reporter: Option<ProgressReporter>) {
    if let Some(reporter) = reporter {
        let snapshot = reporter.finish();
        log::info!("{}", snapshot.message());
    }
}

fn write_scan_report(
    report: &ScanReport,
    settings: &ScanSettings,
    format: OutputFormat,
    color: bool,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => TextOutput::new(color, settings.show_all)
            .write_scan(&mut out, report)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::from_scan(report, settings.show_all, ExitCode::Success)
            .write_to(&mut out, true)?,
    }
    out.flush().context("Failed to write report")
}

fn write_compare_report(
    report: &CompareReport,
    settings: &ScanSettings,
    format: OutputFormat,
    color: bool,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => TextOutput::new(color, settings.show_all)
            .write_compare(&mut out, report)
            .context("Failed to write report")?,
        OutputFormat::Json => {
            JsonOutput::from_compare(report, settings.show_all, ExitCode::Success)
                .write_to(&mut out, true)?;
        }
    }
    out.flush().context("Failed to write report")
}

/// Remove every non-canonical duplicate, or list them without `confirmed`.
///
/// Deletion messages go to stderr so a JSON report on stdout stays valid.
fn delete_duplicates(
    report: &ScanReport,
    settings: &ScanSettings,
    confirmed: bool,
    color: bool,
) -> anyhow::Result<()> {
    let plan = plan_deletions(&report.classes)?;
    let text = TextOutput::new(color, false);
    let stderr = io::stderr();
    let mut err = stderr.lock();

    if plan.is_empty() {
        writeln!(err, "Nothing to delete")?;
        return Ok(());
    }
    if !confirmed {
        text.write_dry_run(&mut err, &plan)?;
        return Ok(());
    }

    let mode = DeleteMode::from_permanent(settings.permanent_delete);
    log::info!("Deleting {} file(s) ({:?})", plan.len(), mode);
    let result = execute_plan(&plan, mode);
    text.write_deletions(&mut err, &result)?;
    if !result.all_succeeded() {
        log::warn!("{} file(s) could not be deleted", result.failure_count());
    }
    Ok(())
}
