//! Logging setup on top of `log` and `env_logger`.
//!
//! The level is chosen in this order:
//!
//! 1. `RUST_LOG`, when set, is handed to `env_logger` unchanged
//! 2. `--quiet` limits output to errors
//! 3. `-v` enables debug output, `-vv` trace output
//! 4. Otherwise info
//!
//! Debug builds stamp every line with the time and, when verbose, the module
//! path. Release builds print the level and message only.
//!
//! ```rust,no_run
//! use dupescan::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("visible with -v");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Install the global logger.
///
/// Returns `false` if a logger was already installed, which happens when
/// several tests drive the application in one process.
pub fn init_logging(verbose: u8, quiet: bool) -> bool {
    let mut builder = Builder::new();
    let from_env = env::var_os("RUST_LOG").is_some();

    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);

    let installed = builder.try_init().is_ok();
    if installed {
        log::debug!(
            "Logging initialized at {} ({})",
            current_level_name(),
            if from_env { "RUST_LOG" } else { "flags" }
        );
    }
    installed
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

#[cfg(debug_assertions)]
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        let timestamp = buf.timestamp_seconds();
        if verbose > 0 {
            writeln!(
                buf,
                "{timestamp} {style}{:<5}{style:#} [{}] {}",
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{timestamp} {style}{:<5}{style:#} {}",
                record.level(),
                record.args()
            )
        }
    });
}

#[cfg(not(debug_assertions))]
fn configure_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let style = buf.default_level_style(record.level());
        writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
    });
}

/// Name of the currently active maximum level.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
