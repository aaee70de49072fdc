//! Logging setup for the `inventory` binary.
//!
//! Uses the `log` facade with an `env_logger` backend. The level comes from
//! `RUST_LOG` when set, otherwise from the CLI flags:
//!
//! | flags   | level |
//! |---------|-------|
//! | `-q`    | error |
//! | none    | info  |
//! | `-v`    | debug |
//! | `-vv`   | trace |
//!
//! Debug builds prefix lines with a timestamp, and with the module path from
//! `-v` on. Release builds print level and message only.
//!
//! ```rust,no_run
//! use threaded_inventory::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("Batch 3: 1000 records");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize logging from the CLI verbosity flags.
///
/// Only the first call in a process installs a logger; later calls are
/// ignored so the application entry point can be driven repeatedly from tests.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    let from_env = env::var("RUST_LOG").is_ok();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_ok() {
        if from_env {
            log::debug!("Logging initialized from RUST_LOG");
        } else {
            log::debug!("Logging initialized at level {}", current_level_name());
        }
    }
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if verbose >= 1 {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_seconds(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} {}",
                buf.timestamp_seconds(),
                level,
                record.args()
            )
        }
    });

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        });
    }
}

/// Name of the current maximum log level.
#[must_use]
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
