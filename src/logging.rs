//! Diagnostic logging through the `log` facade with an `env_logger` backend.
//!
//! Level, highest priority first:
//!
//! 1. `RUST_LOG`, if set
//! 2. `-q`: errors only
//! 3. `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace
//!
//! Log output goes to stderr and is separate from the duplicate log (`-l`).

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Initialize logging. Call once, before any log macro fires.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    if env::var_os("RUST_LOG").is_some() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
    });

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
