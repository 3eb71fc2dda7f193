//! dupfind CLI
//!
//! Find duplicate files under a directory, optionally against a reference
//! directory or a single file, and log, move or remove the surplus copies.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};

use dupfind::config::{RunConfig, RunOptions};
use dupfind::driver::{self, Progress};
use dupfind::error::Error;
use dupfind::logging::init_logging;
use dupfind::report::{Reporter, format_summary};
use dupfind::types::OutputFormat;

const USAGE: &str =
    "Usage: dupfind -s <dir> [-c <dir> | -f <file>] [-m <dir> | -r] [-l <file>] [-o] [-q]";

#[derive(Parser)]
#[command(name = "dupfind")]
#[command(about = "Find duplicate files by size and content hash")]
#[command(version)]
struct Cli {
    /// Directory to scan for duplicates
    #[arg(short = 's', long = "source", value_name = "DIR")]
    source: Option<PathBuf>,

    /// Reference directory: its files are always kept, matching files under
    /// the source are surplus
    #[arg(short = 'c', long = "compare", value_name = "DIR")]
    compare: Option<PathBuf>,

    /// Find copies of this one file under the source directory
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,

    /// Destination directory (accepted, currently unused)
    #[arg(short = 'd', long = "dest", value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Move surplus duplicates into this directory (must exist)
    #[arg(short = 'm', long = "move-to", value_name = "DIR")]
    move_to: Option<PathBuf>,

    /// Write the duplicate listing to this file instead of stdout
    #[arg(short = 'l', long = "log", value_name = "FILE")]
    log: Option<PathBuf>,

    /// Only scan the top level of each directory
    #[arg(short = 'o', long = "one-dir")]
    one_dir: bool,

    /// Suppress progress and status output
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Delete surplus duplicates
    #[arg(short = 'r', long)]
    remove: bool,

    /// Number of hashing threads (default: one per core)
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,

    /// Diagnostic log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Summary format
    #[arg(long, value_enum, default_value = "human")]
    format: OutputFormatArg,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        RunOptions {
            source: cli.source,
            compare_dir: cli.compare,
            compare_file: cli.file,
            destination: cli.dest,
            move_to: cli.move_to,
            log_file: cli.log,
            one_dir: cli.one_dir,
            quiet: cli.quiet,
            remove: cli.remove,
            jobs: cli.jobs,
            format: cli.format.into(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match execute(cli.into()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// PROGRESS
// ============================================================================

/// One bar for the whole run: a spinner while cataloging, a bar while hashing.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        bar.set_message("Cataloging files...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn cataloged(&self, files: usize) {
        self.bar.set_message(format!("Cataloged {} files...", files));
    }

    fn hashing_started(&self, total: usize) {
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("Hashing...");
    }

    fn hashed(&self, done: usize) {
        self.bar.set_position(done as u64);
    }

    fn hashing_finished(&self) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// RUN
// ============================================================================

fn execute(options: RunOptions) -> Result<(), Error> {
    let config = RunConfig::from_options(options)?;

    let reporter = match (&config.log_file, config.format) {
        (Some(path), _) => Reporter::log_file(path, config.quiet)?,
        (None, OutputFormat::Json) => Reporter::status_only(config.quiet),
        (None, OutputFormat::Human) => Reporter::console(config.quiet),
    };

    let show_progress =
        !config.quiet && config.format == OutputFormat::Human && io::stderr().is_terminal();
    let progress = BarProgress::new(show_progress);
    reporter.attach_bar(progress.bar.clone());

    let result = driver::run(&config, &reporter, &progress);
    progress.bar.finish_and_clear();
    reporter.detach_bar();
    let summary = result?;

    reporter.finish().map_err(|source| match &config.log_file {
        Some(path) => Error::LogFile {
            path: path.clone(),
            source,
        },
        None => Error::Io {
            path: PathBuf::from("<stdout>"),
            source,
        },
    })?;

    match config.format {
        OutputFormat::Human if !config.quiet => {
            eprintln!();
            eprint!("{}", format_summary(&summary, OutputFormat::Human));
        }
        OutputFormat::Human => {}
        OutputFormat::Json => println!("{}", format_summary(&summary, OutputFormat::Json)),
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
