//! Reporting: where status lines, skip notices and log records go.
//!
//! Components talk to a [`ReportSink`]; the binary wires a [`Reporter`]
//! (console or log file). Summary formatting is pure: `RunSummary` in,
//! `String` out.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use humansize::{BINARY, format_size};
use indicatif::ProgressBar;

use crate::error::{Error, Result};
use crate::types::{OutputFormat, RunSummary, ScanMode};

/// Receives progress and results from the scanning components.
///
/// Must be shareable with hashing workers.
pub trait ReportSink: Sync {
    /// Progress or status text. Not part of the results.
    fn status(&self, msg: &str);

    /// An entry that was skipped: unreadable, vanished, or not a regular file.
    fn skipped(&self, path: &Path, reason: &str);

    /// A result line: a group header or a member path.
    fn record(&self, line: &str);
}

// ============================================================================
// REPORTER
// ============================================================================

/// The sink used by the binary.
///
/// Status goes to stderr unless quiet. Records go to the log file when one is
/// configured, otherwise to stdout (or nowhere, for JSON output or `-q`). The writer
/// is buffered and flushed on [`Reporter::finish`] or drop.
pub struct Reporter {
    quiet: bool,
    out: Mutex<Option<Box<dyn Write + Send>>>,
    bar: Mutex<Option<ProgressBar>>,
}

impl Reporter {
    /// Records go to stdout, unless quiet: then nothing reaches the console.
    pub fn console(quiet: bool) -> Self {
        if quiet {
            return Self::status_only(true);
        }
        Self::with_writer(Some(Box::new(io::stdout())), quiet)
    }

    /// Records are dropped; only status is shown.
    pub fn status_only(quiet: bool) -> Self {
        Self::with_writer(None, quiet)
    }

    /// Records go to `path`, truncating any previous contents.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn log_file(path: &Path, quiet: bool) -> Result<Self> {
        let file = File::create(path).map_err(|source| Error::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_writer(
            Some(Box::new(BufWriter::new(file))),
            quiet,
        ))
    }

    pub fn with_writer(out: Option<Box<dyn Write + Send>>, quiet: bool) -> Self {
        Self {
            quiet,
            out: Mutex::new(out),
            bar: Mutex::new(None),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Route console output around a live progress bar.
    pub fn attach_bar(&self, bar: ProgressBar) {
        *lock(&self.bar) = Some(bar);
    }

    pub fn detach_bar(&self) {
        lock(&self.bar).take();
    }

    /// Flush and close the record writer.
    ///
    /// # Errors
    /// Returns an error if buffered records cannot be written.
    pub fn finish(&self) -> io::Result<()> {
        match lock(&self.out).take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }

    fn console_line(&self, line: &str) {
        match lock(&self.bar).as_ref() {
            Some(bar) => bar.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl ReportSink for Reporter {
    fn status(&self, msg: &str) {
        if !self.quiet {
            self.console_line(msg);
        }
    }

    fn skipped(&self, path: &Path, reason: &str) {
        log::debug!("skipped {}: {}", path.display(), reason);
        self.status(&format!("Skipping {}: {}", path.display(), reason));
    }

    fn record(&self, line: &str) {
        let bar = lock(&self.bar).clone();
        let mut out = lock(&self.out);
        let Some(writer) = out.as_mut() else {
            return;
        };
        let result = match bar {
            Some(bar) => bar.suspend(|| writeln!(writer, "{}", line)),
            None => writeln!(writer, "{}", line),
        };
        if let Err(e) = result {
            log::error!("failed to write record: {}", e);
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("failed to flush records: {}", e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// SUMMARY FORMAT
// ============================================================================

/// Format the run summary.
pub fn format_summary(summary: &RunSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(summary),
        OutputFormat::Json => format_json(summary),
    }
}

fn format_human(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str("=== Summary ===\n");
    if summary.mode == ScanMode::SingleFile {
        out.push_str(&format!("Matches found:      {}\n", summary.matches.len()));
        if summary.skipped > 0 {
            out.push_str(&format!("Skipped:            {}\n", summary.skipped));
        }
        return out;
    }
    out.push_str(&format!("Files collected:    {}\n", summary.files_collected));
    out.push_str(&format!("Same-size groups:   {}\n", summary.same_size_groups));
    out.push_str(&format!("Duplicate groups:   {}\n", summary.duplicate_groups));
    out.push_str(&format!("Duplicate files:    {}\n", summary.duplicate_files));
    out.push_str(&format!("Surplus files:      {}\n", summary.surplus_files));
    if summary.moved > 0 {
        out.push_str(&format!("Moved:              {}\n", summary.moved));
    }
    if summary.removed > 0 {
        out.push_str(&format!("Removed:            {}\n", summary.removed));
    }
    if summary.failed > 0 {
        out.push_str(&format!("Failed actions:     {}\n", summary.failed));
    }
    if summary.skipped > 0 {
        out.push_str(&format!("Skipped:            {}\n", summary.skipped));
    }
    out.push_str(&format!(
        "Space recoverable:  {}\n",
        format_size(summary.bytes_recoverable, BINARY)
    ));
    out
}

fn format_json(summary: &RunSummary) -> String {
    serde_json::to_string_pretty(summary)
        .unwrap_or_else(|e| panic!("Failed to serialize summary to JSON: {}", e))
}

// ============================================================================
// TEST SUPPORT
// ============================================================================

/// Sink that keeps everything it receives, for assertions.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub status: Mutex<Vec<String>>,
    pub skipped: Mutex<Vec<std::path::PathBuf>>,
    pub records: Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn records(&self) -> Vec<String> {
        lock(&self.records).clone()
    }

    pub fn skipped_paths(&self) -> Vec<std::path::PathBuf> {
        lock(&self.skipped).clone()
    }
}

#[cfg(test)]
impl ReportSink for RecordingSink {
    fn status(&self, msg: &str) {
        lock(&self.status).push(msg.to_string());
    }

    fn skipped(&self, path: &Path, _reason: &str) {
        lock(&self.skipped).push(path.to_path_buf());
    }

    fn record(&self, line: &str) {
        lock(&self.records).push(line.to_string());
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentHash, MemberAction, MemberOutcome, Origin, Role, SetOutcome};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_summary() -> RunSummary {
        let mut summary = RunSummary {
            files_collected: 5,
            same_size_groups: 1,
            ..Default::default()
        };
        summary.add_set(SetOutcome {
            hash: ContentHash([0xab; 32]),
            size: 2048,
            members: vec![
                MemberOutcome {
                    path: PathBuf::from("/data/a.bin"),
                    origin: Origin::Primary,
                    size: 2048,
                    role: Role::Keep,
                    action: MemberAction::Kept,
                },
                MemberOutcome {
                    path: PathBuf::from("/data/b.bin"),
                    origin: Origin::Primary,
                    size: 2048,
                    role: Role::Surplus,
                    action: MemberAction::Moved {
                        to: PathBuf::from("/dupes/b.bin"),
                    },
                },
            ],
        });
        summary
    }

    #[test]
    fn test_log_file_receives_records_and_not_status() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("run.log");

        let reporter = Reporter::log_file(&log, true).unwrap();
        reporter.status("Reading /somewhere");
        reporter.record("---- abc ----");
        reporter.record("/data/a.bin");
        reporter.finish().unwrap();

        let contents = fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "---- abc ----\n/data/a.bin\n");
    }

    #[test]
    fn test_log_file_is_overwritten_per_run() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("run.log");
        fs::write(&log, "stale line\n").unwrap();

        {
            let reporter = Reporter::log_file(&log, false).unwrap();
            reporter.record("fresh line");
        }

        assert_eq!(fs::read_to_string(&log).unwrap(), "fresh line\n");
    }

    #[test]
    fn test_log_file_flushed_on_drop() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("run.log");

        let reporter = Reporter::log_file(&log, false).unwrap();
        reporter.record("buffered");
        drop(reporter);

        assert_eq!(fs::read_to_string(&log).unwrap(), "buffered\n");
    }

    #[test]
    fn test_log_file_in_missing_dir_errors() {
        let result = Reporter::log_file(Path::new("/nonexistent/dir/run.log"), false);
        assert!(matches!(result, Err(Error::LogFile { .. })));
    }

    #[test]
    fn test_status_only_drops_records() {
        let reporter = Reporter::status_only(true);
        reporter.record("nowhere");
        assert!(reporter.finish().is_ok());
    }

    #[test]
    fn test_quiet_console_writes_no_records() {
        let reporter = Reporter::console(true);
        reporter.record("/dup/path");

        assert!(reporter.is_quiet());
        assert!(lock(&reporter.out).is_none());
    }

    #[test]
    fn test_console_keeps_records_when_not_quiet() {
        let reporter = Reporter::console(false);
        assert!(lock(&reporter.out).is_some());
    }

    #[test]
    fn test_quiet_log_file_still_receives_records() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("run.log");

        let reporter = Reporter::log_file(&log, true).unwrap();
        reporter.record("/dup/path");
        reporter.finish().unwrap();

        assert_eq!(fs::read_to_string(&log).unwrap(), "/dup/path\n");
    }

    #[test]
    fn test_human_summary_contains_counts() {
        let output = format_summary(&sample_summary(), OutputFormat::Human);

        assert!(output.contains("=== Summary ==="));
        assert!(output.contains("Files collected:    5"));
        assert!(output.contains("Duplicate groups:   1"));
        assert!(output.contains("Duplicate files:    2"));
        assert!(output.contains("Moved:              1"));
        assert!(output.contains("2 KiB"));
        assert!(!output.contains("Removed"));
    }

    #[test]
    fn test_human_summary_single_file_mode() {
        let summary = RunSummary {
            mode: ScanMode::SingleFile,
            matches: vec![PathBuf::from("/a"), PathBuf::from("/b")],
            ..Default::default()
        };
        let output = format_summary(&summary, OutputFormat::Human);

        assert!(output.contains("Matches found:      2"));
        assert!(!output.contains("Duplicate groups"));
    }

    #[test]
    fn test_json_summary_is_valid() {
        let output = format_summary(&sample_summary(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["mode"], "full_scan");
        assert_eq!(parsed["duplicate_groups"], 1);
        assert_eq!(parsed["sets"][0]["hash"], "ab".repeat(32));
        assert_eq!(parsed["sets"][0]["members"][1]["action"]["kind"], "moved");
        assert_eq!(parsed["sets"][0]["members"][0]["role"], "keep");
        assert!(parsed.get("matches").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_json_summary_with_non_utf8_file_name() {
        use crate::config::{RunConfig, RunOptions};
        use crate::driver::{NoProgress, run};
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), "A").unwrap();
        fs::write(dir.path().join("ok.txt"), "A").unwrap();

        let config = RunConfig::from_options(RunOptions {
            source: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        let sink = RecordingSink::default();
        let summary = run(&config, &sink, &NoProgress).unwrap();

        let output = format_summary(&summary, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let paths: Vec<&str> = parsed["sets"][0]["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().any(|p| p.ends_with("bad\u{fffd}.txt")));
    }
}
