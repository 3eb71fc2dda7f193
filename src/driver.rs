//! Run orchestration: picks full-scan or single-file mode and drives the
//! components in order.
//!
//! Full scan: catalog → resolve → dispose each set. Single file: size and
//! hash the reference once, then record each match as it is found.

use crate::catalog::{catalog_with_progress, scan_roots};
use crate::config::{Mode, RunConfig};
use crate::disposition::DispositionPolicy;
use crate::error::Result;
use crate::hash::{Blake3Hasher, HashProvider};
use crate::matcher::SingleFileMatcher;
use crate::report::ReportSink;
use crate::resolver::Resolver;
use crate::types::{RunSummary, ScanMode};

/// Progress hooks for a UI. Every method defaults to a no-op.
pub trait Progress: Sync {
    /// Running count of files cataloged.
    fn cataloged(&self, _files: usize) {}

    /// Cataloging is over; `total` files will be hashed.
    fn hashing_started(&self, _total: usize) {}

    /// Running count of files hashed.
    fn hashed(&self, _done: usize) {}

    fn hashing_finished(&self) {}
}

/// Progress that reports nothing.
pub struct NoProgress;

impl Progress for NoProgress {}

/// Execute one run with the default hasher.
///
/// # Errors
/// Returns an error on fatal conditions only: a missing or unreadable root,
/// a missing compare file, or a hashing pool that cannot start.
pub fn run(config: &RunConfig, sink: &dyn ReportSink, progress: &dyn Progress) -> Result<RunSummary> {
    run_with_hasher(config, &Blake3Hasher, sink, progress)
}

/// Execute one run with a given hasher.
///
/// # Errors
/// See [`run`].
pub fn run_with_hasher(
    config: &RunConfig,
    hasher: &dyn HashProvider,
    sink: &dyn ReportSink,
    progress: &dyn Progress,
) -> Result<RunSummary> {
    match &config.mode {
        Mode::SingleFile { file } => run_single_file(config, file, hasher, sink),
        Mode::FullScan { .. } => run_full_scan(config, hasher, sink, progress),
    }
}

fn run_full_scan(
    config: &RunConfig,
    hasher: &dyn HashProvider,
    sink: &dyn ReportSink,
    progress: &dyn Progress,
) -> Result<RunSummary> {
    let roots = scan_roots(&config.source, config.reference());
    let catalog = catalog_with_progress(&roots, config.recursive, sink, |n| progress.cataloged(n))?;

    let mut summary = RunSummary {
        mode: ScanMode::FullScan,
        files_collected: catalog.files,
        distinct_sizes: catalog.distinct_sizes(),
        same_size_groups: catalog.same_size_groups(),
        ..Default::default()
    };
    sink.status(&format!("Collected {} files", summary.files_collected));
    sink.status(&format!("Same size groups {}", summary.same_size_groups));

    let to_hash: usize = catalog
        .groups
        .values()
        .filter(|g| g.len() > 1)
        .map(Vec::len)
        .sum();

    let resolver = match config.jobs {
        Some(threads) => Resolver::with_threads(hasher, threads)?,
        None => Resolver::new(hasher),
    };
    progress.hashing_started(to_hash);
    let resolution = resolver.resolve_with_progress(catalog.groups, sink, |n| progress.hashed(n));
    progress.hashing_finished();

    sink.status(&format!("Duplicate groups {}", resolution.sets.len()));

    let policy = DispositionPolicy::from_config(config);
    for set in &resolution.sets {
        summary.add_set(policy.dispose(set, sink));
    }
    summary.skipped = catalog.skipped + resolution.hash_failures;

    sink.status(&format!("Duplicate files found {}", summary.duplicate_files));
    Ok(summary)
}

fn run_single_file(
    config: &RunConfig,
    file: &std::path::Path,
    hasher: &dyn HashProvider,
    sink: &dyn ReportSink,
) -> Result<RunSummary> {
    let matcher = SingleFileMatcher::new(hasher, file)?;
    sink.status(&format!(
        "Comparing file {} size {}",
        matcher.reference().display(),
        matcher.size()
    ));

    let mut matches = matcher.matches(&config.source, config.recursive, sink)?;
    let mut summary = RunSummary {
        mode: ScanMode::SingleFile,
        ..Default::default()
    };
    for path in matches.by_ref() {
        sink.record(&path.display().to_string());
        summary.matches.push(path);
    }
    summary.skipped = matches.skipped();

    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================
