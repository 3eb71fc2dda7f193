//! Directory walking and size grouping.
//!
//! Walks each root depth-first and files every regular file under its byte
//! length. Anything else the walk meets is reported and skipped, and one
//! bad entry never stops the walk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::report::ReportSink;
use crate::types::{FileRecord, Origin, SizeGroups};

/// A directory to catalog and the tag its files carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub path: PathBuf,
    pub origin: Origin,
}

impl Root {
    pub fn primary(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: Origin::Primary,
        }
    }

    pub fn reference(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: Origin::Reference,
        }
    }
}

/// Roots in catalog order: the reference tree first, so its files lead
/// every size group.
pub fn scan_roots(source: &Path, reference: Option<&Path>) -> Vec<Root> {
    reference
        .map(Root::reference)
        .into_iter()
        .chain(std::iter::once(Root::primary(source)))
        .collect()
}

/// Result of walking the roots.
#[derive(Debug, Default)]
pub struct Catalog {
    pub groups: SizeGroups,
    /// Regular files cataloged.
    pub files: usize,
    /// Entries reported and skipped.
    pub skipped: usize,
}

impl Catalog {
    pub fn distinct_sizes(&self) -> usize {
        self.groups.len()
    }

    /// Size groups with at least two members.
    pub fn same_size_groups(&self) -> usize {
        self.groups.values().filter(|g| g.len() > 1).count()
    }
}

/// Catalog `roots` in order.
///
/// # Errors
/// Returns an error if a root does not exist or is not a directory.
pub fn catalog(roots: &[Root], recursive: bool, sink: &dyn ReportSink) -> Result<Catalog> {
    catalog_with_progress(roots, recursive, sink, |_| {})
}

/// Like [`catalog`], calling `on_file` with the running file count.
///
/// # Errors
/// Returns an error if a root does not exist or is not a directory.
pub fn catalog_with_progress<F>(
    roots: &[Root],
    recursive: bool,
    sink: &dyn ReportSink,
    mut on_file: F,
) -> Result<Catalog>
where
    F: FnMut(usize),
{
    let mut catalog = Catalog::default();
    // Only needed when trees can overlap.
    let mut seen: Option<HashSet<PathBuf>> = (roots.len() > 1).then(HashSet::new);
    let mut seq = 0u64;

    for root in roots {
        let root_path = resolve_root(&root.path)?;
        sink.status(&format!("Reading {}", root_path.display()));
        let started = Instant::now();
        let before = catalog.files;

        for entry in walker(&root_path, recursive) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root_path.as_path()).to_path_buf();
                    let reason = err
                        .io_error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| err.to_string());
                    sink.skipped(&path, &reason);
                    catalog.skipped += 1;
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                let reason = if file_type.is_symlink() {
                    "symbolic link"
                } else {
                    "not a regular file"
                };
                sink.skipped(entry.path(), reason);
                catalog.skipped += 1;
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    sink.skipped(entry.path(), &err.to_string());
                    catalog.skipped += 1;
                    continue;
                }
            };

            let path = entry.into_path();
            if let Some(seen) = seen.as_mut() {
                if !seen.insert(path.clone()) {
                    continue;
                }
            }

            catalog.groups.entry(size).or_default().push(FileRecord {
                path,
                size,
                origin: root.origin,
                seq,
            });
            seq += 1;
            catalog.files += 1;
            on_file(catalog.files);
        }

        log::info!(
            "cataloged {} files under {} in {:?}",
            catalog.files - before,
            root_path.display(),
            started.elapsed()
        );
    }

    Ok(catalog)
}

// ============================================================================
// INTERNAL
// ============================================================================

/// Absolute form of a root, which must be a directory.
pub(crate) fn resolve_root(path: &Path) -> Result<PathBuf> {
    let resolved = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
    if !resolved.is_dir() {
        return Err(Error::RootNotADirectory(path.to_path_buf()));
    }
    Ok(resolved)
}

/// Depth-first walk below `root`, root itself excluded, names sorted within
/// each directory, links never followed.
pub(crate) fn walker(root: &Path, recursive: bool) -> walkdir::IntoIter {
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    if !recursive {
        walker = walker.max_depth(1);
    }

    walker.into_iter()
}

// ============================================================================
// TESTS
// ============================================================================
