//! Single-file mode: find every copy of one file under a tree.
//!
//! The reference file is sized and hashed once. The walk is lazy; each match
//! is yielded as soon as it is confirmed, in walk order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{resolve_root, walker};
use crate::error::{ConfigError, Error, Result};
use crate::hash::HashProvider;
use crate::report::ReportSink;
use crate::types::ContentHash;

/// Identity of the file being searched for.
pub struct SingleFileMatcher<'a> {
    hasher: &'a dyn HashProvider,
    reference: PathBuf,
    size: u64,
    hash: ContentHash,
}

impl<'a> SingleFileMatcher<'a> {
    /// Size and hash the reference file.
    ///
    /// # Errors
    /// Returns an error if the reference is missing, not a regular file, or
    /// cannot be read.
    pub fn new(hasher: &'a dyn HashProvider, reference: &Path) -> Result<Self> {
        let metadata = fs::metadata(reference)
            .map_err(|_| ConfigError::CompareFileNotFound(reference.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(ConfigError::CompareFileNotFound(reference.to_path_buf()).into());
        }
        let hash = hasher.hash(reference).map_err(|e| Error::io(reference, e))?;
        let reference = fs::canonicalize(reference).map_err(|e| Error::io(reference, e))?;

        Ok(Self {
            hasher,
            reference,
            size: metadata.len(),
            hash,
        })
    }

    pub fn reference(&self) -> &Path {
        &self.reference
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Lazily yield every file under `root` identical to the reference.
    ///
    /// The reference file itself is never yielded.
    ///
    /// # Errors
    /// Returns an error if `root` does not exist or is not a directory.
    pub fn matches<'m>(
        &'m self,
        root: &Path,
        recursive: bool,
        sink: &'m dyn ReportSink,
    ) -> Result<Matches<'m, 'a>> {
        let root = resolve_root(root)?;
        Ok(Matches {
            matcher: self,
            walker: walker(&root, recursive),
            root,
            sink,
            skipped: 0,
        })
    }
}

/// Iterator over paths matching the reference file. See
/// [`SingleFileMatcher::matches`].
pub struct Matches<'m, 'a> {
    matcher: &'m SingleFileMatcher<'a>,
    walker: walkdir::IntoIter,
    root: PathBuf,
    sink: &'m dyn ReportSink,
    skipped: usize,
}

impl Matches<'_, '_> {
    /// Entries reported and skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, path: &Path, reason: &str) {
        self.sink.skipped(path, reason);
        self.skipped += 1;
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(self.root.as_path()).to_path_buf();
                    let reason = err
                        .io_error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| err.to_string());
                    self.skip(&path, &reason);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    self.skip(entry.path(), &err.to_string());
                    continue;
                }
            };
            if size != self.matcher.size || entry.path() == self.matcher.reference {
                continue;
            }

            match self.matcher.hasher.hash(entry.path()) {
                Ok(hash) if hash == self.matcher.hash => return Some(entry.into_path()),
                Ok(_) => continue,
                Err(err) => {
                    self.skip(entry.path(), &err.to_string());
                    continue;
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
