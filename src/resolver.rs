//! Hash verification of same-size candidates.
//!
//! Only size groups with two or more members are hashed. Hashing fans out on
//! a rayon pool; the hash → files map is shared and each insert takes the
//! lock, but hashing itself never does.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::error::Result;
use crate::hash::HashProvider;
use crate::report::ReportSink;
use crate::types::{ContentHash, DuplicateSet, FileRecord, SizeGroups};

/// Output of [`Resolver::resolve`].
#[derive(Debug, Default)]
pub struct Resolution {
    /// Duplicate sets, ordered by hash.
    pub sets: Vec<DuplicateSet>,
    /// Size groups that were hashed.
    pub candidate_groups: usize,
    /// Files that were hashed (or attempted).
    pub candidate_files: usize,
    /// Files that could not be hashed and were left out.
    pub hash_failures: usize,
}

/// Groups same-size files by content hash.
pub struct Resolver<'h> {
    hasher: &'h dyn HashProvider,
    pool: Option<rayon::ThreadPool>,
}

impl<'h> Resolver<'h> {
    /// Hash on rayon's global pool.
    pub fn new(hasher: &'h dyn HashProvider) -> Self {
        Self { hasher, pool: None }
    }

    /// Hash on a dedicated pool of `threads` workers.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be started.
    pub fn with_threads(hasher: &'h dyn HashProvider, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dupfind-hash-{}", i))
            .build()?;
        Ok(Self {
            hasher,
            pool: Some(pool),
        })
    }

    pub fn resolve(&self, groups: SizeGroups, sink: &dyn ReportSink) -> Resolution {
        self.resolve_with_progress(groups, sink, |_| {})
    }

    /// Like [`Resolver::resolve`], calling `on_hashed` with the running count
    /// of files hashed.
    pub fn resolve_with_progress<F>(
        &self,
        groups: SizeGroups,
        sink: &dyn ReportSink,
        on_hashed: F,
    ) -> Resolution
    where
        F: Fn(usize) + Sync,
    {
        let candidates: Vec<Vec<FileRecord>> = groups
            .into_values()
            .filter(|group| group.len() > 1)
            .collect();

        let candidate_groups = candidates.len();
        let candidate_files: usize = candidates.iter().map(Vec::len).sum();
        log::info!(
            "hashing {} files in {} same-size groups",
            candidate_files,
            candidate_groups
        );

        let by_hash: Mutex<BTreeMap<ContentHash, Vec<FileRecord>>> = Mutex::new(BTreeMap::new());
        let hashed = AtomicUsize::new(0);
        let failures = AtomicUsize::new(0);

        let work = || {
            for group in candidates {
                group.into_par_iter().for_each(|record| {
                    let result = self.hasher.hash(&record.path);
                    on_hashed(hashed.fetch_add(1, Ordering::Relaxed) + 1);

                    match result {
                        Ok(hash) => {
                            let mut map = by_hash
                                .lock()
                                .unwrap_or_else(|poisoned| poisoned.into_inner());
                            map.entry(hash).or_default().push(record);
                        }
                        Err(e) => {
                            failures.fetch_add(1, Ordering::Relaxed);
                            sink.skipped(&record.path, &e.to_string());
                        }
                    }
                });
            }
        };

        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }

        let by_hash = by_hash
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let sets = by_hash
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(hash, mut members)| {
                // Completion order is arbitrary; restore discovery order.
                members.sort_by_key(|m| m.seq);
                DuplicateSet {
                    hash,
                    size: members[0].size,
                    members,
                }
            })
            .collect();

        Resolution {
            sets,
            candidate_groups,
            candidate_files,
            hash_failures: failures.into_inner(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
