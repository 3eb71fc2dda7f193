//! Domain types for dupfind.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Content identity: two files with the same hash are treated as identical.
///
/// Wraps a 32-byte BLAKE3 digest. Ordering follows the bytes, which is the
/// same as ordering by the hex rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Returns the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Paths render lossily: a file name that is not valid UTF-8 must not stop
/// the summary from being written.
fn serialize_path<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

fn serialize_paths<S>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

// ============================================================================
// ENUMS
// ============================================================================

/// Which root a file was discovered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The source tree (`-s`).
    Primary,
    /// The compare tree (`-c`). Never surplus.
    Reference,
}

/// Whether a duplicate-set member survives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Keep,
    Surplus,
}

/// What happened to one member of a duplicate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MemberAction {
    /// Kept member, logged only.
    Kept,
    /// Surplus member, logged only (no move or remove configured).
    Reported,
    /// Surplus member relocated.
    Moved {
        #[serde(serialize_with = "serialize_path")]
        to: PathBuf,
    },
    /// Surplus member deleted.
    Removed,
    /// Move or remove was attempted and failed; the file is untouched.
    Failed { reason: String },
}

/// Which entry point produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    FullScan,
    SingleFile,
}

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Log lines as they are produced, then a readable summary.
    #[default]
    Human,
    /// Machine-readable JSON summary on stdout.
    Json,
}

// ============================================================================
// STRUCTS
// ============================================================================

/// A regular file found while walking a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    /// Length in bytes.
    pub size: u64,
    /// Root the file was found under.
    pub origin: Origin,
    /// Discovery order across the whole catalog (reference tree first).
    pub seq: u64,
}

/// Files grouped by byte length; members in discovery order.
pub type SizeGroups = BTreeMap<u64, Vec<FileRecord>>;

/// Files proven identical by equal size and equal content hash.
///
/// Always holds at least two members, in discovery order.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    pub hash: ContentHash,
    pub size: u64,
    pub members: Vec<FileRecord>,
}

/// Outcome for one member of a processed duplicate set.
#[derive(Debug, Clone, Serialize)]
pub struct MemberOutcome {
    #[serde(serialize_with = "serialize_path")]
    pub path: PathBuf,
    pub origin: Origin,
    pub size: u64,
    pub role: Role,
    pub action: MemberAction,
}

/// A duplicate set after disposition.
#[derive(Debug, Clone, Serialize)]
pub struct SetOutcome {
    pub hash: ContentHash,
    pub size: u64,
    pub members: Vec<MemberOutcome>,
}

impl SetOutcome {
    /// Members designated surplus.
    pub fn surplus(&self) -> impl Iterator<Item = &MemberOutcome> {
        self.members.iter().filter(|m| m.role == Role::Surplus)
    }
}

/// Totals and results for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub mode: ScanMode,
    /// Files cataloged across all roots.
    pub files_collected: usize,
    /// Distinct file sizes seen.
    pub distinct_sizes: usize,
    /// Size groups with two or more members.
    pub same_size_groups: usize,
    /// Sets of identical files.
    pub duplicate_groups: usize,
    /// Every member of every duplicate set, kept or surplus.
    pub duplicate_files: usize,
    /// Members designated surplus.
    pub surplus_files: usize,
    /// Total size of surplus members.
    pub bytes_recoverable: u64,
    pub moved: usize,
    pub removed: usize,
    /// Move or remove failures.
    pub failed: usize,
    /// Entries skipped because they could not be walked or hashed.
    pub skipped: usize,
    /// Processed duplicate sets, ordered by hash.
    pub sets: Vec<SetOutcome>,
    /// Single-file mode: paths matching the reference file, in walk order.
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_paths")]
    pub matches: Vec<PathBuf>,
}

impl RunSummary {
    /// Fold one processed set into the totals.
    pub fn add_set(&mut self, set: SetOutcome) {
        self.duplicate_groups += 1;
        self.duplicate_files += set.members.len();
        for member in set.surplus() {
            self.surplus_files += 1;
            self.bytes_recoverable += member.size;
            match member.action {
                MemberAction::Moved { .. } => self.moved += 1,
                MemberAction::Removed => self.removed += 1,
                MemberAction::Failed { .. } => self.failed += 1,
                MemberAction::Kept | MemberAction::Reported => {}
            }
        }
        self.sets.push(set);
    }
}

// ============================================================================
// TESTS
// ============================================================================
