//! Keep/surplus decisions and the actions applied to surplus files.
//!
//! With a reference tree, every reference member is kept and every primary
//! member is surplus. Without one, the first member in stored order is kept
//! and the rest are surplus. Kept members are logged, never touched.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{Action, RunConfig};
use crate::report::ReportSink;
use crate::types::{DuplicateSet, MemberAction, MemberOutcome, Origin, Role, SetOutcome};

/// Suffix on primary-tree paths in directory-compare logs.
pub const PRIMARY_MARKER: &str = "***";

/// Highest numeric suffix tried when resolving a name collision.
const MAX_SUFFIX: u32 = 10_000;

/// How the kept member of a set is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepRule {
    /// Keep the first member in stored order.
    FirstMember,
    /// Keep reference-tree members; everything else is surplus.
    ReferenceTree,
}

/// A failed relocation. The source file is left where it was.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),

    #[error("no free name for {} in {}", name.to_string_lossy(), dir.display())]
    NamesExhausted { dir: PathBuf, name: OsString },

    #[error("cannot move {} to {}: {source}", from.display(), to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Applies the keep rule and the configured action to duplicate sets.
#[derive(Debug, Clone)]
pub struct DispositionPolicy {
    keep: KeepRule,
    action: Action,
}

impl DispositionPolicy {
    pub fn new(keep: KeepRule, action: Action) -> Self {
        Self { keep, action }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let keep = if config.reference().is_some() {
            KeepRule::ReferenceTree
        } else {
            KeepRule::FirstMember
        };
        Self::new(keep, config.action.clone())
    }

    /// Role of each member, in member order.
    pub fn roles(&self, set: &DuplicateSet) -> Vec<Role> {
        match self.keep {
            KeepRule::ReferenceTree => set
                .members
                .iter()
                .map(|m| match m.origin {
                    Origin::Reference => Role::Keep,
                    Origin::Primary => Role::Surplus,
                })
                .collect(),
            KeepRule::FirstMember => (0..set.members.len())
                .map(|i| if i == 0 { Role::Keep } else { Role::Surplus })
                .collect(),
        }
    }

    /// Log the set and act on its surplus members.
    ///
    /// A failed move or remove is reported and recorded in the outcome; the
    /// remaining members are still processed.
    pub fn dispose(&self, set: &DuplicateSet, sink: &dyn ReportSink) -> SetOutcome {
        let roles = self.roles(set);
        if self.keep == KeepRule::ReferenceTree && !roles.contains(&Role::Keep) {
            log::warn!(
                "set {} has no reference copy; all {} members are surplus",
                set.hash,
                set.members.len()
            );
        }

        sink.record(&format!("---- {} ----", set.hash));

        let members = set
            .members
            .iter()
            .zip(roles)
            .map(|(member, role)| {
                let marker = match (self.keep, member.origin) {
                    (KeepRule::ReferenceTree, Origin::Primary) => PRIMARY_MARKER,
                    _ => "",
                };
                sink.record(&format!("{}{}", member.path.display(), marker));

                let action = match role {
                    Role::Keep => MemberAction::Kept,
                    Role::Surplus => self.apply(&member.path, sink),
                };

                MemberOutcome {
                    path: member.path.clone(),
                    origin: member.origin,
                    size: member.size,
                    role,
                    action,
                }
            })
            .collect();

        SetOutcome {
            hash: set.hash.clone(),
            size: set.size,
            members,
        }
    }

    fn apply(&self, path: &Path, sink: &dyn ReportSink) -> MemberAction {
        match &self.action {
            Action::Report => MemberAction::Reported,
            Action::MoveTo(dir) => match move_into(path, dir) {
                Ok(to) => {
                    log::info!("moved {} to {}", path.display(), to.display());
                    MemberAction::Moved { to }
                }
                Err(e) => {
                    sink.status(&format!("Failed to move {}: {}", path.display(), e));
                    MemberAction::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            Action::Remove => match fs::remove_file(path) {
                Ok(()) => {
                    log::info!("removed {}", path.display());
                    MemberAction::Removed
                }
                Err(e) => {
                    sink.status(&format!("Failed to remove {}: {}", path.display(), e));
                    MemberAction::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        }
    }
}

// ============================================================================
// MOVING
// ============================================================================

/// Move `file` into `dir`, renaming on collision. Returns the new path.
///
/// # Errors
/// Returns an error if no free name is found or the move fails.
pub fn move_into(file: &Path, dir: &Path) -> Result<PathBuf, MoveError> {
    let name = file
        .file_name()
        .ok_or_else(|| MoveError::NoFileName(file.to_path_buf()))?;
    let dest = unique_destination(dir, name)?;

    place(file, &dest)
        .map(|()| dest.clone())
        .map_err(|source| MoveError::Io {
            from: file.to_path_buf(),
            to: dest,
            source,
        })
}

/// Put `file` at `dest`, which must not exist yet.
///
/// A name taken since it was checked is an `AlreadyExists` error, never an
/// overwrite. If the source cannot be removed afterwards, the new copy is
/// removed again so no extra duplicate is left behind.
fn place(file: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(file, dest) {
        Ok(()) => remove_source(file, dest),
        Err(e) if matches!(e.kind(), io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound) => {
            Err(e)
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(file, dest),
        Err(e) => {
            // No hard links on this filesystem.
            log::debug!("hard link to {} failed ({}); renaming", dest.display(), e);
            if exists(dest) {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists));
            }
            fs::rename(file, dest)
        }
    }
}

fn copy_then_remove(file: &Path, dest: &Path) -> io::Result<()> {
    let mut source = File::open(file)?;
    let mut out = OpenOptions::new().write(true).create_new(true).open(dest)?;

    let copied = io::copy(&mut source, &mut out)
        .and_then(|_| out.set_permissions(source.metadata()?.permissions()));
    drop(out);
    if let Err(e) = copied {
        discard(dest);
        return Err(e);
    }
    remove_source(file, dest)
}

fn remove_source(file: &Path, dest: &Path) -> io::Result<()> {
    fs::remove_file(file).inspect_err(|_| discard(dest))
}

fn discard(dest: &Path) {
    if let Err(e) = fs::remove_file(dest) {
        log::warn!("could not clean up {}: {}", dest.display(), e);
    }
}

/// First free path for `name` in `dir`.
///
/// `a.txt` becomes `a_1.txt`, `a_2.txt`, ... when taken; the extension is
/// kept. Names without an extension get the suffix at the end.
///
/// # Errors
/// Returns [`MoveError::NamesExhausted`] if every suffix is taken.
pub fn unique_destination(dir: &Path, name: &OsStr) -> Result<PathBuf, MoveError> {
    let candidate = dir.join(name);
    if !exists(&candidate) {
        return Ok(candidate);
    }

    let as_path = Path::new(name);
    let stem = as_path.file_stem().unwrap_or(name);
    let ext = as_path.extension();

    for n in 1..=MAX_SUFFIX {
        let mut numbered = stem.to_os_string();
        numbered.push(format!("_{}", n));
        if let Some(ext) = ext {
            numbered.push(".");
            numbered.push(ext);
        }
        let candidate = dir.join(&numbered);
        if !exists(&candidate) {
            return Ok(candidate);
        }
    }

    Err(MoveError::NamesExhausted {
        dir: dir.to_path_buf(),
        name: name.to_os_string(),
    })
}

/// Like `Path::exists`, but a dangling symlink still occupies the name.
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

// ============================================================================
// TESTS
// ============================================================================
