//! Run configuration.
//!
//! Raw options come from the command line; [`RunConfig::from_options`]
//! validates them once into an immutable value that is passed to every
//! component explicitly.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::OutputFormat;

/// Options as given by the user, before validation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub source: Option<PathBuf>,
    pub compare_dir: Option<PathBuf>,
    pub compare_file: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub move_to: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub one_dir: bool,
    pub quiet: bool,
    pub remove: bool,
    pub jobs: Option<usize>,
    pub format: OutputFormat,
}

impl RunOptions {
    /// True when the user supplied nothing at all.
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.compare_dir.is_none()
            && self.compare_file.is_none()
            && self.destination.is_none()
            && self.move_to.is_none()
            && self.log_file.is_none()
            && !self.one_dir
            && !self.quiet
            && !self.remove
            && self.jobs.is_none()
    }
}

/// Which entry point the run takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Group the whole source tree (and optional reference tree) by size and hash.
    FullScan { reference: Option<PathBuf> },
    /// Report every file under the source tree identical to `file`.
    SingleFile { file: PathBuf },
}

/// What happens to surplus duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Log only.
    Report,
    /// Relocate into this directory.
    MoveTo(PathBuf),
    /// Delete.
    Remove,
}

/// Validated, read-only configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: PathBuf,
    pub mode: Mode,
    pub action: Action,
    pub recursive: bool,
    pub quiet: bool,
    pub log_file: Option<PathBuf>,
    /// Accepted for compatibility; nothing reads it.
    pub destination: Option<PathBuf>,
    /// Hashing worker bound (None = one per core).
    pub jobs: Option<usize>,
    pub format: OutputFormat,
}

impl RunConfig {
    /// Validate raw options.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for an empty option set, a missing or
    /// nonexistent source, a missing compare directory or compare file,
    /// move combined with remove, or a zero worker count.
    pub fn from_options(options: RunOptions) -> Result<Self, ConfigError> {
        if options.is_empty() {
            return Err(ConfigError::NoArguments);
        }

        let source = match options.source {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err(ConfigError::MissingSource),
        };
        if !source.exists() {
            return Err(ConfigError::SourceNotFound(source));
        }

        if options.jobs == Some(0) {
            return Err(ConfigError::InvalidJobs);
        }

        if options.move_to.is_some() && options.remove {
            return Err(ConfigError::ConflictingActions);
        }

        let mode = match (options.compare_file, options.compare_dir) {
            (Some(file), compare_dir) => {
                if !file.is_file() {
                    return Err(ConfigError::CompareFileNotFound(file));
                }
                if let Some(dir) = compare_dir {
                    log::debug!("-c {} ignored in single-file mode", dir.display());
                }
                if options.move_to.is_some() || options.remove {
                    log::warn!("single-file mode only reports matches; -m and -r are ignored");
                }
                Mode::SingleFile { file }
            }
            (None, Some(dir)) => {
                if !dir.is_dir() {
                    return Err(ConfigError::CompareDirNotFound(dir));
                }
                Mode::FullScan {
                    reference: Some(dir),
                }
            }
            (None, None) => Mode::FullScan { reference: None },
        };

        let action = match options.move_to {
            Some(dir) if is_existing_dir(&dir) => Action::MoveTo(dir),
            Some(dir) => {
                log::warn!(
                    "move target {} does not exist; duplicates will not be moved",
                    dir.display()
                );
                Action::Report
            }
            None if options.remove => Action::Remove,
            None => Action::Report,
        };

        if let Some(dest) = &options.destination {
            log::debug!("destination {} accepted but unused", dest.display());
        }

        Ok(Self {
            source,
            mode,
            action,
            recursive: !options.one_dir,
            quiet: options.quiet,
            log_file: options.log_file,
            destination: options.destination,
            jobs: options.jobs,
            format: options.format,
        })
    }

    /// The reference tree, when running in directory-compare mode.
    pub fn reference(&self) -> Option<&Path> {
        match &self.mode {
            Mode::FullScan { reference } => reference.as_deref(),
            Mode::SingleFile { .. } => None,
        }
    }
}

fn is_existing_dir(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_dir()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options_for(dir: &TempDir) -> RunOptions {
        RunOptions {
            source: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_options_rejected() {
        let result = RunConfig::from_options(RunOptions::default());
        assert!(matches!(result, Err(ConfigError::NoArguments)));
    }

    #[test]
    fn test_missing_source_rejected() {
        let options = RunOptions {
            quiet: true,
            ..Default::default()
        };
        let result = RunConfig::from_options(options);
        assert!(matches!(result, Err(ConfigError::MissingSource)));
    }

    #[test]
    fn test_empty_source_rejected() {
        let options = RunOptions {
            source: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(matches!(
            RunConfig::from_options(options),
            Err(ConfigError::MissingSource)
        ));
    }

    #[test]
    fn test_nonexistent_source_rejected() {
        let options = RunOptions {
            source: Some(PathBuf::from("/nonexistent/source/dir")),
            ..Default::default()
        };
        assert!(matches!(
            RunConfig::from_options(options),
            Err(ConfigError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::from_options(options_for(&dir)).unwrap();

        assert_eq!(config.mode, Mode::FullScan { reference: None });
        assert_eq!(config.action, Action::Report);
        assert!(config.recursive);
        assert!(!config.quiet);
        assert!(config.reference().is_none());
    }

    #[test]
    fn test_one_dir_disables_recursion() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            one_dir: true,
            ..options_for(&dir)
        };
        assert!(!RunConfig::from_options(options).unwrap().recursive);
    }

    #[test]
    fn test_compare_dir_enables_reference_mode() {
        let dir = TempDir::new().unwrap();
        let reference = TempDir::new().unwrap();
        let options = RunOptions {
            compare_dir: Some(reference.path().to_path_buf()),
            ..options_for(&dir)
        };

        let config = RunConfig::from_options(options).unwrap();
        assert_eq!(config.reference(), Some(reference.path()));
    }

    #[test]
    fn test_missing_compare_dir_rejected() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            compare_dir: Some(dir.path().join("absent")),
            ..options_for(&dir)
        };
        assert!(matches!(
            RunConfig::from_options(options),
            Err(ConfigError::CompareDirNotFound(_))
        ));
    }

    #[test]
    fn test_compare_file_selects_single_file_mode() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("r.txt");
        fs::write(&file, "A").unwrap();
        let options = RunOptions {
            compare_file: Some(file.clone()),
            compare_dir: Some(dir.path().to_path_buf()),
            ..options_for(&dir)
        };

        let config = RunConfig::from_options(options).unwrap();
        assert_eq!(config.mode, Mode::SingleFile { file });
        assert!(config.reference().is_none());
    }

    #[test]
    fn test_missing_compare_file_rejected() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            compare_file: Some(dir.path().join("absent.txt")),
            ..options_for(&dir)
        };
        assert!(matches!(
            RunConfig::from_options(options),
            Err(ConfigError::CompareFileNotFound(_))
        ));
    }

    #[test]
    fn test_move_and_remove_conflict() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            move_to: Some(dir.path().to_path_buf()),
            remove: true,
            ..options_for(&dir)
        };
        assert!(matches!(
            RunConfig::from_options(options),
            Err(ConfigError::ConflictingActions)
        ));
    }

    #[test]
    fn test_move_to_existing_dir() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let options = RunOptions {
            move_to: Some(target.path().to_path_buf()),
            ..options_for(&dir)
        };

        let config = RunConfig::from_options(options).unwrap();
        assert_eq!(config.action, Action::MoveTo(target.path().to_path_buf()));
    }

    #[test]
    fn test_move_to_missing_dir_falls_back_to_report() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            move_to: Some(dir.path().join("absent")),
            ..options_for(&dir)
        };
        assert_eq!(RunConfig::from_options(options).unwrap().action, Action::Report);
    }

    #[test]
    fn test_remove_flag() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            remove: true,
            ..options_for(&dir)
        };
        assert_eq!(RunConfig::from_options(options).unwrap().action, Action::Remove);
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            jobs: Some(0),
            ..options_for(&dir)
        };
        assert!(matches!(
            RunConfig::from_options(options),
            Err(ConfigError::InvalidJobs)
        ));
    }

    #[test]
    fn test_destination_is_kept_but_inert() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            destination: Some(PathBuf::from("/anywhere")),
            ..options_for(&dir)
        };
        let config = RunConfig::from_options(options).unwrap();
        assert_eq!(config.destination, Some(PathBuf::from("/anywhere")));
        assert_eq!(config.action, Action::Report);
    }
}
