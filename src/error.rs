//! Error types.
//!
//! Only failures that stop a run are errors here. Per-file problems during a
//! walk, a hash, or a move are reported through the sink and the run goes on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid or incomplete run configuration. Always fatal, raised before any
/// scanning starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("You must supply at least one argument")]
    NoArguments,

    #[error("A source directory is required (-s <dir>)")]
    MissingSource,

    #[error("Directory does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Compare directory does not exist: {}", .0.display())]
    CompareDirNotFound(PathBuf),

    #[error("File to compare does not exist: {}", .0.display())]
    CompareFileNotFound(PathBuf),

    #[error("Cannot both move (-m) and remove (-r) duplicates; pick one")]
    ConflictingActions,

    #[error("Worker count must be at least 1")]
    InvalidJobs,
}

/// Fatal errors for a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),

    #[error("Cannot write log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start hashing workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::MissingSource.into();
        assert!(matches!(err, Error::Config(ConfigError::MissingSource)));
        assert_eq!(err.to_string(), ConfigError::MissingSource.to_string());
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            "/missing/file",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/missing/file"));
        assert!(msg.contains("gone"));
    }
}
