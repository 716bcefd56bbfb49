use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The primary error type for all operations in the `parcelwatch` crate.
#[derive(Debug, Error)]
pub enum WatchError {
    /// An I/O error occurred, typically while reading, moving or removing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io { source: io::Error, path: PathBuf },

    /// The `zip` crate could not read an archive.
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive entry would land outside of its extraction directory.
    #[error("unsafe entry path '{0}' in archive")]
    UnsafeEntry(String),

    /// An error during serialization or deserialization of a snapshot, manifest or config file.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),

    /// The worker pool for a check cycle could not be built.
    #[error("worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Invalid command-line input that clap itself cannot reject.
    #[error("{0}")]
    Usage(String),
}

impl WatchError {
    /// Returns a closure that attaches `path` to an `io::Error`, for use with `map_err`.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> WatchError {
        let path = path.as_ref().to_path_buf();
        move |source| WatchError::Io { source, path }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<io::Error> for WatchError {
    fn from(err: io::Error) -> Self {
        WatchError::Io { source: err, path: PathBuf::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_path_in_message() {
        let err = WatchError::io("/tmp/missing.zip")(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.zip"), "{msg}");
        assert!(msg.contains("gone"), "{msg}");
    }
}
