//! Error types shared by the import stages
//!
//! Only fatal conditions are errors. Recoverable situations such as an
//! unresolved node id or an ambiguous junction are logged by the stage that
//! hits them and never surface as an `Error` value.

use std::io;
use std::path::PathBuf;

/// Fatal import error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Open/read/write/seek failure. The output of the current stage must be
    /// considered inconsistent.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O failure without a known path (in-memory buffers, stdout).
    #[error("I/O error: {0}")]
    Stream(#[from] io::Error),

    /// A record references something that does not exist, or a file is
    /// structurally malformed.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// Bad user input (command line, query box).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an `io::Error` together with the file it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Error::DataIntegrity(msg.into())
    }

    /// True when the failure came from the file system rather than the data.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Stream(_))
    }
}

/// Result alias used across the toolchain
pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to a bare `io::Result`.
pub trait IoContext<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
