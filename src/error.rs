//! Application-wide error types.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A malformed environment value or env file. Startup must abort.
    #[error("config error: {0}")]
    Config(String),

    /// Directory or file creation/write failure.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logger error: {0}")]
    Logger(String),
}

impl AppError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
