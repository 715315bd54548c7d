//! Error types for loading and importing.

use std::path::PathBuf;

use geom_decode::DecodeError;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a valid container.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
