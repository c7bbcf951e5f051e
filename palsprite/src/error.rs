use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds surfaced by the conversion core.
///
/// Every stage returns one of these; nothing is retried and a failed image
/// aborts the whole run before any output file is written.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open {}: {source}", path.display())]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {reason}", path.display())]
    BadFileFormat { path: PathBuf, reason: String },

    #[error("read error on {}: {reason}", path.display())]
    FileRead { path: PathBuf, reason: String },

    #[error("write error on {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("incomplete palette, got {got} colors while expected {expected}")]
    IncompletePalette { got: usize, expected: usize },

    #[error("palette has no colors")]
    EmptyPalette,

    #[error("no input images")]
    NoInput,

    #[error("malformed sprite data: {0}")]
    Malformed(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
