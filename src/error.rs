//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by fallible toolkit operations.
///
/// Lookup misses (unknown paths, absent style keys) are modeled with
/// `Option`, not errors; only genuinely exceptional conditions land here.
#[derive(Debug, Error)]
pub enum Error {
    /// The referenced box does not exist or has not finished construction.
    #[error("box is not ready: {0}")]
    NotReady(String),

    /// Rich-text markup failed to parse.
    #[error("malformed text markup: {0}")]
    Markup(String),

    /// Terminal I/O failure.
    #[error("terminal i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
