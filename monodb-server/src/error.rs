//! Server error types.

use thiserror::Error;

/// Errors the thin query server can raise. Kept as a small per-crate enum
/// in the teacher's convention rather than folded into `monodb_wal::WalError`
/// — this crate doesn't touch the WAL yet, so it has nothing to wrap there.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server is shutting down")]
    ShuttingDown,
}
