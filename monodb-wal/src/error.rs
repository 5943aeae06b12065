//! WAL error taxonomy.

use thiserror::Error;

use crate::location::WalLocation;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("WAL context is not initialized (or has already been shut down)")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corruption at {location:?}: {reason}")]
    Corruption {
        location: WalLocation,
        reason: String,
    },

    #[error("end_record called with no record in flight")]
    NoRecordInFlight,

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("recovery handler for record type {record_type:?} failed at {location:?}")]
    HandlerFailed {
        record_type: crate::record::RecordType,
        location: WalLocation,
    },

    #[error("recovery could not make forward progress: {0}")]
    RecoveryFailed(String),
}

impl WalError {
    /// Returns whether retrying the operation that produced this error might succeed
    /// without the caller changing anything (transient I/O conditions only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalError::Io(_))
    }

    pub fn corruption(location: WalLocation, reason: impl Into<String>) -> Self {
        WalError::Corruption {
            location,
            reason: reason.into(),
        }
    }
}

pub type WalResult<T> = Result<T, WalError>;
