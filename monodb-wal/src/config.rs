//! WAL configuration surface.

use std::path::PathBuf;

use crate::error::{WalError, WalResult};
use crate::record::{RECORD_CRC_SIZE, RECORD_HEADER_SIZE};

/// Default segment size (16 MiB), per the configuration surface.
pub const DEFAULT_SEGMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Recognized configuration options for a [`crate::wal::WalContext`].
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Directory path where segments live. Required.
    pub wal_dir: PathBuf,
    /// Bytes per segment. Must be at least `sizeof(header) + 4`.
    pub segment_size: u64,
}

impl WalConfig {
    pub fn new(wal_dir: impl Into<PathBuf>) -> Self {
        WalConfig {
            wal_dir: wal_dir.into(),
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }

    pub fn with_segment_size(mut self, segment_size: u64) -> Self {
        self.segment_size = segment_size;
        self
    }

    pub fn validate(&self) -> WalResult<()> {
        let minimum = (RECORD_HEADER_SIZE + RECORD_CRC_SIZE) as u64;
        if self.segment_size < minimum {
            return Err(WalError::InvalidArgument(format!(
                "segment_size {} is smaller than the minimum {}",
                self.segment_size, minimum
            )));
        }
        Ok(())
    }
}
