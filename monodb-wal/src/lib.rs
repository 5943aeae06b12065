//! # monodb-wal
//!
//! Write-Ahead Log engine: a durable, ordered, append-only record of
//! mutations that lets a crashed database restore itself to a
//! transactionally consistent state by replaying the log from the last
//! checkpoint.
//!
//! Four cooperating parts, leaves first: the checksum primitive ([`record`]),
//! the segment manager ([`segment`]), the record writer ([`wal`]), and the
//! recovery engine ([`recovery`]).

pub mod config;
pub mod error;
pub mod io;
pub mod location;
pub mod record;
pub mod recovery;
mod scan;
pub mod segment;
pub mod wal;

pub use config::{WalConfig, DEFAULT_SEGMENT_SIZE};
pub use error::{WalError, WalResult};
pub use location::WalLocation;
pub use record::{RecordHeader, RecordType, RECORD_HEADER_SIZE};
pub use recovery::{HandlerTable, RecoveryStats};
pub use segment::{Segment, SegmentId};
pub use wal::{PayloadSlot, WalContext};
