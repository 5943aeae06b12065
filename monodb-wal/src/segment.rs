//! On-disk segment files: allocation, preallocation, filename encoding, and
//! read-back handles.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{WalError, WalResult};
use crate::io;

/// `0` is reserved to mean "no segment" (invariant 3 of the segment manager).
pub type SegmentId = u32;

/// Lifecycle state of a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Empty,
    Active,
    Full,
    Archived,
}

/// Splits a 32-bit segment number into the three zero-padded 8-hex-digit
/// fields the filename format calls for, and formats them uppercase,
/// joined by `_`. The "hi" field is always `00000000` for this
/// implementation's 32-bit segment counter; it stays a distinct field (not
/// collapsed into a single one) so the naming convention parses
/// interchangeably with a future 64-bit implementation.
pub fn segment_filename(id: SegmentId) -> String {
    let hi: u32 = 0;
    let mid = (id >> 16) & 0xFFFF;
    let lo = id & 0xFFFF;
    format!("{:08X}_{:08X}_{:08X}", hi, mid, lo)
}

/// Parses a segment filename back into its segment number. Any filename
/// that parses as three 8-hex-digit fields is accepted; only the low field's
/// value is taken as the segment's true number, per the filename contract.
pub fn parse_segment_filename(name: &str) -> Option<SegmentId> {
    let mut fields = name.split('_');
    let hi = fields.next()?;
    let mid = fields.next()?;
    let lo = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    if hi.len() != 8 || mid.len() != 8 || lo.len() != 8 {
        return None;
    }
    u32::from_str_radix(hi, 16).ok()?;
    let mid = u32::from_str_radix(mid, 16).ok()?;
    let lo = u32::from_str_radix(lo, 16).ok()?;
    Some((mid << 16) | lo)
}

/// An open segment file plus the bookkeeping the writer and recovery scanner
/// both need.
pub struct Segment {
    pub id: SegmentId,
    pub path: PathBuf,
    pub file: File,
    pub segment_size: u64,
    pub current_offset: u64,
    pub state: SegmentState,
}

impl Segment {
    /// `AllocateSegment(n, size)`: creates the file, preallocates it to
    /// `segment_size`, and marks it `Active`.
    pub fn create(dir: &Path, id: SegmentId, segment_size: u64) -> WalResult<Self> {
        let path = dir.join(segment_filename(id));
        let file = io::create(&path, segment_size)?;
        Ok(Segment {
            id,
            path,
            file,
            segment_size,
            current_offset: 0,
            state: SegmentState::Active,
        })
    }

    /// `OpenForRead(n)`: a read-only handle over an already-written segment,
    /// used by recovery and by `read_record`.
    pub fn open_read_only(dir: &Path, id: SegmentId) -> WalResult<Self> {
        let path = dir.join(segment_filename(id));
        if !path.exists() {
            return Err(WalError::InvalidArgument(format!(
                "segment {} not found at {}",
                id,
                path.display()
            )));
        }
        let file = io::open_r(&path)?;
        let segment_size = file.metadata()?.len();
        Ok(Segment {
            id,
            path,
            file,
            segment_size,
            current_offset: 0,
            state: SegmentState::Full,
        })
    }

    /// Reopens an existing segment for continued writing, resuming
    /// `current_offset` at the given position (used when the writer resumes
    /// appending to the last segment found by recovery).
    pub fn open_for_append(dir: &Path, id: SegmentId, current_offset: u64) -> WalResult<Self> {
        let path = dir.join(segment_filename(id));
        let file = io::open_rw(&path)?;
        let segment_size = file.metadata()?.len();
        Ok(Segment {
            id,
            path,
            file,
            segment_size,
            current_offset,
            state: SegmentState::Active,
        })
    }

    pub fn remaining(&self) -> u64 {
        self.segment_size.saturating_sub(self.current_offset)
    }

    pub fn mark_full(&mut self) {
        self.state = SegmentState::Full;
    }

    pub fn sync(&self, wait_for_sync: bool) -> WalResult<()> {
        if wait_for_sync {
            io::sync(&self.file)?;
        } else {
            io::data_sync(&self.file)?;
        }
        Ok(())
    }
}

/// Finds the segment directory's existing segments, in ascending order, for
/// discovery at recovery time.
pub struct SegmentScanner;

impl SegmentScanner {
    /// Phase R1: enumerate files in `wal_dir`, parse each as a segment
    /// filename, and return the segment numbers found in ascending order.
    /// An empty or nonexistent directory yields an empty list — recovery
    /// treats that as a no-op on a fresh database.
    pub fn list_segments(dir: &Path) -> WalResult<Vec<SegmentId>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<SegmentId> = io::enumerate_dir(dir)?
            .iter()
            .filter_map(|name| parse_segment_filename(name))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    pub fn latest_segment(dir: &Path) -> WalResult<Option<SegmentId>> {
        Ok(Self::list_segments(dir)?.into_iter().max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filename_roundtrips_for_small_and_large_numbers() {
        for id in [0u32, 1, 42, 0xFFFF, 0x1_0000, 0xABCDEF01, u32::MAX] {
            let name = segment_filename(id);
            assert_eq!(parse_segment_filename(&name), Some(id), "id={id}");
        }
    }

    #[test]
    fn filename_has_three_eight_digit_fields() {
        let name = segment_filename(7);
        let fields: Vec<&str> = name.split('_').collect();
        assert_eq!(fields.len(), 3);
        for f in fields {
            assert_eq!(f.len(), 8);
        }
        assert!(name.starts_with("00000000_"));
    }

    #[test]
    fn create_preallocates_exact_size() {
        let dir = tempdir().unwrap();
        let segment = Segment::create(dir.path(), 1, 4096).unwrap();
        assert_eq!(segment.file.metadata().unwrap().len(), 4096);
        assert_eq!(segment.remaining(), 4096);
    }

    #[test]
    fn scanner_lists_segments_in_order() {
        let dir = tempdir().unwrap();
        for id in [3u32, 1, 2] {
            Segment::create(dir.path(), id, 1024).unwrap();
        }
        assert_eq!(SegmentScanner::list_segments(dir.path()).unwrap(), vec![1, 2, 3]);
        assert_eq!(SegmentScanner::latest_segment(dir.path()).unwrap(), Some(3));
    }

    #[test]
    fn scanner_on_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert_eq!(SegmentScanner::list_segments(&missing).unwrap(), Vec::new());
    }
}
