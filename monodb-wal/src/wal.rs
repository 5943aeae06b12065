//! `WalContext`: the engine's root handle, and the two-phase record writer.
//!
//! Deliberately `!Sync`: concurrent `begin_record`/`end_record` calls from
//! multiple threads are undefined behavior at the API level, so this type
//! holds no internal lock. Callers serialize access
//! themselves. This is the one place this crate's concurrency story departs
//! from its teacher, whose `Wal` type wraps segments in `parking_lot` locks
//! to let several threads share one handle — see `DESIGN.md`.

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::WalConfig;
use crate::error::{WalError, WalResult};
use crate::location::WalLocation;
use crate::record::{checksum, RecordHeader, RecordType, MAX_PAYLOAD_SIZE, RECORD_CRC_SIZE, RECORD_HEADER_SIZE};
use crate::recovery::{HandlerTable, RecoveryEngine, RecoveryStats};
use crate::scan;
use crate::segment::{Segment, SegmentScanner};
use crate::io;

struct InFlightRecord {
    buffer: Vec<u8>,
}

/// The engine's root handle: the current segment, the last-written
/// location, the in-flight record buffer, the configured segment size, the
/// WAL directory, and the next-segment counter. Created by [`WalContext::init`],
/// destroyed by [`WalContext::shutdown`] — both are meant to be called
/// exactly once per logical engine instance.
pub struct WalContext {
    dir: PathBuf,
    segment_size: u64,
    current_segment: Option<Segment>,
    next_segment_id: u32,
    last_write_location: WalLocation,
    in_flight: Option<InFlightRecord>,
}

impl WalContext {
    /// `init(wal_dir, segment_size)`. Ensures the directory exists, discovers
    /// any existing segments, and either starts a fresh log at segment 1 or
    /// resumes appending after the last valid record in the latest segment.
    pub fn init(config: WalConfig) -> WalResult<Self> {
        config.validate()?;
        io::open_or_create_directory(&config.wal_dir)?;

        let existing = SegmentScanner::list_segments(&config.wal_dir)?;
        let (current_segment, last_write_location, next_segment_id) = match existing.last() {
            None => {
                tracing::info!(dir = %config.wal_dir.display(), "starting a fresh WAL at segment 1");
                let segment = Segment::create(&config.wal_dir, 1, config.segment_size)?;
                (segment, WalLocation::ZERO, 2)
            }
            Some(&latest_id) => {
                let mut segment = Segment::open_for_append(&config.wal_dir, latest_id, 0)?;
                let last_location = Self::find_segment_end(&mut segment)?;
                tracing::info!(
                    segment = latest_id,
                    offset = segment.current_offset,
                    "resuming WAL after restart"
                );
                (segment, last_location, latest_id + 1)
            }
        };

        Ok(WalContext {
            dir: config.wal_dir,
            segment_size: config.segment_size,
            current_segment: Some(current_segment),
            next_segment_id,
            last_write_location,
            in_flight: None,
        })
    }

    /// Scans `segment` from offset 0, advancing `segment.current_offset`
    /// past the last valid record, and returns that record's location (or
    /// `WalLocation::ZERO` if the segment holds no records). Any corruption
    /// found is treated as the effective end of the segment: a crash can
    /// leave a torn tail record, and the writer simply resumes from the last
    /// record it can trust.
    fn find_segment_end(segment: &mut Segment) -> WalResult<WalLocation> {
        let mut offset = 0u64;
        let mut last_location = WalLocation::ZERO;
        loop {
            match scan::scan_one(&mut segment.file, offset, segment.id, segment.segment_size) {
                Ok(Some(record)) => {
                    last_location = record.location;
                    offset += record.total_len;
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(
                        segment = segment.id,
                        offset,
                        error = %err,
                        "stopping at a torn record while resuming the WAL"
                    );
                    break;
                }
            }
        }
        segment.current_offset = offset;
        Ok(last_location)
    }

    /// `BeginRecord(type, xid, data_len) → PayloadSlot`. Reserves an
    /// in-memory buffer sized to the full record and fills in the header;
    /// the returned slot borrows this context so the borrow checker enforces
    /// "only one record is in flight at any time" and "the payload loan
    /// expires at EndRecord" without any runtime bookkeeping.
    pub fn begin_record(
        &mut self,
        record_type: RecordType,
        xid: u32,
        data_len: u16,
    ) -> WalResult<PayloadSlot<'_>> {
        if self.current_segment.is_none() {
            return Err(WalError::NotInitialized);
        }
        let data_len_usize = data_len as usize;
        if data_len_usize > MAX_PAYLOAD_SIZE {
            return Err(WalError::PayloadTooLarge {
                size: data_len_usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let total_len = RECORD_HEADER_SIZE + data_len_usize + RECORD_CRC_SIZE;
        if total_len as u64 > self.segment_size {
            return Err(WalError::PayloadTooLarge {
                size: data_len_usize,
                max: self.segment_size as usize - RECORD_HEADER_SIZE - RECORD_CRC_SIZE,
            });
        }

        let header = RecordHeader::new(record_type, xid, data_len, self.last_write_location);
        let mut buffer = Vec::with_capacity(RECORD_HEADER_SIZE + data_len_usize);
        buffer.extend_from_slice(&header.encode());
        buffer.resize(RECORD_HEADER_SIZE + data_len_usize, 0);

        // A prior unfinished Begin is simply replaced here; reaching this
        // with `in_flight` already populated can't happen through the public
        // API, since the borrow checker won't allow a second `begin_record`
        // call while the previous slot is still alive.
        self.in_flight = Some(InFlightRecord { buffer });
        Ok(PayloadSlot { ctx: self })
    }

    fn finish_record(&mut self) -> WalResult<WalLocation> {
        let mut in_flight = self.in_flight.take().ok_or(WalError::NoRecordInFlight)?;
        let crc = checksum(&in_flight.buffer[..RECORD_HEADER_SIZE], &in_flight.buffer[RECORD_HEADER_SIZE..]);
        in_flight.buffer.extend_from_slice(&crc.to_le_bytes());

        self.rollover_if_needed(in_flight.buffer.len() as u64)?;
        let segment = self
            .current_segment
            .as_mut()
            .expect("rollover_if_needed always leaves a current segment");

        io::seek(&mut segment.file, segment.current_offset)?;
        let written = io::write(&mut segment.file, &in_flight.buffer)?;
        if written != in_flight.buffer.len() {
            return Err(WalError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short write appending WAL record",
            )));
        }

        let location = WalLocation::new(segment.id, segment.current_offset as u32);
        segment.current_offset += in_flight.buffer.len() as u64;
        self.last_write_location = location;
        Ok(location)
    }

    /// `RolloverIfNeeded(record_size)`.
    fn rollover_if_needed(&mut self, record_size: u64) -> WalResult<()> {
        let needs_new_segment = match &self.current_segment {
            Some(segment) => segment.remaining() < record_size,
            None => true,
        };
        if !needs_new_segment {
            return Ok(());
        }
        if let Some(segment) = self.current_segment.as_mut() {
            segment.mark_full();
        }
        let id = self.next_segment_id;
        tracing::debug!(segment = id, "rolling over to a new WAL segment");
        let segment = Segment::create(&self.dir, id, self.segment_size)?;
        self.current_segment = Some(segment);
        self.next_segment_id += 1;
        Ok(())
    }

    /// `Flush(wait_for_sync)`.
    pub fn flush(&mut self, wait_for_sync: bool) -> WalResult<()> {
        let segment = self.current_segment.as_ref().ok_or(WalError::NotInitialized)?;
        segment.sync(wait_for_sync)
    }

    /// `Checkpoint()`: a zero-payload `Checkpoint` record with `xid = 0`,
    /// followed by a blocking flush.
    pub fn checkpoint(&mut self) -> WalResult<WalLocation> {
        let slot = self.begin_record(RecordType::Checkpoint, 0, 0)?;
        let location = slot.end_record()?;
        self.flush(true)?;
        tracing::info!(%location, "wrote checkpoint");
        Ok(location)
    }

    /// `read_record(ctx, location, ...)`, reshaped to return owned values
    /// instead of writing through caller-supplied output buffers.
    pub fn read_record(&mut self, location: WalLocation) -> WalResult<(RecordHeader, Vec<u8>)> {
        if let Some(segment) = &mut self.current_segment {
            if segment.id == location.segment {
                return Self::read_one(&mut segment.file, location, self.segment_size);
            }
        }
        let mut segment = Segment::open_read_only(&self.dir, location.segment)?;
        Self::read_one(&mut segment.file, location, self.segment_size)
    }

    fn read_one(file: &mut File, location: WalLocation, segment_size: u64) -> WalResult<(RecordHeader, Vec<u8>)> {
        match scan::scan_one(file, location.offset as u64, location.segment, segment_size)? {
            Some(record) => Ok((record.header, record.payload)),
            None => Err(WalError::corruption(location, "no record found at location")),
        }
    }

    /// `recover(ctx, end_location, handlers, db_instance)`. `end_location`
    /// is the upper bound of the replay window: `WalLocation::ZERO` means
    /// "no bound, replay everything since the engine's own start anchor";
    /// any other location stops the scan there without applying the record
    /// at that position. The scan's start anchor is always located
    /// internally (Phase R2), never supplied by the caller.
    pub fn recover<D>(
        &mut self,
        end_location: WalLocation,
        handlers: &HandlerTable<D>,
        db_instance: &mut D,
    ) -> WalResult<RecoveryStats> {
        let start = Instant::now();
        let engine = RecoveryEngine::new(&self.dir, self.segment_size);
        let stats = engine.recover(end_location, handlers, db_instance)?;
        tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, ?stats, "recovery complete");
        // Phase R5: a fresh checkpoint so a later crash doesn't re-replay this prefix.
        self.checkpoint()?;
        Ok(stats)
    }

    /// `shutdown(ctx)`: best-effort. Flush is attempted and errors are
    /// logged, but resources are released unconditionally either way.
    pub fn shutdown(mut self) {
        if let Some(segment) = self.current_segment.take() {
            if let Err(err) = segment.sync(true) {
                tracing::warn!(error = %err, "final sync during shutdown failed; releasing resources anyway");
            }
        }
    }

    pub fn last_write_location(&self) -> WalLocation {
        self.last_write_location
    }
}

/// A scoped, lifetime-bounded loan of the in-flight record's payload bytes.
/// The loan expires at [`PayloadSlot::end_record`], which consumes `self` —
/// a caller cannot retain the slice past that call, and cannot finalize the
/// same record twice.
pub struct PayloadSlot<'a> {
    ctx: &'a mut WalContext,
}

impl<'a> PayloadSlot<'a> {
    /// The exact `data_len`-sized mutable region the caller writes the
    /// payload into, in place.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let buffer = &mut self
            .ctx
            .in_flight
            .as_mut()
            .expect("in-flight record exists for the lifetime of the slot")
            .buffer;
        &mut buffer[RECORD_HEADER_SIZE..]
    }

    /// `EndRecord() → WalLocation`: checksums the header+payload, performs
    /// rollover if needed, and appends the record in a single write.
    pub fn end_record(self) -> WalResult<WalLocation> {
        self.ctx.finish_record()
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn any_record_type() -> impl Strategy<Value = RecordType> {
        prop_oneof![
            Just(RecordType::Insert),
            Just(RecordType::Update),
            Just(RecordType::Delete),
            Just(RecordType::NewPage),
            Just(RecordType::Schema),
        ]
    }

    proptest! {
        /// Invariant 1 (record round-trip): for every `(type, xid, payload)`
        /// within the size limits the spec places on a single record,
        /// `begin_record -> write payload -> end_record -> read_record`
        /// returns a header and payload byte-identical to the inputs.
        #[test]
        fn record_round_trips_for_arbitrary_payloads(
            record_type in any_record_type(),
            xid in 1u32..=u32::MAX,
            payload in proptest::collection::vec(any::<u8>(), 0..4096),
        ) {
            let dir = tempdir().unwrap();
            let mut ctx = WalContext::init(WalConfig::new(dir.path()).with_segment_size(1024 * 1024)).unwrap();

            let mut slot = ctx.begin_record(record_type, xid, payload.len() as u16).unwrap();
            slot.payload_mut().copy_from_slice(&payload);
            let location = slot.end_record().unwrap();

            let (header, read_payload) = ctx.read_record(location).unwrap();
            prop_assert_eq!(header.record_type, record_type.as_u32());
            prop_assert_eq!(header.xid, xid);
            prop_assert_eq!(header.data_len as usize, payload.len());
            prop_assert_eq!(read_payload, payload);
        }
    }
}
