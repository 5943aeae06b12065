//! The recovery engine: segment discovery, checkpoint anchoring, the forward
//! scan, transaction-state tracking, and typed handler dispatch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{WalError, WalResult};
use crate::location::WalLocation;
use crate::record::{RecordHeader, RecordType};
use crate::scan;
use crate::segment::{Segment, SegmentScanner};

/// A caller-supplied callback invoked for every data-bearing record of a
/// committed transaction. Returns `false` to abort recovery with
/// `HandlerFailed`.
pub type Handler<D> = Box<dyn Fn(&mut D, &RecordHeader, &[u8]) -> bool>;

/// Handler registrations indexed by record type. Control record types
/// (`Null`, `Checkpoint`, `XactCommit`, `XactAbort`) are handled internally
/// by the recovery engine; registering one here is a no-op, logged and
/// ignored, matching the handler-registration contract.
pub struct HandlerTable<D> {
    handlers: HashMap<RecordType, Handler<D>>,
}

impl<D> HandlerTable<D> {
    pub fn new() -> Self {
        HandlerTable {
            handlers: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        record_type: RecordType,
        handler: impl Fn(&mut D, &RecordHeader, &[u8]) -> bool + 'static,
    ) -> &mut Self {
        if record_type.is_control() {
            tracing::warn!(?record_type, "ignoring handler registration for a control record type");
            return self;
        }
        self.handlers.insert(record_type, Box::new(handler));
        self
    }

    fn get(&self, record_type: RecordType) -> Option<&Handler<D>> {
        self.handlers.get(&record_type)
    }
}

impl<D> Default for HandlerTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    InProgress,
    Committed,
    Aborted,
}

/// An ephemeral in-memory entry tracking one transaction's fate during a
/// single recovery pass. Created lazily on the first record seen for an XID;
/// dropped when recovery completes.
#[derive(Debug, Clone, Copy)]
struct TransactionRecord {
    state: TransactionState,
    #[allow(dead_code)]
    first_record: WalLocation,
    last_record: WalLocation,
}

struct PendingRecord {
    header: RecordHeader,
    payload: Vec<u8>,
    location: WalLocation,
    record_type: RecordType,
}

/// Progress and outcome counters the recovery engine maintains and reports.
#[derive(Debug, Clone, Default)]
pub struct RecoveryStats {
    pub segments_processed: u64,
    pub records_processed: u64,
    pub records_applied: u64,
    pub records_skipped: u64,
    pub committed_transactions: u64,
    pub aborted_transactions: u64,
    pub incomplete_transactions: u64,
    pub bytes_processed: u64,
    pub recovery_time_ms: u64,
}

/// Discovers segments, locates a start anchor, and replays committed
/// transactions' data-bearing records through caller-registered handlers.
pub struct RecoveryEngine {
    dir: PathBuf,
    segment_size: u64,
}

impl RecoveryEngine {
    pub fn new(dir: &Path, segment_size: u64) -> Self {
        RecoveryEngine {
            dir: dir.to_path_buf(),
            segment_size,
        }
    }

    /// `recover(ctx, end_location, handlers, db_instance)`. `end_location`
    /// is the *upper* bound of the replay window per §6: `WalLocation::ZERO`
    /// (the "unset" sentinel) means "no bound, scan to the end of the log";
    /// any other location stops the forward scan at that point without
    /// processing the record found there. The scan's *start* is never taken
    /// from a caller argument — Phase R2 always locates it internally, since
    /// §6 only exposes an end bound, not a start override.
    pub fn recover<D>(
        &self,
        end_location: WalLocation,
        handlers: &HandlerTable<D>,
        db_instance: &mut D,
    ) -> WalResult<RecoveryStats> {
        let mut stats = RecoveryStats::default();
        let start_time = Instant::now();

        // Phase R1.
        let segments = SegmentScanner::list_segments(&self.dir)?;
        if segments.is_empty() {
            tracing::info!(dir = %self.dir.display(), "WAL directory is empty; recovery is a no-op");
            stats.recovery_time_ms = start_time.elapsed().as_millis() as u64;
            return Ok(stats);
        }

        // Phase R2.
        let anchor = self.locate_replay_anchor(&segments)?;

        // Phase R3.
        let mut transactions: HashMap<u32, TransactionRecord> = HashMap::new();
        let mut pending: HashMap<u32, Vec<PendingRecord>> = HashMap::new();
        let mut last_progress = Instant::now();

        let start_idx = segments.iter().position(|&id| id >= anchor.segment).unwrap_or(0);
        let mut offset = if segments.get(start_idx) == Some(&anchor.segment) {
            anchor.offset as u64
        } else {
            0
        };

        'segments: for &segment_id in &segments[start_idx..] {
            stats.segments_processed += 1;
            let mut segment = match Segment::open_read_only(&self.dir, segment_id) {
                Ok(segment) => segment,
                // "segment file cannot be opened -> scanning terminates normally"
                Err(_) => break,
            };

            loop {
                match scan::scan_one(&mut segment.file, offset, segment_id, self.segment_size) {
                    Ok(Some(record)) => {
                        if !end_location.is_zero() && record.location >= end_location {
                            // Reached the caller's upper bound; stop cleanly
                            // without processing the record found there.
                            break 'segments;
                        }
                        stats.records_processed += 1;
                        stats.bytes_processed += record.total_len;
                        let record_type = RecordType::try_from(record.header.record_type)
                            .expect("scan_one validates record_type before returning");
                        self.apply_record(
                            record_type,
                            record.header,
                            record.payload,
                            record.location,
                            &mut transactions,
                            &mut pending,
                            handlers,
                            db_instance,
                            &mut stats,
                        )?;
                        offset += record.total_len;

                        if last_progress.elapsed() >= Duration::from_secs(5) {
                            tracing::info!(?stats, "recovery in progress");
                            last_progress = Instant::now();
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(segment = segment_id, offset, error = %err, ?stats, "recovery stopped: corrupt record");
                        return Err(err);
                    }
                }
            }
            offset = 0;
        }

        // Any XID never resolved to Committed or Aborted by end-of-scan is incomplete;
        // its buffered data-bearing records are discarded, never dispatched.
        for (xid, txn) in &transactions {
            if txn.state == TransactionState::InProgress {
                stats.incomplete_transactions += 1;
                if let Some(queued) = pending.remove(xid) {
                    stats.records_skipped += queued.len() as u64;
                }
            }
        }

        stats.recovery_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(?stats, "recovery finished");
        Ok(stats)
    }

    /// Phase R2: locates where the forward scan should *start*.
    ///
    /// A naive "anchor at the latest checkpoint" is wrong: `Checkpoint()`
    /// always appends the checkpoint record *after* the commit it makes
    /// durable, so the newest checkpoint in the log is typically the one
    /// this very recovery pass needs to scan *past*, not anchor on — doing
    /// so would skip every committed record the checkpoint was meant to
    /// cover. What a recovery pass actually wants is the checkpoint that was
    /// already on disk *before* the data it needs to replay — i.e. the one
    /// before the newest one, since the newest one is either (a) written by
    /// the same session that produced the data (not yet replayed by anyone)
    /// or (b) written by this engine's own Phase R5 after a prior, already-
    /// completed recovery pass (in which case the one before it marks where
    /// that prior pass left off). With fewer than two checkpoints on disk
    /// there is no such "prior" anchor to trust, so this falls back to the
    /// conservative `(1, 0)` default §4.4/R2 explicitly permits.
    fn locate_replay_anchor(&self, segments: &[u32]) -> WalResult<WalLocation> {
        let mut checkpoints: Vec<WalLocation> = Vec::new();
        for &segment_id in segments {
            let mut segment = match Segment::open_read_only(&self.dir, segment_id) {
                Ok(segment) => segment,
                Err(_) => break,
            };
            let mut offset = 0u64;
            loop {
                match scan::scan_one(&mut segment.file, offset, segment_id, self.segment_size) {
                    Ok(Some(record)) => {
                        if record.header.record_type == RecordType::Checkpoint.as_u32() {
                            checkpoints.push(record.location);
                        }
                        offset += record.total_len;
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        }
        let anchor = if checkpoints.len() >= 2 {
            checkpoints[checkpoints.len() - 2]
        } else {
            WalLocation::new(1, 0)
        };
        Ok(anchor)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_record<D>(
        &self,
        record_type: RecordType,
        header: RecordHeader,
        payload: Vec<u8>,
        location: WalLocation,
        transactions: &mut HashMap<u32, TransactionRecord>,
        pending: &mut HashMap<u32, Vec<PendingRecord>>,
        handlers: &HandlerTable<D>,
        db_instance: &mut D,
        stats: &mut RecoveryStats,
    ) -> WalResult<()> {
        let xid = header.xid;
        if xid > 0 {
            transactions.entry(xid).or_insert(TransactionRecord {
                state: TransactionState::InProgress,
                first_record: location,
                last_record: location,
            });
        }

        match record_type {
            RecordType::Checkpoint => {}
            RecordType::XactCommit => {
                if let Some(txn) = transactions.get_mut(&xid) {
                    txn.state = TransactionState::Committed;
                    txn.last_record = location;
                }
                stats.committed_transactions += 1;
                if let Some(queued) = pending.remove(&xid) {
                    for queued_record in queued {
                        self.dispatch(queued_record, handlers, db_instance, stats)?;
                    }
                }
            }
            RecordType::XactAbort => {
                if let Some(txn) = transactions.get_mut(&xid) {
                    txn.state = TransactionState::Aborted;
                    txn.last_record = location;
                }
                stats.aborted_transactions += 1;
                if let Some(queued) = pending.remove(&xid) {
                    stats.records_skipped += queued.len() as u64;
                }
            }
            // Null and the data-bearing types (Insert/Update/Delete/NewPage/Schema)
            // all follow the XID's fate: dispatch now if already committed, queue
            // if still in progress, drop if aborted. Null never has a handler
            // registered for it (HandlerTable rejects control-type registrations),
            // so it always resolves to "skipped" once dispatched.
            other => {
                if let Some(txn) = transactions.get_mut(&xid) {
                    txn.last_record = location;
                }
                let state = transactions
                    .get(&xid)
                    .map(|t| t.state)
                    .unwrap_or(TransactionState::InProgress);
                let record = PendingRecord {
                    header,
                    payload,
                    location,
                    record_type: other,
                };
                match state {
                    TransactionState::Committed => self.dispatch(record, handlers, db_instance, stats)?,
                    TransactionState::Aborted => stats.records_skipped += 1,
                    TransactionState::InProgress => {
                        pending.entry(xid).or_default().push(record);
                    }
                }
            }
        }
        Ok(())
    }

    fn dispatch<D>(
        &self,
        record: PendingRecord,
        handlers: &HandlerTable<D>,
        db_instance: &mut D,
        stats: &mut RecoveryStats,
    ) -> WalResult<()> {
        match handlers.get(record.record_type) {
            Some(handler) => {
                if !handler(db_instance, &record.header, &record.payload) {
                    return Err(WalError::HandlerFailed {
                        record_type: record.record_type,
                        location: record.location,
                    });
                }
                stats.records_applied += 1;
            }
            None => stats.records_skipped += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalConfig;
    use crate::wal::WalContext;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn write_transaction(
        ctx: &mut WalContext,
        xid: u32,
        data_type: RecordType,
        payload: &[u8],
        outcome: Option<RecordType>,
    ) {
        let mut data = ctx.begin_record(data_type, xid, payload.len() as u16).unwrap();
        data.payload_mut().copy_from_slice(payload);
        data.end_record().unwrap();

        if let Some(outcome_type) = outcome {
            let end = ctx.begin_record(outcome_type, xid, 0).unwrap();
            end.end_record().unwrap();
        }
    }

    #[test]
    fn s1_single_commit_is_applied_exactly_once() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let payload = b"TELL users TO ADD RECORD WITH id = 1";
        write_transaction(&mut ctx, 1001, RecordType::Insert, payload, Some(RecordType::XactCommit));
        ctx.checkpoint().unwrap();
        ctx.shutdown();

        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handlers: HandlerTable<()> = HandlerTable::new();
        let seen_clone = seen.clone();
        handlers.register(RecordType::Insert, move |_, _, payload| {
            seen_clone.lock().unwrap().push(payload.to_vec());
            true
        });

        let stats = ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &[payload.to_vec()]);
        assert_eq!(stats.committed_transactions, 1);
        assert_eq!(stats.aborted_transactions, 0);
        assert_eq!(stats.incomplete_transactions, 0);
        assert_eq!(stats.records_applied, 1);
        assert_eq!(stats.records_skipped, 0);
    }

    #[test]
    fn s2_explicit_abort_never_dispatches() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        write_transaction(
            &mut ctx,
            1002,
            RecordType::Delete,
            b"TELL users TO REMOVE WHERE id = 1",
            Some(RecordType::XactAbort),
        );
        ctx.checkpoint().unwrap();
        ctx.shutdown();

        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let calls = Arc::new(Mutex::new(0u32));
        let mut handlers: HandlerTable<()> = HandlerTable::new();
        let calls_clone = calls.clone();
        handlers.register(RecordType::Delete, move |_, _, _| {
            *calls_clone.lock().unwrap() += 1;
            true
        });

        let stats = ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(stats.aborted_transactions, 1);
    }

    #[test]
    fn s3_crash_before_commit_is_incomplete() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        write_transaction(
            &mut ctx,
            1003,
            RecordType::Schema,
            b"TELL users TO ADD email_verified AS BOOLEAN DEFAULT FALSE",
            None,
        );
        ctx.flush(true).unwrap();
        ctx.shutdown();

        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let calls = Arc::new(Mutex::new(0u32));
        let mut handlers: HandlerTable<()> = HandlerTable::new();
        let calls_clone = calls.clone();
        handlers.register(RecordType::Schema, move |_, _, _| {
            *calls_clone.lock().unwrap() += 1;
            true
        });

        let stats = ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(stats.incomplete_transactions, 1);
    }

    #[test]
    fn s4_rollover_applies_all_records_in_order() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path()).with_segment_size(1024)).unwrap();
        for i in 0..50u32 {
            let payload = format!("{:040}", i).into_bytes();
            let mut slot = ctx.begin_record(RecordType::Insert, 1, payload.len() as u16).unwrap();
            slot.payload_mut().copy_from_slice(&payload);
            slot.end_record().unwrap();
        }
        let commit = ctx.begin_record(RecordType::XactCommit, 1, 0).unwrap();
        commit.end_record().unwrap();
        ctx.checkpoint().unwrap();
        ctx.shutdown();

        let mut ctx = WalContext::init(WalConfig::new(dir.path()).with_segment_size(1024)).unwrap();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handlers: HandlerTable<()> = HandlerTable::new();
        let seen_clone = seen.clone();
        handlers.register(RecordType::Insert, move |_, _, payload| {
            seen_clone
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(payload).to_string());
            true
        });

        let stats = ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 50);
        for (i, value) in seen.lock().unwrap().iter().enumerate() {
            assert_eq!(value, &format!("{:040}", i));
        }
        assert!(stats.segments_processed >= 2);
    }

    #[test]
    fn s6_empty_directory_recovers_as_a_no_op() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let handlers: HandlerTable<()> = HandlerTable::new();
        let stats = ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap();
        assert_eq!(stats.records_processed, 0);
        assert_eq!(stats.committed_transactions, 0);
        assert_eq!(stats.incomplete_transactions, 0);
    }

    #[test]
    fn s5_corrupted_record_stops_recovery_and_is_never_applied() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let location = {
            let mut slot = ctx.begin_record(RecordType::Insert, 1, 5).unwrap();
            slot.payload_mut().copy_from_slice(b"hello");
            slot.end_record().unwrap()
        };
        ctx.flush(true).unwrap();
        ctx.shutdown();

        let path = dir.path().join(crate::segment::segment_filename(location.segment));
        let mut bytes = std::fs::read(&path).unwrap();
        let payload_start = location.offset as usize + crate::record::RECORD_HEADER_SIZE;
        bytes[payload_start] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let calls = Arc::new(Mutex::new(0u32));
        let mut handlers: HandlerTable<()> = HandlerTable::new();
        let calls_clone = calls.clone();
        handlers.register(RecordType::Insert, move |_, _, _| {
            *calls_clone.lock().unwrap() += 1;
            true
        });

        let err = ctx.recover(WalLocation::ZERO, &handlers, &mut ()).unwrap_err();
        assert!(matches!(err, WalError::Corruption { .. }));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn idempotent_recovery_applies_nothing_on_second_run() {
        let dir = tempdir().unwrap();
        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        write_transaction(&mut ctx, 1, RecordType::Insert, b"x", Some(RecordType::XactCommit));
        ctx.checkpoint().unwrap();
        ctx.shutdown();

        let mut ctx = WalContext::init(WalConfig::new(dir.path())).unwrap();
        let count = Arc::new(Mutex::new(0u32));
        let make_handlers = |count: Arc<Mutex<u32>>| {
            let mut handlers: HandlerTable<()> = HandlerTable::new();
            handlers.register(RecordType::Insert, move |_, _, _| {
                *count.lock().unwrap() += 1;
                true
            });
            handlers
        };

        ctx.recover(WalLocation::ZERO, &make_handlers(count.clone()), &mut ()).unwrap();
        let first_run_calls = *count.lock().unwrap();
        ctx.recover(WalLocation::ZERO, &make_handlers(count.clone()), &mut ()).unwrap();
        let second_run_calls = *count.lock().unwrap() - first_run_calls;
        assert_eq!(first_run_calls, 1);
        assert_eq!(second_run_calls, 0);
    }
}
