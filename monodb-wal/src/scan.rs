//! Shared record-scanning logic used by the writer (to resume appending after
//! a restart), `read_record`, and the recovery engine's forward scan.

use std::fs::File;

use crate::error::{WalError, WalResult};
use crate::io;
use crate::location::WalLocation;
use crate::record::{checksum, RecordHeader, RECORD_CRC_SIZE, RECORD_HEADER_SIZE};
use crate::segment::SegmentId;

/// A single record read back from a segment, with its own location attached.
pub struct ScannedRecord {
    pub header: RecordHeader,
    pub payload: Vec<u8>,
    pub total_len: u64,
    pub location: WalLocation,
}

/// Reads and verifies one record at `offset` within segment `segment_id`.
///
/// Returns `Ok(None)` for a clean stopping point: end-of-file exactly at a
/// header boundary, or a zero `total_len` sentinel — both mean "no more
/// records here", not an error. Returns `Err(Corruption)` for anything that
/// indicates a malformed or truncated record: a header that fails
/// validation, a short read once a header promised more bytes, or a CRC
/// mismatch.
pub fn scan_one(
    file: &mut File,
    offset: u64,
    segment_id: SegmentId,
    segment_size: u64,
) -> WalResult<Option<ScannedRecord>> {
    let mut header_buf = [0u8; RECORD_HEADER_SIZE];
    match io::read_at(file, offset, &mut header_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let header = RecordHeader::decode(&header_buf);
    if header.total_len == 0 {
        return Ok(None);
    }

    let location = WalLocation::new(segment_id, offset as u32);
    let record_type = header
        .validate(segment_size)
        .map_err(|_| WalError::corruption(location, format!("invalid record header at offset {offset}")))?;
    let _ = record_type;

    let mut payload = vec![0u8; header.data_len as usize];
    let payload_offset = offset + RECORD_HEADER_SIZE as u64;
    io::read_at(file, payload_offset, &mut payload)
        .map_err(|_| WalError::corruption(location, "short read: payload truncated"))?;

    let mut crc_buf = [0u8; RECORD_CRC_SIZE];
    let crc_offset = payload_offset + header.data_len as u64;
    io::read_at(file, crc_offset, &mut crc_buf)
        .map_err(|_| WalError::corruption(location, "short read: trailing CRC truncated"))?;
    let stored_crc = u32::from_le_bytes(crc_buf);
    let computed_crc = checksum(&header_buf, &payload);
    if stored_crc != computed_crc {
        return Err(WalError::corruption(
            location,
            format!("CRC mismatch: stored {stored_crc:#x}, computed {computed_crc:#x}"),
        ));
    }

    Ok(Some(ScannedRecord {
        header,
        payload,
        total_len: header.total_len as u64,
        location,
    }))
}
