//! Record header, record type, and the checksum primitive.

use crate::error::{WalError, WalResult};
use crate::location::WalLocation;

/// Size in bytes of the on-disk [`RecordHeader`].
pub const RECORD_HEADER_SIZE: usize = 24;

/// Size in bytes of the trailing CRC-32.
pub const RECORD_CRC_SIZE: usize = 4;

/// Largest payload a single record may carry (`data_len` is a `u16`).
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// The closed, numerically-stable set of record kinds. These values are part
/// of the on-disk format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RecordType {
    Null = 0,
    Checkpoint = 1,
    XactCommit = 2,
    XactAbort = 3,
    Insert = 4,
    Update = 5,
    Delete = 6,
    NewPage = 7,
    Schema = 8,
}

impl RecordType {
    pub const fn is_control(&self) -> bool {
        matches!(
            self,
            RecordType::Null | RecordType::Checkpoint | RecordType::XactCommit | RecordType::XactAbort
        )
    }

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for RecordType {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, u32> {
        match value {
            0 => Ok(RecordType::Null),
            1 => Ok(RecordType::Checkpoint),
            2 => Ok(RecordType::XactCommit),
            3 => Ok(RecordType::XactAbort),
            4 => Ok(RecordType::Insert),
            5 => Ok(RecordType::Update),
            6 => Ok(RecordType::Delete),
            7 => Ok(RecordType::NewPage),
            8 => Ok(RecordType::Schema),
            other => Err(other),
        }
    }
}

/// The 24-byte on-disk prefix of every record, native little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub total_len: u32,
    pub record_type: u32,
    pub xid: u32,
    pub prev_segment: u32,
    pub prev_offset: u32,
    pub data_len: u16,
    pub _reserved: u16,
}

impl RecordHeader {
    pub fn new(record_type: RecordType, xid: u32, data_len: u16, prev_record: WalLocation) -> Self {
        RecordHeader {
            total_len: (RECORD_HEADER_SIZE + data_len as usize + RECORD_CRC_SIZE) as u32,
            record_type: record_type.as_u32(),
            xid,
            prev_segment: prev_record.segment,
            prev_offset: prev_record.offset,
            data_len,
            _reserved: 0,
        }
    }

    pub fn prev_record(&self) -> WalLocation {
        WalLocation::new(self.prev_segment, self.prev_offset)
    }

    pub fn encode(&self) -> [u8; RECORD_HEADER_SIZE] {
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.total_len.to_le_bytes());
        buf[4..8].copy_from_slice(&self.record_type.to_le_bytes());
        buf[8..12].copy_from_slice(&self.xid.to_le_bytes());
        buf[12..16].copy_from_slice(&self.prev_segment.to_le_bytes());
        buf[16..20].copy_from_slice(&self.prev_offset.to_le_bytes());
        buf[20..22].copy_from_slice(&self.data_len.to_le_bytes());
        buf[22..24].copy_from_slice(&self._reserved.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; RECORD_HEADER_SIZE]) -> Self {
        RecordHeader {
            total_len: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            record_type: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            xid: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            prev_segment: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            prev_offset: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            data_len: u16::from_le_bytes(buf[20..22].try_into().unwrap()),
            _reserved: u16::from_le_bytes(buf[22..24].try_into().unwrap()),
        }
    }

    /// Validates everything `RecordHeader::decode` cannot express in types:
    /// a sane `total_len` relationship and a `RecordType` that falls in the
    /// closed set. Does not touch the CRC — that is checked against the
    /// payload bytes by the caller, which has them in hand.
    pub fn validate(&self, segment_size: u64) -> WalResult<RecordType> {
        let expected_total = RECORD_HEADER_SIZE + self.data_len as usize + RECORD_CRC_SIZE;
        if self.total_len as usize != expected_total {
            return Err(WalError::InvalidArgument(format!(
                "header total_len {} does not match header+data_len+crc {}",
                self.total_len, expected_total
            )));
        }
        if self.total_len as u64 > segment_size {
            return Err(WalError::InvalidArgument(format!(
                "record total_len {} exceeds segment_size {}",
                self.total_len, segment_size
            )));
        }
        RecordType::try_from(self.record_type)
            .map_err(|raw| WalError::InvalidArgument(format!("unknown record type {}", raw)))
    }
}

/// Computes the CRC-32 (reflected, polynomial `0xEDB88320`, initial and
/// final-XOR both `0xFFFFFFFF`) over `header_bytes || payload` — exactly the
/// IEEE/zlib variant `crc32fast` implements.
pub fn checksum(header_bytes: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header_bytes);
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_roundtrips_through_its_stable_numbering() {
        let pairs = [
            (0u32, RecordType::Null),
            (1, RecordType::Checkpoint),
            (2, RecordType::XactCommit),
            (3, RecordType::XactAbort),
            (4, RecordType::Insert),
            (5, RecordType::Update),
            (6, RecordType::Delete),
            (7, RecordType::NewPage),
            (8, RecordType::Schema),
        ];
        for (raw, expected) in pairs {
            assert_eq!(RecordType::try_from(raw).unwrap(), expected);
            assert_eq!(expected.as_u32(), raw);
        }
        assert_eq!(RecordType::try_from(9), Err(9));
    }

    #[test]
    fn header_encode_decode_is_byte_identical() {
        let header = RecordHeader::new(RecordType::Insert, 42, 10, WalLocation::new(3, 128));
        let encoded = header.encode();
        assert_eq!(encoded.len(), RECORD_HEADER_SIZE);
        let decoded = RecordHeader::decode(&encoded);
        assert_eq!(decoded, header);
        assert_eq!(decoded.prev_record(), WalLocation::new(3, 128));
    }

    #[test]
    fn checksum_changes_on_single_bit_flip() {
        let header = RecordHeader::new(RecordType::Insert, 1, 4, WalLocation::ZERO);
        let payload = b"abcd";
        let original = checksum(&header.encode(), payload);
        let mut flipped = *payload;
        flipped[0] ^= 0x01;
        let after_flip = checksum(&header.encode(), &flipped);
        assert_ne!(original, after_flip);
    }
}
