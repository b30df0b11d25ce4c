//! Decoder for the per-user binary ownership file.

use tracing::warn;

use crate::LauncherError;
use crate::cursor::{ID_TAG, RECORD_MARKER, RecordCursor, SECONDARY_ID_TAG, SIZE_TAG, Stop};

/// Bytes before the first ownership record.
pub const OWNERSHIP_PREAMBLE: usize = 0x108;

/// Ids and length read from one ownership record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipHeader {
    pub launch_id: u64,
    pub secondary_launch_id: u64,
    /// Total record length, marker included.
    pub record_size: usize,
}

/// Parses one ownership record header from `data`.
///
/// Returns `Ok(None)` when `data` does not start with a record marker.
pub fn parse_ownership_header(data: &[u8]) -> Result<Option<OwnershipHeader>, LauncherError> {
    let mut cursor = RecordCursor::new(data, 0);
    if cursor.peek()? != RECORD_MARKER {
        return Ok(None);
    }
    cursor.advance(1)?;

    let (size, size_len) = cursor.read_value(Stop::TagAfterValue(SIZE_TAG))?;
    cursor.advance(1)?;

    let (launch_id, _) = cursor.read_value(Stop::UnrepeatedTag(ID_TAG))?;
    cursor.advance(1)?;

    let (secondary_launch_id, _) = cursor.read_value(Stop::Tag(SECONDARY_ID_TAG))?;

    let record_size = usize::try_from(size)
        .ok()
        .and_then(|s| s.checked_add(size_len + 1))
        .ok_or_else(|| LauncherError::malformed(1, "record size out of range"))?;

    Ok(Some(OwnershipHeader {
        launch_id,
        secondary_launch_id,
        record_size,
    }))
}

/// Walks an ownership file held in memory.
pub struct OwnershipDecoder<'a> {
    data: &'a [u8],
}

impl<'a> OwnershipDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Launch ids of every owned title, in file order.
    ///
    /// A record whose secondary id differs contributes both ids. The walk
    /// ends at the first byte that is not a record marker, or at a zero
    /// launch id. A header that cannot be read ends it too, keeping the ids
    /// found so far.
    pub fn owned_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        if let Err(e) = self.collect_into(&mut ids) {
            warn!(
                error = %e,
                recovered = ids.len(),
                "ownership walk stopped early, file may be corrupted or mid-write"
            );
        }
        ids
    }

    fn collect_into(&self, ids: &mut Vec<u64>) -> Result<(), LauncherError> {
        let mut offset = OWNERSHIP_PREAMBLE;

        while offset < self.data.len() {
            let header = match parse_ownership_header(&self.data[offset..]) {
                Ok(Some(header)) if header.launch_id != 0 => header,
                Ok(_) => break,
                Err(e) => return Err(e.rebase(offset)),
            };

            ids.push(header.launch_id);
            if header.secondary_launch_id != header.launch_id {
                ids.push(header.secondary_launch_id);
            }
            offset = offset.saturating_add(header.record_size);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::tests::varint;

    fn ownership_record(launch_id: u64, secondary: u64, extra: &[u8]) -> Vec<u8> {
        let mut msg = vec![SIZE_TAG];
        varint(launch_id, &mut msg);
        msg.push(ID_TAG);
        varint(secondary, &mut msg);
        msg.push(SECONDARY_ID_TAG);
        varint(extra.len() as u64, &mut msg);
        msg.extend_from_slice(extra);

        let mut out = vec![RECORD_MARKER];
        varint(msg.len() as u64, &mut out);
        out.extend(msg);
        out
    }

    fn file(records: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![0u8; OWNERSHIP_PREAMBLE];
        for r in records {
            data.extend_from_slice(r);
        }
        data
    }

    #[test]
    fn header_sizes() {
        let record = ownership_record(4242, 4242, b"token");
        let header = parse_ownership_header(&record).unwrap().unwrap();
        assert_eq!(header.launch_id, 4242);
        assert_eq!(header.secondary_launch_id, 4242);
        assert_eq!(header.record_size, record.len());
    }

    #[test]
    fn header_with_two_byte_size() {
        let record = ownership_record(77, 78, &[0x41; 200]);
        let header = parse_ownership_header(&record).unwrap().unwrap();
        assert_eq!(header.record_size, record.len());
        assert_eq!(header.secondary_launch_id, 78);
    }

    #[test]
    fn non_marker_is_not_a_record() {
        assert_eq!(parse_ownership_header(&[0x00, 0x01]).unwrap(), None);
    }

    #[test]
    fn lists_primary_and_distinct_secondary_ids() {
        let data = file(&[
            ownership_record(77, 77, b"a"),
            ownership_record(4242, 4243, &[0x41; 150]),
            ownership_record(100_000, 100_000, b"ccc"),
        ]);
        let ids = OwnershipDecoder::new(&data).owned_ids();
        assert_eq!(ids, vec![77, 4242, 4243, 100_000]);
    }

    #[test]
    fn stops_at_trailer() {
        let mut data = file(&[ownership_record(5, 5, b"x")]);
        data.extend_from_slice(&[0x12, 0x00, 0x00]);
        assert_eq!(OwnershipDecoder::new(&data).owned_ids(), vec![5]);
    }

    #[test]
    fn zero_launch_id_ends_walk() {
        let mut data = file(&[ownership_record(5, 5, b"x")]);
        data.extend(ownership_record(0, 9, b"y"));
        data.extend(ownership_record(6, 6, b"z"));
        assert_eq!(OwnershipDecoder::new(&data).owned_ids(), vec![5]);
    }

    #[test]
    fn short_file_owns_nothing() {
        assert!(OwnershipDecoder::new(&[0u8; 0x100]).owned_ids().is_empty());
        assert!(OwnershipDecoder::new(&[]).owned_ids().is_empty());
    }

    #[test]
    fn truncated_header_keeps_earlier_ids() {
        let mut data = file(&[ownership_record(5, 5, b"x")]);
        data.extend_from_slice(&[RECORD_MARKER, 0x09, 0x08, 0x07]);
        assert_eq!(OwnershipDecoder::new(&data).owned_ids(), vec![5]);
    }

    #[test]
    fn size_run_without_continuation_bits_keeps_earlier_ids() {
        let bad = [RECORD_MARKER, 0x01, 0x00, 0x01, 0x08, 0x05, 0x10, 0x05, 0x22];
        assert!(OwnershipDecoder::new(&file(&[bad.to_vec()])).owned_ids().is_empty());

        let data = file(&[ownership_record(5, 5, b"x"), bad.to_vec()]);
        assert_eq!(OwnershipDecoder::new(&data).owned_ids(), vec![5]);
    }
}
