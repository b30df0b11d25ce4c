//! Bounds-checked byte cursor over launcher record headers.
//!
//! Header integers are stored as little-endian base-256 runs that end at a
//! field tag byte. The raw sum is then corrected with [`normalize`], which
//! undoes the continuation bits the launcher leaves in each byte.

use crate::LauncherError;

/// Field tag that ends a record size.
pub const SIZE_TAG: u8 = 0x08;
/// Field tag that ends a launch id.
pub const ID_TAG: u8 = 0x10;
/// Field tag in front of an embedded configuration payload.
pub const PAYLOAD_TAG: u8 = 0x1A;
/// Field tag that ends a secondary launch id in ownership records.
pub const SECONDARY_ID_TAG: u8 = 0x22;
/// First byte of every record.
pub const RECORD_MARKER: u8 = 0x0A;

/// Longest integer run the cursor accepts before giving up.
const MAX_VALUE_BYTES: usize = 8;

/// When a value run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Stop at the tag byte.
    Tag(u8),
    /// Stop at the tag byte once something non-zero has been accumulated.
    /// A tag seen first is read as a value byte, since records are never
    /// zero-sized.
    TagAfterValue(u8),
    /// Stop at the tag byte unless the next byte repeats it.
    UnrepeatedTag(u8),
}

impl Stop {
    fn tag(self) -> u8 {
        match self {
            Stop::Tag(t) | Stop::TagAfterValue(t) | Stop::UnrepeatedTag(t) => t,
        }
    }
}

/// Removes the continuation bits from a raw base-256 header value.
///
/// Runs whose continuation bits exceed the value cannot come from the
/// launcher and are reported as malformed at offset 0.
pub fn normalize(value: u64) -> Result<u64, LauncherError> {
    let strip = |v: u64, unit: u64| {
        v.checked_sub(128 * unit * v.div_ceil(256 * unit))
            .ok_or_else(|| LauncherError::malformed(0, format!("invalid continuation bits in {value}")))
    };
    let mut v = value;
    if v > 256 * 256 {
        v = strip(v, 256)?;
        v = strip(v, 1)?;
    } else if v > 256 {
        v = strip(v, 1)?;
    }
    Ok(v)
}

/// Read position over an untrusted byte slice.
///
/// Every access is checked; running off the end yields
/// [`LauncherError::MalformedRecord`] instead of a panic.
#[derive(Debug, Clone)]
pub struct RecordCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the byte at an absolute index.
    pub fn byte_at(&self, index: usize) -> Result<u8, LauncherError> {
        self.data
            .get(index)
            .copied()
            .ok_or_else(|| LauncherError::malformed(index, "unexpected end of data"))
    }

    /// Returns the byte under the cursor.
    pub fn peek(&self) -> Result<u8, LauncherError> {
        self.byte_at(self.pos)
    }

    /// Moves forward `n` bytes. Landing exactly on the end is allowed.
    pub fn advance(&mut self, n: usize) -> Result<(), LauncherError> {
        let next = self.pos + n;
        if next > self.data.len() {
            return Err(LauncherError::malformed(self.pos, "advance past end of data"));
        }
        self.pos = next;
        Ok(())
    }

    /// Returns true if the cursor stands on the terminator described by `stop`.
    fn at_stop(&self, stop: Stop, accumulated: u64) -> Result<bool, LauncherError> {
        let byte = self.peek()?;
        if byte != stop.tag() {
            return Ok(false);
        }
        match stop {
            Stop::Tag(_) => Ok(true),
            Stop::TagAfterValue(_) => Ok(accumulated != 0),
            Stop::UnrepeatedTag(tag) => Ok(self.byte_at(self.pos + 1)? != tag),
        }
    }

    /// Reads a base-256 value up to (not including) its terminator.
    ///
    /// Returns the normalized value and the number of value bytes consumed.
    /// The cursor is left on the terminator.
    pub fn read_value(&mut self, stop: Stop) -> Result<(u64, usize), LauncherError> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut consumed = 0;

        while !self.at_stop(stop, value)? {
            if consumed == MAX_VALUE_BYTES {
                return Err(LauncherError::malformed(
                    start,
                    format!("value longer than {MAX_VALUE_BYTES} bytes"),
                ));
            }
            let byte = u64::from(self.peek()?);
            value += byte << (8 * consumed);
            consumed += 1;
            self.pos += 1;
        }

        let value = normalize(value).map_err(|e| e.rebase(start))?;
        Ok((value, consumed))
    }

    /// Skips bytes until the cursor stands on the terminator.
    pub fn skip_until(&mut self, stop: Stop) -> Result<(), LauncherError> {
        while !self.at_stop(stop, 1)? {
            self.pos += 1;
        }
        Ok(())
    }
}
