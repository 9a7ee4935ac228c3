use core::fmt::Write;

use crate::protocol::message::{key, CompactMessage};

/// XOR of successive big-endian 16-bit words
///
/// An odd trailing byte is the high byte of a final word whose low byte is 0.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.chunks(2).fold(0u16, |acc, word| {
        let high = word[0] as u16;
        let low = word.get(1).copied().unwrap_or(0) as u16;
        acc ^ (high << 8 | low)
    })
}

impl CompactMessage {
    /// Checksum of the record as it currently stands
    pub fn checksum(&self) -> u16 {
        checksum(self.as_bytes())
    }

    /// Zero `c`, checksum the record, then write the digits into `c` in place
    ///
    /// A record without `c` gets one appended. Fails without touching the
    /// record when the digits do not fit.
    #[must_use]
    pub fn insert_checksum(&mut self) -> bool {
        let before = self.clone();
        let zeroed = if self.contains(key::CHECKSUM) {
            self.replace_value(key::CHECKSUM, b"0")
        } else {
            self.set_number(key::CHECKSUM, 0)
        };
        if !zeroed {
            *self = before;
            return false;
        }

        let mut digits = heapless::String::<5>::new();
        if write!(digits, "{}", self.checksum()).is_err()
            || !self.replace_value(key::CHECKSUM, digits.as_bytes())
        {
            *self = before;
            return false;
        }
        true
    }

    /// Read `c` and compact its digits down to a single `0`
    ///
    /// The digits are parsed and the following bytes shifted left in the same
    /// walk over the value.
    pub fn extract_checksum(&mut self) -> Option<u16> {
        let colon = self.colon_position(key::CHECKSUM);
        if colon == 0 {
            return None;
        }
        let start = colon + 1;
        let bytes = self.buffer.as_mut_slice();
        let len = bytes.len();

        let mut value: u32 = 0;
        let mut end = start;
        while end < len && bytes[end].is_ascii_digit() {
            value = value * 10 + (bytes[end] - b'0') as u32;
            if value > u16::MAX as u32 {
                return None;
            }
            end += 1;
        }
        if end == start || end == len {
            return None;
        }

        bytes[start] = b'0';
        if !self.buffer.remove_range(start + 1..end) {
            return None;
        }
        Some(value as u16)
    }

    /// Compare the carried checksum with a fresh one over the zeroed record
    ///
    /// Leaves `c` zeroed either way.
    pub fn verify_checksum(&mut self) -> bool {
        match self.extract_checksum() {
            Some(carried) => carried == self.checksum(),
            None => false,
        }
    }
}
