use core::fmt::Write;
use core::ops::Range;

use crate::error::TalkieError;
use crate::protocol::buffer::ByteBuffer;
use crate::protocol::kinds::{Ack, MessageKind, ValueType};

/// Capacity of a record, envelope included
pub const MESSAGE_CAPACITY: usize = 128;

/// Shortest record accepted by [`CompactMessage::validate_fields`]
pub const MIN_MESSAGE_LENGTH: usize = 28;

/// Written by [`CompactMessage::reset`]: every required field, kind NOISE
const TEMPLATE: &[u8] = b"{\"m\":10,\"i\":0,\"c\":0,\"f\":\"\"}";

/// Single-character field keys
pub mod key {
    pub const KIND: u8 = b'm';
    pub const IDENTITY: u8 = b'i';
    pub const CHECKSUM: u8 = b'c';
    pub const FROM: u8 = b'f';
    pub const TO: u8 = b't';
    pub const ACK: u8 = b'r';
    pub const SUB_CODE: u8 = b's';
    pub const ORIGINAL: u8 = b'o';

    /// Positional data field `'0'..='9'`
    pub const fn data(index: u8) -> u8 {
        b'0' + (index % 10)
    }
}

/// Borrowed view of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Str(&'a str),
    Number(u32),
}

/// Flat `{"k":v,...}` record stored in a fixed buffer
///
/// Equality compares the raw bytes: two records holding the same fields in a
/// different order are not equal. This keeps comparison a plain memcmp and is
/// not meant as JSON equality.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CompactMessage {
    pub(crate) buffer: ByteBuffer<MESSAGE_CAPACITY>,
}

impl Default for CompactMessage {
    fn default() -> Self {
        let mut message = Self {
            buffer: ByteBuffer::new(),
        };
        message.reset();
        message
    }
}

impl CompactMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a record of `kind` sent by `from`, identity and checksum zeroed
    pub fn compose(kind: MessageKind, from: &str) -> Result<Self, TalkieError> {
        if !is_plain_string(from) {
            return Err(TalkieError::MalformedMessage);
        }
        let mut text = heapless::String::<MESSAGE_CAPACITY>::new();
        write!(
            text,
            "{{\"m\":{},\"i\":0,\"c\":0,\"f\":\"{}\"}}",
            kind as u8, from
        )
        .map_err(|_| TalkieError::BufferOverflow {
            capacity: MESSAGE_CAPACITY,
            required: TEMPLATE.len() + from.len(),
        })?;
        Self::from_bytes(text.as_bytes())
    }

    /// Build a record from raw bytes without validating it
    pub fn from_bytes(src: &[u8]) -> Result<Self, TalkieError> {
        let mut message = Self::default();
        message.deserialize_buffer(src)?;
        Ok(message)
    }

    /// Overwrite the record with the minimal template
    pub fn reset(&mut self) {
        // The template is far below capacity
        let _ = self.buffer.replace(TEMPLATE);
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.buffer.as_slice()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Copy the record into `dst`, returning the number of bytes written
    pub fn serialize_json(&self, dst: &mut [u8]) -> Result<usize, TalkieError> {
        let len = self.buffer.len();
        if dst.len() < len {
            return Err(TalkieError::BufferOverflow {
                capacity: dst.len(),
                required: len,
            });
        }
        dst[..len].copy_from_slice(self.buffer.as_slice());
        Ok(len)
    }

    /// Replace the record with `src`; an oversized source leaves it untouched
    pub fn deserialize_buffer(&mut self, src: &[u8]) -> Result<(), TalkieError> {
        if src.len() > MESSAGE_CAPACITY {
            return Err(TalkieError::PacketTooLarge {
                max_size: MESSAGE_CAPACITY,
                actual_size: src.len(),
            });
        }
        if self.buffer.replace(src) {
            Ok(())
        } else {
            Err(TalkieError::PacketTooLarge {
                max_size: MESSAGE_CAPACITY,
                actual_size: src.len(),
            })
        }
    }

    /// Offset of the colon following `"key"`, or 0 when the key is absent
    ///
    /// 0 is never a legal colon offset since the record opens with `{`.
    pub fn colon_position(&self, key: u8) -> usize {
        let bytes = self.buffer.as_slice();
        if bytes.len() < 4 {
            return 0;
        }
        (0..bytes.len() - 3)
            .find(|&pos| {
                bytes[pos] == b'"'
                    && bytes[pos + 1] == key
                    && bytes[pos + 2] == b'"'
                    && bytes[pos + 3] == b':'
            })
            .map(|pos| pos + 3)
            .unwrap_or(0)
    }

    pub fn contains(&self, key: u8) -> bool {
        self.colon_position(key) != 0
    }

    pub fn value_type(&self, key: u8) -> ValueType {
        match self.colon_position(key) {
            0 => ValueType::Void,
            colon => self.value_bounds(colon).0,
        }
    }

    /// Classify the value after `colon` and find where it ends (exclusive)
    fn value_bounds(&self, colon: usize) -> (ValueType, usize) {
        let bytes = self.buffer.as_slice();
        let start = colon + 1;
        let Some(&first) = bytes.get(start) else {
            return (ValueType::Void, start);
        };
        match first {
            b'"' => match bytes[start + 1..].iter().position(|&b| b == b'"') {
                Some(offset) => (ValueType::String, start + 1 + offset + 1),
                None => (ValueType::Void, bytes.len()),
            },
            b'0'..=b'9' => match bytes[start..].iter().position(|b| !b.is_ascii_digit()) {
                Some(offset) => (ValueType::Integer, start + offset),
                None => (ValueType::Void, bytes.len()),
            },
            _ => match bytes[start..].iter().position(|&b| b == b',' || b == b'}') {
                Some(offset) => (ValueType::Other, start + offset),
                None => (ValueType::Void, bytes.len()),
            },
        }
    }

    /// Span of the raw value of `key`, quotes included for strings
    fn value_span(&self, key: u8) -> Option<(ValueType, Range<usize>)> {
        let colon = self.colon_position(key);
        if colon == 0 {
            return None;
        }
        match self.value_bounds(colon) {
            (ValueType::Void, _) => None,
            (value_type, end) => Some((value_type, colon + 1..end)),
        }
    }

    pub fn get_number(&self, key: u8) -> Option<u32> {
        match self.value_span(key)? {
            (ValueType::Integer, span) => parse_decimal(&self.buffer[span]),
            _ => None,
        }
    }

    /// Borrow a string value in place
    pub fn string(&self, key: u8) -> Option<&str> {
        match self.value_span(key)? {
            (ValueType::String, span) => {
                core::str::from_utf8(&self.buffer[span.start + 1..span.end - 1]).ok()
            }
            _ => None,
        }
    }

    /// Copy a string value into `out`
    ///
    /// `out` is cleared and `false` returned when the key is missing, not a
    /// string, or longer than `out` can hold.
    pub fn get_string<const N: usize>(&self, key: u8, out: &mut heapless::String<N>) -> bool {
        out.clear();
        match self.string(key) {
            Some(value) if value.len() <= N => out.push_str(value).is_ok(),
            _ => false,
        }
    }

    pub fn value(&self, key: u8) -> Option<Value<'_>> {
        match self.value_type(key) {
            ValueType::String => self.string(key).map(Value::Str),
            ValueType::Integer => self.get_number(key).map(Value::Number),
            _ => None,
        }
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// Returns `false` and leaves the record unchanged when the result would
    /// not fit.
    #[must_use]
    pub fn set_number(&mut self, key: u8, value: u32) -> bool {
        let mut digits = heapless::String::<10>::new();
        if write!(digits, "{}", value).is_err() {
            return false;
        }
        self.set_raw(key, digits.as_bytes(), false)
    }

    /// Store `value` as a quoted string under `key`
    ///
    /// Strings holding `"` or `\` are refused since values are not escaped.
    #[must_use]
    pub fn set_string(&mut self, key: u8, value: &str) -> bool {
        if !is_plain_string(value) {
            return false;
        }
        self.set_raw(key, value.as_bytes(), true)
    }

    /// Remove-then-append, with the capacity checked before anything moves
    fn set_raw(&mut self, key: u8, value: &[u8], quoted: bool) -> bool {
        if !self.is_enveloped() {
            return false;
        }
        let removal = match self.removal_range(key) {
            Some(range) => Some(range),
            None if self.contains(key) => return false,
            None => None,
        };
        let len_after_removal = self.buffer.len() - removal.as_ref().map_or(0, |r| r.len());
        let separator = usize::from(len_after_removal > 2);
        let quotes = if quoted { 2 } else { 0 };
        let added = separator + 4 + quotes + value.len();
        if len_after_removal + added > MESSAGE_CAPACITY {
            return false;
        }

        let mut field = heapless::Vec::<u8, MESSAGE_CAPACITY>::new();
        let header = [b'"', key, b'"', b':'];
        let quote: &[u8] = if quoted { b"\"" } else { b"" };
        if separator == 1 && field.push(b',').is_err() {
            return false;
        }
        for part in [&header[..], quote, value, quote] {
            if field.extend_from_slice(part).is_err() {
                return false;
            }
        }

        if let Some(range) = removal {
            if !self.buffer.remove_range(range) {
                return false;
            }
        }
        let closing = self.buffer.len() - 1;
        self.buffer.insert_at(closing, &field)
    }

    /// Remove `key` together with exactly one adjacent comma
    #[must_use]
    pub fn remove(&mut self, key: u8) -> bool {
        match self.removal_range(key) {
            Some(range) => self.buffer.remove_range(range),
            None => false,
        }
    }

    /// The field span plus the comma separating it from its neighbour
    ///
    /// The comma before the field is taken when there is one; the first
    /// field takes the comma after it instead.
    fn removal_range(&self, key: u8) -> Option<Range<usize>> {
        let (_, value) = self.value_span(key)?;
        let start = value.start - 4;
        let end = value.end;
        let bytes = self.buffer.as_slice();
        if start > 0 && bytes[start - 1] == b',' {
            Some(start - 1..end)
        } else if bytes.get(end) == Some(&b',') {
            Some(start..end + 1)
        } else {
            Some(start..end)
        }
    }

    /// Replace the value of `key` in place, keeping the field where it is
    pub(crate) fn replace_value(&mut self, key: u8, value: &[u8]) -> bool {
        match self.value_span(key) {
            Some((_, span)) => self.buffer.splice(span, value),
            None => false,
        }
    }

    fn is_enveloped(&self) -> bool {
        let bytes = self.buffer.as_slice();
        bytes.len() >= 2 && bytes[0] == b'{' && bytes[bytes.len() - 1] == b'}'
    }

    /// Any key present more than once
    fn has_duplicate_keys(&self) -> bool {
        let bytes = self.buffer.as_slice();
        let mut seen = [false; 128];
        for pos in 0..bytes.len().saturating_sub(3) {
            if bytes[pos] == b'"' && bytes[pos + 2] == b'"' && bytes[pos + 3] == b':' {
                let key = bytes[pos + 1] as usize;
                if key >= seen.len() || seen[key] {
                    return true;
                }
                seen[key] = true;
            }
        }
        false
    }

    /// Envelope, length, required fields and their types, no duplicate keys
    pub fn validate_fields(&self) -> bool {
        self.buffer.len() >= MIN_MESSAGE_LENGTH
            && self.is_enveloped()
            && self.value_type(key::KIND) == ValueType::Integer
            && self.value_type(key::IDENTITY) == ValueType::Integer
            && self.value_type(key::CHECKSUM) == ValueType::Integer
            && self.value_type(key::FROM) == ValueType::String
            && !self.has_duplicate_keys()
    }

    pub fn kind(&self) -> MessageKind {
        self.get_number(key::KIND)
            .map(MessageKind::from_u32)
            .unwrap_or(MessageKind::Noise)
    }

    #[must_use]
    pub fn set_kind(&mut self, kind: MessageKind) -> bool {
        self.set_number(key::KIND, kind as u32)
    }

    /// Sender timestamp on the 16-bit protocol clock
    pub fn identity(&self) -> Option<u16> {
        self.get_number(key::IDENTITY).map(|value| value as u16)
    }

    #[must_use]
    pub fn set_identity(&mut self, identity: u16) -> bool {
        self.set_number(key::IDENTITY, identity as u32)
    }

    pub fn from(&self) -> Option<&str> {
        self.string(key::FROM)
    }

    pub fn to(&self) -> Option<Value<'_>> {
        self.value(key::TO)
    }

    pub fn ack(&self) -> Option<Ack> {
        self.get_number(key::ACK).and_then(Ack::from_u32)
    }
}

impl core::fmt::Debug for CompactMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(self.buffer.as_slice()) {
            Ok(text) => write!(f, "CompactMessage({})", text),
            Err(_) => write!(f, "CompactMessage({:?})", self.buffer.as_slice()),
        }
    }
}

impl core::fmt::Display for CompactMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip transport noise around a record
///
/// Keeps the bytes from the first `{` up to the last `}` that is not preceded
/// by a backslash.
pub fn trim_noise(src: &[u8]) -> Option<&[u8]> {
    let start = src.iter().position(|&b| b == b'{')?;
    let end = (start + 1..src.len())
        .rev()
        .find(|&pos| src[pos] == b'}' && src[pos - 1] != b'\\')?;
    Some(&src[start..=end])
}

fn parse_decimal(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &digit| {
        acc.checked_mul(10)?.checked_add((digit - b'0') as u32)
    })
}

fn is_plain_string(value: &str) -> bool {
    !value.bytes().any(|b| b == b'"' || b == b'\\')
}
