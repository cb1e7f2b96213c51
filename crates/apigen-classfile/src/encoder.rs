//! Byte-level encoding and decoding utilities
//!
//! Class files are big-endian throughout. Strings are stored in the JVM's
//! "modified UTF-8" form, which differs from standard UTF-8 in two ways: the
//! NUL character is written as two bytes, and supplementary characters are
//! written as two three-byte surrogate halves.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while reading raw class file bytes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Unexpected end of input
    #[error("Unexpected end of class data at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid modified UTF-8 sequence
    #[error("Invalid modified UTF-8 string at offset {0}")]
    InvalidUtf8(usize),
}

/// Big-endian writer used to assemble class file sections
#[derive(Debug, Default)]
pub struct ByteWriter {
    /// Internal buffer
    pub(crate) buffer: Vec<u8>,
}

impl ByteWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of the buffer)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 16-bit unsigned integer
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 32-bit unsigned integer
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 32-bit signed integer
    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a 64-bit signed integer
    pub fn emit_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a byte slice verbatim
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Patch a previously emitted u16 value at the given offset
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        self.buffer[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Patch a previously emitted u32 value at the given offset
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Reserve space for a u32 value (returns offset for later patching)
    pub fn reserve_u32(&mut self) -> usize {
        let offset = self.offset();
        self.emit_u32(0);
        offset
    }
}

/// Big-endian reader over a borrowed class file buffer
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Read a 16-bit unsigned integer
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a 32-bit unsigned integer
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a 32-bit signed integer
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a 64-bit signed integer
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let high = self.read_u32()? as u64;
        let low = self.read_u32()? as u64;
        Ok(((high << 32) | low) as i64)
    }

    /// Read a fixed number of bytes without copying
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        self.take(count)
    }

    /// Skip a fixed number of bytes
    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.take(count).map(|_| ())
    }

    /// Read a u16-length-prefixed modified UTF-8 string
    ///
    /// Fails only on malformed byte sequences; unpaired surrogates are kept.
    pub fn read_java_string(&mut self) -> Result<JavaString, DecodeError> {
        let len = self.read_u16()? as usize;
        let start = self.position;
        let bytes = self.take(len)?.to_vec();
        JavaString::from_modified_utf8(bytes).ok_or(DecodeError::InvalidUtf8(start))
    }
}

/// A Java string held in its encoded modified UTF-8 form
///
/// Java strings are sequences of UTF-16 code units and may contain unpaired
/// surrogates, which no `str` can hold. The bytes are kept exactly as read so
/// such values re-encode unchanged; [`as_str`](Self::as_str) is available
/// whenever the value is valid Unicode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JavaString {
    bytes: Vec<u8>,
    text: Option<String>,
}

impl JavaString {
    /// Wrap encoded bytes, returning `None` if they are not well-formed modified UTF-8
    pub fn from_modified_utf8(bytes: Vec<u8>) -> Option<Self> {
        let units = decode_utf16_units(&bytes)?;
        let text = String::from_utf16(&units).ok();
        Some(Self { bytes, text })
    }

    /// The encoded bytes, without the length prefix
    pub fn as_modified_utf8(&self) -> &[u8] {
        &self.bytes
    }

    /// The value as text, or `None` if it contains an unpaired surrogate
    pub fn as_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The value as text, with unpaired surrogates replaced by U+FFFD
    pub fn to_string_lossy(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => decode_utf16_units(&self.bytes)
                .map(|units| String::from_utf16_lossy(&units))
                .unwrap_or_default(),
        }
    }
}

impl From<&str> for JavaString {
    fn from(value: &str) -> Self {
        Self {
            bytes: encode_modified_utf8(value),
            text: Some(value.to_string()),
        }
    }
}

impl From<String> for JavaString {
    fn from(value: String) -> Self {
        Self {
            bytes: encode_modified_utf8(&value),
            text: Some(value),
        }
    }
}

impl fmt::Display for JavaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Decode a modified UTF-8 byte sequence, returning `None` if it is malformed
/// or is not valid Unicode
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    String::from_utf16(&decode_utf16_units(bytes)?).ok()
}

/// Decode modified UTF-8 into UTF-16 code units, surrogates included
fn decode_utf16_units(bytes: &[u8]) -> Option<Vec<u16>> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                return None;
            }
            units.push(b0);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1)?;
            units.push(((b0 & 0x1F) << 6) | b1);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, i + 1)?;
            let b2 = continuation(bytes, i + 2)?;
            units.push(((b0 & 0x0F) << 12) | (b1 << 6) | b2);
            i += 3;
        } else {
            return None;
        }
    }
    Some(units)
}

fn continuation(bytes: &[u8], index: usize) -> Option<u16> {
    let byte = *bytes.get(index)?;
    if byte & 0xC0 != 0x80 {
        return None;
    }
    Some((byte & 0x3F) as u16)
}

/// Encode a string in modified UTF-8
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
