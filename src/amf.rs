//! AMF0 encoding
//!
//! AMF0 is the Action Message Format used by Flash/RTMP script data. FLV
//! metadata (`onMetaData`) is a string value followed by an ECMA array of
//! properties, and that is the only surface this crate needs, so this is an
//! encoder for the handful of value types metadata uses.
//!
//! Type markers:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x08 - ECMA Array (associative array)
//! 0x09 - Object End (0x000009 sequence)
//! 0x0C - Long String (UTF-8, 32-bit length prefix)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_LONG_STRING: u8 = 0x0C;

/// AMF0 value types supported by the encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    Number(f64),
    Boolean(bool),
    String(String),
}

impl From<f64> for AmfValue {
    fn from(v: f64) -> Self {
        AmfValue::Number(v)
    }
}

impl From<bool> for AmfValue {
    fn from(v: bool) -> Self {
        AmfValue::Boolean(v)
    }
}

impl From<&str> for AmfValue {
    fn from(v: &str) -> Self {
        AmfValue::String(v.to_string())
    }
}

/// AMF0 encoder writing into an owned buffer.
#[derive(Debug, Default)]
pub struct Amf0Writer {
    buf: BytesMut,
}

impl Amf0Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a string value (with type marker).
    pub fn write_string(&mut self, s: &str) {
        if s.len() > u16::MAX as usize {
            self.buf.put_u8(MARKER_LONG_STRING);
            self.buf.put_u32(s.len() as u32);
            self.buf.put_slice(s.as_bytes());
        } else {
            self.buf.put_u8(MARKER_STRING);
            self.put_utf8(s);
        }
    }

    /// Write a number value.
    pub fn write_number(&mut self, n: f64) {
        self.buf.put_u8(MARKER_NUMBER);
        self.buf.put_f64(n);
    }

    /// Write a boolean value.
    pub fn write_boolean(&mut self, b: bool) {
        self.buf.put_u8(MARKER_BOOLEAN);
        self.buf.put_u8(b as u8);
    }

    /// Write an ECMA array: associative count, properties in the given
    /// order, object end marker.
    pub fn write_ecma_array(&mut self, entries: &[(&str, AmfValue)]) {
        self.buf.put_u8(MARKER_ECMA_ARRAY);
        self.buf.put_u32(entries.len() as u32);
        for (name, value) in entries {
            self.put_utf8(name);
            self.write_value(value);
        }
        // Empty property name followed by the end marker
        self.buf.put_u16(0);
        self.buf.put_u8(MARKER_OBJECT_END);
    }

    fn write_value(&mut self, value: &AmfValue) {
        match value {
            AmfValue::Number(n) => self.write_number(*n),
            AmfValue::Boolean(b) => self.write_boolean(*b),
            AmfValue::String(s) => self.write_string(s),
        }
    }

    /// UTF-8 string with 16-bit length prefix, no type marker.
    fn put_utf8(&mut self, s: &str) {
        self.buf.put_u16(s.len() as u16);
        self.buf.put_slice(s.as_bytes());
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
