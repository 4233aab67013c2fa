//! AMF0 codec over the byte buffer
//!
//! AMF0 is the original Action Message Format used for RTMP command
//! payloads. Values are self-describing: a one-byte marker, then a
//! marker-specific body.
//!
//! ```text
//! 0x00 Number      IEEE 754 double, big-endian
//! 0x01 Boolean     single byte, zero = false
//! 0x02 String      16-bit length prefix + bytes
//! 0x03 Object      (name, value) pairs until empty name + 0x09
//! 0x05 Null
//! 0x06 Undefined
//! 0x08 ECMA Array  32-bit count hint + object body
//! 0x09 Object End
//! 0x0C Long String 32-bit length prefix + bytes (decode only)
//! ```
//!
//! Anything else (Reference, Date, StrictArray, TypedObject, ...) is
//! rejected as unsupported. Strings are strictly interpreted only in the
//! 0x00-0x7F range; higher bytes pass through untouched.

use crate::amf::value::{Amf0Object, Amf0Value};
use crate::error::{Amf0Error, Result};
use crate::protocol::buffer::ByteBuffer;

// AMF0 type markers
const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_LONG_STRING: u8 = 0x0C;

/// AMF0 reader/writer borrowing the session byte buffer
pub struct Amf0Codec<'a> {
    buf: &'a mut ByteBuffer,
}

impl<'a> Amf0Codec<'a> {
    pub fn new(buf: &'a mut ByteBuffer) -> Self {
        Self { buf }
    }

    /// Decode one value, dispatching on the marker byte
    pub fn read_value(&mut self) -> Result<Amf0Value> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("value requires 1-byte marker").into());
        }
        let marker = self.buf.read_u8()?;
        match marker {
            MARKER_NUMBER => Ok(Amf0Value::Number(self.read_number_body()?)),
            MARKER_BOOLEAN => Ok(Amf0Value::Boolean(self.read_boolean_body()?)),
            MARKER_STRING => Ok(Amf0Value::String(self.read_utf8()?)),
            MARKER_OBJECT => Ok(Amf0Value::Object(self.read_object_body()?)),
            MARKER_NULL => Ok(Amf0Value::Null),
            MARKER_UNDEFINED => Ok(Amf0Value::Undefined),
            MARKER_ECMA_ARRAY => Ok(Amf0Value::EcmaArray(self.read_ecma_array_body()?)),
            MARKER_OBJECT_END => Ok(Amf0Value::ObjectEnd),
            MARKER_LONG_STRING => Ok(Amf0Value::LongString(self.read_utf8_long()?)),
            other => Err(Amf0Error::Invalid(other).into()),
        }
    }

    /// Read a marker-prefixed string
    pub fn read_string(&mut self) -> Result<String> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("string requires 1-byte marker").into());
        }
        if self.buf.read_u8()? != MARKER_STRING {
            return Err(Amf0Error::Decode("string marker invalid").into());
        }
        self.read_utf8()
    }

    /// Read a marker-prefixed number
    pub fn read_number(&mut self) -> Result<f64> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("number requires 1-byte marker").into());
        }
        if self.buf.read_u8()? != MARKER_NUMBER {
            return Err(Amf0Error::Decode("number marker invalid").into());
        }
        self.read_number_body()
    }

    /// Read a marker-prefixed boolean
    pub fn read_boolean(&mut self) -> Result<bool> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("boolean requires 1-byte marker").into());
        }
        if self.buf.read_u8()? != MARKER_BOOLEAN {
            return Err(Amf0Error::Decode("boolean marker invalid").into());
        }
        self.read_boolean_body()
    }

    /// Consume a null marker
    pub fn read_null(&mut self) -> Result<()> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("null requires 1-byte marker").into());
        }
        if self.buf.read_u8()? != MARKER_NULL {
            return Err(Amf0Error::Decode("null marker invalid").into());
        }
        Ok(())
    }

    /// Read a marker-prefixed object
    pub fn read_object(&mut self) -> Result<Amf0Object> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("object requires 1-byte marker").into());
        }
        if self.buf.read_u8()? != MARKER_OBJECT {
            return Err(Amf0Error::Decode("object marker invalid").into());
        }
        self.read_object_body()
    }

    /// Read a marker-prefixed ECMA array
    pub fn read_ecma_array(&mut self) -> Result<Amf0Object> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("ecma array requires 1-byte marker").into());
        }
        if self.buf.read_u8()? != MARKER_ECMA_ARRAY {
            return Err(Amf0Error::Decode("ecma array marker invalid").into());
        }
        self.read_ecma_array_body()
    }

    fn read_number_body(&mut self) -> Result<f64> {
        if !self.buf.require(8) {
            return Err(Amf0Error::Decode("number requires 8 bytes").into());
        }
        self.buf.read_f64_be()
    }

    fn read_boolean_body(&mut self) -> Result<bool> {
        if !self.buf.require(1) {
            return Err(Amf0Error::Decode("boolean requires 1 byte").into());
        }
        Ok(self.buf.read_u8()? != 0)
    }

    /// 16-bit length, then bytes. An empty string is legal.
    pub fn read_utf8(&mut self) -> Result<String> {
        if !self.buf.require(2) {
            return Err(Amf0Error::Decode("utf8 length requires 2 bytes").into());
        }
        let len = self.buf.read_u16_be()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        if !self.buf.require(len) {
            return Err(Amf0Error::Decode("utf8 data requires more bytes").into());
        }
        self.buf.read_string(len)
    }

    fn read_utf8_long(&mut self) -> Result<String> {
        if !self.buf.require(4) {
            return Err(Amf0Error::Decode("long string length requires 4 bytes").into());
        }
        let len = self.buf.read_u32_be()? as usize;
        if !self.buf.require(len) {
            return Err(Amf0Error::Decode("long string data requires more bytes").into());
        }
        self.buf.read_string(len)
    }

    /// Property loop shared by objects and ECMA arrays. Terminates on an
    /// empty name followed by the object-end sentinel; an empty name with
    /// any other value is ill-formed. Duplicate names overwrite the value
    /// but keep the original ordering slot.
    fn read_object_body(&mut self) -> Result<Amf0Object> {
        let mut object = Amf0Object::new();
        loop {
            let name = self.read_utf8()?;
            let value = self.read_value()?;
            if name.is_empty() {
                if value == Amf0Value::ObjectEnd {
                    return Ok(object);
                }
                return Err(Amf0Error::Decode("empty property name without object end").into());
            }
            if value == Amf0Value::ObjectEnd {
                return Err(Amf0Error::Decode("object end with non-empty name").into());
            }
            object.set(name, value);
        }
    }

    fn read_ecma_array_body(&mut self) -> Result<Amf0Object> {
        if !self.buf.require(4) {
            return Err(Amf0Error::Decode("ecma array count requires 4 bytes").into());
        }
        // count is a hint only; termination is the object-end sentinel
        let _count = self.buf.read_u32_be()?;
        self.read_object_body()
    }

    /// Encode one value
    pub fn write_value(&mut self, value: &Amf0Value) -> Result<()> {
        match value {
            Amf0Value::Number(n) => self.write_number(*n),
            Amf0Value::Boolean(b) => self.write_boolean(*b),
            Amf0Value::String(s) => self.write_string(s),
            Amf0Value::Object(o) => self.write_object(o),
            Amf0Value::Null => self.write_null(),
            Amf0Value::Undefined => self.write_undefined(),
            Amf0Value::EcmaArray(o) => self.write_ecma_array(o),
            Amf0Value::ObjectEnd => {
                self.buf.write_u16_be(0);
                self.buf.write_u8(MARKER_OBJECT_END);
                Ok(())
            }
            Amf0Value::LongString(_) => {
                Err(Amf0Error::Encode("long string is decode-only").into())
            }
        }
    }

    pub fn write_number(&mut self, v: f64) -> Result<()> {
        self.buf.write_u8(MARKER_NUMBER);
        self.buf.write_f64_be(v);
        Ok(())
    }

    pub fn write_boolean(&mut self, v: bool) -> Result<()> {
        self.buf.write_u8(MARKER_BOOLEAN);
        self.buf.write_u8(v as u8);
        Ok(())
    }

    pub fn write_string(&mut self, v: &str) -> Result<()> {
        self.buf.write_u8(MARKER_STRING);
        self.write_utf8(v)
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.buf.write_u8(MARKER_NULL);
        Ok(())
    }

    pub fn write_undefined(&mut self) -> Result<()> {
        self.buf.write_u8(MARKER_UNDEFINED);
        Ok(())
    }

    pub fn write_utf8(&mut self, v: &str) -> Result<()> {
        if v.len() > u16::MAX as usize {
            return Err(Amf0Error::Encode("utf8 string too long").into());
        }
        self.buf.write_u16_be(v.len() as u16);
        self.buf.write_bytes(v.as_bytes());
        Ok(())
    }

    /// Properties go out in recorded insertion order
    pub fn write_object(&mut self, object: &Amf0Object) -> Result<()> {
        self.buf.write_u8(MARKER_OBJECT);
        self.write_object_body(object)
    }

    pub fn write_ecma_array(&mut self, object: &Amf0Object) -> Result<()> {
        self.buf.write_u8(MARKER_ECMA_ARRAY);
        self.buf.write_u32_be(object.len() as u32);
        self.write_object_body(object)
    }

    fn write_object_body(&mut self, object: &Amf0Object) -> Result<()> {
        for (name, value) in object.iter() {
            self.write_utf8(name)?;
            self.write_value(value)?;
        }
        self.buf.write_u16_be(0);
        self.buf.write_u8(MARKER_OBJECT_END);
        Ok(())
    }
}
