// Copyright 2025 OctoQTI Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Primitive readers and writers for the snapshot stream
//!
//! Fixed-width integers are big-endian. Unbounded counters use LEB128
//! varints. Strings are UTF-8 with a u16 byte-length prefix. Every read is
//! bounds-checked before touching the buffer.

use crate::error::{CodecError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, TimeZone, Utc};
use octoqti_model::QtiDuration;

/// Writer over a growable byte buffer
#[derive(Default)]
pub struct StreamWriter {
    buf: BytesMut,
}

impl StreamWriter {
    /// A fresh writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish writing and hand out the stream
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing was written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write one byte
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Write a 16-bit unsigned integer
    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    /// Write a 32-bit unsigned integer
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Write a 32-bit signed integer
    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Write a 64-bit signed integer
    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    /// Write an IEEE-754 double
    pub fn put_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    /// Write a boolean as one byte
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    /// Write an LEB128 varint
    pub fn put_varint(&mut self, mut value: u64) {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.buf.put_u8(byte);
            if value == 0 {
                break;
            }
        }
    }

    /// Write a u16-length-prefixed UTF-8 string
    pub fn put_string(&mut self, value: &str) -> Result<()> {
        let len = value.len();
        if len > usize::from(u16::MAX) {
            return Err(CodecError::FieldOverflow {
                what: "string length",
                value: len,
                limit: usize::from(u16::MAX),
            });
        }
        self.buf.put_u16(len as u16);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Write a u16-length-prefixed byte block
    pub fn put_blob(&mut self, value: &[u8]) -> Result<()> {
        let len = value.len();
        if len > usize::from(u16::MAX) {
            return Err(CodecError::FieldOverflow {
                what: "blob length",
                value: len,
                limit: usize::from(u16::MAX),
            });
        }
        self.buf.put_u16(len as u16);
        self.buf.put_slice(value);
        Ok(())
    }

    /// Write a duration as its ISO-8601 lexical form
    pub fn put_duration(&mut self, value: QtiDuration) -> Result<()> {
        self.put_string(&value.to_string())
    }

    /// Write an optional instant as a flag plus epoch milliseconds
    pub fn put_optional_instant(&mut self, value: Option<DateTime<Utc>>) {
        match value {
            Some(instant) => {
                self.put_bool(true);
                self.put_i64(instant.timestamp_millis());
            }
            None => self.put_bool(false),
        }
    }
}

/// Bounds-checked reader over a byte slice
pub struct StreamReader<'a> {
    buf: &'a [u8],
}

impl<'a> StreamReader<'a> {
    /// Read from the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, what: &'static str, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(CodecError::Truncated {
                what,
                needed: len - self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Read one byte
    pub fn get_u8(&mut self, what: &'static str) -> Result<u8> {
        self.need(what, 1)?;
        Ok(self.buf.get_u8())
    }

    /// Read a 16-bit unsigned integer
    pub fn get_u16(&mut self, what: &'static str) -> Result<u16> {
        self.need(what, 2)?;
        Ok(self.buf.get_u16())
    }

    /// Read a 32-bit unsigned integer
    pub fn get_u32(&mut self, what: &'static str) -> Result<u32> {
        self.need(what, 4)?;
        Ok(self.buf.get_u32())
    }

    /// Read a 32-bit signed integer
    pub fn get_i32(&mut self, what: &'static str) -> Result<i32> {
        self.need(what, 4)?;
        Ok(self.buf.get_i32())
    }

    /// Read a 64-bit signed integer
    pub fn get_i64(&mut self, what: &'static str) -> Result<i64> {
        self.need(what, 8)?;
        Ok(self.buf.get_i64())
    }

    /// Read an IEEE-754 double
    pub fn get_f64(&mut self, what: &'static str) -> Result<f64> {
        self.need(what, 8)?;
        Ok(self.buf.get_f64())
    }

    /// Read a boolean byte
    pub fn get_bool(&mut self, what: &'static str) -> Result<bool> {
        Ok(self.get_u8(what)? != 0)
    }

    /// Read an LEB128 varint
    pub fn get_varint(&mut self, what: &'static str) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.get_u8(what)?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(CodecError::FieldOverflow {
                    what,
                    value: usize::MAX,
                    limit: 64,
                });
            }
        }
    }

    /// Read a u16-length-prefixed UTF-8 string
    pub fn get_string(&mut self, what: &'static str) -> Result<String> {
        let len = usize::from(self.get_u16(what)?);
        self.need(what, len)?;
        let bytes = self.buf[..len].to_vec();
        self.buf.advance(len);
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a u16-length-prefixed byte block
    pub fn get_blob(&mut self, what: &'static str) -> Result<Vec<u8>> {
        let len = usize::from(self.get_u16(what)?);
        self.need(what, len)?;
        let bytes = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(bytes)
    }

    /// Read an ISO-8601 duration
    pub fn get_duration(&mut self, what: &'static str) -> Result<QtiDuration> {
        let lexical = self.get_string(what)?;
        Ok(lexical.parse::<QtiDuration>()?)
    }

    /// Read an optional instant
    pub fn get_optional_instant(&mut self, what: &'static str) -> Result<Option<DateTime<Utc>>> {
        if !self.get_bool(what)? {
            return Ok(None);
        }
        let millis = self.get_i64(what)?;
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Some)
            .ok_or(CodecError::ModelMismatch {
                message: format!("instant {millis}ms outside the representable range"),
            })
    }
}
