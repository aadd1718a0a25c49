//! Little-endian fixed-width primitives shared by every request schema.
//! Strings are `u64` length + bytes; sequences are `u64` length + per-element
//! encoding; enums are signed 8-bit tags.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{Error, Result};

/// Append-only little-endian writer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.write_u32::<LittleEndian>(v).expect("Vec write");
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.write_u64::<LittleEndian>(v).expect("Vec write");
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.write_i64::<LittleEndian>(v).expect("Vec write");
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// `u64` length prefix followed by raw bytes.
    pub fn write_string(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    /// `u64` length prefix followed by `n` elements written by `f`.
    pub fn write_seq<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.write_u64(items.len() as u64);
        for item in items {
            f(self, item);
        }
    }
}

/// Cursor-based little-endian reader over a borrowed byte slice.
pub struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Decoder {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn remaining(&self) -> usize {
        let pos = self.cursor.position() as usize;
        self.cursor.get_ref().len().saturating_sub(pos)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor
            .read_u8()
            .map_err(|e| Error::Codec(e.to_string()))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.cursor
            .read_i8()
            .map_err(|e| Error::Codec(e.to_string()))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::Codec(e.to_string()))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::Codec(e.to_string()))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.cursor
            .read_i64::<LittleEndian>()
            .map_err(|e| Error::Codec(e.to_string()))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.remaining() < n {
            return Err(Error::Codec(format!(
                "expected {n} bytes, only {} remain",
                self.remaining()
            )));
        }
        let mut out = vec![0u8; n];
        std::io::Read::read_exact(&mut self.cursor, &mut out)
            .map_err(|e| Error::Codec(e.to_string()))?;
        Ok(out)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u64()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| Error::Codec(e.to_string()))
    }

    pub fn read_seq<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let len = self.read_u64()? as usize;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(f(self)?);
        }
        Ok(out)
    }
}
