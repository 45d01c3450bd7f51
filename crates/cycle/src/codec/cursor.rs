// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian primitive cursors for the wire format.

use std::fmt;

use crate::config::WIRE_USIZE_BYTES;

/// Out-of-bounds or malformed primitive read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub offset: usize,
    pub reason: &'static str,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.reason, self.offset)
    }
}

impl std::error::Error for WireError {}

/// Data corruption is not recoverable: the bytes were produced by a
/// cooperating process using the same schema.
#[track_caller]
pub(crate) fn corrupt(what: impl fmt::Display) -> ! {
    panic!("corrupt object data: {}", what)
}

pub(crate) trait OrCorrupt<T> {
    fn or_corrupt(self) -> T;
}

impl<T> OrCorrupt<T> for Result<T, WireError> {
    #[track_caller]
    fn or_corrupt(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => corrupt(e),
        }
    }
}

macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, WireError> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Growable writer; the wire form never needs a pre-sized buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_u128, u128);

    /// `usize` travels as 8 bytes regardless of target width.
    pub fn write_usize(&mut self, value: usize) {
        self.write_u64(value as u64);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Length-prefixed byte string.
    pub fn write_blob(&mut self, data: &[u8]) {
        self.write_usize(data.len());
        self.write_bytes(data);
    }

    /// Reserve `count` zeroed `usize` slots, returning the first slot's offset.
    pub fn reserve_usize_table(&mut self, count: usize) -> usize {
        let start = self.buffer.len();
        self.buffer.resize(start + count * WIRE_USIZE_BYTES, 0);
        start
    }

    /// Overwrite slot `index` of a table reserved at `table`.
    pub fn patch_usize(&mut self, table: usize, index: usize, value: usize) {
        let at = table + index * WIRE_USIZE_BYTES;
        self.buffer[at..at + WIRE_USIZE_BYTES].copy_from_slice(&(value as u64).to_le_bytes());
    }

    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked reader over borrowed bytes.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_u128, u128, 16);

    pub fn read_usize(&mut self) -> Result<usize, WireError> {
        let offset = self.offset;
        let value = self.read_u64()?;
        usize::try_from(value).map_err(|_| WireError {
            offset,
            reason: "usize out of range for this target",
        })
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(WireError {
                offset,
                reason: "invalid bool/flag byte",
            }),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.buffer.len())
            .ok_or(WireError {
                offset: self.offset,
                reason: "unexpected end of buffer",
            })?;
        let slice = &self.buffer[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Length-prefixed byte string.
    pub fn read_blob(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_usize()?;
        self.read_bytes(len)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    /// Unread tail.
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.offset.min(self.buffer.len())..]
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

/// Read the `usize` slot `index` of a table starting at byte 0 of `table`.
pub(crate) fn table_entry(table: &[u8], index: usize) -> usize {
    let mut cursor = Cursor::new(table);
    cursor
        .read_bytes(index * WIRE_USIZE_BYTES)
        .and_then(|_| cursor.read_usize())
        .or_corrupt()
}
