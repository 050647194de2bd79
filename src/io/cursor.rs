//! Positional binary reads with explicit byte order.
//!
//! Every read names its endianness; the cursor itself only tracks a
//! position. A cursor lives for a single decode and is never shared.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{MeshIoError, Result};

/// Byte order of a multi-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// `Little` when `little_endian` is true.
    pub fn from_flag(little_endian: bool) -> Self {
        if little_endian {
            Endian::Little
        } else {
            Endian::Big
        }
    }
}

macro_rules! positional {
    ($name:ident, $read:ident, $t:ty, $n:expr) => {
        pub fn $name(&self, offset: usize, endian: Endian) -> Result<$t> {
            let b = self.bytes_at(offset, $n)?;
            Ok(match endian {
                Endian::Little => LittleEndian::$read(b),
                Endian::Big => BigEndian::$read(b),
            })
        }
    };
}

macro_rules! sequential {
    ($name:ident, $at:ident, $t:ty, $n:expr) => {
        pub fn $name(&mut self, endian: Endian) -> Result<$t> {
            let v = self.$at(self.pos, endian)?;
            self.pos += $n;
            Ok(v)
        }
    };
}

macro_rules! sequential_vec {
    ($name:ident, $read:ident, $t:ty, $n:expr) => {
        pub fn $name(&mut self, count: usize, endian: Endian) -> Result<Vec<$t>> {
            let len = count
                .checked_mul($n)
                .ok_or_else(|| MeshIoError::malformed("element count overflows"))?;
            let b = self.read_bytes(len)?;
            Ok(match endian {
                Endian::Little => b.chunks_exact($n).map(LittleEndian::$read).collect(),
                Endian::Big => b.chunks_exact($n).map(BigEndian::$read).collect(),
            })
        }
    };
}

/// A read position over an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a cursor starting at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Slice of `len` bytes at `offset`, or a truncation error.
    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                MeshIoError::malformed(format!(
                    "truncated: need {} bytes at offset {}, buffer has {}",
                    len,
                    offset,
                    self.data.len()
                ))
            })
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes_at(offset, 1)?[0])
    }

    pub fn i8_at(&self, offset: usize) -> Result<i8> {
        Ok(self.u8_at(offset)? as i8)
    }

    positional!(u16_at, read_u16, u16, 2);
    positional!(i16_at, read_i16, i16, 2);
    positional!(u32_at, read_u32, u32, 4);
    positional!(i32_at, read_i32, i32, 4);
    positional!(u64_at, read_u64, u64, 8);
    positional!(i64_at, read_i64, i64, 8);
    positional!(f32_at, read_f32, f32, 4);
    positional!(f64_at, read_f64, f64, 8);

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.u8_at(self.pos)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    sequential!(read_u16, u16_at, u16, 2);
    sequential!(read_i16, i16_at, i16, 2);
    sequential!(read_u32, u32_at, u32, 4);
    sequential!(read_i32, i32_at, i32, 4);
    sequential!(read_u64, u64_at, u64, 8);
    sequential!(read_i64, i64_at, i64, 8);
    sequential!(read_f32, f32_at, f32, 4);
    sequential!(read_f64, f64_at, f64, 8);

    sequential_vec!(read_u32_vec, read_u32, u32, 4);
    sequential_vec!(read_i32_vec, read_i32, i32, 4);
    sequential_vec!(read_f32_vec, read_f32, f32, 4);
    sequential_vec!(read_f64_vec, read_f64, f64, 8);

    /// Read a 64-bit unsigned value as two 32-bit words, failing when the
    /// high word is non-zero.
    pub fn read_u64_as_u32(&mut self, endian: Endian) -> Result<u32> {
        let at = self.pos;
        let v = self.read_u64(endian)?;
        u32::try_from(v).map_err(|_| {
            MeshIoError::IntegerOverflow(format!(
                "64-bit value {} at offset {} exceeds 32 bits",
                v, at
            ))
        })
    }

    /// Read a non-negative 32-bit count.
    pub fn read_count(&mut self, endian: Endian) -> Result<usize> {
        let at = self.pos;
        let v = self.read_i32(endian)?;
        usize::try_from(v)
            .map_err(|_| MeshIoError::malformed(format!("negative count {} at offset {}", v, at)))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let b = self.bytes_at(self.pos, len)?;
        self.pos += len;
        Ok(b)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes_at(self.pos, len)?;
        self.pos += len;
        Ok(())
    }

    /// Read a fixed-width field, dropping everything from the first NUL.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let b = self.read_bytes(len)?;
        Ok(null_terminated(b))
    }

    /// Read a NUL-terminated string and step past the terminator.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| MeshIoError::malformed(format!("unterminated string at offset {}", self.pos)))?;
        let s = crate::io::text::decode_text(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(s)
    }

    /// First position at or after `from` holding `byte`.
    pub fn find_byte(&self, byte: u8, from: usize) -> Option<usize> {
        self.data
            .get(from..)?
            .iter()
            .position(|&b| b == byte)
            .map(|p| p + from)
    }

    /// First position at or after `from` where `needle` starts.
    pub fn find(&self, needle: &[u8], from: usize) -> Option<usize> {
        find_bytes(self.data, needle, from)
    }
}

/// Text up to the first NUL byte.
pub fn null_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    crate::io::text::decode_text(&bytes[..end]).trim().to_string()
}

/// First position at or after `from` where `needle` starts in `haystack`.
pub fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
