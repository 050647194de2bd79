//! Typed numeric arrays selected by a header datatype code

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use half::f16;
use once_cell::sync::Lazy;

use crate::error::{MeshIoError, Result};
use crate::io::Endian;

/// float16 bit pattern → float32, computed once and shared read-only.
static F16_TABLE: Lazy<Vec<f32>> =
    Lazy::new(|| (0..=u16::MAX).map(|bits| f16::from_bits(bits).to_f32()).collect());

/// Decode a float16 bit pattern through the shared lookup table.
#[inline]
pub fn f16_to_f32(bits: u16) -> f32 {
    F16_TABLE[bits as usize]
}

/// On-disk element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    /// Narrowed to `UInt32` on decode.
    UInt64,
    /// Narrowed to `Int32` on decode.
    Int64,
    /// Widened to `Float32` on decode.
    Float16,
    Float32,
    Float64,
}

impl ScalarType {
    /// Bytes per element on disk.
    pub fn byte_size(self) -> usize {
        match self {
            ScalarType::UInt8 | ScalarType::Int8 => 1,
            ScalarType::UInt16 | ScalarType::Int16 | ScalarType::Float16 => 2,
            ScalarType::UInt32 | ScalarType::Int32 | ScalarType::Float32 => 4,
            ScalarType::UInt64 | ScalarType::Int64 | ScalarType::Float64 => 8,
        }
    }

    /// Parse a lowercase file-suffix type name (`float32`, `uint64`, ...).
    pub fn from_suffix(s: &str) -> Option<Self> {
        Some(match s {
            "uint8" => ScalarType::UInt8,
            "int8" => ScalarType::Int8,
            "uint16" => ScalarType::UInt16,
            "int16" => ScalarType::Int16,
            "uint32" => ScalarType::UInt32,
            "int32" => ScalarType::Int32,
            "uint64" => ScalarType::UInt64,
            "int64" => ScalarType::Int64,
            "float16" => ScalarType::Float16,
            "float32" => ScalarType::Float32,
            "float64" => ScalarType::Float64,
            _ => return None,
        })
    }
}

/// Decoded numeric array, one variant per in-memory element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarArray {
    UInt8(Vec<u8>),
    Int8(Vec<i8>),
    UInt16(Vec<u16>),
    Int16(Vec<i16>),
    UInt32(Vec<u32>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! decode_vec {
    ($bytes:expr, $size:expr, $endian:expr, $read:ident) => {
        match $endian {
            Endian::Little => $bytes.chunks_exact($size).map(LittleEndian::$read).collect(),
            Endian::Big => $bytes.chunks_exact($size).map(BigEndian::$read).collect(),
        }
    };
}

impl ScalarArray {
    /// Decode `count` elements of `ty` from the start of `bytes`.
    ///
    /// 64-bit integers are narrowed to 32 bits and fail with
    /// `IntegerOverflow` when any high word is non-zero.
    pub fn from_bytes(ty: ScalarType, bytes: &[u8], count: usize, endian: Endian) -> Result<Self> {
        let need = count
            .checked_mul(ty.byte_size())
            .ok_or_else(|| MeshIoError::malformed("element count overflows"))?;
        if bytes.len() < need {
            return Err(MeshIoError::malformed(format!(
                "need {} bytes for {} {:?} values, have {}",
                need,
                count,
                ty,
                bytes.len()
            )));
        }
        let bytes = &bytes[..need];
        Ok(match ty {
            ScalarType::UInt8 => ScalarArray::UInt8(bytes.to_vec()),
            ScalarType::Int8 => ScalarArray::Int8(bytes.iter().map(|&b| b as i8).collect()),
            ScalarType::UInt16 => ScalarArray::UInt16(decode_vec!(bytes, 2, endian, read_u16)),
            ScalarType::Int16 => ScalarArray::Int16(decode_vec!(bytes, 2, endian, read_i16)),
            ScalarType::UInt32 => ScalarArray::UInt32(decode_vec!(bytes, 4, endian, read_u32)),
            ScalarType::Int32 => ScalarArray::Int32(decode_vec!(bytes, 4, endian, read_i32)),
            ScalarType::Float32 => ScalarArray::Float32(decode_vec!(bytes, 4, endian, read_f32)),
            ScalarType::Float64 => ScalarArray::Float64(decode_vec!(bytes, 8, endian, read_f64)),
            ScalarType::Float16 => {
                let bits: Vec<u16> = decode_vec!(bytes, 2, endian, read_u16);
                ScalarArray::Float32(bits.into_iter().map(f16_to_f32).collect())
            }
            ScalarType::UInt64 => {
                let wide: Vec<u64> = decode_vec!(bytes, 8, endian, read_u64);
                ScalarArray::UInt32(narrow_u64(&wide)?)
            }
            ScalarType::Int64 => {
                let wide: Vec<i64> = decode_vec!(bytes, 8, endian, read_i64);
                let mut out = Vec::with_capacity(wide.len());
                for (k, v) in wide.into_iter().enumerate() {
                    out.push(i32::try_from(v).map_err(|_| {
                        MeshIoError::IntegerOverflow(format!(
                            "int64 element {} ({}) does not fit in 32 bits",
                            k, v
                        ))
                    })?);
                }
                ScalarArray::Int32(out)
            }
        })
    }

    pub fn len(&self) -> usize {
        match self {
            ScalarArray::UInt8(v) => v.len(),
            ScalarArray::Int8(v) => v.len(),
            ScalarArray::UInt16(v) => v.len(),
            ScalarArray::Int16(v) => v.len(),
            ScalarArray::UInt32(v) => v.len(),
            ScalarArray::Int32(v) => v.len(),
            ScalarArray::Float32(v) => v.len(),
            ScalarArray::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element to `f32`.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            ScalarArray::UInt8(v) => v.iter().map(|&x| x as f32).collect(),
            ScalarArray::Int8(v) => v.iter().map(|&x| x as f32).collect(),
            ScalarArray::UInt16(v) => v.iter().map(|&x| x as f32).collect(),
            ScalarArray::Int16(v) => v.iter().map(|&x| x as f32).collect(),
            ScalarArray::UInt32(v) => v.iter().map(|&x| x as f32).collect(),
            ScalarArray::Int32(v) => v.iter().map(|&x| x as f32).collect(),
            ScalarArray::Float32(v) => v.clone(),
            ScalarArray::Float64(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }

    /// Consume into `f32` values without copying when already `Float32`.
    pub fn into_f32(self) -> Vec<f32> {
        match self {
            ScalarArray::Float32(v) => v,
            other => other.to_f32(),
        }
    }

    /// Convert every element to `u32`; fails for negative or fractional
    /// values.
    pub fn to_u32(&self) -> Result<Vec<u32>> {
        let as_index = |k: usize, v: f64| -> Result<u32> {
            if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
                return Err(MeshIoError::malformed(format!(
                    "element {} ({}) is not a valid index",
                    k, v
                )));
            }
            Ok(v as u32)
        };
        match self {
            ScalarArray::UInt32(v) => Ok(v.clone()),
            ScalarArray::UInt8(v) => Ok(v.iter().map(|&x| x as u32).collect()),
            ScalarArray::UInt16(v) => Ok(v.iter().map(|&x| x as u32).collect()),
            ScalarArray::Int32(v) => v
                .iter()
                .enumerate()
                .map(|(k, &x)| as_index(k, x as f64))
                .collect(),
            other => other
                .to_f32()
                .into_iter()
                .enumerate()
                .map(|(k, x)| as_index(k, x as f64))
                .collect(),
        }
    }
}

/// Narrow 64-bit unsigned values to 32 bits, failing on any non-zero high
/// word.
pub fn narrow_u64(values: &[u64]) -> Result<Vec<u32>> {
    values
        .iter()
        .enumerate()
        .map(|(k, &v)| {
            u32::try_from(v).map_err(|_| {
                MeshIoError::IntegerOverflow(format!(
                    "uint64 element {} ({}) has a non-zero high word",
                    k, v
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f16_table() {
        assert_eq!(f16_to_f32(0x3C00), 1.0);
        assert_eq!(f16_to_f32(0xC000), -2.0);
        assert_eq!(f16_to_f32(0x0000), 0.0);
        assert!(f16_to_f32(0x7E00).is_nan());
    }

    #[test]
    fn test_decode_big_endian_i16() {
        let arr = ScalarArray::from_bytes(ScalarType::Int16, &[0xFF, 0xFE, 0x00, 0x02], 2, Endian::Big)
            .unwrap();
        assert_eq!(arr, ScalarArray::Int16(vec![-2, 2]));
    }

    #[test]
    fn test_uint64_overflow_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u64.to_le_bytes());
        bytes.extend_from_slice(&(1u64 << 32).to_le_bytes());
        let err = ScalarArray::from_bytes(ScalarType::UInt64, &bytes, 2, Endian::Little).unwrap_err();
        assert!(matches!(err, MeshIoError::IntegerOverflow(_)));
    }

    #[test]
    fn test_uint64_narrowing() {
        let bytes = 9u64.to_le_bytes();
        let arr = ScalarArray::from_bytes(ScalarType::UInt64, &bytes, 1, Endian::Little).unwrap();
        assert_eq!(arr, ScalarArray::UInt32(vec![9]));
    }

    #[test]
    fn test_truncated_input() {
        assert!(ScalarArray::from_bytes(ScalarType::Float32, &[0, 0], 1, Endian::Little).is_err());
    }

    #[test]
    fn test_suffix_names() {
        assert_eq!(ScalarType::from_suffix("float16"), Some(ScalarType::Float16));
        assert_eq!(ScalarType::from_suffix("bool"), None);
    }
}
