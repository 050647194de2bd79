//! NIfTI-1/NIfTI-2 images whose voxels are per-vertex values
//!
//! Surface tools write overlays as `N x 1 x 1 x T` images. The voxel grid
//! is flattened to one value per vertex and the remaining dimensions become
//! frames. NIfTI-2 files carrying a CIfTI extension are routed to
//! [`cifti`](crate::io::layer::cifti).

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::{assemble_layer, cifti};
use crate::io::options::ReaderConfiguration;
use crate::types::{Layer, ScalarArray, ScalarType};

const NIFTI1_HEADER_SIZE: i32 = 348;
const NIFTI2_HEADER_SIZE: i32 = 540;

/// Extension code of an embedded CIfTI XML document.
pub const NIFTI_ECODE_CIFTI: i32 = 32;

/// Fields of a NIfTI header needed to pull values out of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub version: u8,
    pub endian: Endian,
    /// `dim[0..8]`, with `dim[0]` the number of used dimensions.
    pub dim: [usize; 8],
    pub datatype: i16,
    pub vox_offset: usize,
    pub scl_slope: f64,
    pub scl_inter: f64,
    pub intent_code: i32,
    /// Extensions as `(ecode, payload)` pairs.
    pub extensions: Vec<(i32, Vec<u8>)>,
}

impl NiftiHeader {
    /// Parse the header, detecting the version and byte order from
    /// `sizeof_hdr`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let c = ByteCursor::new(bytes);
        let (version, endian) = [Endian::Little, Endian::Big]
            .iter()
            .find_map(|&e| match c.i32_at(0, e).ok()? {
                NIFTI1_HEADER_SIZE => Some((1u8, e)),
                NIFTI2_HEADER_SIZE => Some((2u8, e)),
                _ => None,
            })
            .ok_or_else(|| MeshIoError::malformed("not a NIfTI header (sizeof_hdr)"))?;

        let mut dim = [1usize; 8];
        let (datatype, vox_offset, scl_slope, scl_inter, intent_code, ext_at);
        if version == 1 {
            for (k, d) in dim.iter_mut().enumerate() {
                *d = c.i16_at(40 + k * 2, endian)?.max(0) as usize;
            }
            intent_code = c.i16_at(68, endian)? as i32;
            datatype = c.i16_at(70, endian)?;
            vox_offset = c.f32_at(108, endian)?.max(0.0) as usize;
            scl_slope = c.f32_at(112, endian)? as f64;
            scl_inter = c.f32_at(116, endian)? as f64;
            ext_at = NIFTI1_HEADER_SIZE as usize;
        } else {
            datatype = c.i16_at(12, endian)?;
            for (k, d) in dim.iter_mut().enumerate() {
                let v = c.i64_at(16 + k * 8, endian)?;
                *d = usize::try_from(v.max(0)).map_err(|_| {
                    MeshIoError::IntegerOverflow(format!("NIfTI dimension {}", v))
                })?;
            }
            let off = c.i64_at(168, endian)?;
            vox_offset = usize::try_from(off.max(0))
                .map_err(|_| MeshIoError::IntegerOverflow(format!("vox_offset {}", off)))?;
            scl_slope = c.f64_at(176, endian)?;
            scl_inter = c.f64_at(184, endian)?;
            intent_code = c.i32_at(504, endian)?;
            ext_at = NIFTI2_HEADER_SIZE as usize;
        }

        let extensions = read_extensions(&c, ext_at, vox_offset, endian);
        Ok(Self {
            version,
            endian,
            dim,
            datatype,
            vox_offset,
            scl_slope,
            scl_inter,
            intent_code,
            extensions,
        })
    }

    /// Element type of the voxel data.
    pub fn scalar_type(&self) -> Result<ScalarType> {
        Ok(match self.datatype {
            2 => ScalarType::UInt8,
            4 => ScalarType::Int16,
            8 => ScalarType::Int32,
            16 => ScalarType::Float32,
            64 => ScalarType::Float64,
            256 => ScalarType::Int8,
            512 => ScalarType::UInt16,
            768 => ScalarType::UInt32,
            1024 => ScalarType::Int64,
            1280 => ScalarType::UInt64,
            other => {
                return Err(MeshIoError::unsupported(format!("NIfTI datatype {}", other)));
            }
        })
    }

    /// Size of dimension `k` (1-based), treating unused dimensions as 1.
    pub fn dim_size(&self, k: usize) -> usize {
        if k > self.dim[0].min(7) {
            1
        } else {
            self.dim[k].max(1)
        }
    }

    /// Whether this is a CIfTI-2 file.
    pub fn is_cifti(&self) -> bool {
        self.version == 2
            && (3000..3100).contains(&self.intent_code)
            && self.extension(NIFTI_ECODE_CIFTI).is_some()
    }

    pub fn extension(&self, ecode: i32) -> Option<&[u8]> {
        self.extensions
            .iter()
            .find(|(code, _)| *code == ecode)
            .map(|(_, data)| data.as_slice())
    }

    /// Decode every voxel, applying the scale slope/intercept when set.
    pub fn read_values(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let ty = self.scalar_type()?;
        let count = (1..=7).try_fold(1usize, |acc, k| acc.checked_mul(self.dim_size(k)))
            .ok_or_else(|| MeshIoError::malformed("NIfTI dimensions overflow"))?;
        let payload = bytes.get(self.vox_offset..).unwrap_or(&[]);
        let mut values = ScalarArray::from_bytes(ty, payload, count, self.endian)?.into_f32();
        if self.scl_slope.is_finite()
            && self.scl_slope != 0.0
            && (self.scl_slope != 1.0 || self.scl_inter != 0.0)
        {
            let (slope, inter) = (self.scl_slope as f32, self.scl_inter as f32);
            values.iter_mut().for_each(|v| *v = *v * slope + inter);
        }
        Ok(values)
    }
}

/// Extensions follow a 4-byte extender whose first byte flags presence.
fn read_extensions(
    c: &ByteCursor<'_>,
    ext_at: usize,
    vox_offset: usize,
    endian: Endian,
) -> Vec<(i32, Vec<u8>)> {
    let mut out = Vec::new();
    if c.u8_at(ext_at).map_or(true, |flag| flag == 0) {
        return out;
    }
    let end = if vox_offset > ext_at { vox_offset } else { c.len() };
    let mut pos = ext_at + 4;
    while pos + 8 <= end {
        let (Ok(esize), Ok(ecode)) = (c.i32_at(pos, endian), c.i32_at(pos + 4, endian)) else {
            break;
        };
        let Some(esize) = usize::try_from(esize).ok().filter(|&s| s >= 8) else {
            break;
        };
        match c.bytes_at(pos + 8, esize - 8) {
            Ok(data) => out.push((ecode, data.to_vec())),
            Err(_) => break,
        }
        pos += esize;
    }
    out
}

/// Decode a NIfTI overlay (optionally gzip-wrapped).
pub fn read_nifti(bytes: &[u8], n_vert: usize, config: &ReaderConfiguration) -> Result<Layer> {
    let raw = maybe_decompress(bytes)?;
    let hdr = NiftiHeader::parse(&raw)?;
    if hdr.is_cifti() {
        return cifti::read_cifti(&hdr, &raw, n_vert, config);
    }
    let values = hdr.read_values(&raw)?;
    let n_vert_file = hdr.dim_size(1) * hdr.dim_size(2) * hdr.dim_size(3);
    log::debug!(
        "NIfTI-{} overlay: {} vertices, {} frames",
        hdr.version,
        n_vert_file,
        values.len() / n_vert_file.max(1)
    );
    assemble_layer(values, n_vert_file, n_vert)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// NIfTI-1 little-endian float32 image of shape `(n, 1, 1, frames)`.
    pub(crate) fn nifti1_bytes(values: &[f32], frames: i16, slope: f32) -> Vec<u8> {
        let mut out = vec![0u8; 352];
        out[0..4].copy_from_slice(&348i32.to_le_bytes());
        let n = values.len() as i16 / frames;
        for (k, d) in [4i16, n, 1, 1, frames].iter().enumerate() {
            out[40 + k * 2..42 + k * 2].copy_from_slice(&d.to_le_bytes());
        }
        out[70..72].copy_from_slice(&16i16.to_le_bytes());
        out[108..112].copy_from_slice(&352f32.to_le_bytes());
        out[112..116].copy_from_slice(&slope.to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_nifti1_frames() {
        let layer = read_nifti(&nifti1_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 0.0), 3, &Default::default())
            .unwrap();
        assert_eq!(layer.n_frame_4d, 2);
        assert_eq!(layer.frame(1), Some(&[4.0f32, 5.0, 6.0][..]));
    }

    #[test]
    fn test_scaling() {
        let layer = read_nifti(&nifti1_bytes(&[1.0, 2.0], 1, 2.0), 2, &Default::default()).unwrap();
        assert_eq!(layer.values, vec![2.0, 4.0]);
    }

    #[test]
    fn test_big_endian_header_detected() {
        let mut bytes = vec![0u8; 352];
        bytes[0..4].copy_from_slice(&348i32.to_be_bytes());
        for (k, d) in [1i16, 2].iter().enumerate() {
            bytes[40 + k * 2..42 + k * 2].copy_from_slice(&d.to_be_bytes());
        }
        bytes[70..72].copy_from_slice(&4i16.to_be_bytes());
        bytes[108..112].copy_from_slice(&352f32.to_be_bytes());
        bytes.extend_from_slice(&(-7i16).to_be_bytes());
        bytes.extend_from_slice(&9i16.to_be_bytes());
        let hdr = NiftiHeader::parse(&bytes).unwrap();
        assert_eq!(hdr.endian, Endian::Big);
        assert_eq!(hdr.read_values(&bytes).unwrap(), vec![-7.0, 9.0]);
    }

    #[test]
    fn test_rejects_non_nifti() {
        assert!(NiftiHeader::parse(&[0u8; 400]).is_err());
    }
}
