//! FreeSurfer MGH/MGZ volumes used as per-vertex overlays

use std::sync::Arc;

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::assemble_layer;
use crate::io::layer::ctab::read_color_table;
use crate::notification::{NotificationCollection, NotificationType};
use crate::types::{LabelLut, Layer, ScalarArray, ScalarType};

const BE: Endian = Endian::Big;

/// Offset of the voxel data.
pub const MGH_HEADER_SIZE: usize = 284;

const TAG_OLD_COLORTABLE: i32 = 1;
const TAG_OLD_MGH_XFORM: i32 = 30;

/// Scan parameters (TR, flip angle, TE, TI, FoV) preceding the tags.
const SCAN_PARAMS_SIZE: usize = 20;

fn scalar_type(code: i32) -> Result<ScalarType> {
    Ok(match code {
        0 => ScalarType::UInt8,
        1 => ScalarType::Int32,
        3 => ScalarType::Float32,
        4 => ScalarType::Int16,
        other => {
            return Err(MeshIoError::unsupported(format!("MGH data type {}", other)));
        }
    })
}

/// Decode an MGH or gzip-wrapped MGZ overlay. An embedded color table in
/// the footer becomes the layer's label lookup.
pub fn read_mgh(bytes: &[u8], n_vert: usize) -> Result<Layer> {
    let raw = maybe_decompress(bytes)?;
    let c = ByteCursor::new(&raw);
    let version = c.i32_at(0, BE)?;
    if version != 1 {
        return Err(MeshIoError::malformed(format!("MGH version {} (expected 1)", version)));
    }
    let dims: Vec<usize> = (0..4)
        .map(|k| {
            let v = c.i32_at(4 + k * 4, BE)?;
            usize::try_from(v.max(1)).map_err(|_| MeshIoError::malformed("negative MGH dimension"))
        })
        .collect::<Result<_>>()?;
    let ty = scalar_type(c.i32_at(20, BE)?)?;
    let n_vert_file = dims[0]
        .checked_mul(dims[1])
        .and_then(|v| v.checked_mul(dims[2]))
        .ok_or_else(|| MeshIoError::malformed("MGH dimensions overflow"))?;
    let n_frames = dims[3];
    let count = n_vert_file
        .checked_mul(n_frames)
        .ok_or_else(|| MeshIoError::malformed("MGH dimensions overflow"))?;
    let data_len = count
        .checked_mul(ty.byte_size())
        .ok_or_else(|| MeshIoError::malformed("MGH dimensions overflow"))?;
    let payload = c.bytes_at(MGH_HEADER_SIZE, data_len)?;
    let values = ScalarArray::from_bytes(ty, payload, count, BE)?.into_f32();

    let mut notes = NotificationCollection::new();
    let lut = read_footer(&raw, MGH_HEADER_SIZE + data_len, &mut notes);

    let mut layer = assemble_layer(values, n_vert_file, n_vert)?;
    layer.notifications.extend(notes);
    Ok(layer.with_label_lut(lut))
}

/// Walk the tag chain after the data block; failures are notifications.
fn read_footer(
    raw: &[u8],
    data_end: usize,
    notes: &mut NotificationCollection,
) -> Option<Arc<LabelLut>> {
    let mut c = ByteCursor::at(raw, data_end);
    if c.skip(SCAN_PARAMS_SIZE).is_err() {
        return None;
    }
    while c.remaining() >= 4 {
        let tag = match c.read_i32(BE) {
            Ok(t) => t,
            Err(_) => break,
        };
        if tag == 0 {
            break;
        }
        if tag == TAG_OLD_COLORTABLE {
            let lut = read_color_table(&mut c).and_then(|ctab| LabelLut::build(ctab.table));
            match lut {
                Ok(lut) => return Some(Arc::new(lut)),
                Err(e) => {
                    notes.notify(NotificationType::Error, format!("MGH color table: {}", e));
                    return None;
                }
            }
        }
        let len = if tag == TAG_OLD_MGH_XFORM {
            c.read_count(BE)
        } else {
            c.read_u64(BE).and_then(|v| {
                usize::try_from(v).map_err(|_| {
                    MeshIoError::IntegerOverflow(format!("MGH tag length {}", v))
                })
            })
        };
        match len.and_then(|len| c.skip(len)) {
            Ok(()) => log::trace!("skipped MGH tag {}", tag),
            Err(e) => {
                notes.notify(NotificationType::Error, format!("MGH footer tag {}: {}", tag, e));
                break;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::layer::ctab::tests::v2_table;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn mgh_bytes(values: &[f32], frames: i32) -> Vec<u8> {
        let mut out = Vec::new();
        let width = values.len() as i32 / frames;
        for v in [1, width, 1, 1, frames, 3, 0] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.resize(MGH_HEADER_SIZE, 0);
        for v in values {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    #[test]
    fn test_float_frames() {
        let layer = read_mgh(&mgh_bytes(&[1.0, 2.0, 3.0, 4.0], 2), 2).unwrap();
        assert_eq!(layer.n_frame_4d, 2);
        assert_eq!(layer.frame(1), Some(&[3.0f32, 4.0][..]));
    }

    #[test]
    fn test_gzip_wrapper() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&mgh_bytes(&[5.0, 6.0], 1)).unwrap();
        let layer = read_mgh(&enc.finish().unwrap(), 2).unwrap();
        assert_eq!(layer.values, vec![5.0, 6.0]);
    }

    #[test]
    fn test_footer_color_table() {
        let mut bytes = mgh_bytes(&[0.0, 3.0], 1);
        bytes.extend_from_slice(&[0u8; SCAN_PARAMS_SIZE]);
        bytes.extend_from_slice(&TAG_OLD_MGH_XFORM.to_be_bytes());
        bytes.extend_from_slice(&4i32.to_be_bytes());
        bytes.extend_from_slice(b"xfm\0");
        bytes.extend_from_slice(&TAG_OLD_COLORTABLE.to_be_bytes());
        bytes.extend(v2_table(&[(0, "bg", [0, 0, 0]), (3, "roi", [200, 10, 10])]));
        let layer = read_mgh(&bytes, 2).unwrap();
        let lut = layer.colormap_label.as_ref().unwrap();
        assert_eq!(lut.label(3.0), Some("roi"));
    }

    #[test]
    fn test_bad_footer_is_not_fatal() {
        let mut bytes = mgh_bytes(&[1.0], 1);
        bytes.extend_from_slice(&[0u8; SCAN_PARAMS_SIZE]);
        bytes.extend_from_slice(&99i32.to_be_bytes());
        bytes.extend_from_slice(&1000u64.to_be_bytes());
        let layer = read_mgh(&bytes, 1).unwrap();
        assert_eq!(layer.notifications.len(), 1);
    }

    #[test]
    fn test_unsupported_type() {
        let mut bytes = mgh_bytes(&[1.0], 1);
        bytes[20..24].copy_from_slice(&9i32.to_be_bytes());
        assert!(matches!(read_mgh(&bytes, 1), Err(MeshIoError::UnsupportedFormat(_))));
    }
}
