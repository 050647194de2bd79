//! DSI Studio tracts (`.tt`, usually `.tt.gz`)
//!
//! The payload is a MATLAB v4 container. Each streamline record in the
//! `track` byte array is a `u32` coordinate count, an absolute `i32` XYZ
//! triple, then one signed-byte delta triple per further point. Coordinates
//! are in 1/32 voxel units.

use indexmap::IndexMap;
use nalgebra::Matrix4;

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{ByteCursor, Endian};
use crate::types::{apply_affine, ScalarArray, ScalarType, StreamlineBuilder, Tractogram};

const LE: Endian = Endian::Little;

/// One MATLAB v4 matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MatVariable {
    pub rows: usize,
    pub cols: usize,
    pub data: ScalarArray,
    /// Raw element bytes, kept for byte-stream payloads such as `track`.
    pub raw: Vec<u8>,
}

fn mat_scalar_type(precision: i32) -> Result<ScalarType> {
    Ok(match precision {
        0 => ScalarType::Float64,
        1 => ScalarType::Float32,
        2 => ScalarType::Int32,
        3 => ScalarType::Int16,
        4 => ScalarType::UInt16,
        5 => ScalarType::UInt8,
        other => {
            return Err(MeshIoError::unsupported(format!("MAT v4 precision {}", other)));
        }
    })
}

/// Read every variable of a MATLAB v4 file, keyed by name in file order.
pub fn read_mat_v4(bytes: &[u8]) -> Result<IndexMap<String, MatVariable>> {
    let mut vars = IndexMap::new();
    let mut c = ByteCursor::new(bytes);
    while c.remaining() >= 20 {
        // thousands digit of the type code selects the byte order
        let at = c.position();
        let endian = if (0..1000).contains(&c.i32_at(at, LE)?) {
            Endian::Little
        } else if (1000..2000).contains(&c.i32_at(at, Endian::Big)?) {
            Endian::Big
        } else {
            return Err(MeshIoError::unsupported(format!(
                "MAT v4 type code {}",
                c.i32_at(at, LE)?
            )));
        };
        let type_code = c.read_i32(endian)?;
        if type_code % 10 != 0 {
            return Err(MeshIoError::unsupported(format!(
                "MAT v4 matrix class {}",
                type_code % 10
            )));
        }
        let ty = mat_scalar_type((type_code / 10) % 10)?;
        let rows = c.read_count(endian)?;
        let cols = c.read_count(endian)?;
        let imaginary = c.read_i32(endian)? != 0;
        let name_len = c.read_count(endian)?;
        let name = c.read_fixed_string(name_len)?;
        let count = rows
            .checked_mul(cols)
            .ok_or_else(|| MeshIoError::malformed(format!("MAT v4 '{}' size overflows", name)))?;
        let len = count
            .checked_mul(ty.byte_size())
            .ok_or_else(|| MeshIoError::malformed(format!("MAT v4 '{}' size overflows", name)))?;
        let raw = c.read_bytes(len)?;
        if imaginary {
            c.skip(len)?;
        }
        let data = ScalarArray::from_bytes(ty, raw, count, endian)?;
        log::trace!("MAT v4 variable '{}' {}x{} {:?}", name, rows, cols, ty);
        vars.insert(
            name,
            MatVariable {
                rows,
                cols,
                data,
                raw: raw.to_vec(),
            },
        );
    }
    Ok(vars)
}

/// Decode a TT file (optionally gzip-wrapped) into MNI coordinates.
pub fn read_tt(bytes: &[u8]) -> Result<Tractogram> {
    let raw = maybe_decompress(bytes)?;
    let vars = read_mat_v4(&raw)?;
    let track = vars
        .get("track")
        .ok_or_else(|| MeshIoError::malformed("TT file has no 'track' variable"))?;
    let to_mni = match vars.get("trans_to_mni") {
        Some(v) if v.data.len() >= 16 => {
            let vals: Vec<f64> = v.data.to_f32().into_iter().map(f64::from).collect();
            Some(Matrix4::from_row_slice(&vals[..16]))
        }
        _ => None,
    };

    let mut builder = StreamlineBuilder::new();
    let mut c = ByteCursor::new(&track.raw);
    while c.remaining() >= 4 {
        let n_coords = c.read_u32(LE)? as usize;
        let n_pts = n_coords / 3;
        if n_pts == 0 {
            continue;
        }
        let mut x = c.read_i32(LE)?;
        let mut y = c.read_i32(LE)?;
        let mut z = c.read_i32(LE)?;
        builder.push_point(x as f32, y as f32, z as f32);
        for _ in 1..n_pts {
            x = x.wrapping_add(c.read_i8()? as i32);
            y = y.wrapping_add(c.read_i8()? as i32);
            z = z.wrapping_add(c.read_i8()? as i32);
            builder.push_point(x as f32, y as f32, z as f32);
        }
        builder.end_streamline()?;
    }

    let mut tract = builder.finish()?;
    for v in tract.pts.iter_mut() {
        *v /= 32.0;
    }
    match to_mni {
        Some(m) => apply_affine(&m, &mut tract.pts),
        None => tract
            .notifications
            .warn("TT file has no trans_to_mni matrix; coordinates left in voxel space"),
    }
    log::debug!(
        "TT: {} streamlines, {} points",
        tract.streamline_count(),
        tract.point_count()
    );
    tract.checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_var(out: &mut Vec<u8>, name: &str, precision: i32, rows: i32, cols: i32, data: &[u8]) {
        out.extend_from_slice(&(precision * 10).to_le_bytes());
        out.extend_from_slice(&rows.to_le_bytes());
        out.extend_from_slice(&cols.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&(name.len() as i32 + 1).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(data);
    }

    fn track_record(start: [i32; 3], deltas: &[[i8; 3]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((deltas.len() as u32 + 1) * 3).to_le_bytes());
        for v in start {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for d in deltas {
            out.extend(d.iter().map(|&v| v as u8));
        }
        out
    }

    fn tt_bytes(with_transform: bool) -> Vec<u8> {
        let mut track = track_record([32, 64, 96], &[[32, 0, -32]]);
        track.extend(track_record([0, 0, 0], &[]));
        let mut out = Vec::new();
        if with_transform {
            let mut m = Vec::new();
            // stored transposed, so row-major reading yields the translation column
            for v in [1.0f64, 0.0, 0.0, 10.0, 0.0, 1.0, 0.0, 20.0, 0.0, 0.0, 1.0, 30.0, 0.0, 0.0, 0.0, 1.0] {
                m.extend_from_slice(&v.to_le_bytes());
            }
            mat_var(&mut out, "trans_to_mni", 0, 4, 4, &m);
        }
        mat_var(&mut out, "track", 5, 1, track.len() as i32, &track);
        out
    }

    #[test]
    fn test_delta_decoding() {
        let t = read_tt(&tt_bytes(false)).unwrap();
        assert_eq!(t.offset_pt0, vec![0, 2, 3]);
        assert_eq!(&t.pts[..6], &[1.0, 2.0, 3.0, 2.0, 2.0, 2.0]);
        assert_eq!(t.notifications.len(), 1);
    }

    #[test]
    fn test_mni_transform() {
        let t = read_tt(&tt_bytes(true)).unwrap();
        assert_eq!(&t.pts[..3], &[11.0, 22.0, 33.0]);
        assert!(t.notifications.is_empty());
    }

    #[test]
    fn test_missing_track() {
        let mut out = Vec::new();
        mat_var(&mut out, "voxel_size", 1, 1, 3, &[0u8; 12]);
        assert!(read_tt(&out).is_err());
    }

    #[test]
    fn test_mat_variables() {
        let vars = read_mat_v4(&tt_bytes(true)).unwrap();
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["trans_to_mni", "track"]);
        assert_eq!(vars["trans_to_mni"].rows, 4);
    }
}
