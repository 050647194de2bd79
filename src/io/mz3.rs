//! Surf Ice MZ3 meshes and overlays (`.mz3`)
//!
//! A 16-byte little-endian header names which blocks follow: faces,
//! vertices, per-vertex RGBA, then scalar frames. The same container
//! holds a surface, an overlay, or both.

use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::assemble_layer;
use crate::io::mesh::zero_based;
use crate::types::{ColorLookupTable, LabelLut, Layer, Mesh};

const LE: Endian = Endian::Little;

/// `MZ` read as a little-endian `u16`.
pub const MZ3_MAGIC: u16 = 0x5A4D;

pub const MZ3_HEADER_SIZE: usize = 16;

bitflags! {
    /// Blocks present in an MZ3 body.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mz3Attributes: u16 {
        /// Triangle indices.
        const FACE = 0x1;
        /// Vertex positions.
        const VERT = 0x2;
        /// Per-vertex RGBA colours.
        const RGBA = 0x4;
        /// Scalar frames.
        const SCALAR = 0x8;
        /// Scalars are float64 instead of float32.
        const DOUBLE = 0x10;
        /// Scalars hold ambient occlusion.
        const AOMAP = 0x20;
        /// RGBA block encodes atlas labels.
        const LABEL = 0x40;
    }
}

/// Decoded MZ3 blocks.
#[derive(Debug, Clone, Default)]
pub struct Mz3Contents {
    pub attributes: Mz3Attributes,
    pub n_vert: usize,
    pub indices: Vec<u32>,
    pub positions: Vec<f32>,
    /// One packed `R, G, B, A` quadruple per vertex.
    pub rgba: Vec<[u8; 4]>,
    /// Concatenated scalar frames.
    pub scalars: Vec<f32>,
}

fn checked(n: usize, by: usize) -> Result<usize> {
    n.checked_mul(by)
        .ok_or_else(|| MeshIoError::malformed("MZ3 element count overflows"))
}

/// Parse the header and every block named by its attribute flags.
pub fn parse_mz3(bytes: &[u8]) -> Result<Mz3Contents> {
    let raw = maybe_decompress(bytes)?;
    let mut c = ByteCursor::new(&raw);
    let magic = c.read_u16(LE)?;
    if magic != MZ3_MAGIC {
        return Err(MeshIoError::malformed(format!("MZ3 magic {:#06x}", magic)));
    }
    let attr_bits = c.read_u16(LE)?;
    let attributes = Mz3Attributes::from_bits_truncate(attr_bits);
    if attributes.bits() != attr_bits {
        log::debug!("MZ3: unknown attribute bits {:#x}", attr_bits & !attributes.bits());
    }
    let n_face = c.read_u32(LE)? as usize;
    let n_vert = c.read_u32(LE)? as usize;
    let n_skip = c.read_u32(LE)? as usize;
    c.skip(n_skip)?;

    let mut out = Mz3Contents {
        attributes,
        n_vert,
        ..Default::default()
    };
    if attributes.contains(Mz3Attributes::FACE) {
        out.indices = c
            .read_i32_vec(checked(n_face, 3)?, LE)?
            .into_iter()
            .map(|i| zero_based(i as i64))
            .collect::<Result<Vec<_>>>()?;
    }
    if attributes.contains(Mz3Attributes::VERT) {
        out.positions = c.read_f32_vec(checked(n_vert, 3)?, LE)?;
    }
    if attributes.contains(Mz3Attributes::RGBA) {
        out.rgba = c
            .read_bytes(checked(n_vert, 4)?)?
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]])
            .collect();
    }
    if attributes.contains(Mz3Attributes::SCALAR) && n_vert > 0 {
        let width = if attributes.contains(Mz3Attributes::DOUBLE) { 8 } else { 4 };
        let n_frames = c.remaining() / checked(n_vert, width)?;
        let count = checked(n_vert, n_frames)?;
        out.scalars = if width == 8 {
            c.read_f64_vec(count, LE)?.into_iter().map(|v| v as f32).collect()
        } else {
            c.read_f32_vec(count, LE)?
        };
    }
    log::debug!(
        "MZ3 {:?}: {} faces, {} vertices",
        attributes,
        n_face,
        n_vert
    );
    Ok(out)
}

/// Decode the surface of an MZ3 file, with vertex colours when present.
pub fn read_mz3_mesh(bytes: &[u8]) -> Result<Mesh> {
    let mz3 = parse_mz3(bytes)?;
    if !mz3
        .attributes
        .contains(Mz3Attributes::FACE | Mz3Attributes::VERT)
    {
        return Err(MeshIoError::malformed(
            "MZ3 file has no faces and vertices; it is an overlay",
        ));
    }
    let colors = (!mz3.rgba.is_empty()).then(|| {
        mz3.rgba
            .iter()
            .flat_map(|p| [p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0])
            .collect()
    });
    Mesh::new(mz3.positions, mz3.indices)
        .with_colors(colors)
        .checked()
}

/// Label table from the distinct colours of a label mesh, numbered in
/// order of first appearance, plus each vertex's label index.
fn labels_from_colors(rgba: &[[u8; 4]]) -> (ColorLookupTable, Vec<f32>) {
    let mut ids: IndexMap<[u8; 4], i32> = IndexMap::new();
    let values = rgba
        .iter()
        .map(|&c| {
            let next = ids.len() as i32;
            *ids.entry(c).or_insert(next) as f32
        })
        .collect();
    let mut table = ColorLookupTable::default();
    for (rgba, id) in ids {
        table.push(id, [rgba[0], rgba[1], rgba[2], 255], "");
    }
    (table, values)
}

/// Decode the per-vertex data of an MZ3 file as a layer.
///
/// Scalar frames are used when present; otherwise a `LABEL` file's
/// colours become label indices with a matching lookup table.
pub fn read_mz3_layer(bytes: &[u8], n_vert: usize) -> Result<Layer> {
    let mz3 = parse_mz3(bytes)?;
    if !mz3.scalars.is_empty() {
        let mut layer = assemble_layer(mz3.scalars, mz3.n_vert, n_vert)?;
        if mz3.attributes.contains(Mz3Attributes::AOMAP) {
            layer.colormap = "gray".to_string();
        }
        return Ok(layer);
    }
    if mz3.attributes.contains(Mz3Attributes::LABEL) && !mz3.rgba.is_empty() {
        let (table, values) = labels_from_colors(&mz3.rgba);
        let lut = LabelLut::build(table)?;
        return Ok(assemble_layer(values, mz3.n_vert, n_vert)?.with_label_lut(Some(Arc::new(lut))));
    }
    Err(MeshIoError::malformed("MZ3 file has no per-vertex scalars or labels"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mz3_bytes(attr: Mz3Attributes, n_face: u32, n_vert: u32, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MZ3_MAGIC.to_le_bytes());
        out.extend_from_slice(&attr.bits().to_le_bytes());
        out.extend_from_slice(&n_face.to_le_bytes());
        out.extend_from_slice(&n_vert.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn triangle_body() -> Vec<u8> {
        let mut body = Vec::new();
        for i in [0i32, 1, 2] {
            body.extend_from_slice(&i.to_le_bytes());
        }
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            body.extend_from_slice(&v.to_le_bytes());
        }
        body
    }

    #[test]
    fn test_mesh_with_colors() {
        let mut body = triangle_body();
        body.extend_from_slice(&[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255]);
        let attr = Mz3Attributes::FACE | Mz3Attributes::VERT | Mz3Attributes::RGBA;
        let mesh = read_mz3_mesh(&mz3_bytes(attr, 1, 3, &body)).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(&mesh.colors.unwrap()[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_gzipped_mesh() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let plain = mz3_bytes(Mz3Attributes::FACE | Mz3Attributes::VERT, 1, 3, &triangle_body());
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&plain).unwrap();
        let mesh = read_mz3_mesh(&enc.finish().unwrap()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_scalar_frames() {
        let mut body = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0] {
            body.extend_from_slice(&v.to_le_bytes());
        }
        let layer = read_mz3_layer(&mz3_bytes(Mz3Attributes::SCALAR, 0, 3, &body), 3).unwrap();
        assert_eq!(layer.n_frame_4d, 2);
        assert_eq!(layer.frame(1), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn test_double_scalars() {
        let mut body = Vec::new();
        for v in [0.5f64, 1.5] {
            body.extend_from_slice(&v.to_le_bytes());
        }
        let attr = Mz3Attributes::SCALAR | Mz3Attributes::DOUBLE;
        let layer = read_mz3_layer(&mz3_bytes(attr, 0, 2, &body), 2).unwrap();
        assert_eq!(layer.values, vec![0.5, 1.5]);
    }

    #[test]
    fn test_label_colors_become_lut() {
        let body = [9, 9, 9, 255, 200, 0, 0, 255, 9, 9, 9, 255];
        let attr = Mz3Attributes::RGBA | Mz3Attributes::LABEL;
        let layer = read_mz3_layer(&mz3_bytes(attr, 0, 3, &body), 3).unwrap();
        assert_eq!(layer.values, vec![0.0, 1.0, 0.0]);
        let lut = layer.colormap_label.unwrap();
        assert_eq!(lut.rgba(1.0), Some([200, 0, 0, 255]));
    }

    #[test]
    fn test_overlay_is_not_a_mesh() {
        let bytes = mz3_bytes(Mz3Attributes::SCALAR, 0, 1, &1.0f32.to_le_bytes());
        assert!(read_mz3_mesh(&bytes).is_err());
        assert!(parse_mz3(b"XX\0\0").is_err());
    }
}
