//! BrainVoyager surfaces (`.srf`)

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::mesh::zero_based;
use crate::types::Mesh;

const LE: Endian = Endian::Little;

/// Centre of the 256³ BrainVoyager volume space.
const VOLUME_CENTER: f32 = 128.0;

/// Packed colour value meaning "use the convex curvature colour".
const CONVEX_SENTINEL: u32 = 0;
/// Packed colour value meaning "use the concave curvature colour".
const CONCAVE_SENTINEL: u32 = 1;

fn unpack_color(packed: u32, convex: [f32; 3], concave: [f32; 3]) -> [f32; 3] {
    match packed {
        CONVEX_SENTINEL => convex,
        CONCAVE_SENTINEL => concave,
        v => [
            ((v >> 16) & 0xFF) as f32 / 255.0,
            ((v >> 8) & 0xFF) as f32 / 255.0,
            (v & 0xFF) as f32 / 255.0,
        ],
    }
}

/// Decode an SRF surface.
///
/// Coordinates are stored as separate X, Y and Z planes in BrainVoyager
/// volume axes and are remapped to Talairach space:
/// `(128 - z, 128 - x, 128 - y)`. Per-vertex colours resolve the two
/// curvature sentinels before unpacking RGB.
pub fn read_srf(bytes: &[u8]) -> Result<Mesh> {
    let raw = maybe_decompress(bytes)?;
    let mut c = ByteCursor::new(&raw);
    let version = c.read_f32(LE)?;
    if !(1.0..=10.0).contains(&version) {
        return Err(MeshIoError::malformed(format!(
            "SRF version {} (is the file big-endian?)",
            version
        )));
    }
    // reserved
    c.skip(4)?;
    let n_vert = c.read_count(LE)?;
    let n_tri = c.read_count(LE)?;
    // mesh centre
    c.skip(12)?;
    let xs = c.read_f32_vec(n_vert, LE)?;
    let ys = c.read_f32_vec(n_vert, LE)?;
    let zs = c.read_f32_vec(n_vert, LE)?;
    // normals
    c.skip(
        n_vert
            .checked_mul(12)
            .ok_or_else(|| MeshIoError::malformed("SRF vertex count overflows"))?,
    )?;
    let convex = c.read_f32_vec(4, LE)?;
    let concave = c.read_f32_vec(4, LE)?;
    let packed = c.read_u32_vec(n_vert, LE)?;
    for _ in 0..n_vert {
        let n_neighbors = c.read_count(LE)?;
        c.skip(
            n_neighbors
                .checked_mul(4)
                .ok_or_else(|| MeshIoError::malformed("SRF neighbour count overflows"))?,
        )?;
    }
    let faces = c.read_i32_vec(
        n_tri
            .checked_mul(3)
            .ok_or_else(|| MeshIoError::malformed("SRF triangle count overflows"))?,
        LE,
    )?;

    let mut positions = Vec::with_capacity(n_vert * 3);
    for ((x, y), z) in xs.iter().zip(&ys).zip(&zs) {
        positions.extend_from_slice(&[
            VOLUME_CENTER - z,
            VOLUME_CENTER - x,
            VOLUME_CENTER - y,
        ]);
    }
    let convex = [convex[0], convex[1], convex[2]];
    let concave = [concave[0], concave[1], concave[2]];
    let colors: Vec<f32> = packed
        .iter()
        .flat_map(|&p| unpack_color(p, convex, concave))
        .collect();
    let indices = faces
        .into_iter()
        .map(|i| zero_based(i as i64))
        .collect::<Result<Vec<_>>>()?;
    log::debug!("SRF v{}: {} vertices, {} triangles", version, n_vert, n_tri);
    Mesh::new(positions, indices)
        .with_colors(Some(colors))
        .checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn srf_bytes(packed: [u32; 3]) -> Vec<u8> {
        let mut out = Vec::new();
        let f = |out: &mut Vec<u8>, vals: &[f32]| {
            for v in vals {
                out.extend_from_slice(&v.to_le_bytes());
            }
        };
        f(&mut out, &[4.0]);
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&3i32.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes());
        f(&mut out, &[128.0; 3]);
        f(&mut out, &[100.0, 101.0, 102.0]);
        f(&mut out, &[110.0, 111.0, 112.0]);
        f(&mut out, &[120.0, 121.0, 122.0]);
        f(&mut out, &[0.0; 9]);
        f(&mut out, &[0.3, 0.3, 0.3, 1.0]);
        f(&mut out, &[0.6, 0.6, 0.6, 1.0]);
        for p in packed {
            out.extend_from_slice(&p.to_le_bytes());
        }
        for _ in 0..3 {
            out.extend_from_slice(&2i32.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
        }
        for i in [0i32, 1, 2] {
            out.extend_from_slice(&i.to_le_bytes());
        }
        // strips and MTC name, ignored
        out.extend_from_slice(&0i32.to_le_bytes());
        out.push(0);
        out
    }

    #[test]
    fn test_axis_remap() {
        let mesh = read_srf(&srf_bytes([0, 1, 0x00FF_0000])).unwrap();
        assert_eq!(mesh.vertex(0), Some([8.0, 28.0, 18.0]));
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_color_sentinels() {
        let mesh = read_srf(&srf_bytes([0, 1, 0x00FF_0000])).unwrap();
        let colors = mesh.colors.unwrap();
        assert_eq!(&colors[..3], &[0.3, 0.3, 0.3]);
        assert_eq!(&colors[3..6], &[0.6, 0.6, 0.6]);
        assert_eq!(&colors[6..], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_truncated() {
        let bytes = srf_bytes([0, 0, 0]);
        assert!(read_srf(&bytes[..60]).is_err());
    }
}
