//! BrainSuite surfaces (`.dfs`)

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::mesh::zero_based;
use crate::types::Mesh;

/// Decode a DFS file.
///
/// The byte order is named in the magic (`DFS_LE`/`DFS_BE`). Triangles
/// precede vertices; the winding is flipped to counter-clockwise. A
/// non-zero vertex-colour offset adds per-vertex RGB.
pub fn read_dfs(bytes: &[u8]) -> Result<Mesh> {
    let c = ByteCursor::new(bytes);
    let endian = match c.bytes_at(0, 6)? {
        b"DFS_LE" => Endian::Little,
        b"DFS_BE" => Endian::Big,
        _ => return Err(MeshIoError::malformed("DFS file lacks DFS_LE/DFS_BE magic")),
    };
    let hdr_size = c.u32_at(12, endian)? as usize;
    let n_face = c.u32_at(24, endian)? as usize;
    let n_vert = c.u32_at(28, endian)? as usize;
    let color_offset = c.u32_at(48, endian)? as usize;

    let mut body = ByteCursor::at(bytes, hdr_size);
    let faces = body.read_i32_vec(
        n_face
            .checked_mul(3)
            .ok_or_else(|| MeshIoError::malformed("DFS face count overflows"))?,
        endian,
    )?;
    let n_coords = n_vert
        .checked_mul(3)
        .ok_or_else(|| MeshIoError::malformed("DFS vertex count overflows"))?;
    let positions = body.read_f32_vec(n_coords, endian)?;
    let indices = faces
        .into_iter()
        .map(|i| zero_based(i as i64))
        .collect::<Result<Vec<_>>>()?;
    let colors = if color_offset > 0 {
        Some(ByteCursor::at(bytes, color_offset).read_f32_vec(n_coords, endian)?)
    } else {
        None
    };

    let mut mesh = Mesh::new(positions, indices).with_colors(colors);
    mesh.flip_winding();
    mesh.checked()
}
