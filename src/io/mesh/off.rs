//! Object File Format (`.off`)

use crate::error::{MeshIoError, Result};
use crate::io::mesh::{fan_triangulate, zero_based};
use crate::io::text::{LineReader, Tokens};
use crate::types::Mesh;

/// Decode an OFF file with 0-based polygon indices.
///
/// Trailing per-vertex or per-face colour values are ignored.
pub fn read_off(bytes: &[u8]) -> Result<Mesh> {
    let mut lines = LineReader::new(bytes)
        .skip_blank(true)
        .filter(|l| !l.starts_with('#'));
    let magic = lines
        .next()
        .ok_or_else(|| MeshIoError::malformed("empty OFF file"))?;
    if !magic.ends_with("OFF") {
        return Err(MeshIoError::malformed(format!("bad OFF magic '{}'", magic)));
    }
    let counts = lines
        .next()
        .ok_or_else(|| MeshIoError::malformed("OFF file has no counts line"))?;
    let mut t = Tokens::new(&counts);
    let n_vert: usize = t.next_value()?;
    let n_face: usize = t.next_value()?;

    let mut positions = Vec::new();
    for _ in 0..n_vert {
        let line = lines
            .next()
            .ok_or_else(|| MeshIoError::malformed("OFF file ends inside the vertex list"))?;
        positions.extend(Tokens::new(&line).next_f32s(3)?);
    }
    let mut indices = Vec::new();
    let mut poly = Vec::new();
    for _ in 0..n_face {
        let line = lines
            .next()
            .ok_or_else(|| MeshIoError::malformed("OFF file ends inside the face list"))?;
        let mut t = Tokens::new(&line);
        let n: usize = t.next_value()?;
        poly.clear();
        for _ in 0..n {
            poly.push(zero_based(t.next_value::<i64>()?)?);
        }
        fan_triangulate(&poly, &mut indices);
    }
    Mesh::new(positions, indices).checked()
}
