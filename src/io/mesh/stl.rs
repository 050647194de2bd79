//! Stereolithography meshes, binary and ASCII

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::text::{LineReader, Tokens};
use crate::types::Mesh;

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

/// True when `bytes` has the exact size of a binary STL with its declared
/// triangle count.
fn is_binary(bytes: &[u8]) -> bool {
    let Ok(n) = ByteCursor::new(bytes).u32_at(HEADER_LEN, Endian::Little) else {
        return false;
    };
    (n as usize)
        .checked_mul(RECORD_LEN)
        .and_then(|b| b.checked_add(HEADER_LEN + 4))
        == Some(bytes.len())
}

/// Decode an STL file. Vertices are not shared: triangle `t` uses vertices
/// `3t..3t+3`.
///
/// A file starting with `solid` is ASCII unless its size matches the binary
/// layout exactly, since some exporters write `solid` into binary headers.
pub fn read_stl(bytes: &[u8]) -> Result<Mesh> {
    if bytes.starts_with(b"solid") && !is_binary(bytes) {
        return read_ascii(bytes);
    }
    read_binary(bytes)
}

fn identity_indices(n_vert: usize) -> Result<Vec<u32>> {
    let n = u32::try_from(n_vert)
        .map_err(|_| MeshIoError::IntegerOverflow(format!("{} STL vertices", n_vert)))?;
    Ok((0..n).collect())
}

fn read_binary(bytes: &[u8]) -> Result<Mesh> {
    let mut c = ByteCursor::at(bytes, HEADER_LEN);
    let n_tri = c.read_u32(Endian::Little)? as usize;
    let need = n_tri
        .checked_mul(RECORD_LEN)
        .and_then(|b| b.checked_add(HEADER_LEN + 4))
        .ok_or_else(|| MeshIoError::malformed("STL triangle count overflows"))?;
    if bytes.len() < need {
        return Err(MeshIoError::malformed(format!(
            "binary STL declares {} triangles ({} bytes) but has {} bytes",
            n_tri,
            need,
            bytes.len()
        )));
    }
    let mut positions = Vec::with_capacity(n_tri * 9);
    for _ in 0..n_tri {
        // facet normal
        c.skip(12)?;
        positions.extend(c.read_f32_vec(9, Endian::Little)?);
        // attribute byte count
        c.skip(2)?;
    }
    Mesh::new(positions, identity_indices(n_tri * 3)?).checked()
}

fn read_ascii(bytes: &[u8]) -> Result<Mesh> {
    let mut positions = Vec::new();
    for line in LineReader::new(bytes).skip_blank(true) {
        if let Some(rest) = line.strip_prefix("vertex") {
            positions.extend(Tokens::new(rest).next_f32s(3)?);
        }
    }
    let n_vert = positions.len() / 3;
    if n_vert == 0 || n_vert % 3 != 0 {
        return Err(MeshIoError::malformed(format!(
            "ASCII STL has {} vertices, not whole triangles",
            n_vert
        )));
    }
    Mesh::new(positions, identity_indices(n_vert)?).checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        let text = b"solid t\nfacet normal 0 0 1\n outer loop\n  vertex 0 0 0\n  vertex 1 0 0\n  vertex 0 1 0\n endloop\nendfacet\nendsolid t\n";
        let mesh = read_stl(text).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertex(1), Some([1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_binary_with_solid_header() {
        let mut bytes = b"solid but binary".to_vec();
        bytes.resize(80, 0);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        let mesh = read_stl(&bytes).unwrap();
        assert_eq!(mesh.positions.len(), 9);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_binary_truncated() {
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 50]);
        assert!(read_stl(&bytes).is_err());
    }

    #[test]
    fn test_ascii_partial_triangle() {
        assert!(read_stl(b"solid x\nvertex 0 0 0\nvertex 1 1 1\nendsolid\n").is_err());
    }
}
