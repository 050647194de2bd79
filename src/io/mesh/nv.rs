//! BrainNet Viewer meshes (`.nv`)

use crate::error::{MeshIoError, Result};
use crate::io::mesh::one_based;
use crate::io::text::{LineReader, Tokens};
use crate::types::Mesh;

/// Decode an NV file: `#` comments, a vertex count, `x y z` rows, a
/// triangle count, then 1-based `a b c` rows.
pub fn read_nv(bytes: &[u8]) -> Result<Mesh> {
    let mut lines = LineReader::new(bytes)
        .skip_blank(true)
        .filter(|l| !l.starts_with('#'));
    let mut next = |what: &str| {
        lines.next().ok_or_else(|| {
            MeshIoError::malformed(format!("NV file ends before {}", what))
        })
    };
    let n_vert: usize = Tokens::new(&next("vertex count")?).next_value()?;
    let mut positions = Vec::with_capacity(n_vert.min(1 << 24) * 3);
    for _ in 0..n_vert {
        positions.extend(Tokens::new(&next("vertex")?).next_f32s(3)?);
    }
    let n_tri: usize = Tokens::new(&next("triangle count")?).next_value()?;
    let mut indices = Vec::new();
    for _ in 0..n_tri {
        let line = next("triangle")?;
        let mut t = Tokens::new(&line);
        for _ in 0..3 {
            indices.push(one_based(t.next_value::<i64>()?)?);
        }
    }
    Mesh::new(positions, indices).checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv() {
        let text = b"# BrainNet\n3\n0 0 0\n1 0 0\n0 1 0\n1\n1 2 3\n";
        let mesh = read_nv(text).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_truncated() {
        assert!(read_nv(b"3\n0 0 0\n1 0 0\n").is_err());
    }
}
