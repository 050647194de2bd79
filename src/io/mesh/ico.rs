//! FreeSurfer icosahedron text meshes (`.ico`, `.tri`)

use crate::error::{MeshIoError, Result};
use crate::io::mesh::one_based;
use crate::io::text::{LineReader, Tokens};
use crate::types::Mesh;

/// Decode an ICO/TRI file: a vertex count, numbered `id x y z` rows, a
/// triangle count, then numbered `id a b c` rows with 1-based corners.
pub fn read_ico(bytes: &[u8]) -> Result<Mesh> {
    let mut lines = LineReader::new(bytes).skip_blank(true);
    let n_vert: usize = Tokens::new(&lines.expect_line("ICO vertex count")?).next_value()?;
    let mut positions = Vec::new();
    for _ in 0..n_vert {
        let line = lines.expect_line("ICO vertex")?;
        let mut t = Tokens::new(&line);
        t.skip(1)?;
        positions.extend(t.next_f32s(3)?);
    }
    let n_tri: usize = Tokens::new(&lines.expect_line("ICO triangle count")?).next_value()?;
    let mut indices = Vec::new();
    for _ in 0..n_tri {
        let line = lines.expect_line("ICO triangle")?;
        let mut t = Tokens::new(&line);
        t.skip(1)?;
        for _ in 0..3 {
            indices.push(one_based(t.next_value::<i64>()?)?);
        }
    }
    if positions.is_empty() {
        return Err(MeshIoError::malformed("ICO file has no vertices"));
    }
    Mesh::new(positions, indices).checked()
}
