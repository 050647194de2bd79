//! FreeSurfer surfaces: binary triangle files and their ASCII export

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{find_bytes, ByteCursor, Endian};
use crate::io::mesh::zero_based;
use crate::io::text::{decode_text, LineReader, Tokens};
use crate::types::Mesh;

const BE: Endian = Endian::Big;

/// Triangle-file magic.
pub const TRIANGLE_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFE];

/// Centre RAS offset from the `cras = x y z` line of the volume-geometry
/// footer, if present.
fn cras_offset(footer: &[u8]) -> Option<[f32; 3]> {
    let at = find_bytes(footer, b"cras", 0)?;
    let text = decode_text(&footer[at..]);
    let line = text.lines().next()?;
    let (_, values) = line.split_once('=')?;
    let mut t = Tokens::new(values);
    let xyz = t.next_f32s(3).ok()?;
    Some([xyz[0], xyz[1], xyz[2]])
}

/// Decode a FreeSurfer binary surface (`lh.pial`, `rh.white`, ...).
///
/// Triangles are stored clockwise and are flipped; a `cras` footer
/// translation is added to every vertex.
pub fn read_freesurfer(bytes: &[u8]) -> Result<Mesh> {
    let raw = maybe_decompress(bytes)?;
    let c = ByteCursor::new(&raw);
    if c.bytes_at(0, 3)? != TRIANGLE_MAGIC {
        return Err(MeshIoError::malformed("FreeSurfer surface lacks FFFFFE magic"));
    }
    // "created by ... on ...\n\n"
    let newline = c
        .find_byte(b'\n', 3)
        .ok_or_else(|| MeshIoError::malformed("FreeSurfer creator line is unterminated"))?;
    let mut c = ByteCursor::at(&raw, newline + 2);
    let n_vert = c.read_count(BE)?;
    let n_face = c.read_count(BE)?;
    let positions = c.read_f32_vec(
        n_vert
            .checked_mul(3)
            .ok_or_else(|| MeshIoError::malformed("vertex count overflows"))?,
        BE,
    )?;
    let faces = c.read_i32_vec(
        n_face
            .checked_mul(3)
            .ok_or_else(|| MeshIoError::malformed("face count overflows"))?,
        BE,
    )?;
    let indices = faces
        .into_iter()
        .map(|i| zero_based(i as i64))
        .collect::<Result<Vec<_>>>()?;

    let mut mesh = Mesh::new(positions, indices);
    mesh.flip_winding();
    if let Some(cras) = cras_offset(&raw[c.position()..]) {
        log::debug!("FreeSurfer surface cras offset {:?}", cras);
        for p in mesh.positions.chunks_exact_mut(3) {
            p[0] += cras[0];
            p[1] += cras[1];
            p[2] += cras[2];
        }
    }
    mesh.checked()
}

/// Decode a FreeSurfer ASCII surface (`.asc`): a comment line, vertex and
/// face counts, `x y z flag` rows, then 0-based `a b c flag` rows.
pub fn read_asc(bytes: &[u8]) -> Result<Mesh> {
    let mut lines = LineReader::new(bytes)
        .skip_blank(true)
        .filter(|l| !l.starts_with('#'));
    let mut next = |what: &str| {
        lines
            .next()
            .ok_or_else(|| MeshIoError::malformed(format!("ASC file ends before {}", what)))
    };
    let counts = next("counts")?;
    let mut t = Tokens::new(&counts);
    let n_vert: usize = t.next_value()?;
    let n_face: usize = t.next_value()?;
    let mut positions = Vec::new();
    for _ in 0..n_vert {
        positions.extend(Tokens::new(&next("vertex")?).next_f32s(3)?);
    }
    let mut indices = Vec::new();
    for _ in 0..n_face {
        let line = next("face")?;
        let mut t = Tokens::new(&line);
        for _ in 0..3 {
            indices.push(zero_based(t.next_value::<i64>()?)?);
        }
    }
    let mut mesh = Mesh::new(positions, indices);
    mesh.flip_winding();
    mesh.checked()
}
