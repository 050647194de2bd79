//! Wavefront OBJ and the MNI `.obj` polygon format

use crate::error::{MeshIoError, Result};
use crate::io::mesh::{fan_triangulate, zero_based};
use crate::io::text::{decode_text, LineReader, Tokens};
use crate::types::Mesh;

/// Decode an `.obj` file, dispatching to the MNI variant when the first
/// token is `P`.
pub fn read_obj(bytes: &[u8]) -> Result<Mesh> {
    let text = decode_text(bytes);
    if text.split_whitespace().next() == Some("P") {
        return read_mni_obj(&text);
    }
    read_wavefront(bytes)
}

/// Resolve an OBJ face reference: positive ids are 1-based, negative ids
/// count back from the most recent vertex.
fn face_index(token: &str, n_vert: usize) -> Result<u32> {
    let first = token.split('/').next().unwrap_or(token);
    let id: i64 = first
        .parse()
        .map_err(|_| MeshIoError::malformed(format!("bad OBJ face reference '{}'", token)))?;
    match id {
        0 => Err(MeshIoError::malformed("OBJ face reference 0")),
        id if id > 0 => zero_based(id - 1),
        id => zero_based(n_vert as i64 + id),
    }
}

fn read_wavefront(bytes: &[u8]) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut poly = Vec::new();
    for line in LineReader::new(bytes).skip_blank(true) {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("v") => {
                let xyz = words
                    .take(3)
                    .map(|w| w.parse::<f32>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| MeshIoError::malformed(format!("bad OBJ vertex '{}'", line)))?;
                if xyz.len() != 3 {
                    return Err(MeshIoError::malformed(format!("bad OBJ vertex '{}'", line)));
                }
                positions.extend(xyz);
            }
            Some("f") => {
                let n_vert = positions.len() / 3;
                poly.clear();
                for w in words {
                    poly.push(face_index(w, n_vert)?);
                }
                fan_triangulate(&poly, &mut indices);
            }
            // normals, texture coordinates, groups, materials
            _ => {}
        }
    }
    Mesh::new(positions, indices).checked()
}

/// Colour block layout of an MNI polygon object.
const MNI_COLOR_ONE: i64 = 0;
const MNI_COLOR_PER_ITEM: i64 = 1;
const MNI_COLOR_PER_VERTEX: i64 = 2;

fn mni_count(n: usize, per_item: usize) -> Result<usize> {
    n.checked_mul(per_item)
        .ok_or_else(|| MeshIoError::malformed(format!("MNI object count {} overflows", n)))
}

fn read_mni_obj(text: &str) -> Result<Mesh> {
    let mut t = Tokens::new(text);
    // P, ambient, diffuse, specular, specular exponent, opacity
    t.skip(6)?;
    let n_vert: usize = t.next_value()?;
    let n_floats = mni_count(n_vert, 3)?;
    let positions = t.next_f32s(n_floats)?;
    // normals
    t.skip(n_floats)?;
    let n_items: usize = t.next_value()?;
    let color_flag: i64 = t.next_value()?;
    let n_colors = match color_flag {
        MNI_COLOR_ONE => 1,
        MNI_COLOR_PER_ITEM => n_items,
        MNI_COLOR_PER_VERTEX => n_vert,
        other => return Err(MeshIoError::malformed(format!("MNI colour flag {}", other))),
    };
    let rgba = t.next_f32s(mni_count(n_colors, 4)?)?;
    let end_indices: Vec<usize> = (0..n_items)
        .map(|_| t.next_value::<usize>())
        .collect::<Result<_>>()?;
    let n_indices = end_indices.last().copied().unwrap_or(0);
    let mut indices = Vec::new();
    for _ in 0..n_indices {
        indices.push(zero_based(t.next_value::<i64>()?)?);
    }
    if indices.len() % 3 != 0 {
        return Err(MeshIoError::malformed(format!(
            "MNI object has {} indices, not whole triangles",
            indices.len()
        )));
    }
    let colors = (color_flag == MNI_COLOR_PER_VERTEX).then(|| {
        rgba.chunks_exact(4)
            .flat_map(|c| [c[0], c[1], c[2]])
            .collect::<Vec<f32>>()
    });
    Mesh::new(positions, indices).with_colors(colors).checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavefront_relative_and_slashes() {
        let text = b"# cube corner\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\nf -4 -2 -1\n";
        let mesh = read_obj(text).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 0, 2, 3]);
    }

    #[test]
    fn test_face_reference_out_of_range() {
        assert!(read_obj(b"v 0 0 0\nf 1 2 3\n").is_err());
        assert!(read_obj(b"v 0 0 0\nf 0 1 1\n").is_err());
    }

    #[test]
    fn test_mni_polygon() {
        let text = "P 0.3 0.3 0.4 10 1 3\n0 0 0\n1 0 0\n0 1 0\n\n0 0 1\n0 0 1\n0 0 1\n\n1\n2 1 0 0 1\n0 1 0 1\n0 0 1 1\n\n3\n\n0 1 2\n";
        let mesh = read_obj(text.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.colors.unwrap()[3..6], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_mni_truncated() {
        assert!(read_obj(b"P 0.3 0.3 0.4 10 1 3\n0 0 0\n").is_err());
    }

    #[test]
    fn test_mni_count_overflow() {
        let err = read_obj(b"P 0.3 0.3 0.4 10 1 9223372036854775807 0 0 0").unwrap_err();
        assert!(matches!(err, MeshIoError::MalformedInput(_)));
    }
}
