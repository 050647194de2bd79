//! MOVIE.BYU geometry (`.geo`, `.byu`)

use crate::error::{MeshIoError, Result};
use crate::io::mesh::{fan_triangulate, one_based};
use crate::io::text::{decode_text, Tokens};
use crate::types::Mesh;

/// Decode a BYU file.
///
/// The header gives part, vertex, polygon and edge counts. Polygon
/// connectivity is a stream of 1-based ids where a negated id closes the
/// current polygon.
pub fn read_geo(bytes: &[u8]) -> Result<Mesh> {
    let text = decode_text(bytes);
    let mut t = Tokens::new(&text);
    let n_parts: usize = t.next_value()?;
    let n_vert: usize = t.next_value()?;
    let n_poly: usize = t.next_value()?;
    let n_edges: usize = t.next_value()?;
    // first and last polygon of each part
    let overflow = || MeshIoError::malformed("BYU header count overflows");
    t.skip(n_parts.checked_mul(2).ok_or_else(overflow)?)?;
    let positions = t.next_f32s(n_vert.checked_mul(3).ok_or_else(overflow)?)?;

    let mut indices = Vec::new();
    let mut poly = Vec::new();
    let mut closed = 0usize;
    for _ in 0..n_edges {
        let id: i64 = t.next_value()?;
        poly.push(one_based(id.abs())?);
        if id < 0 {
            fan_triangulate(&poly, &mut indices);
            poly.clear();
            closed += 1;
        }
    }
    if !poly.is_empty() {
        return Err(MeshIoError::malformed("BYU connectivity ends inside a polygon"));
    }
    let mut mesh = Mesh::new(positions, indices);
    if closed != n_poly {
        mesh.notifications.warn(format!(
            "BYU header declares {} polygons, found {}",
            n_poly, closed
        ));
    }
    mesh.checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_and_triangle() {
        let text = b"1 5 2 7\n1 2\n0 0 0 1 0 0 1 1 0 0 1 0\n2 2 2\n1 2 3 -4\n2 5 -3\n";
        let mesh = read_geo(text).unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 1, 4, 2]);
    }

    #[test]
    fn test_unterminated_polygon() {
        assert!(read_geo(b"1 3 1 3\n1 1\n0 0 0 1 0 0 0 1 0\n1 2 3\n").is_err());
    }
}
