//! VRML 2.0 meshes (`.wrl`)

use crate::error::{MeshIoError, Result};
use crate::io::mesh::{fan_triangulate, zero_based};
use crate::io::text::{decode_text, parse_numbers};
use crate::types::Mesh;

/// Contents of the first `[...]` list following `keyword` at or after
/// `from`, with the offset just past its closing bracket.
fn bracket_list<'a>(text: &'a str, keyword: &str, from: usize) -> Option<(&'a str, usize)> {
    let at = text.get(from..)?.find(keyword)? + from;
    let open = text[at..].find('[')? + at;
    let close = text[open..].find(']')? + open;
    Some((&text[open + 1..close], close + 1))
}

/// Decode the first `IndexedFaceSet` of a VRML file.
///
/// Points come from `coord Coordinate { point [...] }`, polygons from
/// `coordIndex [...]` with `-1` separators. A `color Color { color [...] }`
/// block is kept only when it holds one RGB triple per vertex.
pub fn read_wrl(bytes: &[u8]) -> Result<Mesh> {
    let text = decode_text(bytes);
    let coord = text
        .find("Coordinate")
        .ok_or_else(|| MeshIoError::malformed("VRML file has no Coordinate node"))?;
    let (points, _) = bracket_list(&text, "point", coord)
        .ok_or_else(|| MeshIoError::malformed("VRML Coordinate node has no point list"))?;
    let positions: Vec<f32> = parse_numbers(points)?;
    let (coord_index, _) = bracket_list(&text, "coordIndex", 0)
        .ok_or_else(|| MeshIoError::malformed("VRML file has no coordIndex list"))?;

    let mut indices = Vec::new();
    let mut poly = Vec::new();
    for id in parse_numbers::<i64>(coord_index)? {
        if id < 0 {
            fan_triangulate(&poly, &mut indices);
            poly.clear();
        } else {
            poly.push(zero_based(id)?);
        }
    }
    fan_triangulate(&poly, &mut indices);

    let mut mesh = Mesh::new(positions, indices);
    if let Some(node) = text.find("Color {").or_else(|| text.find("Color{")) {
        if let Some((list, _)) = bracket_list(&text, "color", node + "Color".len()) {
            let colors: Vec<f32> = parse_numbers(list)?;
            if colors.len() == mesh.positions.len() {
                mesh.colors = Some(colors);
            } else {
                mesh.notifications.warn(format!(
                    "VRML colour list has {} values for {} vertices; ignored",
                    colors.len(),
                    mesh.vertex_count()
                ));
            }
        }
    }
    mesh.checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "#VRML V2.0 utf8\nShape {\n geometry IndexedFaceSet {\n  coord Coordinate {\n   point [ 0 0 0, 1 0 0, 1 1 0, 0 1 0 ]\n  }\n  coordIndex [ 0, 1, 2, 3, -1 ]\n  COLOR\n }\n}\n";

    #[test]
    fn test_square_with_colors() {
        let text = SQUARE.replace(
            "COLOR",
            "color Color { color [ 1 0 0, 0 1 0, 0 0 1, 1 1 1 ] }",
        );
        let mesh = read_wrl(text.as_bytes()).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.colors.as_ref().map(Vec::len), Some(12));
    }

    #[test]
    fn test_short_color_block_discarded() {
        let text = SQUARE.replace("COLOR", "color Color { color [ 1 0 0 ] }");
        let mesh = read_wrl(text.as_bytes()).unwrap();
        assert!(mesh.colors.is_none());
        assert_eq!(mesh.notifications.len(), 1);
    }

    #[test]
    fn test_missing_points() {
        assert!(read_wrl(b"#VRML V2.0 utf8\ncoordIndex [ 0 1 2 -1 ]").is_err());
    }
}
