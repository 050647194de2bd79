//! Stanford polygon files (`.ply`), ASCII and binary

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::mesh::fan_triangulate;
use crate::io::text::{decode_text, LineReader, Tokens};
use crate::types::{Mesh, ScalarType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    Binary(Endian),
}

#[derive(Debug, Clone, PartialEq)]
enum PlyProperty {
    Scalar { name: String, ty: ScalarType },
    List { name: String, count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone, PartialEq)]
struct PlyElement {
    name: String,
    count: usize,
    properties: Vec<PlyProperty>,
}

#[derive(Debug, Clone, PartialEq)]
struct PlyHeader {
    format: PlyFormat,
    elements: Vec<PlyElement>,
    /// Byte offset of the first body byte.
    body: usize,
}

fn ply_type(name: &str) -> Result<ScalarType> {
    Ok(match name {
        "char" | "int8" => ScalarType::Int8,
        "uchar" | "uint8" => ScalarType::UInt8,
        "short" | "int16" => ScalarType::Int16,
        "ushort" | "uint16" => ScalarType::UInt16,
        "int" | "int32" => ScalarType::Int32,
        "uint" | "uint32" => ScalarType::UInt32,
        "float" | "float32" => ScalarType::Float32,
        "double" | "float64" => ScalarType::Float64,
        other => return Err(MeshIoError::unsupported(format!("PLY property type '{}'", other))),
    })
}

fn parse_header(bytes: &[u8]) -> Result<PlyHeader> {
    let mut lines = LineReader::new(bytes);
    if lines.expect_line("PLY magic")? != "ply" {
        return Err(MeshIoError::malformed("PLY file lacks 'ply' magic"));
    }
    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();
    loop {
        let line = lines.expect_line("PLY end_header")?;
        let mut words = line.split_whitespace();
        match words.next() {
            Some("end_header") => break,
            Some("format") => {
                format = Some(match words.next() {
                    Some("ascii") => PlyFormat::Ascii,
                    Some("binary_little_endian") => PlyFormat::Binary(Endian::Little),
                    Some("binary_big_endian") => PlyFormat::Binary(Endian::Big),
                    other => {
                        return Err(MeshIoError::unsupported(format!("PLY format {:?}", other)));
                    }
                });
            }
            Some("element") => {
                let name = words.next().unwrap_or_default().to_string();
                let count = words
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| MeshIoError::malformed(format!("bad PLY line '{}'", line)))?;
                elements.push(PlyElement {
                    name,
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements.last_mut().ok_or_else(|| {
                    MeshIoError::malformed("PLY property declared before any element")
                })?;
                let parts: Vec<&str> = words.collect();
                let property = match parts.as_slice() {
                    ["list", count, item, name] => PlyProperty::List {
                        name: name.to_string(),
                        count: ply_type(count)?,
                        item: ply_type(item)?,
                    },
                    [ty, name] => PlyProperty::Scalar {
                        name: name.to_string(),
                        ty: ply_type(ty)?,
                    },
                    _ => return Err(MeshIoError::malformed(format!("bad PLY line '{}'", line))),
                };
                element.properties.push(property);
            }
            // comment, obj_info
            _ => {}
        }
    }
    Ok(PlyHeader {
        format: format.ok_or_else(|| MeshIoError::malformed("PLY header has no format line"))?,
        elements,
        body: lines.position(),
    })
}

/// Source of property values for one body encoding.
trait ValueSource {
    fn value(&mut self, ty: ScalarType) -> Result<f64>;
}

struct BinarySource<'a> {
    cursor: ByteCursor<'a>,
    endian: Endian,
}

impl ValueSource for BinarySource<'_> {
    fn value(&mut self, ty: ScalarType) -> Result<f64> {
        let (c, e) = (&mut self.cursor, self.endian);
        Ok(match ty {
            ScalarType::Int8 => c.read_i8()? as f64,
            ScalarType::UInt8 => c.read_u8()? as f64,
            ScalarType::Int16 => c.read_i16(e)? as f64,
            ScalarType::UInt16 => c.read_u16(e)? as f64,
            ScalarType::Int32 => c.read_i32(e)? as f64,
            ScalarType::UInt32 => c.read_u32(e)? as f64,
            ScalarType::Float32 => c.read_f32(e)? as f64,
            ScalarType::Float64 => c.read_f64(e)?,
            other => return Err(MeshIoError::unsupported(format!("PLY type {:?}", other))),
        })
    }
}

impl ValueSource for Tokens<'_> {
    fn value(&mut self, _ty: ScalarType) -> Result<f64> {
        self.next_value::<f64>()
    }
}

fn list_index(v: f64) -> Result<u32> {
    if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return Err(MeshIoError::malformed(format!("invalid PLY vertex index {}", v)));
    }
    Ok(v as u32)
}

/// `body_len` bounds the declared element counts: every row of an element
/// with properties occupies at least one body byte.
fn decode_body(header: &PlyHeader, src: &mut dyn ValueSource, body_len: usize) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut colors: Option<Vec<f32>> = None;
    let mut indices = Vec::new();
    let mut poly = Vec::new();

    for element in &header.elements {
        let is_vertex = element.name == "vertex";
        let is_face = element.name == "face";
        let slot = |name: &str| {
            element.properties.iter().position(|p| {
                matches!(p, PlyProperty::Scalar { name: n, .. } if n == name)
            })
        };
        let xyz = [slot("x"), slot("y"), slot("z")];
        let rgb = [slot("red"), slot("green"), slot("blue")];
        let has_rgb = is_vertex && rgb.iter().all(Option::is_some);
        if is_vertex && xyz.iter().any(Option::is_none) {
            return Err(MeshIoError::malformed("PLY vertex element lacks x/y/z"));
        }
        if element.properties.is_empty() {
            continue;
        }
        if element.count > body_len {
            return Err(MeshIoError::malformed(format!(
                "PLY element '{}' declares {} rows but the body holds {} bytes",
                element.name, element.count, body_len
            )));
        }
        if is_vertex {
            let floats = element
                .count
                .checked_mul(3)
                .ok_or_else(|| MeshIoError::malformed("PLY vertex count overflows"))?;
            positions.reserve(floats);
            if has_rgb {
                colors = Some(Vec::with_capacity(floats));
            }
        }
        let mut row = vec![0f64; element.properties.len()];
        for _ in 0..element.count {
            let mut face_done = false;
            for (k, property) in element.properties.iter().enumerate() {
                match property {
                    PlyProperty::Scalar { ty, .. } => row[k] = src.value(*ty)?,
                    PlyProperty::List { count, item, .. } => {
                        let n = list_index(src.value(*count)?)? as usize;
                        poly.clear();
                        for _ in 0..n {
                            poly.push(list_index(src.value(*item)?)?);
                        }
                        // first list of a face is its vertex list
                        if is_face && !face_done {
                            fan_triangulate(&poly, &mut indices);
                            face_done = true;
                        }
                    }
                }
            }
            if is_vertex {
                for s in xyz.iter().flatten() {
                    positions.push(row[*s] as f32);
                }
                if let Some(colors) = colors.as_mut() {
                    for (s, prop) in rgb.iter().flatten().map(|&s| (s, &element.properties[s])) {
                        let scale = match prop {
                            PlyProperty::Scalar {
                                ty: ScalarType::Float32 | ScalarType::Float64,
                                ..
                            } => 1.0,
                            _ => 255.0,
                        };
                        colors.push((row[s] / scale) as f32);
                    }
                }
            }
        }
    }
    Mesh::new(positions, indices).with_colors(colors).checked()
}

/// Decode a PLY file. Polygons are fan-triangulated; `red`/`green`/`blue`
/// vertex properties become per-vertex colors.
pub fn read_ply(bytes: &[u8]) -> Result<Mesh> {
    let header = parse_header(bytes)?;
    log::debug!(
        "PLY {:?}: {:?}",
        header.format,
        header
            .elements
            .iter()
            .map(|e| (e.name.as_str(), e.count))
            .collect::<Vec<_>>()
    );
    let body = bytes.get(header.body..).unwrap_or_default();
    match header.format {
        PlyFormat::Ascii => {
            let text = decode_text(body);
            let mesh = decode_body(&header, &mut Tokens::new(&text), body.len());
            mesh
        }
        PlyFormat::Binary(endian) => decode_body(
            &header,
            &mut BinarySource {
                cursor: ByteCursor::new(body),
                endian,
            },
            body.len(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_HEADER: &str = "element vertex 4\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n";

    #[test]
    fn test_ascii_quad_fan() {
        let text = format!(
            "ply\nformat ascii 1.0\ncomment test\n{}0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n",
            QUAD_HEADER
        );
        let mesh = read_ply(text.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(mesh.colors.is_none());
    }

    #[test]
    fn test_binary_big_endian() {
        let mut bytes = format!("ply\nformat binary_big_endian 1.0\n{}", QUAD_HEADER).into_bytes();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.push(3);
        for i in [0i32, 1, 2] {
            bytes.extend_from_slice(&i.to_be_bytes());
        }
        let mesh = read_ply(&bytes).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertex(2), Some([1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_colors_and_extra_element() {
        let text = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nelement face 1\nproperty list uchar int vertex_indices\nelement edge 1\nproperty int vertex1\nproperty int vertex2\nend_header\n0 0 0 255 0 0\n1 0 0 0 255 0\n0 1 0 0 0 255\n3 0 1 2\n0 1\n";
        let mesh = read_ply(text.as_bytes()).unwrap();
        let colors = mesh.colors.unwrap();
        assert_eq!(&colors[..3], &[1.0, 0.0, 0.0]);
        assert_eq!(&colors[6..], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_index_out_of_range() {
        let text = format!("ply\nformat ascii 1.0\n{}0 0 0\n1 0 0\n1 1 0\n0 1 0\n3 0 1 9\n", QUAD_HEADER);
        assert!(read_ply(text.as_bytes()).is_err());
    }

    #[test]
    fn test_oversized_element_count() {
        let text = "ply\nformat ascii 1.0\nelement vertex 4000000000000000000\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        assert!(matches!(read_ply(text.as_bytes()), Err(MeshIoError::MalformedInput(_))));
        let bin = "ply\nformat binary_little_endian 1.0\nelement vertex 18446744073709551615\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        assert!(matches!(read_ply(bin.as_bytes()), Err(MeshIoError::MalformedInput(_))));
    }

    #[test]
    fn test_missing_format() {
        assert!(read_ply(b"ply\nelement vertex 0\nend_header\n").is_err());
    }
}
