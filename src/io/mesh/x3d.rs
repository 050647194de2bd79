//! X3D scenes (`.x3d`), flattened into one triangle mesh
//!
//! Only the XML subset used by surface exporters is walked: nested
//! `Transform` nodes, `Shape`/`Appearance`/`Material` colour state with
//! `DEF`/`USE` reuse, the three indexed geometry nodes, and the `Sphere`
//! and `Cylinder` primitives.

use std::collections::HashMap;
use std::f64::consts::PI;

use indexmap::IndexMap;
use nalgebra::{Matrix4, Rotation3, Unit, Vector3, Vector4};

use crate::error::{MeshIoError, Result};
use crate::io::mesh::{fan_triangulate, strip_triangulate, zero_based};
use crate::io::text::{parse_numbers, Tag, TagReader};
use crate::types::Mesh;

/// X3D default `Material.diffuseColor`.
const DEFAULT_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

/// Subdivision order used for `Sphere` nodes.
pub const SPHERE_ORDER: u32 = 2;
/// Side segments used for `Cylinder` nodes.
pub const CYLINDER_SEGMENTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryKind {
    FaceSet,
    TriangleSet,
    TriangleStripSet,
}

impl GeometryKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "IndexedFaceSet" => Some(GeometryKind::FaceSet),
            "IndexedTriangleSet" => Some(GeometryKind::TriangleSet),
            "IndexedTriangleStripSet" => Some(GeometryKind::TriangleStripSet),
            _ => None,
        }
    }
}

/// Geometry node collected until its closing tag.
#[derive(Debug)]
struct PendingGeometry {
    kind: GeometryKind,
    index: Vec<i64>,
    ccw: bool,
    points: Vec<f32>,
    colors: Option<Vec<f32>>,
}

impl PendingGeometry {
    fn triangles(&self) -> Result<Vec<u32>> {
        let mut out = Vec::new();
        let mut run = Vec::new();
        let flush = |run: &mut Vec<u32>, out: &mut Vec<u32>| {
            match self.kind {
                GeometryKind::FaceSet => fan_triangulate(run, out),
                GeometryKind::TriangleStripSet => strip_triangulate(run, out),
                GeometryKind::TriangleSet => out.extend_from_slice(run),
            }
            run.clear();
        };
        for &id in &self.index {
            if id < 0 {
                flush(&mut run, &mut out);
            } else {
                run.push(zero_based(id)?);
            }
        }
        flush(&mut run, &mut out);
        if out.len() % 3 != 0 {
            return Err(MeshIoError::malformed(format!(
                "X3D {:?} index list is not whole triangles",
                self.kind
            )));
        }
        if !self.ccw {
            for tri in out.chunks_exact_mut(3) {
                tri.swap(0, 1);
            }
        }
        Ok(out)
    }
}

/// Accumulates transformed shapes into one mesh.
#[derive(Debug, Default)]
struct SceneBuilder {
    positions: Vec<f32>,
    indices: Vec<u32>,
    colors: Vec<f32>,
    colored: bool,
}

impl SceneBuilder {
    fn add(
        &mut self,
        points: &[f32],
        triangles: &[u32],
        m: &Matrix4<f64>,
        colors: Option<&[f32]>,
        color: [f32; 3],
    ) -> Result<()> {
        let base = u32::try_from(self.positions.len() / 3)
            .map_err(|_| MeshIoError::IntegerOverflow("X3D scene exceeds 32-bit indices".into()))?;
        let n = points.len() / 3;
        if let Some(&bad) = triangles.iter().find(|&&i| i as usize >= n) {
            return Err(MeshIoError::malformed(format!(
                "X3D index {} out of range for {} points",
                bad, n
            )));
        }
        for p in points.chunks_exact(3) {
            let v = m * Vector4::new(p[0] as f64, p[1] as f64, p[2] as f64, 1.0);
            self.positions.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
        }
        match colors {
            Some(c) if c.len() == points.len() => self.colors.extend_from_slice(c),
            _ => {
                for _ in 0..n {
                    self.colors.extend_from_slice(&color);
                }
            }
        }
        self.indices.extend(triangles.iter().map(|&i| i + base));
        Ok(())
    }

    fn finish(self) -> Result<Mesh> {
        let colors = self.colored.then_some(self.colors);
        Mesh::new(self.positions, self.indices)
            .with_colors(colors)
            .checked()
    }
}

fn numbers(tag: &Tag<'_>, name: &str) -> Result<Option<Vec<f64>>> {
    tag.attribute(name).map(parse_numbers::<f64>).transpose()
}

fn vec3(tag: &Tag<'_>, name: &str, default: Vector3<f64>) -> Result<Vector3<f64>> {
    Ok(match numbers(tag, name)? {
        Some(v) if v.len() >= 3 => Vector3::new(v[0], v[1], v[2]),
        _ => default,
    })
}

/// Local matrix of a `Transform` node: `T * C * R * S * -C`.
fn local_transform(tag: &Tag<'_>) -> Result<Matrix4<f64>> {
    let translation = vec3(tag, "translation", Vector3::zeros())?;
    let center = vec3(tag, "center", Vector3::zeros())?;
    let scale = vec3(tag, "scale", Vector3::new(1.0, 1.0, 1.0))?;
    let rotation = match numbers(tag, "rotation")? {
        Some(r) if r.len() >= 4 && Vector3::new(r[0], r[1], r[2]).norm() > 0.0 => {
            let axis = Unit::new_normalize(Vector3::new(r[0], r[1], r[2]));
            Rotation3::from_axis_angle(&axis, r[3]).to_homogeneous()
        }
        _ => Matrix4::identity(),
    };
    Ok(Matrix4::new_translation(&translation)
        * Matrix4::new_translation(&center)
        * rotation
        * Matrix4::new_nonuniform_scaling(&scale)
        * Matrix4::new_translation(&-center))
}

/// Unit icosphere with `order` midpoint subdivisions, counter-clockwise
/// outward-facing triangles.
pub fn icosphere(order: u32) -> (Vec<f32>, Vec<u32>) {
    let t = (1.0 + 5f64.sqrt()) / 2.0;
    let mut verts: Vec<Vector3<f64>> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|v| Vector3::new(v[0], v[1], v[2]).normalize())
    .collect();
    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];
    for _ in 0..order {
        let mut cache: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, verts: &mut Vec<Vector3<f64>>| -> u32 {
            let key = (a.min(b), a.max(b));
            *cache.entry(key).or_insert_with(|| {
                let m = (verts[a as usize] + verts[b as usize]).normalize();
                verts.push(m);
                (verts.len() - 1) as u32
            })
        };
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut verts);
            let bc = midpoint(b, c, &mut verts);
            let ca = midpoint(c, a, &mut verts);
            next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }
    let positions = verts
        .iter()
        .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
        .collect();
    (positions, faces.into_iter().flatten().collect())
}

/// Capped cylinder along Y centred on the origin.
pub fn cylinder(radius: f32, height: f32, segments: usize) -> (Vec<f32>, Vec<u32>) {
    let n = segments as u32;
    let half = height / 2.0;
    let mut positions = Vec::with_capacity((segments * 2 + 2) * 3);
    for y in [-half, half] {
        for k in 0..segments {
            let theta = 2.0 * PI * k as f64 / segments as f64;
            positions.extend_from_slice(&[
                radius * theta.cos() as f32,
                y,
                radius * theta.sin() as f32,
            ]);
        }
    }
    let (bottom_center, top_center) = (2 * n, 2 * n + 1);
    positions.extend_from_slice(&[0.0, -half, 0.0, 0.0, half, 0.0]);
    let mut indices = Vec::with_capacity(segments * 12);
    for k in 0..n {
        let k1 = (k + 1) % n;
        let (b0, b1, t0, t1) = (k, k1, k + n, k1 + n);
        indices.extend_from_slice(&[b0, t0, b1, b1, t0, t1]);
        indices.extend_from_slice(&[top_center, t1, t0]);
        indices.extend_from_slice(&[bottom_center, b0, b1]);
    }
    (positions, indices)
}

/// Decode an X3D scene into a single mesh. Colours are attached when any
/// shape carries a material or colour node.
pub fn read_x3d(bytes: &[u8]) -> Result<Mesh> {
    let mut stack = vec![Matrix4::<f64>::identity()];
    let mut appearances: IndexMap<String, [f32; 3]> = IndexMap::new();
    let mut materials: IndexMap<String, [f32; 3]> = IndexMap::new();
    let mut appearance_def: Option<String> = None;
    let mut color = DEFAULT_COLOR;
    let mut geometry: Option<PendingGeometry> = None;
    let mut scene = SceneBuilder::default();
    let mut n_shapes = 0usize;

    for tag in TagReader::new(bytes) {
        if tag.is_declaration() {
            continue;
        }
        let name = tag.name().to_string();
        let m = stack.last().copied().unwrap_or_else(Matrix4::identity);
        if tag.is_closing() {
            match name.as_str() {
                "Transform" if stack.len() > 1 => {
                    stack.pop();
                }
                "Appearance" => {
                    if let Some(def) = appearance_def.take() {
                        appearances.insert(def, color);
                    }
                }
                n if GeometryKind::from_name(n).is_some() || n == "Shape" => {
                    if let Some(g) = geometry.take() {
                        let tris = g.triangles()?;
                        scene.add(&g.points, &tris, &m, g.colors.as_deref(), color)?;
                        n_shapes += 1;
                    }
                }
                _ => {}
            }
            continue;
        }
        match name.as_str() {
            "Transform" if !tag.is_self_closing() => stack.push(m * local_transform(&tag)?),
            "Shape" => color = DEFAULT_COLOR,
            "Appearance" => {
                if let Some(used) = tag.attribute("USE") {
                    color = appearances.get(used).copied().unwrap_or(DEFAULT_COLOR);
                    scene.colored = true;
                } else {
                    appearance_def = tag.attribute("DEF").map(str::to_string);
                }
            }
            "Material" => {
                if let Some(used) = tag.attribute("USE") {
                    color = materials.get(used).copied().unwrap_or(DEFAULT_COLOR);
                } else if let Some(c) = numbers(&tag, "diffuseColor")? {
                    if c.len() >= 3 {
                        color = [c[0] as f32, c[1] as f32, c[2] as f32];
                    }
                }
                if let Some(def) = tag.attribute("DEF") {
                    materials.insert(def.to_string(), color);
                }
                scene.colored = true;
            }
            "Coordinate" => {
                if let (Some(g), Some(p)) = (geometry.as_mut(), tag.attribute("point")) {
                    g.points = parse_numbers(p)?;
                }
            }
            "Color" => {
                if let (Some(g), Some(c)) = (geometry.as_mut(), tag.attribute("color")) {
                    g.colors = Some(parse_numbers(c)?);
                    scene.colored = true;
                }
            }
            "Sphere" => {
                let radius = tag.numeric_attribute::<f32>("radius").unwrap_or(1.0);
                let (mut pts, tris) = icosphere(SPHERE_ORDER);
                pts.iter_mut().for_each(|v| *v *= radius);
                scene.add(&pts, &tris, &m, None, color)?;
                n_shapes += 1;
            }
            "Cylinder" => {
                let radius = tag.numeric_attribute::<f32>("radius").unwrap_or(1.0);
                let height = tag.numeric_attribute::<f32>("height").unwrap_or(2.0);
                let (pts, tris) = cylinder(radius, height, CYLINDER_SEGMENTS);
                scene.add(&pts, &tris, &m, None, color)?;
                n_shapes += 1;
            }
            n => {
                if let Some(kind) = GeometryKind::from_name(n) {
                    let index_attr = match kind {
                        GeometryKind::FaceSet => "coordIndex",
                        _ => "index",
                    };
                    let index = tag
                        .attribute(index_attr)
                        .map(parse_numbers::<i64>)
                        .transpose()?
                        .unwrap_or_default();
                    geometry = Some(PendingGeometry {
                        kind,
                        index,
                        ccw: tag.attribute("ccw") != Some("false"),
                        points: Vec::new(),
                        colors: None,
                    });
                }
            }
        }
    }
    if n_shapes == 0 {
        return Err(MeshIoError::malformed("X3D scene has no supported geometry"));
    }
    log::debug!("X3D: {} shapes flattened", n_shapes);
    scene.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosphere_counts() {
        let (pts, tris) = icosphere(SPHERE_ORDER);
        assert_eq!(pts.len() / 3, 162);
        assert_eq!(tris.len() / 3, 320);
        assert_eq!(
            crate::io::layer::icosphere_order(pts.len() / 3),
            Some(SPHERE_ORDER)
        );
    }

    #[test]
    fn test_icosphere_faces_outward() {
        let (pts, tris) = icosphere(1);
        let p = |i: u32| Vector3::new(pts[i as usize * 3], pts[i as usize * 3 + 1], pts[i as usize * 3 + 2]);
        for t in tris.chunks_exact(3) {
            let (a, b, c) = (p(t[0]), p(t[1]), p(t[2]));
            assert!((b - a).cross(&(c - a)).dot(&(a + b + c)) > 0.0);
        }
    }

    #[test]
    fn test_face_set_with_transform_and_def_use() {
        let x3d = br#"<?xml version="1.0"?>
<X3D><Scene>
 <Transform translation="10 0 0">
  <Shape>
   <Appearance DEF="red"><Material diffuseColor="1 0 0"/></Appearance>
   <IndexedFaceSet coordIndex="0 1 2 3 -1">
    <Coordinate point="0 0 0, 1 0 0, 1 1 0, 0 1 0"/>
   </IndexedFaceSet>
  </Shape>
 </Transform>
 <Shape>
  <Appearance USE="red"/>
  <IndexedTriangleSet index="0 1 2"><Coordinate point="0 0 0 0 1 0 0 0 1"/></IndexedTriangleSet>
 </Shape>
</Scene></X3D>"#;
        let mesh = read_x3d(x3d).unwrap();
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.vertex(0), Some([10.0, 0.0, 0.0]));
        assert_eq!(mesh.vertex(4), Some([0.0, 0.0, 0.0]));
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6]);
        let colors = mesh.colors.unwrap();
        assert_eq!(&colors[18..21], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_strip_alternates_winding() {
        let x3d = br#"<X3D><Shape><IndexedTriangleStripSet index="0 1 2 3"><Coordinate point="0 0 0 1 0 0 0 1 0 1 1 0"/></IndexedTriangleStripSet></Shape></X3D>"#;
        let mesh = read_x3d(x3d).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3]);
        assert!(mesh.colors.is_none());
    }

    #[test]
    fn test_primitives() {
        let x3d = br#"<X3D><Shape><Sphere radius="2"/></Shape><Transform scale="1 1 1"><Shape><Cylinder radius="1" height="4"/></Shape></Transform></X3D>"#;
        let mesh = read_x3d(x3d).unwrap();
        assert_eq!(mesh.vertex_count(), 162 + 42);
        let r = mesh.vertex(0).map(|p| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt());
        assert!((r.unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_scene() {
        assert!(read_x3d(b"<X3D><Scene></Scene></X3D>").is_err());
    }
}
