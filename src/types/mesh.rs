//! Triangle mesh geometry

use crate::error::{MeshIoError, Result};
use crate::notification::NotificationCollection;

/// Triangle mesh with flattened vertex and index buffers.
///
/// `positions` holds XYZ triples, `indices` holds counter-clockwise
/// triangles and `colors` (when present) holds one RGB triple in `0..=1`
/// per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex coordinates, `3 * vertex_count` values.
    pub positions: Vec<f32>,
    /// Triangle vertex indices, `3 * triangle_count` values.
    pub indices: Vec<u32>,
    /// Optional per-vertex RGB colors.
    pub colors: Option<Vec<f32>>,
    /// Hemisphere/structure tag stored by GIFTI meshes (e.g. `CortexLeft`).
    pub anatomical_structure_primary: Option<String>,
    /// Non-fatal issues found while decoding.
    pub notifications: NotificationCollection,
}

impl Mesh {
    /// Create a mesh from flattened positions and indices.
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    /// Attach per-vertex colors.
    pub fn with_colors(mut self, colors: Option<Vec<f32>>) -> Self {
        self.colors = colors;
        self
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Coordinates of vertex `i`.
    pub fn vertex(&self, i: usize) -> Option<[f32; 3]> {
        let p = self.positions.get(i * 3..i * 3 + 3)?;
        Some([p[0], p[1], p[2]])
    }

    /// Reverse the orientation of every triangle by swapping its first two
    /// corners.
    pub fn flip_winding(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(0, 1);
        }
    }

    /// Check the structural invariants of the mesh.
    pub fn validate(&self) -> Result<()> {
        if self.positions.len() % 3 != 0 {
            return Err(MeshIoError::malformed(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshIoError::malformed(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let n = self.vertex_count();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(MeshIoError::malformed(format!(
                "triangle index {} out of range for {} vertices",
                bad, n
            )));
        }
        if let Some(colors) = &self.colors {
            if colors.len() != self.positions.len() {
                return Err(MeshIoError::malformed(format!(
                    "color buffer has {} values, expected {}",
                    colors.len(),
                    self.positions.len()
                )));
            }
        }
        Ok(())
    }

    /// Validate and return the mesh, the last step of every mesh decoder.
    pub(crate) fn checked(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}
