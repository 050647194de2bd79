//! Affine transforms for point buffers
//!
//! Coordinates are stored as flattened `f32` XYZ triples; transforms are
//! composed in `f64` with nalgebra and applied to column vectors.

use nalgebra::{Matrix4, Vector4};

/// Build a 4×4 matrix from 16 values listed row by row.
pub fn affine_from_row_slice(values: &[f64]) -> Option<Matrix4<f64>> {
    if values.len() < 16 {
        return None;
    }
    Some(Matrix4::from_row_slice(&values[..16]))
}

/// Scale millimetres to voxel indices of `voxel_size` and shift from voxel
/// corners to voxel centers.
pub fn voxel_zoom_matrix(voxel_size: [f64; 3]) -> Matrix4<f64> {
    let inv = |v: f64| if v == 0.0 { 1.0 } else { 1.0 / v };
    Matrix4::new(
        inv(voxel_size[0]), 0.0, 0.0, -0.5,
        0.0, inv(voxel_size[1]), 0.0, -0.5,
        0.0, 0.0, inv(voxel_size[2]), -0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Apply `m` to every XYZ triple in `pts`.
pub fn apply_affine(m: &Matrix4<f64>, pts: &mut [f32]) {
    for p in pts.chunks_exact_mut(3) {
        let v = m * Vector4::new(p[0] as f64, p[1] as f64, p[2] as f64, 1.0);
        p[0] = v.x as f32;
        p[1] = v.y as f32;
        p[2] = v.z as f32;
    }
}
