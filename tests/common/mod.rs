//! Shared fixtures for surfio integration tests.
//!
//! Every builder synthesizes a complete file in memory so the tests need
//! no sample data on disk. Test crates import them via `mod common;`.

#![allow(dead_code)]

pub mod builders;

use surfio::{Mesh, Tractogram};

/// Assert the fence-post invariants every tractogram decoder guarantees.
pub fn assert_fence_post(t: &Tractogram) {
    let n_pts = (t.pts.len() / 3) as u32;
    assert_eq!(t.offset_pt0.first(), Some(&0), "first offset must be 0");
    assert_eq!(t.offset_pt0.last(), Some(&n_pts), "last offset must be the point count");
    assert_eq!(t.offset_pt0.len(), t.streamline_count() + 1);
    assert!(
        t.offset_pt0.windows(2).all(|w| w[0] <= w[1]),
        "offsets must be non-decreasing: {:?}",
        t.offset_pt0
    );
}

/// Assert every triangle index addresses an existing vertex.
pub fn assert_index_bounds(m: &Mesh) {
    let n = m.vertex_count() as u32;
    assert!(m.indices.iter().all(|&i| i < n), "index out of range for {} vertices", n);
    assert_eq!(m.indices.len() % 3, 0);
}

/// Signed volume contribution of each triangle relative to the mesh centroid;
/// positive when the triangle faces away from the centroid.
pub fn outward_facing(m: &Mesh) -> Vec<bool> {
    let n = m.vertex_count() as f32;
    let mut c = [0.0f32; 3];
    for p in m.positions.chunks_exact(3) {
        for k in 0..3 {
            c[k] += p[k] / n;
        }
    }
    m.indices
        .chunks_exact(3)
        .map(|t| {
            let v = |i: u32| {
                let p = &m.positions[i as usize * 3..i as usize * 3 + 3];
                [p[0] - c[0], p[1] - c[1], p[2] - c[2]]
            };
            let (a, b, d) = (v(t[0]), v(t[1]), v(t[2]));
            let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let e2 = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
            let n = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            n[0] * a[0] + n[1] * a[1] + n[2] * a[2] > 0.0
        })
        .collect()
}
