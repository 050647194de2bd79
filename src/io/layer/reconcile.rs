//! Vertex-count reconciliation between an overlay and its background mesh
//!
//! Overlays either match the mesh exactly, carry several frames of it, or
//! were computed on a finer icosphere whose first vertices are the coarser
//! sphere's vertices. Anything else is a mismatch.

/// Subdivision order whose icosphere has `n` vertices (`10 * 4^order + 2`).
pub fn icosphere_order(n: usize) -> Option<u32> {
    if n <= 2 {
        return None;
    }
    let order = (((n - 2) as f64 / 10.0).ln() / 4f64.ln()).round();
    if !(0.0..=15.0).contains(&order) {
        return None;
    }
    let order = order as u32;
    let expected = 4usize.checked_pow(order)?.checked_mul(10)?.checked_add(2)?;
    (expected == n).then_some(order)
}

/// Effective per-frame vertex count of an overlay with `n_vert_layer`
/// values per frame drawn on a mesh with `n_vert_mesh` vertices.
///
/// Returns `n_vert_mesh` when the overlay can be drawn on the mesh (equal
/// counts, a whole number of frames, or a decimated icosphere) and
/// `n_vert_layer` otherwise. A mesh count of zero means no mesh is known.
pub fn reconcile(n_vert_layer: usize, n_vert_mesh: usize) -> usize {
    if n_vert_mesh == 0 {
        return n_vert_layer;
    }
    if n_vert_layer % n_vert_mesh == 0 {
        return n_vert_mesh;
    }
    match (icosphere_order(n_vert_layer), icosphere_order(n_vert_mesh)) {
        (Some(layer_order), Some(mesh_order)) if mesh_order >= 1 && layer_order > mesh_order => {
            n_vert_mesh
        }
        _ => n_vert_layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders() {
        assert_eq!(icosphere_order(12), Some(0));
        assert_eq!(icosphere_order(42), Some(1));
        assert_eq!(icosphere_order(162), Some(2));
        assert_eq!(icosphere_order(163842), Some(7));
        assert_eq!(icosphere_order(43), None);
        assert_eq!(icosphere_order(2), None);
        assert_eq!(icosphere_order(0), None);
    }

    #[test]
    fn test_identity_and_frames() {
        assert_eq!(reconcile(100, 100), 100);
        assert_eq!(reconcile(200, 100), 100);
        assert_eq!(reconcile(7, 1), 1);
    }

    #[test]
    fn test_decimation_accepted() {
        assert_eq!(reconcile(162, 42), 42);
        assert_eq!(reconcile(163842, 40962), 40962);
    }

    #[test]
    fn test_mismatch_returns_layer_count() {
        assert_eq!(reconcile(42, 12), 42);
        assert_eq!(reconcile(101, 100), 101);
        assert_eq!(reconcile(42, 162), 42);
    }

    #[test]
    fn test_unknown_mesh() {
        assert_eq!(reconcile(55, 0), 55);
    }
}
