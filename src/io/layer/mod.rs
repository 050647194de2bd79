//! Per-vertex overlay decoders
//!
//! Every decoder produces raw frames with the file's own vertex count and
//! hands them to [`assemble_layer`], which reconciles that count with the
//! background mesh before a [`Layer`] is returned.

pub mod annot;
pub mod cifti;
pub mod ctab;
pub mod curv;
pub mod mgh;
pub mod nifti;
pub mod reconcile;
pub mod smp;
pub mod stc;
pub mod tsf;

pub use annot::read_annot;
pub use curv::read_curv;
pub use mgh::read_mgh;
pub use nifti::read_nifti;
pub use reconcile::{icosphere_order, reconcile};
pub use smp::read_smp;
pub use stc::read_stc;
pub use tsf::read_tsf;

use crate::error::{MeshIoError, Result};
use crate::types::Layer;

/// Build a layer from `values` holding whole frames of `n_vert_layer`
/// values each, shaped for a mesh of `n_vert_mesh` vertices.
///
/// A layer count that is a multiple of the mesh count is re-split into
/// more frames. A decimated icosphere keeps the first `n_vert_mesh` values
/// of each frame. Any other disagreement is a `VertexCountMismatch`.
pub(crate) fn assemble_layer(
    values: Vec<f32>,
    n_vert_layer: usize,
    n_vert_mesh: usize,
) -> Result<Layer> {
    if n_vert_layer == 0 {
        return Err(MeshIoError::malformed("overlay has no vertices"));
    }
    if values.len() % n_vert_layer != 0 {
        return Err(MeshIoError::malformed(format!(
            "{} overlay values are not whole frames of {} vertices",
            values.len(),
            n_vert_layer
        )));
    }
    let effective = reconcile(n_vert_layer, n_vert_mesh);
    if effective != n_vert_mesh && n_vert_mesh != 0 {
        return Err(MeshIoError::VertexCountMismatch {
            layer: n_vert_layer,
            mesh: n_vert_mesh,
        });
    }
    if n_vert_mesh == 0 || n_vert_layer % n_vert_mesh == 0 {
        let per_frame = if n_vert_mesh == 0 { n_vert_layer } else { n_vert_mesh };
        let n_frames = values.len() / per_frame;
        return Ok(Layer::new(values, n_frames));
    }

    let n_frames = values.len() / n_vert_layer;
    let decimated: Vec<f32> = values
        .chunks_exact(n_vert_layer)
        .flat_map(|frame| frame[..n_vert_mesh].iter().copied())
        .collect();
    let mut layer = Layer::new(decimated, n_frames);
    layer.notifications.warn(format!(
        "overlay with {} vertices decimated to {} mesh vertices",
        n_vert_layer, n_vert_mesh
    ));
    Ok(layer)
}
