//! FreeSurfer curvature/morphometry files (`lh.curv`, `lh.sulc`, ...)

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::assemble_layer;
use crate::types::Layer;

/// Three `0xFF` bytes open the "new" curvature layout.
pub const CURV_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Decode a curvature file.
///
/// Values are rescaled to `[0, 1]` with inverted polarity, so sulci
/// (positive curvature) render dark on a gray colormap.
pub fn read_curv(bytes: &[u8], n_vert: usize) -> Result<Layer> {
    let c = ByteCursor::new(bytes);
    if c.bytes_at(0, 3)? != CURV_MAGIC {
        return Err(MeshIoError::malformed("curvature file lacks 0xFFFFFF magic"));
    }
    let n_vert_file = c.u32_at(3, Endian::Big)? as usize;
    let _n_faces = c.u32_at(7, Endian::Big)?;
    let vals_per_vertex = c.u32_at(11, Endian::Big)?;
    if vals_per_vertex != 1 {
        return Err(MeshIoError::unsupported(format!(
            "curvature files with {} values per vertex",
            vals_per_vertex
        )));
    }
    let mut body = ByteCursor::at(bytes, 15);
    let mut values = body.read_f32_vec(n_vert_file, Endian::Big)?;
    normalize_inverted(&mut values);

    let mut layer = assemble_layer(values, n_vert_file, n_vert)?;
    layer.colormap = "gray".to_string();
    layer.cal_min = 0.0;
    layer.cal_max = 1.0;
    Ok(layer)
}

/// `v -> 1 - (v - min) / (max - min)`; a constant input maps to 0.5.
fn normalize_inverted(values: &mut [f32]) {
    let (mn, mx) = crate::types::finite_range(values);
    let range = mx - mn;
    for v in values.iter_mut() {
        *v = if range > 0.0 { 1.0 - (*v - mn) / range } else { 0.5 };
    }
}
