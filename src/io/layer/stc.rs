//! MNE source time courses (`.stc`)

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::assemble_layer;
use crate::types::Layer;

const BE: Endian = Endian::Big;

/// Decode an STC overlay, one frame per time point.
///
/// Source spaces usually cover a subset of the surface; when the file's
/// vertex count differs from the mesh, each frame is scattered to the
/// listed mesh vertices and every other vertex is 0.
pub fn read_stc(bytes: &[u8], n_vert: usize) -> Result<Layer> {
    let mut c = ByteCursor::new(bytes);
    let epoch_begin_ms = c.read_f32(BE)?;
    let sample_period_ms = c.read_f32(BE)?;
    let n_vert_file = c.read_count(BE)?;
    let vertices = c.read_u32_vec(n_vert_file, BE)?;
    let n_time = c.read_u32(BE)? as usize;
    let count = n_vert_file
        .checked_mul(n_time)
        .ok_or_else(|| MeshIoError::malformed("STC dimensions overflow"))?;
    let values = c.read_f32_vec(count, BE)?;
    log::debug!(
        "STC: {} vertices x {} samples from {} ms every {} ms",
        n_vert_file,
        n_time,
        epoch_begin_ms,
        sample_period_ms
    );
    if n_time == 0 {
        return Err(MeshIoError::malformed("STC file has no time points"));
    }

    if n_vert == 0 || n_vert_file == n_vert {
        return assemble_layer(values, n_vert_file, n_vert);
    }
    if let Some(&bad) = vertices.iter().find(|&&v| v as usize >= n_vert) {
        return Err(MeshIoError::malformed(format!(
            "STC vertex {} exceeds mesh with {} vertices",
            bad, n_vert
        )));
    }
    let mut dense = vec![0.0f32; n_vert * n_time];
    for (t, frame) in values.chunks_exact(n_vert_file.max(1)).enumerate() {
        let out = &mut dense[t * n_vert..(t + 1) * n_vert];
        for (&v, &val) in vertices.iter().zip(frame) {
            out[v as usize] = val;
        }
    }
    let mut layer = assemble_layer(dense, n_vert, n_vert)?;
    layer.notifications.warn(format!(
        "STC covers {} of {} mesh vertices; other vertices set to 0",
        n_vert_file, n_vert
    ));
    Ok(layer)
}
