//! Triangle mesh decoders
//!
//! Each decoder returns a validated [`Mesh`](crate::types::Mesh) with
//! counter-clockwise triangles; formats stored clockwise are flipped before
//! returning.

pub mod dfs;
pub mod freesurfer;
pub mod geo;
pub mod ico;
pub mod nv;
pub mod obj;
pub mod off;
pub mod ply;
pub mod srf;
pub mod stl;
pub mod wrl;
pub mod x3d;

pub use dfs::read_dfs;
pub use freesurfer::{read_asc, read_freesurfer};
pub use geo::read_geo;
pub use ico::read_ico;
pub use nv::read_nv;
pub use obj::read_obj;
pub use off::read_off;
pub use ply::read_ply;
pub use srf::read_srf;
pub use stl::read_stl;
pub use wrl::read_wrl;
pub use x3d::read_x3d;

use crate::error::{MeshIoError, Result};

/// Append the fan `(v0, v[k-1], v[k])` of a convex polygon to `out`.
///
/// Polygons with fewer than three corners add nothing.
pub(crate) fn fan_triangulate(poly: &[u32], out: &mut Vec<u32>) {
    if poly.len() < 3 {
        return;
    }
    for k in 2..poly.len() {
        out.extend_from_slice(&[poly[0], poly[k - 1], poly[k]]);
    }
}

/// Append the triangles of a strip, swapping the first two corners of
/// every odd triangle so all of them keep the strip's winding.
pub(crate) fn strip_triangulate(strip: &[u32], out: &mut Vec<u32>) {
    for k in 2..strip.len() {
        if k % 2 == 0 {
            out.extend_from_slice(&[strip[k - 2], strip[k - 1], strip[k]]);
        } else {
            out.extend_from_slice(&[strip[k - 1], strip[k - 2], strip[k]]);
        }
    }
}

/// Convert a 1-based index to 0-based.
pub(crate) fn one_based(index: i64) -> Result<u32> {
    if index < 1 {
        return Err(MeshIoError::malformed(format!(
            "index {} is not a valid 1-based vertex id",
            index
        )));
    }
    u32::try_from(index - 1)
        .map_err(|_| MeshIoError::IntegerOverflow(format!("vertex index {} exceeds 32 bits", index)))
}

/// Convert a 0-based index read as a signed value.
pub(crate) fn zero_based(index: i64) -> Result<u32> {
    u32::try_from(index)
        .map_err(|_| MeshIoError::malformed(format!("invalid vertex index {}", index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_quad() {
        let mut out = Vec::new();
        fan_triangulate(&[0, 1, 2, 3], &mut out);
        assert_eq!(out, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_fan_degenerate() {
        let mut out = Vec::new();
        fan_triangulate(&[4, 5], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_strip_keeps_winding() {
        let mut out = Vec::new();
        strip_triangulate(&[0, 1, 2, 3, 4], &mut out);
        assert_eq!(out, vec![0, 1, 2, 2, 1, 3, 2, 3, 4]);
    }

    #[test]
    fn test_index_bases() {
        assert_eq!(one_based(1).unwrap(), 0);
        assert!(one_based(0).is_err());
        assert!(zero_based(-1).is_err());
        assert_eq!(zero_based(7).unwrap(), 7);
    }
}
