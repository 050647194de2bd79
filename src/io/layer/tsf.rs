//! MRtrix track scalar files (`.tsf`), one value per streamline point

use crate::error::{MeshIoError, Result};
use crate::io::layer::assemble_layer;
use crate::io::tract::tck::{MrtrixHeader, TSF_MAGIC};
use crate::types::Layer;

/// Decode a TSF file for a tractogram with `n_vert` points.
///
/// NaN separates streamlines and an infinity ends the data, mirroring the
/// companion TCK file.
pub fn read_tsf(bytes: &[u8], n_vert: usize) -> Result<Layer> {
    let hdr = MrtrixHeader::parse(bytes, TSF_MAGIC)?;
    let raw = hdr.read_values(bytes)?;
    let values: Vec<f32> = raw
        .into_iter()
        .take_while(|v| !v.is_infinite())
        .filter(|v| !v.is_nan())
        .collect();
    if values.is_empty() {
        return Err(MeshIoError::malformed("TSF file holds no values"));
    }
    let n = values.len();
    assemble_layer(values, n, n_vert)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsf_bytes(values: &[f32]) -> Vec<u8> {
        let mut out = b"mrtrix track scalars\ndatatype: Float32LE\nfile: . 64\nEND\n".to_vec();
        out.resize(64, 0);
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_separators_removed() {
        let bytes = tsf_bytes(&[0.1, 0.2, f32::NAN, 0.3, f32::NAN, f32::INFINITY, 9.0]);
        let layer = read_tsf(&bytes, 3).unwrap();
        assert_eq!(layer.values, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_count_mismatch() {
        let bytes = tsf_bytes(&[0.1, 0.2, f32::NAN]);
        assert!(matches!(
            read_tsf(&bytes, 3),
            Err(MeshIoError::VertexCountMismatch { layer: 2, mesh: 3 })
        ));
    }

    #[test]
    fn test_wrong_magic() {
        assert!(read_tsf(b"mrtrix tracks\nfile: . 20\nEND\n", 1).is_err());
    }
}
