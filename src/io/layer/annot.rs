//! FreeSurfer annotation files (`lh.aparc.annot`)

use std::sync::Arc;

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::assemble_layer;
use crate::io::layer::ctab::read_color_table;
use crate::io::options::ReaderConfiguration;
use crate::types::{Layer, LabelLut};

/// Tag announcing an embedded color table after the vertex labels.
const TAG_COLORTABLE: i32 = 1;

/// Decode an annotation.
///
/// Each vertex stores a packed RGB value; it is replaced by the id of the
/// color-table entry with that color. Vertices whose color is not in the
/// table are set to 0 and counted.
pub fn read_annot(bytes: &[u8], n_vert: usize, config: &ReaderConfiguration) -> Result<Layer> {
    let mut c = ByteCursor::new(bytes);
    let n_vert_file = c.read_count(Endian::Big)?;
    if n_vert_file == 0 {
        return Err(MeshIoError::malformed("annotation has no vertices"));
    }
    let pairs = c.read_i32_vec(
        n_vert_file
            .checked_mul(2)
            .ok_or_else(|| MeshIoError::malformed("annotation vertex count overflows"))?,
        Endian::Big,
    )?;
    let mut packed = vec![0i32; n_vert_file];
    for pair in pairs.chunks_exact(2) {
        let vno = usize::try_from(pair[0])
            .ok()
            .filter(|&v| v < n_vert_file)
            .ok_or_else(|| {
                MeshIoError::malformed(format!("annotation vertex {} out of range", pair[0]))
            })?;
        packed[vno] = pair[1];
    }

    let tag = if c.remaining() >= 4 { c.read_i32(Endian::Big)? } else { 0 };
    if tag != TAG_COLORTABLE {
        let values = packed.iter().map(|&v| v as f32).collect();
        let mut layer = assemble_layer(values, n_vert_file, n_vert)?;
        layer
            .notifications
            .warn("annotation has no embedded color table; showing packed label values");
        return Ok(layer);
    }

    let ctab = read_color_table(&mut c)?;
    let mut values = Vec::with_capacity(n_vert_file);
    let mut mismatches = 0usize;
    let mut hint = 0usize;
    for &p in &packed {
        match ctab.find_packed(p, hint) {
            Some(k) => {
                hint = k;
                values.push(ctab.table.id_at(k) as f32);
            }
            None => {
                mismatches += 1;
                values.push(0.0);
            }
        }
    }

    let fraction = mismatches as f32 / n_vert_file as f32;
    if mismatches > 0 {
        let over_limit = config
            .max_label_mismatch_fraction
            .map_or(false, |limit| fraction > limit);
        if config.strict || over_limit {
            return Err(MeshIoError::malformed(format!(
                "{} of {} annotation vertices have labels missing from the color table",
                mismatches, n_vert_file
            )));
        }
    }

    let lut = LabelLut::build(ctab.table)?;
    let mut layer = assemble_layer(values, n_vert_file, n_vert)?.with_label_lut(Some(Arc::new(lut)));
    if mismatches > 0 {
        layer.notifications.warn(format!(
            "{} of {} annotation vertices have labels missing from the color table",
            mismatches, n_vert_file
        ));
    }
    log::debug!("annotation: {} vertices, {} unmatched", n_vert_file, mismatches);
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::layer::ctab::pack_rgb;
    use crate::io::layer::ctab::tests::v2_table;

    fn annot_bytes(labels: &[i32], with_ctab: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(labels.len() as i32).to_be_bytes());
        for (k, l) in labels.iter().enumerate() {
            out.extend_from_slice(&(k as i32).to_be_bytes());
            out.extend_from_slice(&l.to_be_bytes());
        }
        if with_ctab {
            out.extend_from_slice(&TAG_COLORTABLE.to_be_bytes());
            out.extend(v2_table(&[(0, "unknown", [25, 5, 25]), (7, "precentral", [60, 20, 220])]));
        }
        out
    }

    #[test]
    fn test_labels_map_to_structure_ids() {
        let a = pack_rgb(25, 5, 25);
        let b = pack_rgb(60, 20, 220);
        let layer = read_annot(&annot_bytes(&[a, b, b], true), 3, &Default::default()).unwrap();
        assert_eq!(layer.values, vec![0.0, 7.0, 7.0]);
        let lut = layer.colormap_label.as_ref().unwrap();
        assert_eq!(lut.rgba(7.0), Some([60, 20, 220, 255]));
        assert_eq!(lut.label(7.0), Some("precentral"));
        assert!(layer.notifications.is_empty());
    }

    #[test]
    fn test_mismatch_is_reported() {
        let a = pack_rgb(25, 5, 25);
        let layer = read_annot(&annot_bytes(&[a, 12345], true), 2, &Default::default()).unwrap();
        assert_eq!(layer.values, vec![0.0, 0.0]);
        assert_eq!(layer.notifications.len(), 1);
    }

    #[test]
    fn test_mismatch_rejected_when_strict() {
        let bytes = annot_bytes(&[12345], true);
        let cfg = ReaderConfiguration::new().strict(true);
        assert!(read_annot(&bytes, 1, &cfg).is_err());
        let cfg = ReaderConfiguration::new().max_label_mismatch_fraction(0.5);
        assert!(read_annot(&bytes, 1, &cfg).is_err());
    }

    #[test]
    fn test_missing_color_table() {
        let layer = read_annot(&annot_bytes(&[5, 6], false), 2, &Default::default()).unwrap();
        assert_eq!(layer.values, vec![5.0, 6.0]);
        assert!(layer.colormap_label.is_none());
        assert_eq!(layer.notifications.len(), 1);
    }

    #[test]
    fn test_vertex_index_out_of_range() {
        let mut bytes = annot_bytes(&[1], false);
        bytes[4..8].copy_from_slice(&9i32.to_be_bytes());
        assert!(read_annot(&bytes, 1, &Default::default()).is_err());
    }
}
