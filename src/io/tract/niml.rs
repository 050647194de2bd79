//! AFNI/FATCAT `.niml.tract` networks
//!
//! A pseudo-XML stream where every `<tracts ...>` tag is followed by a raw
//! binary block of `N_tracts` records: four `i32` (id, coordinate count,
//! two start indices) then the coordinates as `f32`.

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::text::TagReader;
use crate::types::{NamedValues, StreamlineBuilder, Tractogram};

/// Decode a niml.tract file. Y is negated to move from AFNI's LPI
/// convention to RAS, and each streamline gets a `bundle` dps value giving
/// the index of the `<tracts>` block that held it.
pub fn read_niml_tract(bytes: &[u8]) -> Result<Tractogram> {
    let mut tags = TagReader::new(bytes);
    let mut builder = StreamlineBuilder::new();
    let mut bundle = Vec::new();
    let mut n_blocks = 0usize;

    while let Some(tag) = tags.next_tag() {
        if tag.is_closing() || tag.name() != "tracts" {
            continue;
        }
        let endian = Endian::from_flag(tag.text.contains("lsbfirst"));
        let n_tracts: usize = tag.numeric_attribute("N_tracts").ok_or_else(|| {
            MeshIoError::malformed(format!("niml <tracts> at {} lacks N_tracts", tag.start))
        })?;
        let mut c = ByteCursor::at(bytes, tag.end);
        for _ in 0..n_tracts {
            let _id = c.read_i32(endian)?;
            let n_coords = c.read_count(endian)?;
            let _start_a = c.read_i32(endian)?;
            let _start_b = c.read_i32(endian)?;
            if n_coords % 3 != 0 {
                return Err(MeshIoError::malformed(format!(
                    "niml tract with {} coordinates at offset {}",
                    n_coords,
                    c.position()
                )));
            }
            for _ in 0..n_coords / 3 {
                let x = c.read_f32(endian)?;
                let y = c.read_f32(endian)?;
                let z = c.read_f32(endian)?;
                builder.push_point(x, -y, z);
            }
            builder.end_streamline()?;
            bundle.push(n_blocks as f32);
        }
        tags.set_position(c.position());
        n_blocks += 1;
    }

    if n_blocks == 0 {
        return Err(MeshIoError::malformed("niml file has no <tracts> blocks"));
    }
    let mut tract = builder.finish()?;
    tract.dps.push(NamedValues::new("bundle", bundle));
    log::debug!(
        "niml.tract: {} bundles, {} streamlines, {} points",
        n_blocks,
        tract.streamline_count(),
        tract.point_count()
    );
    tract.checked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(out: &mut Vec<u8>, tracts: &[&[[f32; 3]]], lsb: bool) {
        let form = if lsb { "binary.lsbfirst" } else { "binary.msbfirst" };
        out.extend_from_slice(
            format!(
                "<tracts\n ni_form=\"{}\"\n N_tracts=\"{}\" >",
                form,
                tracts.len()
            )
            .as_bytes(),
        );
        let enc = |v: i32| if lsb { v.to_le_bytes() } else { v.to_be_bytes() };
        let encf = |v: f32| if lsb { v.to_le_bytes() } else { v.to_be_bytes() };
        for (id, pts) in tracts.iter().enumerate() {
            out.extend_from_slice(&enc(id as i32));
            out.extend_from_slice(&enc(pts.len() as i32 * 3));
            out.extend_from_slice(&enc(0));
            out.extend_from_slice(&enc(0));
            for p in *pts {
                for v in p {
                    out.extend_from_slice(&encf(*v));
                }
            }
        }
        out.extend_from_slice(b"</tracts>\n");
    }

    #[test]
    fn test_two_bundles() {
        let mut bytes = b"<network\n N_tracts=\"3\" >\n".to_vec();
        block(&mut bytes, &[&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]], true);
        block(&mut bytes, &[&[[60.0, 60.0, 60.0]], &[[0.0, -1.0, 0.0]]], false);
        bytes.extend_from_slice(b"</network>\n");

        let t = read_niml_tract(&bytes).unwrap();
        assert_eq!(t.offset_pt0, vec![0, 2, 3, 4]);
        assert_eq!(&t.pts[..3], &[1.0, -2.0, 3.0]);
        assert_eq!(&t.pts[9..], &[0.0, 1.0, 0.0]);
        assert_eq!(t.dps[0].id, "bundle");
        assert_eq!(t.dps[0].vals, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_binary_holding_tag_bytes() {
        // coordinate bytes equal to '<' are data, not tags
        let mut bytes = Vec::new();
        block(&mut bytes, &[&[[f32::from_bits(0x3C3C_3C3C), 0.0, 0.0]]], true);
        let t = read_niml_tract(&bytes).unwrap();
        assert_eq!(t.streamline_count(), 1);
    }

    #[test]
    fn test_truncated_block() {
        let mut bytes = Vec::new();
        block(&mut bytes, &[&[[1.0, 2.0, 3.0]]], true);
        let cut = bytes.len() - b"</tracts>\n".len() - 2;
        assert!(read_niml_tract(&bytes[..cut]).is_err());
    }

    #[test]
    fn test_no_tracts() {
        assert!(read_niml_tract(b"<network N_tracts=\"0\" ></network>").is_err());
    }
}
