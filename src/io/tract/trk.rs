//! TrackVis streamlines (`.trk`)

use nalgebra::Matrix4;

use crate::error::{MeshIoError, Result};
use crate::io::compression::maybe_decompress;
use crate::io::cursor::{ByteCursor, Endian};
use crate::types::{
    affine_from_row_slice, apply_affine, voxel_zoom_matrix, NamedValues, StreamlineBuilder,
    Tractogram,
};

pub const TRK_HEADER_SIZE: usize = 1000;

const NAME_LEN: usize = 20;
const MAX_NAMES: usize = 10;

/// Header fields used to decode the body.
#[derive(Debug, Clone, PartialEq)]
pub struct TrkHeader {
    pub endian: Endian,
    pub dim: [i16; 3],
    pub voxel_size: [f32; 3],
    pub scalar_names: Vec<String>,
    pub property_names: Vec<String>,
    /// Row-major voxel-to-RAS matrix.
    pub vox_to_ras: [f32; 16],
    /// Declared streamline count, 0 when unknown.
    pub n_count: i32,
}

fn slot_names(c: &ByteCursor<'_>, count: i16, at: usize, prefix: &str) -> Result<Vec<String>> {
    if !(0..=MAX_NAMES as i16).contains(&count) {
        return Err(MeshIoError::malformed(format!("TRK declares {} {} slots", count, prefix)));
    }
    (0..count as usize)
        .map(|k| {
            let mut sub = ByteCursor::at(c.data(), at + k * NAME_LEN);
            let name = sub.read_fixed_string(NAME_LEN)?;
            Ok(if name.is_empty() {
                format!("{}{}", prefix, k)
            } else {
                name
            })
        })
        .collect()
}

impl TrkHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let c = ByteCursor::new(bytes);
        if c.bytes_at(0, 5)? != b"TRACK" {
            return Err(MeshIoError::malformed("TRK file lacks TRACK magic"));
        }
        let endian = [Endian::Little, Endian::Big]
            .into_iter()
            .find(|&e| c.i32_at(996, e).map_or(false, |v| v as usize == TRK_HEADER_SIZE))
            .ok_or_else(|| MeshIoError::malformed("TRK hdr_size is not 1000"))?;

        let dim = [c.i16_at(6, endian)?, c.i16_at(8, endian)?, c.i16_at(10, endian)?];
        let voxel_size = [c.f32_at(12, endian)?, c.f32_at(16, endian)?, c.f32_at(20, endian)?];
        let scalar_names = slot_names(&c, c.i16_at(36, endian)?, 38, "scalar")?;
        let property_names = slot_names(&c, c.i16_at(238, endian)?, 240, "property")?;
        let mut vox_to_ras = [0f32; 16];
        for (k, v) in vox_to_ras.iter_mut().enumerate() {
            *v = c.f32_at(440 + k * 4, endian)?;
        }
        Ok(Self {
            endian,
            dim,
            voxel_size,
            scalar_names,
            property_names,
            vox_to_ras,
            n_count: c.i32_at(988, endian)?,
        })
    }

    /// Map stored voxel-millimetre coordinates to RAS: `vox_to_ras * zoom`.
    ///
    /// The flag is false when the file does not record a voxel-to-RAS
    /// matrix and identity was substituted.
    pub fn transform(&self) -> (Matrix4<f64>, bool) {
        let zoom = voxel_zoom_matrix(self.voxel_size.map(f64::from));
        let recorded = self.vox_to_ras[15] != 0.0;
        let vox_to_ras = if recorded {
            let vals: Vec<f64> = self.vox_to_ras.iter().map(|&v| v as f64).collect();
            affine_from_row_slice(&vals).unwrap_or_else(Matrix4::identity)
        } else {
            Matrix4::identity()
        };
        (vox_to_ras * zoom, recorded)
    }
}

/// Decode a TRK file (optionally gzip-wrapped).
///
/// Per-point scalars become `dpv` and per-streamline properties `dps`.
pub fn read_trk(bytes: &[u8]) -> Result<Tractogram> {
    let raw = maybe_decompress(bytes)?;
    let hdr = TrkHeader::parse(&raw)?;
    let endian = hdr.endian;
    let n_scalars = hdr.scalar_names.len();
    let n_props = hdr.property_names.len();

    let mut c = ByteCursor::at(&raw, TRK_HEADER_SIZE);
    let mut builder = StreamlineBuilder::new();
    let mut dpv: Vec<Vec<f32>> = vec![Vec::new(); n_scalars];
    let mut dps: Vec<Vec<f32>> = vec![Vec::new(); n_props];
    while c.remaining() >= 4 {
        let n_pts = c.read_count(endian)?;
        for _ in 0..n_pts {
            let p = c.read_f32_vec(3 + n_scalars, endian)?;
            builder.push_point(p[0], p[1], p[2]);
            for (k, v) in p[3..].iter().enumerate() {
                dpv[k].push(*v);
            }
        }
        builder.end_streamline()?;
        for (k, v) in c.read_f32_vec(n_props, endian)?.into_iter().enumerate() {
            dps[k].push(v);
        }
    }

    let mut tract = builder.finish()?;
    let (m, recorded) = hdr.transform();
    if !recorded {
        tract
            .notifications
            .warn("TRK vox_to_ras is not recorded; using identity");
    }
    apply_affine(&m, &mut tract.pts);
    if hdr.n_count > 0 && hdr.n_count as usize != tract.streamline_count() {
        tract.notifications.warn(format!(
            "TRK header declares {} streamlines, found {}",
            hdr.n_count,
            tract.streamline_count()
        ));
    }
    tract.dpv = hdr
        .scalar_names
        .iter()
        .zip(dpv)
        .map(|(id, vals)| NamedValues::new(id.clone(), vals))
        .collect();
    tract.dps = hdr
        .property_names
        .iter()
        .zip(dps)
        .map(|(id, vals)| NamedValues::new(id.clone(), vals))
        .collect();
    log::debug!(
        "TRK: {} streamlines, {} points, dim {:?}",
        tract.streamline_count(),
        tract.point_count(),
        hdr.dim
    );
    tract.checked()
}
