//! BrainVoyager surface maps (`.smp`), versions 1 through 5

use crate::error::{MeshIoError, Result};
use crate::io::compression::{decompress, is_gzip};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::layer::{assemble_layer, reconcile};
use crate::io::options::ReaderConfiguration;
use crate::notification::NotificationType;
use crate::types::Layer;

const LE: Endian = Endian::Little;

/// Highest version written by BrainVoyager; larger values mean the
/// plaintext read is really looking at a gzip stream.
const MAX_VERSION: u16 = 5;

/// Map type whose header carries the cross-correlation lag fields.
const MAP_TYPE_LAG: u32 = 3;

/// Per-map header fields kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmpMap {
    pub map_type: u32,
    pub threshold: f32,
    pub max_threshold: f32,
    pub lut_name: String,
    pub name: String,
}

fn read_map_header(c: &mut ByteCursor<'_>, version: u16) -> Result<SmpMap> {
    let mut map = SmpMap {
        map_type: c.read_u32(LE)?,
        ..Default::default()
    };
    if version >= 3 && map.map_type == MAP_TYPE_LAG {
        // number of lags, min lag, max lag, cc overlay
        c.skip(16)?;
    }
    let _cluster_size = c.read_u32(LE)?;
    let _cluster_check = c.read_u8()?;
    map.threshold = c.read_f32(LE)?;
    map.max_threshold = c.read_f32(LE)?;
    if version >= 4 {
        let _include_greater = c.read_u32(LE)?;
    }
    let _df1 = c.read_u32(LE)?;
    let _df2 = c.read_u32(LE)?;
    if version >= 5 {
        let _bonferroni = c.read_u32(LE)?;
    }
    if version >= 2 {
        // positive min/max RGB
        c.skip(6)?;
    }
    if version >= 4 {
        // negative min/max RGB
        c.skip(6)?;
    }
    let _enable_color = c.read_u8()?;
    if version >= 4 {
        map.lut_name = c.read_cstring()?;
    }
    let _transparent_color_factor = c.read_f32(LE)?;
    map.name = c.read_cstring()?;
    Ok(map)
}

/// Decode an SMP overlay, one frame per map.
pub fn read_smp(bytes: &[u8], n_vert: usize, config: &ReaderConfiguration) -> Result<Layer> {
    let inflated;
    let mut data = bytes;
    let version = ByteCursor::new(data).u16_at(0, LE)?;
    if version > MAX_VERSION {
        if !is_gzip(data) {
            return Err(MeshIoError::unsupported(format!("SMP version {}", version)));
        }
        inflated = decompress(data)?;
        data = &inflated;
    }

    let mut c = ByteCursor::new(data);
    let version = c.read_u16(LE)?;
    if version == 0 || version > MAX_VERSION {
        return Err(MeshIoError::unsupported(format!("SMP version {}", version)));
    }
    let n_vert_file = c.read_u32(LE)? as usize;
    let n_maps = c.read_u16(LE)? as usize;
    let srf_name = c.read_cstring()?;
    if n_vert_file == 0 || n_maps == 0 {
        return Err(MeshIoError::malformed("SMP file declares no vertices or maps"));
    }

    let mut values = Vec::with_capacity(c.remaining() / 4);
    let mut maps = Vec::with_capacity(n_maps);
    for _ in 0..n_maps {
        maps.push(read_map_header(&mut c, version)?);
        values.extend(c.read_f32_vec(n_vert_file, LE)?);
    }
    log::debug!(
        "SMP v{} for '{}': {} maps ({:?}) of {} vertices",
        version,
        srf_name,
        n_maps,
        maps.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        n_vert_file
    );

    let mismatch = n_vert != 0 && n_vert_file != n_vert;
    if mismatch && config.strict {
        return Err(MeshIoError::VertexCountMismatch {
            layer: n_vert_file,
            mesh: n_vert,
        });
    }
    let mut layer = if mismatch && reconcile(n_vert_file, n_vert) != n_vert {
        Layer::new(fit_maps(&values, n_vert_file, n_vert), n_maps)
    } else {
        assemble_layer(values, n_vert_file, n_vert)?
    };
    if mismatch {
        layer.notifications.notify(
            NotificationType::Warning,
            format!("SMP has {} vertices, mesh has {}", n_vert_file, n_vert),
        );
    }
    if let Some(first) = maps.first() {
        if first.threshold.is_finite() && first.max_threshold > first.threshold {
            layer.cal_min = first.threshold;
            layer.cal_max = first.max_threshold;
        }
    }
    Ok(layer)
}

/// Truncate or zero-pad every map of `n_vert_file` values to `n_vert`.
fn fit_maps(values: &[f32], n_vert_file: usize, n_vert: usize) -> Vec<f32> {
    values
        .chunks_exact(n_vert_file)
        .flat_map(|map| map.iter().copied().chain(std::iter::repeat(0.0)).take(n_vert))
        .collect()
}
