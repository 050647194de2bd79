//! TRX tractograms: a ZIP archive of typed flat arrays
//!
//! Member names carry the element type as their final suffix
//! (`positions.3.float16`, `offsets.uint64`, `dps/fa.float32`) and the
//! parent directory says what the array is attached to.

use serde::Deserialize;

use crate::error::{MeshIoError, Result};
use crate::io::compression::{extract_zip_entries, ZipEntry};
use crate::io::cursor::Endian;
use crate::notification::{NotificationCollection, NotificationType};
use crate::types::{NamedValues, ScalarArray, ScalarType, Tractogram};

/// Fields of `header.json` used for cross-checking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrxHeader {
    #[serde(rename = "NB_VERTICES")]
    pub nb_vertices: Option<u64>,
    #[serde(rename = "NB_STREAMLINES")]
    pub nb_streamlines: Option<u64>,
    #[serde(rename = "DIMENSIONS")]
    pub dimensions: Option<Vec<u64>>,
    #[serde(rename = "VOXEL_TO_RASMM")]
    pub voxel_to_rasmm: Option<Vec<Vec<f64>>>,
}

/// Where a member's values attach.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TrxMember {
    Header,
    Positions,
    Offsets,
    Dps(String),
    Dpv(String),
    Group(String),
    /// `dpg/<group>/<name>`
    Dpg(String),
    Other,
}

fn classify(entry: &ZipEntry) -> (TrxMember, Option<&str>) {
    let mut dirs: Vec<&str> = entry.name.split('/').filter(|p| !p.is_empty()).collect();
    dirs.pop();
    let (base, suffix) = match entry.file_name.split_once('.') {
        Some((base, rest)) => (base.to_string(), rest.rsplit('.').next()),
        None => (entry.file_name.clone(), None),
    };
    if entry.file_name == "header.json" {
        return (TrxMember::Header, None);
    }
    let member = match dirs.first().copied() {
        None => match base.as_str() {
            "positions" => TrxMember::Positions,
            "offsets" => TrxMember::Offsets,
            _ => TrxMember::Other,
        },
        Some("dps") => TrxMember::Dps(base),
        Some("dpv") => TrxMember::Dpv(base),
        Some("groups") => TrxMember::Group(base),
        Some("dpg") => TrxMember::Dpg(format!("{}/{}", entry.parent_dir, base)),
        Some(_) => TrxMember::Other,
    };
    (member, suffix)
}

fn decode(entry: &ZipEntry, suffix: Option<&str>) -> Result<ScalarArray> {
    let ty = suffix.and_then(ScalarType::from_suffix).ok_or_else(|| {
        MeshIoError::unsupported(format!("TRX member '{}' has an unknown data type", entry.name))
    })?;
    let count = entry.data.len() / ty.byte_size();
    ScalarArray::from_bytes(ty, &entry.data, count, Endian::Little)
}

fn push_sized(
    out: &mut Vec<NamedValues>,
    id: String,
    vals: Vec<f32>,
    expected: usize,
    kind: &str,
    notes: &mut NotificationCollection,
) {
    if vals.len() == expected {
        out.push(NamedValues::new(id, vals));
    } else {
        notes.notify(
            NotificationType::NotSupported,
            format!(
                "TRX {} '{}' has {} values, expected {}; skipped",
                kind,
                id,
                vals.len(),
                expected
            ),
        );
    }
}

/// Decode a TRX archive.
///
/// 64-bit offsets fail with `IntegerOverflow` when a value needs more than
/// 32 bits. `groups/` members land in `dpg` as streamline index lists.
pub fn read_trx(bytes: &[u8]) -> Result<Tractogram> {
    let entries = extract_zip_entries(bytes)?;
    let mut notes = NotificationCollection::new();
    let mut header = TrxHeader::default();
    let mut pts: Option<Vec<f32>> = None;
    let mut offsets: Option<Vec<u32>> = None;
    let mut dps_raw = Vec::new();
    let mut dpv_raw = Vec::new();
    let mut dpg = Vec::new();

    for entry in &entries {
        if entry.file_name.starts_with('.') {
            log::trace!("TRX: skipping hidden member '{}'", entry.name);
            continue;
        }
        let (member, suffix) = classify(entry);
        match member {
            TrxMember::Header => {
                header = serde_json::from_slice(&entry.data).map_err(|e| {
                    MeshIoError::malformed(format!("TRX header.json: {}", e))
                })?;
            }
            TrxMember::Positions => pts = Some(decode(entry, suffix)?.into_f32()),
            TrxMember::Offsets => offsets = Some(decode(entry, suffix)?.to_u32()?),
            TrxMember::Dps(id) => dps_raw.push((id, decode(entry, suffix)?.into_f32())),
            TrxMember::Dpv(id) => dpv_raw.push((id, decode(entry, suffix)?.into_f32())),
            TrxMember::Group(id) | TrxMember::Dpg(id) => {
                dpg.push(NamedValues::new(id, decode(entry, suffix)?.into_f32()));
            }
            TrxMember::Other => {
                notes.notify(
                    NotificationType::NotImplemented,
                    format!("TRX member '{}' ignored", entry.name),
                );
            }
        }
    }

    let pts = pts.ok_or_else(|| MeshIoError::malformed("TRX archive has no positions"))?;
    if pts.len() % 3 != 0 {
        return Err(MeshIoError::malformed(format!(
            "TRX positions hold {} values, not XYZ triples",
            pts.len()
        )));
    }
    let mut offset_pt0 =
        offsets.ok_or_else(|| MeshIoError::malformed("TRX archive has no offsets"))?;
    let n_pts = u32::try_from(pts.len() / 3).map_err(|_| {
        MeshIoError::IntegerOverflow(format!("{} TRX points exceed 32 bits", pts.len() / 3))
    })?;
    if offset_pt0.is_empty() && n_pts > 0 {
        offset_pt0.push(0);
    }
    offset_pt0.push(n_pts);
    let n_streamlines = offset_pt0.len() - 1;

    if let Some(nb) = header.nb_vertices {
        if nb != u64::from(n_pts) {
            notes.warn(format!("TRX header NB_VERTICES {} but {} points", nb, n_pts));
        }
    }
    if let Some(nb) = header.nb_streamlines {
        if nb != n_streamlines as u64 {
            notes.warn(format!(
                "TRX header NB_STREAMLINES {} but {} offsets",
                nb, n_streamlines
            ));
        }
    }

    let mut tract = Tractogram {
        pts,
        offset_pt0,
        dpg,
        ..Default::default()
    };
    for (id, vals) in dps_raw {
        push_sized(&mut tract.dps, id, vals, n_streamlines, "dps", &mut notes);
    }
    for (id, vals) in dpv_raw {
        push_sized(&mut tract.dpv, id, vals, n_pts as usize, "dpv", &mut notes);
    }
    tract.notifications = notes;
    log::debug!(
        "TRX: {} members, {} streamlines, {} points, {} groups",
        entries.len(),
        tract.streamline_count(),
        tract.point_count(),
        tract.dpg.len()
    );
    tract.checked()
}
