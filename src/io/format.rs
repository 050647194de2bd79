//! Format tags derived from file names and magic bytes

use std::fmt;

use crate::io::compression::{is_gzip, maybe_decompress};

/// Decoder family a format belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Mesh,
    Tractogram,
    Layer,
}

/// Every format the crate can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    // Meshes
    Stl,
    Ply,
    Obj,
    Geo,
    Off,
    Ico,
    X3d,
    Wrl,
    FreeSurfer,
    Asc,
    Dfs,
    Srf,
    Nv,
    Gifti,
    Mz3,
    /// Legacy VTK; polygons give a mesh, lines a tractogram.
    Vtk,
    // Tractograms
    Trk,
    Tck,
    Tt,
    Trx,
    NimlTract,
    // Overlays
    Curv,
    Annot,
    Mgh,
    Nifti,
    Smp,
    Stc,
    Tsf,
}

/// Surface names FreeSurfer writes without an extension of its own.
const FREESURFER_SURFACES: &[&str] = &[
    "PIAL", "WHITE", "INFLATED", "SPHERE", "ORIG", "SMOOTHWM", "FSM", "MID", "QSPHERE", "REG",
];

/// Per-vertex morphometry written in the curvature layout.
const CURV_NAMES: &[&str] = &[
    "CURV",
    "SULC",
    "THICKNESS",
    "AREA",
    "JACOBIAN_WHITE",
    "AVG_CURV",
    "VOLUME",
];

impl FormatTag {
    /// Map an upper-case extension to a tag.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let tag = match ext {
            "STL" => FormatTag::Stl,
            "PLY" => FormatTag::Ply,
            "OBJ" => FormatTag::Obj,
            "GEO" | "BYU" => FormatTag::Geo,
            "OFF" => FormatTag::Off,
            "ICO" | "TRI" => FormatTag::Ico,
            "X3D" => FormatTag::X3d,
            "WRL" => FormatTag::Wrl,
            "ASC" => FormatTag::Asc,
            "DFS" => FormatTag::Dfs,
            "SRF" => FormatTag::Srf,
            "NV" => FormatTag::Nv,
            "GII" => FormatTag::Gifti,
            "MZ3" => FormatTag::Mz3,
            "VTK" | "FIB" => FormatTag::Vtk,
            "TRK" => FormatTag::Trk,
            "TCK" => FormatTag::Tck,
            "TT" => FormatTag::Tt,
            "TRX" => FormatTag::Trx,
            "TRACT" => FormatTag::NimlTract,
            "ANNOT" => FormatTag::Annot,
            "MGH" | "MGZ" => FormatTag::Mgh,
            "NII" => FormatTag::Nifti,
            "SMP" => FormatTag::Smp,
            "STC" => FormatTag::Stc,
            "TSF" => FormatTag::Tsf,
            e if FREESURFER_SURFACES.contains(&e) => FormatTag::FreeSurfer,
            e if CURV_NAMES.contains(&e) => FormatTag::Curv,
            _ => return None,
        };
        Some(tag)
    }

    /// Tag for a file name, ignoring a trailing `.gz`/`.gzip` layer.
    ///
    /// `lh.pial` and `lh.white.gz` resolve through their final component;
    /// `x.niml.tract` resolves through `TRACT`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::from_extension(&extension(name))
    }

    /// Identify a buffer from its leading bytes, looking through gzip.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if is_gzip(bytes) {
            let inner = maybe_decompress(bytes).ok()?;
            if is_gzip(&inner) {
                return None;
            }
            return Self::sniff(&inner).filter(|t| t.supports_gzip());
        }
        let starts = |m: &[u8]| bytes.starts_with(m);
        if starts(&[0xFF, 0xFF, 0xFF]) {
            return Some(FormatTag::Curv);
        }
        if starts(&[0xFF, 0xFF, 0xFE]) {
            return Some(FormatTag::FreeSurfer);
        }
        if starts(b"TRACK") {
            return Some(FormatTag::Trk);
        }
        if starts(b"mrtrix tracks") {
            return Some(FormatTag::Tck);
        }
        if starts(b"mrtrix track scalars") {
            return Some(FormatTag::Tsf);
        }
        if starts(b"ply") {
            return Some(FormatTag::Ply);
        }
        if starts(b"# vtk DataFile") {
            return Some(FormatTag::Vtk);
        }
        if starts(b"DFS_") {
            return Some(FormatTag::Dfs);
        }
        if starts(b"OFF") {
            return Some(FormatTag::Off);
        }
        if starts(b"#VRML") {
            return Some(FormatTag::Wrl);
        }
        if starts(b"#!ascii") {
            return Some(FormatTag::Asc);
        }
        if starts(b"PK\x03\x04") {
            return Some(FormatTag::Trx);
        }
        if starts(&[0x4D, 0x5A]) {
            return Some(FormatTag::Mz3);
        }
        if bytes.len() >= 348 {
            let le = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let be = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            if [le, be].iter().any(|&v| v == 348 || v == 540) {
                return Some(FormatTag::Nifti);
            }
        }
        let head = &bytes[..bytes.len().min(512)];
        let text = String::from_utf8_lossy(head);
        if text.contains("<GIFTI") {
            return Some(FormatTag::Gifti);
        }
        if text.contains("<X3D") {
            return Some(FormatTag::X3d);
        }
        if text.contains("<network") || text.contains("<tracts") {
            return Some(FormatTag::NimlTract);
        }
        None
    }

    /// Resolve by extension first, then by content.
    pub fn detect(name: &str, bytes: &[u8]) -> Option<Self> {
        Self::from_file_name(name).or_else(|| Self::sniff(bytes))
    }

    /// Family of decoder producing this format's primary output.
    pub fn family(self) -> Family {
        match self {
            FormatTag::Stl
            | FormatTag::Ply
            | FormatTag::Obj
            | FormatTag::Geo
            | FormatTag::Off
            | FormatTag::Ico
            | FormatTag::X3d
            | FormatTag::Wrl
            | FormatTag::FreeSurfer
            | FormatTag::Asc
            | FormatTag::Dfs
            | FormatTag::Srf
            | FormatTag::Nv
            | FormatTag::Gifti
            | FormatTag::Mz3
            | FormatTag::Vtk => Family::Mesh,
            FormatTag::Trk
            | FormatTag::Tck
            | FormatTag::Tt
            | FormatTag::Trx
            | FormatTag::NimlTract => Family::Tractogram,
            FormatTag::Curv
            | FormatTag::Annot
            | FormatTag::Mgh
            | FormatTag::Nifti
            | FormatTag::Smp
            | FormatTag::Stc
            | FormatTag::Tsf => Family::Layer,
        }
    }

    /// Formats whose decoder accepts a gzip wrapper.
    pub fn supports_gzip(self) -> bool {
        !matches!(self, FormatTag::Trx | FormatTag::Gifti | FormatTag::X3d)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Upper-case final extension of `name` after dropping `.gz`/`.gzip`.
///
/// A name without a dot yields its whole upper-cased base name, so bare
/// FreeSurfer files such as `pial` still resolve.
pub fn extension(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let mut upper = base.to_ascii_uppercase();
    for gz in [".GZ", ".GZIP"] {
        if upper.ends_with(gz) {
            upper.truncate(upper.len() - gz.len());
            break;
        }
    }
    match upper.rfind('.') {
        Some(dot) => upper[dot + 1..].to_string(),
        None => upper,
    }
}
