//! # surfio
//!
//! A pure Rust library for decoding neuroimaging surface meshes,
//! tractograms and per-vertex overlays from in-memory buffers.
//!
//! ## Features
//!
//! - Meshes: STL, PLY, OBJ (including MNI), GEO/BYU, OFF, ICO/TRI, X3D, VRML,
//!   FreeSurfer (binary and ASCII), BrainSuite DFS, BrainVoyager SRF, NV,
//!   GIFTI, MZ3 and legacy VTK
//! - Tractograms: TrackVis TRK, mrtrix TCK, DSI Studio TT, TRX and AFNI
//!   niml.tract, plus VTK line sets
//! - Overlays: FreeSurfer curvature, annotation and MGH/MGZ, NIfTI/CIfTI,
//!   BrainVoyager SMP, MNE STC, mrtrix TSF, GIFTI and MZ3
//! - Transparent gzip for formats that allow it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use surfio::{read_layer, read_mesh, read_tractogram};
//!
//! let mesh = read_mesh("lh.pial", &std::fs::read("lh.pial")?)?;
//! println!("{} vertices", mesh.vertex_count());
//!
//! let curv = read_layer("lh.curv", &std::fs::read("lh.curv")?, mesh.vertex_count())?;
//!
//! let tracts = read_tractogram("fibers.trk.gz", &std::fs::read("fibers.trk.gz")?)?;
//! assert_eq!(tracts.offset_pt0.len(), tracts.streamline_count() + 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`io::FormatTag`] - closed set of formats, detected by name or content
//! - [`io::mesh`], [`io::tract`], [`io::layer`] - one decoder per format
//! - [`types`] - the canonical [`Mesh`], [`Tractogram`] and [`Layer`] values
//! - [`notification`] - non-fatal issues attached to every decoded value

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod io;
pub mod notification;
pub mod types;

pub use error::{MeshIoError, Result};
pub use notification::{Notification, NotificationCollection, NotificationType};
pub use types::{
    ColorLookupTable, LabelLut, Layer, Mesh, NamedValues, ScalarArray, ScalarType,
    StreamlineBuilder, Tractogram,
};

pub use io::{
    read, read_layer, read_layer_with_options, read_mesh, read_tractogram, Family, FileContent,
    FormatTag, ReaderConfiguration,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexported_entry_points() {
        let err = read_mesh("brain.unknown", b"").unwrap_err();
        assert!(matches!(err, MeshIoError::UnsupportedFormat(_)));
        assert_eq!(FormatTag::from_file_name("lh.pial"), Some(FormatTag::FreeSurfer));
    }
}
