//! Streamline decoders
//!
//! Every decoder returns a [`Tractogram`](crate::types::Tractogram) whose
//! `offset_pt0` carries the trailing fence-post entry, whatever convention
//! the source file uses.

pub mod niml;
pub mod tck;
pub mod trk;
pub mod trx;
pub mod tt;

pub use niml::read_niml_tract;
pub use tck::read_tck;
pub use trk::read_trk;
pub use trx::read_trx;
pub use tt::read_tt;
