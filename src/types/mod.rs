//! Canonical in-memory structures produced by the decoders

mod color_table;
mod layer;
mod mesh;
mod scalar;
mod tractogram;
mod transform;

pub use color_table::{ColorLookupTable, LabelLut};
pub use layer::Layer;
pub use mesh::Mesh;
pub use scalar::{ScalarArray, ScalarType};
pub use tractogram::{NamedValues, StreamlineBuilder, Tractogram};
pub use transform::{affine_from_row_slice, apply_affine, voxel_zoom_matrix};

pub use scalar::{f16_to_f32, narrow_u64};

pub(crate) use layer::finite_range;
