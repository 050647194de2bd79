//! Decoders for surface meshes, tractograms and per-vertex overlays
//!
//! The entry points pick a decoder from the file name (falling back to
//! magic bytes), strip a gzip wrapper for formats that allow one, and
//! return the canonical value for the decoder's family.

use std::borrow::Cow;

pub mod compression;
pub mod cursor;
pub mod format;
pub mod gifti;
pub mod layer;
pub mod mesh;
pub mod mz3;
pub mod options;
pub mod text;
pub mod tract;
pub mod vtk;

pub use cursor::{ByteCursor, Endian};
pub use format::{Family, FormatTag};
pub use layer::reconcile;
pub use options::ReaderConfiguration;
pub use vtk::VtkContent;

use crate::error::{MeshIoError, Result};
use crate::types::{Layer, Mesh, Tractogram};

/// Any decoded file.
#[derive(Debug, Clone)]
pub enum FileContent {
    Mesh(Mesh),
    Tractogram(Tractogram),
    Layer(Layer),
}

fn detect(name: &str, bytes: &[u8]) -> Result<FormatTag> {
    FormatTag::detect(name, bytes)
        .ok_or_else(|| MeshIoError::unsupported(format!("no decoder for '{}'", name)))
}

fn unwrap_gzip(tag: FormatTag, bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if tag.supports_gzip() {
        compression::maybe_decompress(bytes)
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

fn decode_mesh(tag: FormatTag, bytes: &[u8]) -> Result<Mesh> {
    match tag {
        FormatTag::Stl => mesh::read_stl(bytes),
        FormatTag::Ply => mesh::read_ply(bytes),
        FormatTag::Obj => mesh::read_obj(bytes),
        FormatTag::Geo => mesh::read_geo(bytes),
        FormatTag::Off => mesh::read_off(bytes),
        FormatTag::Ico => mesh::read_ico(bytes),
        FormatTag::X3d => mesh::read_x3d(bytes),
        FormatTag::Wrl => mesh::read_wrl(bytes),
        FormatTag::FreeSurfer => mesh::read_freesurfer(bytes),
        FormatTag::Asc => mesh::read_asc(bytes),
        FormatTag::Dfs => mesh::read_dfs(bytes),
        FormatTag::Srf => mesh::read_srf(bytes),
        FormatTag::Nv => mesh::read_nv(bytes),
        FormatTag::Gifti => gifti::read_gifti_mesh(bytes),
        FormatTag::Mz3 => mz3::read_mz3_mesh(bytes),
        FormatTag::Vtk => vtk::read_vtk_mesh(bytes),
        other => Err(MeshIoError::unsupported(format!("{} is not a mesh format", other))),
    }
}

fn decode_tractogram(tag: FormatTag, bytes: &[u8]) -> Result<Tractogram> {
    match tag {
        FormatTag::Trk => tract::read_trk(bytes),
        FormatTag::Tck => tract::read_tck(bytes),
        FormatTag::Tt => tract::read_tt(bytes),
        FormatTag::Trx => tract::read_trx(bytes),
        FormatTag::NimlTract => tract::read_niml_tract(bytes),
        FormatTag::Vtk => vtk::read_vtk_tractogram(bytes),
        other => Err(MeshIoError::unsupported(format!(
            "{} is not a tractogram format",
            other
        ))),
    }
}

fn decode_layer(
    tag: FormatTag,
    bytes: &[u8],
    n_vert: usize,
    config: &ReaderConfiguration,
) -> Result<Layer> {
    match tag {
        FormatTag::Curv => layer::read_curv(bytes, n_vert),
        FormatTag::Annot => layer::read_annot(bytes, n_vert, config),
        FormatTag::Mgh => layer::read_mgh(bytes, n_vert),
        FormatTag::Nifti => layer::read_nifti(bytes, n_vert, config),
        FormatTag::Smp => layer::read_smp(bytes, n_vert, config),
        FormatTag::Stc => layer::read_stc(bytes, n_vert),
        FormatTag::Tsf => layer::read_tsf(bytes, n_vert),
        FormatTag::Gifti => gifti::read_gifti_layer(bytes, n_vert),
        FormatTag::Mz3 => mz3::read_mz3_layer(bytes, n_vert),
        other => Err(MeshIoError::unsupported(format!("{} is not an overlay format", other))),
    }
}

/// Formats that can carry per-vertex overlays.
fn is_layer_format(tag: FormatTag) -> bool {
    tag.family() == Family::Layer || matches!(tag, FormatTag::Gifti | FormatTag::Mz3)
}

/// Decode a surface mesh.
pub fn read_mesh(name: &str, bytes: &[u8]) -> Result<Mesh> {
    let tag = detect(name, bytes)?;
    log::debug!("{}: decoding as {} mesh", name, tag);
    decode_mesh(tag, &unwrap_gzip(tag, bytes)?)
}

/// Decode a tractogram.
pub fn read_tractogram(name: &str, bytes: &[u8]) -> Result<Tractogram> {
    let tag = detect(name, bytes)?;
    log::debug!("{}: decoding as {} tractogram", name, tag);
    decode_tractogram(tag, &unwrap_gzip(tag, bytes)?)
}

/// Decode an overlay for a mesh of `n_vert` vertices with the default
/// (lenient) configuration.
///
/// A file no overlay decoder recognizes logs a warning and yields
/// `Ok(None)`.
pub fn read_layer(name: &str, bytes: &[u8], n_vert: usize) -> Result<Option<Layer>> {
    read_layer_with_options(name, bytes, n_vert, &ReaderConfiguration::default())
}

/// [`read_layer`] with explicit configuration.
pub fn read_layer_with_options(
    name: &str,
    bytes: &[u8],
    n_vert: usize,
    config: &ReaderConfiguration,
) -> Result<Option<Layer>> {
    let tag = match FormatTag::detect(name, bytes).filter(|&t| is_layer_format(t)) {
        Some(tag) => tag,
        None => {
            log::warn!("{}: not a recognized overlay format", name);
            return Ok(None);
        }
    };
    log::debug!("{}: decoding as {} overlay", name, tag);
    decode_layer(tag, &unwrap_gzip(tag, bytes)?, n_vert, config).map(Some)
}

/// Decode any supported file, routing by format family.
///
/// GIFTI and MZ3 files are read as overlays when `n_vert` is given and as
/// meshes otherwise; VTK files yield whichever family their cells form.
pub fn read(name: &str, bytes: &[u8], n_vert: Option<usize>) -> Result<FileContent> {
    let tag = detect(name, bytes)?;
    let data = unwrap_gzip(tag, bytes)?;
    let config = ReaderConfiguration::default();
    Ok(match (tag.family(), n_vert) {
        (Family::Layer, n) => FileContent::Layer(decode_layer(tag, &data, n.unwrap_or(0), &config)?),
        (Family::Tractogram, _) => FileContent::Tractogram(decode_tractogram(tag, &data)?),
        (Family::Mesh, Some(n)) if is_layer_format(tag) => {
            FileContent::Layer(decode_layer(tag, &data, n, &config)?)
        }
        (Family::Mesh, _) if tag == FormatTag::Vtk => match vtk::read_vtk(&data)? {
            VtkContent::Mesh(m) => FileContent::Mesh(m),
            VtkContent::Tractogram(t) => FileContent::Tractogram(t),
        },
        (Family::Mesh, _) => FileContent::Mesh(decode_mesh(tag, &data)?),
    })
}
