//! CIfTI-2 dense overlays (`.dscalar.nii`, `.dtseries.nii`)
//!
//! The embedded XML lists brain models, each a slice of the brainordinate
//! axis covering one structure. One surface model is chosen for the mesh
//! and its sparse values are scattered to a dense per-vertex array.

use crate::error::{MeshIoError, Result};
use crate::io::layer::{assemble_layer, icosphere_order, reconcile};
use crate::io::layer::nifti::{NiftiHeader, NIFTI_ECODE_CIFTI};
use crate::io::options::ReaderConfiguration;
use crate::io::text::{parse_numbers, TagReader};
use crate::notification::NotificationCollection;
use crate::types::Layer;

const SURFACE_MODEL: &str = "CIFTI_MODEL_TYPE_SURFACE";

/// One `<BrainModel>` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrainModel {
    pub index_offset: usize,
    pub index_count: usize,
    pub model_type: String,
    pub brain_structure: String,
    pub surface_number_of_vertices: usize,
    /// Mesh vertex of each brainordinate in this model.
    pub vertex_indices: Vec<usize>,
}

impl BrainModel {
    pub fn is_surface(&self) -> bool {
        self.model_type == SURFACE_MODEL
    }
}

/// Brain models plus the matrix dimension they index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CiftiLayout {
    pub models: Vec<BrainModel>,
    /// 0 when brainordinates vary fastest in the data block.
    pub brain_model_dim: usize,
}

/// `CIFTI_STRUCTURE_CORTEX_LEFT` and `CortexLeft` both become `CORTEXLEFT`.
pub fn normalize_structure(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase();
    let bare = upper.strip_prefix("CIFTI_STRUCTURE_").unwrap_or(&upper);
    bare.chars().filter(|&c| c != '_').collect()
}

/// Pull the brain-model table out of the CIfTI XML.
pub fn parse_layout(xml: &[u8]) -> Result<CiftiLayout> {
    let mut layout = CiftiLayout {
        models: Vec::new(),
        brain_model_dim: 1,
    };
    let mut current_dim: Option<usize> = None;
    let mut reader = TagReader::new(xml);
    while let Some(tag) = reader.next_tag() {
        if tag.is_closing() || tag.is_declaration() {
            continue;
        }
        match tag.name() {
            "MatrixIndicesMap" => {
                current_dim = tag
                    .attribute("AppliesToMatrixDimension")
                    .and_then(|v| v.split(',').next())
                    .and_then(|v| v.trim().parse().ok());
            }
            "BrainModel" => {
                if let Some(d) = current_dim {
                    layout.brain_model_dim = d;
                }
                let mut model = BrainModel {
                    index_offset: tag.numeric_attribute("IndexOffset").unwrap_or(0),
                    index_count: tag.numeric_attribute("IndexCount").unwrap_or(0),
                    model_type: tag.attribute("ModelType").unwrap_or_default().to_string(),
                    brain_structure: tag.attribute("BrainStructure").unwrap_or_default().to_string(),
                    surface_number_of_vertices: tag
                        .numeric_attribute("SurfaceNumberOfVertices")
                        .unwrap_or(0),
                    vertex_indices: Vec::new(),
                };
                if !tag.is_self_closing() {
                    while let Some(inner) = reader.next_tag() {
                        if inner.is_closing() && inner.name() == "BrainModel" {
                            break;
                        }
                        if !inner.is_closing() && inner.name() == "VertexIndices" {
                            let text = reader.content_until_close("VertexIndices").unwrap_or(&[]);
                            model.vertex_indices =
                                parse_numbers(&crate::io::text::decode_text(text))?;
                        }
                    }
                }
                layout.models.push(model);
            }
            _ => {}
        }
    }
    Ok(layout)
}

fn select_model<'a>(
    models: &'a [BrainModel],
    n_vert: usize,
    config: &ReaderConfiguration,
    notes: &mut NotificationCollection,
) -> Option<&'a BrainModel> {
    let surfaces: Vec<&BrainModel> = models.iter().filter(|m| m.is_surface()).collect();
    if let Some(wanted) = config.anatomical_structure_primary.as_deref() {
        let wanted = normalize_structure(wanted);
        if let Some(m) = surfaces
            .iter()
            .find(|m| normalize_structure(&m.brain_structure) == wanted)
        {
            return Some(*m);
        }
    }
    let fallback = surfaces
        .iter()
        .find(|m| m.surface_number_of_vertices == n_vert)
        .or_else(|| surfaces.first())?;
    notes.warn(format!(
        "no CIfTI brain model matches the mesh structure; using {}",
        fallback.brain_structure
    ));
    Some(*fallback)
}

/// Decode the surface part of a CIfTI file for a mesh of `n_vert` vertices.
pub fn read_cifti(
    hdr: &NiftiHeader,
    raw: &[u8],
    n_vert: usize,
    config: &ReaderConfiguration,
) -> Result<Layer> {
    let xml = hdr
        .extension(NIFTI_ECODE_CIFTI)
        .ok_or_else(|| MeshIoError::malformed("CIfTI extension missing"))?;
    let layout = parse_layout(xml)?;
    let data = hdr.read_values(raw)?;
    let dim0 = hdr.dim_size(5);
    let dim1 = hdr.dim_size(6);
    let (n_brainordinates, n_maps) = if layout.brain_model_dim == 0 {
        (dim0, dim1)
    } else {
        (dim1, dim0)
    };

    let mut notes = NotificationCollection::new();
    let model = select_model(&layout.models, n_vert, config, &mut notes)
        .ok_or_else(|| MeshIoError::malformed("CIfTI file has no surface brain model"))?;
    if model.index_offset.saturating_add(model.index_count) > n_brainordinates {
        return Err(MeshIoError::malformed(format!(
            "brain model {} spans past {} brainordinates",
            model.brain_structure, n_brainordinates
        )));
    }
    let identity: Vec<usize>;
    let indices = if model.vertex_indices.is_empty() {
        identity = (0..model.index_count).collect();
        &identity
    } else {
        &model.vertex_indices
    };
    if indices.len() != model.index_count {
        return Err(MeshIoError::malformed(format!(
            "brain model {} lists {} vertices for {} brainordinates",
            model.brain_structure,
            indices.len(),
            model.index_count
        )));
    }
    let n_surf = if model.surface_number_of_vertices > 0 {
        model.surface_number_of_vertices
    } else {
        n_vert
    };
    if let Some(&bad) = indices.iter().find(|&&v| v >= n_surf) {
        return Err(MeshIoError::malformed(format!(
            "CIfTI vertex index {} exceeds {} surface vertices",
            bad, n_surf
        )));
    }

    let value_at = |map: usize, b: usize| -> f32 {
        let k = if layout.brain_model_dim == 0 {
            b + map * dim0
        } else {
            map + b * dim0
        };
        data.get(k).copied().unwrap_or(0.0)
    };
    let decimates = icosphere_order(n_surf).is_some() && reconcile(n_surf, n_vert) == n_vert;
    if n_vert > 0 && n_surf != n_vert && !decimates {
        return Err(MeshIoError::VertexCountMismatch {
            layer: n_surf,
            mesh: n_vert,
        });
    }
    let dense_len = n_surf
        .checked_mul(n_maps)
        .ok_or_else(|| MeshIoError::malformed("CIfTI surface size overflows"))?;
    let mut dense = Vec::new();
    dense.try_reserve_exact(dense_len).map_err(|_| {
        MeshIoError::malformed(format!("CIfTI surface of {} values cannot be allocated", dense_len))
    })?;
    dense.resize(dense_len, 0.0f32);
    for map in 0..n_maps {
        let frame = &mut dense[map * n_surf..(map + 1) * n_surf];
        for (i, &v) in indices.iter().enumerate() {
            frame[v] = value_at(map, model.index_offset + i);
        }
    }
    log::debug!(
        "CIfTI {}: {} of {} vertices, {} maps",
        model.brain_structure,
        model.index_count,
        n_surf,
        n_maps
    );

    let mut layer = assemble_layer(dense, n_surf, n_vert)?;
    layer.notifications.extend(notes);
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<CIFTI Version="2">
 <Matrix>
  <MatrixIndicesMap AppliesToMatrixDimension="0" IndicesMapToDataType="CIFTI_INDEX_TYPE_SCALARS"/>
  <MatrixIndicesMap AppliesToMatrixDimension="1" IndicesMapToDataType="CIFTI_INDEX_TYPE_BRAIN_MODELS">
   <BrainModel IndexOffset="0" IndexCount="2" ModelType="CIFTI_MODEL_TYPE_SURFACE"
     BrainStructure="CIFTI_STRUCTURE_CORTEX_LEFT" SurfaceNumberOfVertices="4">
    <VertexIndices>1 3</VertexIndices>
   </BrainModel>
   <BrainModel IndexOffset="2" IndexCount="1" ModelType="CIFTI_MODEL_TYPE_SURFACE"
     BrainStructure="CIFTI_STRUCTURE_CORTEX_RIGHT" SurfaceNumberOfVertices="3">
    <VertexIndices>2</VertexIndices>
   </BrainModel>
  </MatrixIndicesMap>
 </Matrix>
</CIFTI>"#;

    /// NIfTI-2 dscalar with one map over three brainordinates.
    fn cifti_bytes(values: &[f32]) -> Vec<u8> {
        cifti_bytes_with(XML, values)
    }

    fn cifti_bytes_with(xml: &str, values: &[f32]) -> Vec<u8> {
        let mut out = vec![0u8; 544];
        out[0..4].copy_from_slice(&540i32.to_le_bytes());
        out[12..14].copy_from_slice(&16i16.to_le_bytes());
        let dims = [6i64, 1, 1, 1, 1, 1, values.len() as i64, 1];
        for (k, d) in dims.iter().enumerate() {
            out[16 + k * 8..24 + k * 8].copy_from_slice(&d.to_le_bytes());
        }
        out[504..508].copy_from_slice(&3006i32.to_le_bytes());
        out[540] = 1;
        let mut xml = xml.as_bytes().to_vec();
        while (xml.len() + 8) % 16 != 0 {
            xml.push(0);
        }
        out.extend_from_slice(&((xml.len() + 8) as i32).to_le_bytes());
        out.extend_from_slice(&NIFTI_ECODE_CIFTI.to_le_bytes());
        out.extend_from_slice(&xml);
        let vox_offset = out.len() as i64;
        out[168..176].copy_from_slice(&vox_offset.to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_normalize_structure() {
        assert_eq!(normalize_structure("CIFTI_STRUCTURE_CORTEX_LEFT"), "CORTEXLEFT");
        assert_eq!(normalize_structure("CortexLeft"), "CORTEXLEFT");
    }

    #[test]
    fn test_layout() {
        let layout = parse_layout(XML.as_bytes()).unwrap();
        assert_eq!(layout.brain_model_dim, 1);
        assert_eq!(layout.models.len(), 2);
        assert_eq!(layout.models[0].vertex_indices, vec![1, 3]);
        assert_eq!(layout.models[1].index_offset, 2);
    }

    #[test]
    fn test_structure_match_scatters() {
        let bytes = cifti_bytes(&[10.0, 20.0, 30.0]);
        let hdr = NiftiHeader::parse(&bytes).unwrap();
        assert!(hdr.is_cifti());
        let cfg = ReaderConfiguration::new().anatomical_structure_primary("CortexRight");
        let layer = read_cifti(&hdr, &bytes, 3, &cfg).unwrap();
        assert_eq!(layer.values, vec![0.0, 0.0, 30.0]);
        assert!(layer.notifications.is_empty());
    }

    #[test]
    fn test_vertex_count_fallback() {
        let bytes = cifti_bytes(&[10.0, 20.0, 30.0]);
        let layer =
            crate::io::layer::read_nifti(&bytes, 4, &ReaderConfiguration::default()).unwrap();
        assert_eq!(layer.values, vec![0.0, 10.0, 0.0, 20.0]);
        assert_eq!(layer.notifications.len(), 1);
    }

    #[test]
    fn test_oversized_surface_rejected_before_scatter() {
        let xml = XML.replace(
            "SurfaceNumberOfVertices=\"4\"",
            "SurfaceNumberOfVertices=\"18446744073709551615\"",
        );
        let bytes = cifti_bytes_with(&xml, &[10.0, 20.0, 30.0]);
        let hdr = NiftiHeader::parse(&bytes).unwrap();
        let cfg = ReaderConfiguration::new().anatomical_structure_primary("CortexLeft");
        assert!(matches!(
            read_cifti(&hdr, &bytes, 3, &cfg),
            Err(MeshIoError::VertexCountMismatch { mesh: 3, .. })
        ));
    }
}
