//! GIFTI surfaces and overlays (`.gii`)
//!
//! A GIFTI document is a list of `<DataArray>` elements. Point-set and
//! triangle arrays form a mesh; every other array is an overlay frame.
//! Array payloads may be ASCII, base64, or zlib-compressed base64.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;

use crate::error::{MeshIoError, Result};
use crate::io::compression::inflate_any;
use crate::io::cursor::Endian;
use crate::io::layer::assemble_layer;
use crate::io::text::{decode_text, parse_numbers, Tag, TagReader};
use crate::types::{ColorLookupTable, LabelLut, Layer, Mesh, ScalarArray, ScalarType};

pub const INTENT_POINTSET: &str = "NIFTI_INTENT_POINTSET";
pub const INTENT_TRIANGLE: &str = "NIFTI_INTENT_TRIANGLE";
pub const INTENT_LABEL: &str = "NIFTI_INTENT_LABEL";

/// Metadata key naming the hemisphere or structure a surface belongs to.
pub const ANATOMICAL_STRUCTURE_PRIMARY: &str = "AnatomicalStructurePrimary";

/// Element type named by a `DataType` attribute.
fn scalar_type(name: &str) -> Result<ScalarType> {
    Ok(match name {
        "NIFTI_TYPE_UINT8" => ScalarType::UInt8,
        "NIFTI_TYPE_INT8" => ScalarType::Int8,
        "NIFTI_TYPE_UINT16" => ScalarType::UInt16,
        "NIFTI_TYPE_INT16" => ScalarType::Int16,
        "NIFTI_TYPE_UINT32" => ScalarType::UInt32,
        "NIFTI_TYPE_INT32" => ScalarType::Int32,
        "NIFTI_TYPE_UINT64" => ScalarType::UInt64,
        "NIFTI_TYPE_INT64" => ScalarType::Int64,
        "NIFTI_TYPE_FLOAT32" => ScalarType::Float32,
        "NIFTI_TYPE_FLOAT64" => ScalarType::Float64,
        other => return Err(MeshIoError::unsupported(format!("GIFTI DataType {}", other))),
    })
}

/// Text of an element body with any `<![CDATA[...]]>` wrapper removed.
fn element_text(raw: &[u8]) -> String {
    let text = decode_text(raw);
    let t = text.trim();
    t.strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(t)
        .trim()
        .to_string()
}

/// Row-major copy of a column-major `rows x cols` array.
fn transpose<T: Copy>(values: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for r in 0..rows {
        for c in 0..cols {
            out.push(values[c * rows + r]);
        }
    }
    out
}

/// One decoded `<DataArray>`.
#[derive(Debug, Clone)]
pub struct DataArray {
    pub intent: String,
    /// `Dim0`, `Dim1`, ... in file order.
    pub dims: Vec<usize>,
    /// Values in row-major order.
    pub values: ScalarArray,
}

impl DataArray {
    /// Rows of the array (`Dim0`).
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Columns of the array, 1 for vectors.
    pub fn cols(&self) -> usize {
        self.dims.iter().skip(1).product::<usize>().max(1)
    }
}

/// Attributes of a `<DataArray>` still waiting for its `<Data>`.
#[derive(Debug)]
struct ArrayHeader {
    intent: String,
    ty: ScalarType,
    dims: Vec<usize>,
    column_major: bool,
    encoding: String,
    endian: Endian,
    external: bool,
}

impl ArrayHeader {
    fn parse(tag: &Tag<'_>) -> Result<Self> {
        let ty = scalar_type(tag.attribute("DataType").unwrap_or("NIFTI_TYPE_FLOAT32"))?;
        let n_dims = tag.numeric_attribute::<usize>("Dimensionality").unwrap_or(1).min(6);
        let dims = (0..n_dims)
            .map(|k| tag.numeric_attribute::<usize>(&format!("Dim{}", k)).unwrap_or(1))
            .collect();
        Ok(Self {
            intent: tag.attribute("Intent").unwrap_or("NIFTI_INTENT_NONE").to_string(),
            ty,
            dims,
            column_major: tag.attribute("ArrayIndexingOrder") == Some("ColumnMajorOrder"),
            encoding: tag.attribute("Encoding").unwrap_or("ASCII").to_string(),
            endian: Endian::from_flag(tag.attribute("Endian") != Some("BigEndian")),
            external: tag
                .attribute("ExternalFileName")
                .map_or(false, |f| !f.trim().is_empty()),
        })
    }

    fn count(&self) -> Result<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| MeshIoError::malformed("GIFTI array dimensions overflow"))
    }

    fn decode(&self, content: &[u8]) -> Result<ScalarArray> {
        if self.external {
            return Err(MeshIoError::unsupported(
                "GIFTI ExternalFileBinary payloads are not embedded",
            ));
        }
        let count = self.count()?;
        let values = match self.encoding.as_str() {
            "ASCII" => self.decode_ascii(&decode_text(content))?,
            "Base64Binary" | "GZipBase64Binary" => {
                let text: Vec<u8> = content
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                let raw = STANDARD
                    .decode(&text)
                    .map_err(|e| MeshIoError::malformed(format!("GIFTI base64: {}", e)))?;
                let raw = if self.encoding == "GZipBase64Binary" {
                    inflate_any(&raw)?
                } else {
                    raw
                };
                ScalarArray::from_bytes(self.ty, &raw, count, self.endian)?
            }
            other => {
                return Err(MeshIoError::unsupported(format!("GIFTI encoding {}", other)));
            }
        };
        if values.len() != count {
            return Err(MeshIoError::malformed(format!(
                "GIFTI array holds {} values, dimensions give {}",
                values.len(),
                count
            )));
        }
        if self.column_major && self.dims.len() == 2 && self.dims[1] > 1 {
            let (rows, cols) = (self.dims[0], self.dims[1]);
            return Ok(match values {
                ScalarArray::Float32(v) => ScalarArray::Float32(transpose(&v, rows, cols)),
                ScalarArray::Float64(v) => ScalarArray::Float64(transpose(&v, rows, cols)),
                ScalarArray::Int32(v) => ScalarArray::Int32(transpose(&v, rows, cols)),
                ScalarArray::UInt32(v) => ScalarArray::UInt32(transpose(&v, rows, cols)),
                ScalarArray::Int16(v) => ScalarArray::Int16(transpose(&v, rows, cols)),
                ScalarArray::UInt16(v) => ScalarArray::UInt16(transpose(&v, rows, cols)),
                ScalarArray::Int8(v) => ScalarArray::Int8(transpose(&v, rows, cols)),
                ScalarArray::UInt8(v) => ScalarArray::UInt8(transpose(&v, rows, cols)),
            });
        }
        Ok(values)
    }

    fn decode_ascii(&self, text: &str) -> Result<ScalarArray> {
        Ok(match self.ty {
            ScalarType::Float32 | ScalarType::Float16 => ScalarArray::Float32(parse_numbers(text)?),
            ScalarType::Float64 => ScalarArray::Float64(parse_numbers(text)?),
            _ => {
                let wide: Vec<i64> = parse_numbers(text)?;
                ScalarArray::Int32(
                    wide.into_iter()
                        .map(|v| {
                            i32::try_from(v).map_err(|_| {
                                MeshIoError::IntegerOverflow(format!(
                                    "GIFTI value {} exceeds 32 bits",
                                    v
                                ))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                )
            }
        })
    }
}

/// Parsed GIFTI document.
#[derive(Debug, Clone, Default)]
pub struct GiftiDocument {
    pub arrays: Vec<DataArray>,
    /// Document-level `<MD>` name/value pairs.
    pub metadata: IndexMap<String, String>,
    pub label_table: Option<ColorLookupTable>,
}

impl GiftiDocument {
    fn first_with_intent(&self, intent: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.intent == intent)
    }

    /// Arrays that are neither geometry nor topology.
    pub fn overlay_arrays(&self) -> impl Iterator<Item = &DataArray> {
        self.arrays
            .iter()
            .filter(|a| a.intent != INTENT_POINTSET && a.intent != INTENT_TRIANGLE)
    }
}

/// Parse every data array, the label table and document metadata.
pub fn parse_gifti(bytes: &[u8]) -> Result<GiftiDocument> {
    let mut doc = GiftiDocument::default();
    let mut reader = TagReader::new(bytes);
    let mut seen_root = false;
    let mut header: Option<ArrayHeader> = None;
    let mut pending_values: Option<ScalarArray> = None;
    let mut md_name: Option<String> = None;
    let mut table = ColorLookupTable::default();

    while let Some(tag) = reader.next_tag() {
        if tag.is_declaration() {
            continue;
        }
        if tag.is_closing() {
            if tag.name() == "DataArray" {
                if let (Some(h), Some(values)) = (header.take(), pending_values.take()) {
                    doc.arrays.push(DataArray {
                        intent: h.intent,
                        dims: h.dims,
                        values,
                    });
                }
            }
            continue;
        }
        match tag.name() {
            "GIFTI" => seen_root = true,
            "DataArray" => header = Some(ArrayHeader::parse(&tag)?),
            "Data" if !tag.is_self_closing() => {
                let content = reader
                    .content_until_close("Data")
                    .ok_or_else(|| MeshIoError::malformed("GIFTI <Data> is unterminated"))?;
                if let Some(h) = header.as_ref() {
                    pending_values = Some(h.decode(content)?);
                }
            }
            "Name" if !tag.is_self_closing() => {
                md_name = reader.content_until_close("Name").map(element_text);
            }
            "Value" if !tag.is_self_closing() => {
                let value = reader.content_until_close("Value").map(element_text);
                if let (Some(name), Some(value)) = (md_name.take(), value) {
                    if header.is_none() {
                        doc.metadata.entry(name).or_insert(value);
                    }
                }
            }
            "Label" => {
                let id = tag
                    .numeric_attribute::<i32>("Key")
                    .or_else(|| tag.numeric_attribute::<i32>("Index"))
                    .unwrap_or(table.len() as i32);
                let channel = |name: &str| {
                    let v = tag.numeric_attribute::<f32>(name).unwrap_or(1.0);
                    (v.clamp(0.0, 1.0) * 255.0).round() as u8
                };
                let rgba = [channel("Red"), channel("Green"), channel("Blue"), channel("Alpha")];
                let name = if tag.is_self_closing() {
                    String::new()
                } else {
                    reader.content_until_close("Label").map(element_text).unwrap_or_default()
                };
                table.push(id, rgba, name);
            }
            _ => {}
        }
    }
    if !seen_root {
        return Err(MeshIoError::malformed("file has no <GIFTI> element"));
    }
    if !table.is_empty() {
        doc.label_table = Some(table);
    }
    log::debug!(
        "GIFTI: {} arrays, {} metadata entries",
        doc.arrays.len(),
        doc.metadata.len()
    );
    Ok(doc)
}

/// Decode the surface of a GIFTI file.
pub fn read_gifti_mesh(bytes: &[u8]) -> Result<Mesh> {
    let doc = parse_gifti(bytes)?;
    let points = doc
        .first_with_intent(INTENT_POINTSET)
        .ok_or_else(|| MeshIoError::malformed("GIFTI file has no NIFTI_INTENT_POINTSET array"))?;
    let triangles = doc
        .first_with_intent(INTENT_TRIANGLE)
        .ok_or_else(|| MeshIoError::malformed("GIFTI file has no NIFTI_INTENT_TRIANGLE array"))?;
    if points.cols() != 3 || triangles.cols() != 3 {
        return Err(MeshIoError::malformed(format!(
            "GIFTI geometry arrays have {} and {} columns, expected 3",
            points.cols(),
            triangles.cols()
        )));
    }
    let mut mesh = Mesh::new(points.values.to_f32(), triangles.values.to_u32()?);
    mesh.anatomical_structure_primary = doc.metadata.get(ANATOMICAL_STRUCTURE_PRIMARY).cloned();
    let n_overlays = doc.overlay_arrays().count();
    if n_overlays > 0 {
        log::debug!("GIFTI mesh: {} overlay arrays not attached", n_overlays);
    }
    mesh.checked()
}

/// Decode the overlay arrays of a GIFTI file as frames of one layer.
///
/// A 2-D array contributes one frame per column. A label table becomes the
/// layer's label lookup.
pub fn read_gifti_layer(bytes: &[u8], n_vert: usize) -> Result<Layer> {
    let doc = parse_gifti(bytes)?;
    let mut values = Vec::new();
    let mut n_vert_layer = 0usize;
    let mut is_label = false;
    for array in doc.overlay_arrays() {
        let (rows, cols) = (array.rows(), array.cols());
        if n_vert_layer == 0 {
            n_vert_layer = rows;
        } else if rows != n_vert_layer {
            return Err(MeshIoError::malformed(format!(
                "GIFTI overlay arrays disagree on vertex count ({} vs {})",
                rows, n_vert_layer
            )));
        }
        is_label |= array.intent == INTENT_LABEL;
        let v = array.values.to_f32();
        if cols == 1 {
            values.extend(v);
        } else {
            for c in 0..cols {
                values.extend((0..rows).map(|r| v[r * cols + c]));
            }
        }
    }
    if values.is_empty() {
        return Err(MeshIoError::malformed("GIFTI file has no overlay arrays"));
    }
    let mut layer = assemble_layer(values, n_vert_layer, n_vert)?;
    match doc.label_table {
        Some(table) => {
            layer = layer.with_label_lut(Some(Arc::new(LabelLut::build(table)?)));
        }
        None if is_label => layer
            .notifications
            .warn("GIFTI label array has no <LabelTable>; showing raw keys"),
        None => {}
    }
    Ok(layer)
}
