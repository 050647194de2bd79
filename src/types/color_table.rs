//! Label color tables
//!
//! Atlas formats (FreeSurfer ANNOT, MGH embedded tables, GIFTI label tables,
//! MZ3 label meshes) all store labels as parallel `R, G, B, A, I, labels`
//! arrays. [`LabelLut::build`] turns those arrays into a dense lookup the
//! renderer can index directly by scalar value.

use crate::error::{MeshIoError, Result};

/// Largest span of label ids accepted for a dense lookup.
const MAX_LABEL_SPAN: i64 = 1 << 24;

/// Parallel label arrays as stored in the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorLookupTable {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
    /// Alpha; when empty every label is opaque.
    pub a: Vec<u8>,
    /// Structure ids; when empty labels are numbered `0..n`.
    pub i: Vec<i32>,
    /// Structure names; may be empty.
    pub labels: Vec<String>,
}

impl ColorLookupTable {
    /// Number of labels in the table.
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Append one label.
    pub fn push(&mut self, id: i32, rgba: [u8; 4], label: impl Into<String>) {
        self.r.push(rgba[0]);
        self.g.push(rgba[1]);
        self.b.push(rgba[2]);
        self.a.push(rgba[3]);
        self.i.push(id);
        self.labels.push(label.into());
    }

    /// Index of the entry with structure id `id`.
    pub fn position_of_id(&self, id: i32) -> Option<usize> {
        if self.i.is_empty() {
            return usize::try_from(id).ok().filter(|&k| k < self.len());
        }
        self.i.iter().position(|&v| v == id)
    }

    /// Structure id of entry `k`.
    pub fn id_at(&self, k: usize) -> i32 {
        self.i.get(k).copied().unwrap_or(k as i32)
    }
}

/// Renderer-ready label lookup, indexed by `value - min`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLut {
    table: ColorLookupTable,
    lut: Vec<[u8; 4]>,
    labels: Vec<String>,
    min: i32,
    max: i32,
}

impl LabelLut {
    /// Build a dense lookup from parallel label arrays.
    ///
    /// Ids missing from the table map to fully transparent black with an
    /// empty name.
    pub fn build(table: ColorLookupTable) -> Result<Self> {
        let n = table.len();
        if table.g.len() != n || table.b.len() != n {
            return Err(MeshIoError::InvalidColorTable(format!(
                "R/G/B lengths differ ({}, {}, {})",
                n,
                table.g.len(),
                table.b.len()
            )));
        }
        if !table.a.is_empty() && table.a.len() != n {
            return Err(MeshIoError::InvalidColorTable(format!(
                "alpha has {} entries for {} colors",
                table.a.len(),
                n
            )));
        }
        if !table.i.is_empty() && table.i.len() != n {
            return Err(MeshIoError::InvalidColorTable(format!(
                "index has {} entries for {} colors",
                table.i.len(),
                n
            )));
        }
        if !table.labels.is_empty() && table.labels.len() != n {
            return Err(MeshIoError::InvalidColorTable(format!(
                "{} labels for {} colors",
                table.labels.len(),
                n
            )));
        }
        if n == 0 {
            return Err(MeshIoError::InvalidColorTable("table is empty".into()));
        }

        let ids: Vec<i32> = (0..n).map(|k| table.id_at(k)).collect();
        let min = ids.iter().copied().min().unwrap_or(0);
        let max = ids.iter().copied().max().unwrap_or(0);
        let span = max as i64 - min as i64 + 1;
        if span > MAX_LABEL_SPAN {
            return Err(MeshIoError::InvalidColorTable(format!(
                "label ids span {} values",
                span
            )));
        }

        let mut lut = vec![[0u8; 4]; span as usize];
        let mut labels = vec![String::new(); span as usize];
        for (k, &id) in ids.iter().enumerate() {
            let slot = (id - min) as usize;
            let alpha = table.a.get(k).copied().unwrap_or(255);
            lut[slot] = [table.r[k], table.g[k], table.b[k], alpha];
            if let Some(name) = table.labels.get(k) {
                labels[slot] = name.clone();
            }
        }

        Ok(Self {
            table,
            lut,
            labels,
            min,
            max,
        })
    }

    /// Smallest label id.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Largest label id.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// The parallel arrays this lookup was built from.
    pub fn table(&self) -> &ColorLookupTable {
        &self.table
    }

    /// Dense RGBA entries from `min` to `max`.
    pub fn entries(&self) -> &[[u8; 4]] {
        &self.lut
    }

    fn slot(&self, value: f32) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let id = value.round() as i64;
        if id < self.min as i64 || id > self.max as i64 {
            return None;
        }
        Some((id - self.min as i64) as usize)
    }

    /// RGBA color for a scalar value.
    pub fn rgba(&self, value: f32) -> Option<[u8; 4]> {
        self.slot(value).map(|s| self.lut[s])
    }

    /// Structure name for a scalar value.
    pub fn label(&self, value: f32) -> Option<&str> {
        self.slot(value).map(|s| self.labels[s].as_str())
    }
}
