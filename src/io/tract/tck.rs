//! MRtrix streamlines (`.tck`) and the shared MRtrix key/value preamble

use indexmap::IndexMap;

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::text::LineReader;
use crate::types::{StreamlineBuilder, Tractogram};

pub const TCK_MAGIC: &str = "mrtrix tracks";
pub const TSF_MAGIC: &str = "mrtrix track scalars";

/// Parsed MRtrix preamble.
#[derive(Debug, Clone, PartialEq)]
pub struct MrtrixHeader {
    /// Header keys in file order; repeated keys are joined with newlines.
    pub fields: IndexMap<String, String>,
    /// Byte offset of the first value, from the `file:` key.
    pub data_offset: usize,
    pub endian: Endian,
    /// `Float64LE`/`Float64BE` data.
    pub double: bool,
}

impl MrtrixHeader {
    /// Parse the `key: value` lines between `magic` and `END`.
    pub fn parse(bytes: &[u8], magic: &str) -> Result<Self> {
        let mut lines = LineReader::new(bytes);
        let first = lines.expect_line("MRtrix magic")?;
        if first != magic {
            return Err(MeshIoError::malformed(format!(
                "expected '{}' header, found '{}'",
                magic, first
            )));
        }
        let mut fields: IndexMap<String, String> = IndexMap::new();
        loop {
            let line = lines.expect_line("MRtrix header END")?;
            if line == "END" {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            fields
                .entry(key.trim().to_string())
                .and_modify(|v| {
                    v.push('\n');
                    v.push_str(&value);
                })
                .or_insert(value);
        }

        let file = fields
            .get("file")
            .ok_or_else(|| MeshIoError::malformed("MRtrix header has no 'file' key"))?;
        let data_offset = file
            .split_whitespace()
            .last()
            .and_then(|t| t.parse::<usize>().ok())
            .ok_or_else(|| MeshIoError::malformed(format!("bad MRtrix file entry '{}'", file)))?;
        let datatype = fields.get("datatype").map(String::as_str).unwrap_or("Float32LE");
        let (double, endian) = match datatype.to_ascii_lowercase().as_str() {
            "float32le" | "float32" => (false, Endian::Little),
            "float32be" => (false, Endian::Big),
            "float64le" | "float64" => (true, Endian::Little),
            "float64be" => (true, Endian::Big),
            other => {
                return Err(MeshIoError::unsupported(format!("MRtrix datatype {}", other)));
            }
        };
        Ok(Self {
            fields,
            data_offset,
            endian,
            double,
        })
    }

    /// Declared element count (`count:`), if present.
    pub fn count(&self) -> Option<usize> {
        self.fields.get("count")?.trim().parse().ok()
    }

    /// Every value from the data offset to the end of the buffer.
    pub fn read_values(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        if self.data_offset > bytes.len() {
            return Err(MeshIoError::malformed(format!(
                "MRtrix data offset {} beyond {} bytes",
                self.data_offset,
                bytes.len()
            )));
        }
        let size = if self.double { 8 } else { 4 };
        let n = (bytes.len() - self.data_offset) / size;
        let mut c = ByteCursor::at(bytes, self.data_offset);
        if self.double {
            Ok(c.read_f64_vec(n, self.endian)?.into_iter().map(|v| v as f32).collect())
        } else {
            c.read_f32_vec(n, self.endian)
        }
    }
}

/// Decode a TCK file.
///
/// A triple containing NaN closes the current streamline; one containing
/// an infinity ends the data.
pub fn read_tck(bytes: &[u8]) -> Result<Tractogram> {
    let hdr = MrtrixHeader::parse(bytes, TCK_MAGIC)?;
    let values = hdr.read_values(bytes)?;
    let mut builder = StreamlineBuilder::with_capacity(values.len() / 3, 0);
    for p in values.chunks_exact(3) {
        if p.iter().any(|v| v.is_infinite()) {
            break;
        }
        if p.iter().any(|v| v.is_nan()) {
            builder.end_streamline()?;
            continue;
        }
        builder.push_point(p[0], p[1], p[2]);
    }
    let mut tract = builder.finish()?;
    if let Some(count) = hdr.count() {
        if count != tract.streamline_count() {
            tract.notifications.warn(format!(
                "TCK header declares {} streamlines, found {}",
                count,
                tract.streamline_count()
            ));
        }
    }
    log::debug!(
        "TCK: {} streamlines, {} points",
        tract.streamline_count(),
        tract.point_count()
    );
    tract.checked()
}
