//! Legacy VTK polydata (`.vtk`, `.fib`)
//!
//! Polygons and triangle strips give a mesh; a file holding only `LINES`
//! gives a tractogram. Both the classic `count, ids...` cell layout and
//! the `OFFSETS`/`CONNECTIVITY` layout of VTK 5 files are read, in ASCII
//! and big-endian BINARY encodings.

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{ByteCursor, Endian};
use crate::io::mesh::{fan_triangulate, strip_triangulate};
use crate::io::text::decode_text;
use crate::types::{Mesh, StreamlineBuilder, Tractogram};

const BE: Endian = Endian::Big;

/// A VTK file decodes to either family depending on its cells.
#[derive(Debug, Clone)]
pub enum VtkContent {
    Mesh(Mesh),
    Tractogram(Tractogram),
}

/// Line and payload reader over a legacy VTK body.
struct VtkReader<'a> {
    data: &'a [u8],
    pos: usize,
    binary: bool,
}

impl<'a> VtkReader<'a> {
    /// Next line, trimmed, including blank ones.
    fn raw_line(&mut self) -> Option<String> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.pos += (end + 1).min(rest.len());
        Some(decode_text(&rest[..end]).trim().to_string())
    }

    /// Next non-blank line.
    fn line(&mut self) -> Option<String> {
        loop {
            let line = self.raw_line()?;
            if !line.is_empty() {
                return Some(line);
            }
        }
    }

    /// `count` whitespace-separated ASCII tokens, spanning lines.
    fn tokens(&mut self, count: usize) -> Result<Vec<&'a str>> {
        let mut out = Vec::new();
        while out.len() < count {
            let rest = &self.data[self.pos.min(self.data.len())..];
            let start = rest
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .ok_or_else(|| {
                    MeshIoError::malformed(format!(
                        "VTK data ends after {} of {} values",
                        out.len(),
                        count
                    ))
                })?;
            let len = rest[start..]
                .iter()
                .position(|b| b.is_ascii_whitespace())
                .unwrap_or(rest.len() - start);
            let token = std::str::from_utf8(&rest[start..start + len])
                .map_err(|_| MeshIoError::malformed("VTK ASCII data is not text"))?;
            out.push(token);
            self.pos += start + len;
        }
        Ok(out)
    }

    fn floats(&mut self, count: usize, ty: &str) -> Result<Vec<f32>> {
        if !self.binary {
            return self
                .tokens(count)?
                .into_iter()
                .map(|t| {
                    t.parse::<f32>()
                        .map_err(|_| MeshIoError::malformed(format!("invalid VTK value '{}'", t)))
                })
                .collect();
        }
        let mut c = ByteCursor::at(self.data, self.pos);
        let values = match ty {
            "float" => c.read_f32_vec(count, BE)?,
            "double" => c.read_f64_vec(count, BE)?.into_iter().map(|v| v as f32).collect(),
            other => {
                return Err(MeshIoError::UnsupportedFormat(format!(
                    "VTK point type '{}'",
                    other
                )))
            }
        };
        self.pos = c.position();
        Ok(values)
    }

    /// Integer list, 32-bit unless declared `vtktypeint64`.
    fn ints(&mut self, count: usize, ty: &str) -> Result<Vec<u32>> {
        if !self.binary {
            return self
                .tokens(count)?
                .into_iter()
                .map(|t| {
                    let v: i64 = t.parse().map_err(|_| {
                        MeshIoError::malformed(format!("invalid VTK index '{}'", t))
                    })?;
                    u32::try_from(v).map_err(|_| {
                        MeshIoError::IntegerOverflow(format!("VTK index {} exceeds 32 bits", v))
                    })
                })
                .collect();
        }
        let mut c = ByteCursor::at(self.data, self.pos);
        let values = if ty == "vtktypeint64" {
            c.bytes_at(c.position(), count.saturating_mul(8))?;
            (0..count)
                .map(|_| c.read_u64_as_u32(BE))
                .collect::<Result<Vec<_>>>()?
        } else {
            c.read_i32_vec(count, BE)?
                .into_iter()
                .map(|v| {
                    u32::try_from(v)
                        .map_err(|_| MeshIoError::malformed(format!("negative VTK index {}", v)))
                })
                .collect::<Result<Vec<_>>>()?
        };
        self.pos = c.position();
        Ok(values)
    }

    /// Cells of a `POLYGONS`/`LINES`/`TRIANGLE_STRIPS` section whose header
    /// declared `a b`.
    fn cells(&mut self, a: usize, b: usize) -> Result<Vec<Vec<u32>>> {
        let mark = self.pos;
        match self.line() {
            Some(line) if line.starts_with("OFFSETS") => {
                let ty = line.split_whitespace().nth(1).unwrap_or("vtktypeint32").to_string();
                let offsets = self.ints(a, &ty)?;
                let conn_line = self
                    .line()
                    .filter(|l| l.starts_with("CONNECTIVITY"))
                    .ok_or_else(|| MeshIoError::malformed("VTK OFFSETS without CONNECTIVITY"))?;
                let ty = conn_line.split_whitespace().nth(1).unwrap_or("vtktypeint32").to_string();
                let connectivity = self.ints(b, &ty)?;
                offsets
                    .windows(2)
                    .map(|w| {
                        let (s, e) = (w[0] as usize, w[1] as usize);
                        connectivity
                            .get(s..e)
                            .map(<[u32]>::to_vec)
                            .ok_or_else(|| MeshIoError::malformed("VTK offsets exceed connectivity"))
                    })
                    .collect()
            }
            _ => {
                self.pos = mark;
                let flat = self.ints(b, "int")?;
                let mut cells = Vec::with_capacity(a.min(flat.len()));
                let mut k = 0;
                while k < flat.len() {
                    let n = flat[k] as usize;
                    let cell = flat
                        .get(k + 1..k + 1 + n)
                        .ok_or_else(|| MeshIoError::malformed("VTK cell list overruns its size"))?;
                    cells.push(cell.to_vec());
                    k += 1 + n;
                }
                if cells.len() != a {
                    return Err(MeshIoError::malformed(format!(
                        "VTK section declares {} cells, found {}",
                        a,
                        cells.len()
                    )));
                }
                Ok(cells)
            }
        }
    }
}

fn section_counts(line: &str) -> Result<(usize, usize)> {
    let mut it = line.split_whitespace().skip(1);
    let mut next = || -> Result<usize> {
        it.next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| MeshIoError::malformed(format!("bad VTK section header '{}'", line)))
    };
    Ok((next()?, next()?))
}

/// Decode a legacy VTK polydata file.
pub fn read_vtk(bytes: &[u8]) -> Result<VtkContent> {
    let mut r = VtkReader { data: bytes, pos: 0, binary: false };
    let magic = r.raw_line().unwrap_or_default();
    if !magic.starts_with("# vtk DataFile") {
        return Err(MeshIoError::malformed("VTK file lacks '# vtk DataFile' header"));
    }
    // title line, may be empty
    r.raw_line();
    r.binary = match r.line().as_deref() {
        Some("ASCII") => false,
        Some("BINARY") => true,
        other => {
            return Err(MeshIoError::malformed(format!(
                "VTK encoding {:?} is not ASCII or BINARY",
                other
            )))
        }
    };
    let dataset = r.line().unwrap_or_default();
    if dataset.split_whitespace().nth(1) != Some("POLYDATA") {
        return Err(MeshIoError::UnsupportedFormat(format!("VTK '{}'", dataset)));
    }

    let mut positions = Vec::new();
    let mut triangles = Vec::new();
    let mut lines = Vec::new();
    while let Some(line) = r.line() {
        let keyword = line.split_whitespace().next().unwrap_or_default().to_string();
        match keyword.as_str() {
            "POINTS" => {
                let mut it = line.split_whitespace().skip(1);
                let n: usize = it
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| MeshIoError::malformed("bad VTK POINTS header"))?;
                let ty = it.next().unwrap_or("float").to_string();
                let count = n
                    .checked_mul(3)
                    .ok_or_else(|| MeshIoError::malformed("VTK point count overflows"))?;
                positions = r.floats(count, &ty)?;
            }
            "POLYGONS" => {
                let (a, b) = section_counts(&line)?;
                for cell in r.cells(a, b)? {
                    fan_triangulate(&cell, &mut triangles);
                }
            }
            "TRIANGLE_STRIPS" => {
                let (a, b) = section_counts(&line)?;
                for cell in r.cells(a, b)? {
                    strip_triangulate(&cell, &mut triangles);
                }
            }
            "LINES" => {
                let (a, b) = section_counts(&line)?;
                lines = r.cells(a, b)?;
            }
            "VERTICES" => {
                let (a, b) = section_counts(&line)?;
                r.cells(a, b)?;
            }
            "METADATA" | "POINT_DATA" | "CELL_DATA" | "FIELD" => break,
            other => {
                log::debug!("VTK: stopping at unhandled section '{}'", other);
                break;
            }
        }
    }

    if !triangles.is_empty() {
        let mut mesh = Mesh::new(positions, triangles);
        if !lines.is_empty() {
            mesh.notifications
                .warn(format!("VTK LINES ignored: {} lines alongside polygons", lines.len()));
        }
        return Ok(VtkContent::Mesh(mesh.checked()?));
    }
    if lines.is_empty() {
        return Err(MeshIoError::malformed("VTK file has no polygons, strips or lines"));
    }
    let n_points = positions.len() / 3;
    let mut builder = StreamlineBuilder::with_capacity(n_points, lines.len());
    for line in &lines {
        for &id in line {
            let i = id as usize;
            if i >= n_points {
                return Err(MeshIoError::malformed(format!(
                    "VTK line index {} out of range for {} points",
                    id, n_points
                )));
            }
            builder.push_point(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);
        }
        builder.end_streamline()?;
    }
    log::debug!("VTK: {} lines read as streamlines", lines.len());
    Ok(VtkContent::Tractogram(builder.finish()?.checked()?))
}

/// Decode a VTK file that must contain polygons or strips.
pub fn read_vtk_mesh(bytes: &[u8]) -> Result<Mesh> {
    match read_vtk(bytes)? {
        VtkContent::Mesh(mesh) => Ok(mesh),
        VtkContent::Tractogram(_) => Err(MeshIoError::malformed(
            "VTK file holds lines, not a surface",
        )),
    }
}

/// Decode a VTK file that must contain lines.
pub fn read_vtk_tractogram(bytes: &[u8]) -> Result<Tractogram> {
    match read_vtk(bytes)? {
        VtkContent::Tractogram(tract) => Ok(tract),
        VtkContent::Mesh(_) => Err(MeshIoError::malformed(
            "VTK file holds a surface, not streamlines",
        )),
    }
}
