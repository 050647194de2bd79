//! In-memory file builders, one per format under test.

#![allow(dead_code)]

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};

/// Regular tetrahedron, counter-clockwise seen from outside.
pub const TETRA_POSITIONS: [f32; 12] = [
    1.0, 1.0, 1.0, //
    1.0, -1.0, -1.0, //
    -1.0, 1.0, -1.0, //
    -1.0, -1.0, 1.0,
];
pub const TETRA_CCW: [u32; 12] = [0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2];

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}

pub fn zip_archive(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::SimpleFileOptions::default();
    for (name, data) in members {
        w.start_file(*name, opts).unwrap();
        w.write_all(data).unwrap();
    }
    w.finish().unwrap().into_inner()
}

// ---------------------------------------------------------------------------
// Meshes
// ---------------------------------------------------------------------------

/// Binary STL: 80-byte header, count, then normal + 3 vertices + attribute.
pub fn binary_stl(triangles: &[[f32; 9]]) -> Vec<u8> {
    let mut out = vec![0u8; 80];
    out.write_u32::<LittleEndian>(triangles.len() as u32).unwrap();
    for tri in triangles {
        for _ in 0..3 {
            out.write_f32::<LittleEndian>(0.0).unwrap();
        }
        for v in tri {
            out.write_f32::<LittleEndian>(*v).unwrap();
        }
        out.write_u16::<LittleEndian>(0).unwrap();
    }
    out
}

/// FreeSurfer triangle file storing `faces` as given (clockwise on disk).
pub fn freesurfer_surface(positions: &[f32], faces: &[u32]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFF, 0xFE];
    out.extend_from_slice(b"created by surfio tests\n\n");
    out.write_i32::<BigEndian>((positions.len() / 3) as i32).unwrap();
    out.write_i32::<BigEndian>((faces.len() / 3) as i32).unwrap();
    for v in positions {
        out.write_f32::<BigEndian>(*v).unwrap();
    }
    for f in faces {
        out.write_i32::<BigEndian>(*f as i32).unwrap();
    }
    out
}

/// Clockwise copy of a counter-clockwise index list.
pub fn reversed_winding(indices: &[u32]) -> Vec<u32> {
    indices
        .chunks_exact(3)
        .flat_map(|t| [t[1], t[0], t[2]])
        .collect()
}

pub fn ascii_ply(positions: &[f32], faces: &[&[u32]]) -> Vec<u8> {
    let mut s = format!(
        "ply\nformat ascii 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nelement face {}\nproperty list uchar int vertex_indices\nend_header\n",
        positions.len() / 3,
        faces.len()
    );
    for p in positions.chunks_exact(3) {
        s += &format!("{} {} {}\n", p[0], p[1], p[2]);
    }
    for f in faces {
        let ids: Vec<String> = f.iter().map(|i| i.to_string()).collect();
        s += &format!("{} {}\n", f.len(), ids.join(" "));
    }
    s.into_bytes()
}

pub fn wavefront_obj(positions: &[f32], faces: &[&[u32]]) -> Vec<u8> {
    let mut s = String::from("# test\n");
    for p in positions.chunks_exact(3) {
        s += &format!("v {} {} {}\n", p[0], p[1], p[2]);
    }
    for f in faces {
        let ids: Vec<String> = f.iter().map(|i| format!("{}//1", i + 1)).collect();
        s += &format!("f {}\n", ids.join(" "));
    }
    s.into_bytes()
}

pub fn mz3_mesh(positions: &[f32], indices: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<LittleEndian>(0x5A4D).unwrap();
    out.write_u16::<LittleEndian>(0x3).unwrap();
    out.write_u32::<LittleEndian>((indices.len() / 3) as u32).unwrap();
    out.write_u32::<LittleEndian>((positions.len() / 3) as u32).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    for i in indices {
        out.write_i32::<LittleEndian>(*i as i32).unwrap();
    }
    for v in positions {
        out.write_f32::<LittleEndian>(*v).unwrap();
    }
    out
}

// ---------------------------------------------------------------------------
// Tractograms
// ---------------------------------------------------------------------------

/// TRK with an identity vox2ras and 1 mm voxels.
pub fn trk(streamlines: &[&[[f32; 3]]]) -> Vec<u8> {
    let mut h = vec![0u8; 1000];
    h[..6].copy_from_slice(b"TRACK\0");
    for k in 0..3 {
        h[12 + k * 4..16 + k * 4].copy_from_slice(&1f32.to_le_bytes());
    }
    for k in [0usize, 5, 10, 15] {
        h[440 + k * 4..444 + k * 4].copy_from_slice(&1f32.to_le_bytes());
    }
    h[988..992].copy_from_slice(&(streamlines.len() as i32).to_le_bytes());
    h[992..996].copy_from_slice(&2i32.to_le_bytes());
    h[996..1000].copy_from_slice(&1000i32.to_le_bytes());
    for s in streamlines {
        h.write_i32::<LittleEndian>(s.len() as i32).unwrap();
        for p in *s {
            for v in p {
                h.write_f32::<LittleEndian>(*v).unwrap();
            }
        }
    }
    h
}

/// TCK with NaN separators and an Inf terminator.
pub fn tck(streamlines: &[&[[f32; 3]]]) -> Vec<u8> {
    let mut out = format!(
        "mrtrix tracks\ndatatype: Float32LE\ncount: {}\nfile: . 100\nEND\n",
        streamlines.len()
    )
    .into_bytes();
    out.resize(100, 0);
    for s in streamlines {
        for p in *s {
            for v in p {
                out.write_f32::<LittleEndian>(*v).unwrap();
            }
        }
        for _ in 0..3 {
            out.write_f32::<LittleEndian>(f32::NAN).unwrap();
        }
    }
    for _ in 0..3 {
        out.write_f32::<LittleEndian>(f32::INFINITY).unwrap();
    }
    out
}

/// TRX archive with float32 positions and uint32 offsets (no fence post).
pub fn trx(streamlines: &[&[[f32; 3]]]) -> Vec<u8> {
    let mut positions = Vec::new();
    let mut offsets = Vec::new();
    let mut n = 0u32;
    for s in streamlines {
        offsets.write_u32::<LittleEndian>(n).unwrap();
        for p in *s {
            for v in p {
                positions.write_f32::<LittleEndian>(*v).unwrap();
            }
        }
        n += s.len() as u32;
    }
    let header = format!(
        "{{\"NB_VERTICES\": {}, \"NB_STREAMLINES\": {}}}",
        n,
        streamlines.len()
    );
    zip_archive(&[
        ("header.json", header.into_bytes()),
        ("positions.3.float32", positions),
        ("offsets.uint32", offsets),
    ])
}

/// TRX archive whose uint64 offsets carry a non-zero high word.
pub fn trx_overflowing_offsets() -> Vec<u8> {
    let mut offsets = Vec::new();
    offsets.write_u64::<LittleEndian>(0).unwrap();
    offsets.write_u64::<LittleEndian>(1 << 33).unwrap();
    let mut positions = Vec::new();
    for _ in 0..6 {
        positions.write_f32::<LittleEndian>(0.0).unwrap();
    }
    zip_archive(&[
        ("positions.3.float32", positions),
        ("offsets.uint64", offsets),
    ])
}

/// Legacy VTK ASCII polydata of line cells.
pub fn vtk_lines(streamlines: &[&[[f32; 3]]]) -> Vec<u8> {
    let n_pts: usize = streamlines.iter().map(|s| s.len()).sum();
    let mut s = format!(
        "# vtk DataFile Version 3.0\nlines\nASCII\nDATASET POLYDATA\nPOINTS {} float\n",
        n_pts
    );
    for line in streamlines {
        for p in *line {
            s += &format!("{} {} {}\n", p[0], p[1], p[2]);
        }
    }
    s += &format!("LINES {} {}\n", streamlines.len(), n_pts + streamlines.len());
    let mut next = 0;
    for line in streamlines {
        let ids: Vec<String> = (next..next + line.len()).map(|i| i.to_string()).collect();
        s += &format!("{} {}\n", line.len(), ids.join(" "));
        next += line.len();
    }
    s.into_bytes()
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

pub fn curv(values: &[f32]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFF, 0xFF];
    out.write_i32::<BigEndian>(values.len() as i32).unwrap();
    out.write_i32::<BigEndian>(0).unwrap();
    out.write_i32::<BigEndian>(1).unwrap();
    for v in values {
        out.write_f32::<BigEndian>(*v).unwrap();
    }
    out
}

/// MGH float volume of `width` vertices and `frames` frames.
pub fn mgh(values: &[f32], frames: i32) -> Vec<u8> {
    let mut out = Vec::new();
    let width = values.len() as i32 / frames;
    for v in [1, width, 1, 1, frames, 3, 0] {
        out.write_i32::<BigEndian>(v).unwrap();
    }
    out.resize(284, 0);
    for v in values {
        out.write_f32::<BigEndian>(*v).unwrap();
    }
    out
}

/// MZ3 overlay holding scalar frames only.
pub fn mz3_scalars(n_vert: u32, values: &[f32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<LittleEndian>(0x5A4D).unwrap();
    out.write_u16::<LittleEndian>(0x8).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(n_vert).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    for v in values {
        out.write_f32::<LittleEndian>(*v).unwrap();
    }
    out
}

/// GIFTI document with one ASCII float overlay array.
pub fn gifti_overlay(values: &[f32]) -> Vec<u8> {
    let data: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!(
        "<?xml version=\"1.0\"?>\n<GIFTI Version=\"1.0\">\n<DataArray Intent=\"NIFTI_INTENT_SHAPE\" DataType=\"NIFTI_TYPE_FLOAT32\" Dimensionality=\"1\" Dim0=\"{}\" Encoding=\"ASCII\">\n<Data>{}</Data>\n</DataArray>\n</GIFTI>\n",
        values.len(),
        data.join(" ")
    )
    .into_bytes()
}
