//! FreeSurfer binary color tables
//!
//! Stored after annotation labels and in the MGH footer. Two layouts exist:
//! the legacy one starts with a positive entry count, the versioned one
//! starts with a negative version number (only `-2` was ever written).

use crate::error::{MeshIoError, Result};
use crate::io::cursor::{null_terminated, ByteCursor, Endian};
use crate::types::ColorLookupTable;

const BE: Endian = Endian::Big;

/// Upper bound on entries and name lengths accepted from a file.
const MAX_ENTRIES: usize = 1 << 20;
const MAX_NAME_LEN: usize = 1 << 16;

/// A decoded color table plus the packed `r + g<<8 + b<<16` value of each
/// entry, which is how annotation vertices reference a structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FsColorTable {
    pub table: ColorLookupTable,
    pub packed: Vec<i32>,
    /// Source file name recorded in the table, often empty.
    pub orig_name: String,
}

impl FsColorTable {
    fn push(&mut self, id: i32, rgbt: [i32; 4], name: String) {
        let clamp = |v: i32| v.clamp(0, 255) as u8;
        let alpha = 255 - clamp(rgbt[3]);
        self.table
            .push(id, [clamp(rgbt[0]), clamp(rgbt[1]), clamp(rgbt[2]), alpha], name);
        self.packed.push(pack_rgb(rgbt[0], rgbt[1], rgbt[2]));
    }

    /// Entry whose packed color equals `packed`, scanning from `hint`.
    pub fn find_packed(&self, packed: i32, hint: usize) -> Option<usize> {
        if self.packed.get(hint) == Some(&packed) {
            return Some(hint);
        }
        self.packed.iter().position(|&p| p == packed)
    }
}

/// Packed annotation value of an RGB triple.
pub fn pack_rgb(r: i32, g: i32, b: i32) -> i32 {
    r.wrapping_add(g.wrapping_shl(8)).wrapping_add(b.wrapping_shl(16))
}

fn read_len(c: &mut ByteCursor<'_>, limit: usize, what: &str) -> Result<usize> {
    let n = c.read_count(BE)?;
    if n > limit {
        return Err(MeshIoError::InvalidColorTable(format!(
            "{} {} exceeds limit {}",
            what, n, limit
        )));
    }
    Ok(n)
}

fn read_name(c: &mut ByteCursor<'_>) -> Result<String> {
    let len = read_len(c, MAX_NAME_LEN, "name length")?;
    Ok(null_terminated(c.read_bytes(len)?))
}

fn read_rgbt(c: &mut ByteCursor<'_>) -> Result<[i32; 4]> {
    Ok([c.read_i32(BE)?, c.read_i32(BE)?, c.read_i32(BE)?, c.read_i32(BE)?])
}

/// Read a color table starting at the cursor's version/count word.
pub fn read_color_table(c: &mut ByteCursor<'_>) -> Result<FsColorTable> {
    let version = c.read_i32(BE)?;
    let mut ctab = FsColorTable::default();
    if version > 0 {
        let n_entries = version as usize;
        if n_entries > MAX_ENTRIES {
            return Err(MeshIoError::InvalidColorTable(format!(
                "{} entries",
                n_entries
            )));
        }
        ctab.orig_name = read_name(c)?;
        for k in 0..n_entries {
            let name = read_name(c)?;
            let rgbt = read_rgbt(c)?;
            ctab.push(k as i32, rgbt, name);
        }
    } else if version == -2 {
        let _max_structure = c.read_i32(BE)?;
        ctab.orig_name = read_name(c)?;
        let n_entries = read_len(c, MAX_ENTRIES, "entry count")?;
        for _ in 0..n_entries {
            let structure = c.read_i32(BE)?;
            let name = read_name(c)?;
            let rgbt = read_rgbt(c)?;
            ctab.push(structure, rgbt, name);
        }
    } else {
        return Err(MeshIoError::InvalidColorTable(format!(
            "unsupported color table version {}",
            version
        )));
    }
    log::debug!("color table '{}' with {} entries", ctab.orig_name, ctab.table.len());
    Ok(ctab)
}
