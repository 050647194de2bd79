//! gzip/zlib inflation and ZIP member extraction

use std::borrow::Cow;
use std::io::{Cursor, Read};

use flate2::read::{GzDecoder, MultiGzDecoder, ZlibDecoder};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{MeshIoError, Result};

/// gzip stream magic.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// True when `bytes` starts with a gzip header.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// True when `bytes` starts with a zlib header (CMF/FLG pair divisible by 31).
pub fn is_zlib(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }
    let (cmf, flg) = (bytes[0], bytes[1]);
    cmf & 0x0F == 8 && cmf >> 4 <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

/// Inflate a gzip or zlib stream, picking the codec from the magic bytes.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    if is_gzip(bytes) {
        inflate_gzip(bytes)
    } else if is_zlib(bytes) {
        inflate_zlib(bytes)
    } else {
        Err(MeshIoError::Decompression(
            "buffer has neither gzip nor zlib magic".into(),
        ))
    }
}

/// Inflate only when the buffer is gzip-wrapped; plain data is borrowed.
pub fn maybe_decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if is_gzip(bytes) {
        Ok(Cow::Owned(inflate_gzip(bytes)?))
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

/// Inflate a (possibly multi-member) gzip stream.
pub fn inflate_gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    MultiGzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| MeshIoError::Decompression(format!("gzip: {}", e)))?;
    log::trace!("inflated gzip {} -> {} bytes", bytes.len(), out.len());
    Ok(out)
}

/// Inflate a zlib stream (GIFTI `GZipBase64Binary` payloads).
pub fn inflate_zlib(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| MeshIoError::Decompression(format!("zlib: {}", e)))?;
    Ok(out)
}

/// Inflate either codec, used where writers disagree on the wrapper.
pub fn inflate_any(bytes: &[u8]) -> Result<Vec<u8>> {
    if is_gzip(bytes) {
        let mut out = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .map_err(|e| MeshIoError::Decompression(format!("gzip: {}", e)))?;
        return Ok(out);
    }
    inflate_zlib(bytes)
}

// ============================================================================
// ZIP
// ============================================================================

/// One inflated ZIP member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Full member path inside the archive.
    pub name: String,
    /// Last directory component, empty for root members.
    pub parent_dir: String,
    /// Final path component.
    pub file_name: String,
    pub data: Vec<u8>,
}

impl ZipEntry {
    fn new(name: String, data: Vec<u8>) -> Self {
        let mut parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
        let file_name = parts.pop().unwrap_or_default().to_string();
        let parent_dir = parts.pop().unwrap_or_default().to_string();
        Self {
            name,
            parent_dir,
            file_name,
            data,
        }
    }
}

fn zip_error(e: ZipError) -> MeshIoError {
    match e {
        ZipError::UnsupportedArchive(msg) => {
            MeshIoError::UnsupportedFormat(format!("zip member: {}", msg))
        }
        other => MeshIoError::Decompression(format!("zip: {}", other)),
    }
}

/// Upper bound of the deflate expansion ratio.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Buffer size to reserve for a member declaring `declared` bytes inside an
/// archive of `archive_len` bytes.
fn member_capacity(declared: u64, archive_len: usize) -> usize {
    usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(archive_len.saturating_mul(MAX_DEFLATE_RATIO))
}

/// List and inflate every non-empty member of a ZIP archive.
///
/// Directory entries and zero-length members are skipped.
pub fn extract_zip_entries(bytes: &[u8]) -> Result<Vec<ZipEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
    log::debug!("zip archive has {} entries", archive.len());

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(zip_error)?;
        let name = file.name().to_string();
        if file.is_dir() || file.size() == 0 {
            log::trace!("skipping empty zip entry '{}'", name);
            continue;
        }
        let mut data = Vec::with_capacity(member_capacity(file.size(), bytes.len()));
        file.read_to_end(&mut data)
            .map_err(|e| MeshIoError::Decompression(format!("zip entry '{}': {}", name, e)))?;
        entries.push(ZipEntry::new(name, data));
    }
    Ok(entries)
}
