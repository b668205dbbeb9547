use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::error::{DatError, Result};
use crate::format::{COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_ZSTD};

/// How each record is stored inside a container.
///
/// Every record is compressed on its own, so any record can be fetched
/// without touching its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Records stored verbatim.
    #[default]
    None,
    /// Zstandard at the given level (1 = fast / larger, 22 = slow / smallest).
    Zstd { level: i32 },
    /// LZ4 with a prepended size; fastest to decode.
    Lz4,
}

impl Compression {
    /// Stable id stored in the container header.
    pub fn id(&self) -> u16 {
        match self {
            Compression::None => COMPRESSION_NONE,
            Compression::Zstd { .. } => COMPRESSION_ZSTD,
            Compression::Lz4 => COMPRESSION_LZ4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zstd { .. } => "zstd",
            Compression::Lz4 => "lz4",
        }
    }

    /// Resolve the compression from its on-disk id.
    ///
    /// The zstd level only matters when writing, so readers get the default.
    pub fn from_id(id: u16) -> Result<Self> {
        match id {
            COMPRESSION_NONE => Ok(Compression::None),
            COMPRESSION_ZSTD => Ok(Compression::Zstd { level: 3 }),
            COMPRESSION_LZ4 => Ok(Compression::Lz4),
            other => Err(DatError::UnknownCompression(other)),
        }
    }

    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(raw.to_vec()),
            Compression::Zstd { level } => Ok(zstd::bulk::compress(raw, *level)?),
            Compression::Lz4 => Ok(compress_prepend_size(raw)),
        }
    }

    pub fn decompress(&self, stored: &[u8], raw_len: u32) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(stored.to_vec()),
            Compression::Zstd { .. } => Ok(zstd::bulk::decompress(stored, raw_len as usize)?),
            Compression::Lz4 => decompress_size_prepended(stored)
                .map_err(|e| DatError::Compression(format!("lz4 decompress error: {e}"))),
        }
    }
}
