use crate::error::{DatError, Result};

/// Magic bytes for motion DAT container version 1.
/// 8 bytes: "MDAT1\n" followed by 2 null bytes.
pub const MAGIC: &[u8; 8] = b"MDAT1\n\x00\x00";

pub const FORMAT_VERSION: u16 = 1;

/// Fixed size of the container header in bytes.
///   magic[8] + version:u16 + compression:u16 + entry_count:u32
///   + flags:u64 + reserved[8]
///   = 8 + 2 + 2 + 4 + 8 + 8 = 32
pub const HEADER_SIZE: u64 = 32;

/// Size of each IndexEntry, in bytes.
///   asset_id:u32 + compressed_len:u32 + raw_len:u32 + _pad:u32
///   + offset:u64 + checksum:u64
///   = 4 + 4 + 4 + 4 + 8 + 8 = 32
pub const INDEX_ENTRY_SIZE: u64 = 32;

/// Size of the index footer (single u64 offset) in bytes.
pub const FOOTER_SIZE: u64 = 8;

// ── Flags ──────────────────────────────────────────────────────────────────

/// Each record carries an xxhash3-64 checksum of its stored bytes.
pub const FLAG_HAS_CHECKSUM: u64 = 1 << 0;

// ── Compression IDs ────────────────────────────────────────────────────────

pub const COMPRESSION_NONE: u16 = 0;
pub const COMPRESSION_ZSTD: u16 = 1;
pub const COMPRESSION_LZ4: u16 = 2;

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 32-byte container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatHeader {
    pub version: u16,
    pub compression_id: u16,
    pub entry_count: u32,
    pub flags: u64,
}

impl DatHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[..8].copy_from_slice(MAGIC);
        buf[8..10].copy_from_slice(&self.version.to_le_bytes());
        buf[10..12].copy_from_slice(&self.compression_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.flags.to_le_bytes());
        // reserved[8] stays zero
        buf
    }

    /// Deserialize from `HEADER_SIZE` bytes, checking magic and version.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE as usize]) -> Result<Self> {
        if &buf[..8] != MAGIC {
            return Err(DatError::InvalidMagic);
        }
        let version = u16::from_le_bytes([buf[8], buf[9]]);
        if version != FORMAT_VERSION {
            return Err(DatError::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            compression_id: u16::from_le_bytes([buf[10], buf[11]]),
            entry_count: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            flags: u64::from_le_bytes(le_array(&buf[16..24])),
        })
    }

    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags & flag != 0
    }
}

// ── Index entry ────────────────────────────────────────────────────────────

/// Locates and describes one stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    pub asset_id: u32,
    /// Stored (possibly compressed) length in bytes.
    pub compressed_len: u32,
    /// Length of the record as handed to decoders.
    pub raw_len: u32,
    /// Byte offset of the record from the start of the file.
    pub offset: u64,
    /// xxhash3-64 of the stored bytes.
    pub checksum: u64,
}

impl IndexEntry {
    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_SIZE as usize] {
        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        buf[0..4].copy_from_slice(&self.asset_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.compressed_len.to_le_bytes());
        buf[8..12].copy_from_slice(&self.raw_len.to_le_bytes());
        // buf[12..16] padding
        buf[16..24].copy_from_slice(&self.offset.to_le_bytes());
        buf[24..32].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; INDEX_ENTRY_SIZE as usize]) -> Self {
        Self {
            asset_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            compressed_len: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            raw_len: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            offset: u64::from_le_bytes(le_array(&buf[16..24])),
            checksum: u64::from_le_bytes(le_array(&buf[24..32])),
        }
    }
}

fn le_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    out
}
