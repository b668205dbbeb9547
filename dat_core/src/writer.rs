use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::compression::Compression;
use crate::error::{DatError, Result};
use crate::format::{DatHeader, IndexEntry, FLAG_HAS_CHECKSUM, FORMAT_VERSION, HEADER_SIZE};

/// Streaming writer for motion DAT containers.
///
/// # Write contract
/// Call [`add`](Self::add) once per record, in any order. Each record is
/// compressed on its own and written immediately. Call
/// [`finish`](Self::finish) to append the index and footer and write back
/// the final header.
///
/// # Layout written
/// ```text
/// [HEADER: 32 bytes placeholder]
/// [RECORD a] [RECORD b] ...                 ← independently compressed
/// [INDEX: 32 bytes × N, sorted by asset id]
/// [FOOTER: 8 bytes — u64 LE offset of index]
/// ← seek back to 0, overwrite header with real values
/// ```
pub struct DatWriter {
    file: BufWriter<File>,
    compression: Compression,
    entries: Vec<IndexEntry>,
    seen: HashSet<u32>,
    /// Current write position in the file (mirrors the file cursor).
    current_offset: u64,
}

impl DatWriter {
    /// Create a new container at `path`, overwriting any existing file.
    pub fn create(path: impl AsRef<Path>, compression: Compression) -> Result<Self> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&[0u8; HEADER_SIZE as usize])?;
        Ok(Self {
            file,
            compression,
            entries: Vec::new(),
            seen: HashSet::new(),
            current_offset: HEADER_SIZE,
        })
    }

    /// Store one record. Adding the same id twice is an error.
    pub fn add(&mut self, asset_id: u32, raw: &[u8]) -> Result<()> {
        if !self.seen.insert(asset_id) {
            return Err(DatError::DuplicateAsset(asset_id));
        }

        let stored = self.compression.compress(raw)?;
        let offset = self.current_offset;
        self.file.write_all(&stored)?;
        self.current_offset += stored.len() as u64;

        self.entries.push(IndexEntry {
            asset_id,
            compressed_len: stored.len() as u32,
            raw_len: raw.len() as u32,
            offset,
            checksum: xxh3_64(&stored),
        });
        Ok(())
    }

    /// Write the index + footer and seal the file with the final header.
    ///
    /// Returns the number of records written.
    pub fn finish(mut self) -> Result<u32> {
        self.entries.sort_by_key(|e| e.asset_id);

        let index_offset = self.current_offset;
        for entry in &self.entries {
            self.file.write_all(&entry.to_bytes())?;
        }
        self.file.write_all(&index_offset.to_le_bytes())?;

        let entry_count = self.entries.len() as u32;
        let header = DatHeader {
            version: FORMAT_VERSION,
            compression_id: self.compression.id(),
            entry_count,
            flags: FLAG_HAS_CHECKSUM,
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()?;

        debug!(entry_count, compression = self.compression.name(), "sealed DAT archive");
        Ok(entry_count)
    }
}
