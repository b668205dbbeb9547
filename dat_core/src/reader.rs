use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, trace};
use xxhash_rust::xxh3::xxh3_64;

use crate::compression::Compression;
use crate::error::{DatError, Result};
use crate::format::{
    DatHeader, IndexEntry, FLAG_HAS_CHECKSUM, FOOTER_SIZE, HEADER_SIZE, INDEX_ENTRY_SIZE,
};
use crate::store::AssetStore;

/// Random-access reader for motion DAT containers.
///
/// # Open sequence
/// 1. Read the 32-byte header (magic, version, compression, entry count).
/// 2. Seek to `file_end - 8`, read the `index_offset` u64.
/// 3. Seek to `index_offset`, load the whole index into RAM, sorted by id.
///
/// # Access pattern
/// [`fetch_bytes`](AssetStore::fetch_bytes) looks the id up in the index,
/// seeks straight to that record and decodes only it. The file handle sits
/// behind a mutex so one archive can serve many threads.
pub struct DatArchive {
    file: Mutex<File>,
    pub header: DatHeader,
    compression: Compression,
    entries: Vec<IndexEntry>,
}

impl DatArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        // ── Header ──────────────────────────────────────────────────────────
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header_buf)?;
        let header = DatHeader::from_bytes(&header_buf)?;
        let compression = Compression::from_id(header.compression_id)?;

        // ── Footer → index offset ───────────────────────────────────────────
        let file_len = file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))? + FOOTER_SIZE;
        let mut footer_buf = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer_buf)?;
        let index_offset = u64::from_le_bytes(footer_buf);

        // The index must sit between the header and the footer.
        let index_len = header.entry_count as u64 * INDEX_ENTRY_SIZE;
        let index_fits = index_offset >= HEADER_SIZE
            && index_offset
                .checked_add(index_len)
                .is_some_and(|end| end <= file_len - FOOTER_SIZE);
        if !index_fits {
            return Err(DatError::CorruptIndex {
                entry_count: header.entry_count,
                index_offset,
                file_len,
            });
        }

        // ── Index ───────────────────────────────────────────────────────────
        file.seek(SeekFrom::Start(index_offset))?;
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        let mut entry_buf = [0u8; INDEX_ENTRY_SIZE as usize];
        for _ in 0..header.entry_count {
            file.read_exact(&mut entry_buf)?;
            entries.push(IndexEntry::from_bytes(&entry_buf));
        }
        entries.sort_by_key(|e| e.asset_id);

        debug!(
            path = %path.display(),
            entries = entries.len(),
            compression = compression.name(),
            "opened DAT archive"
        );

        Ok(Self {
            file: Mutex::new(file),
            header,
            compression,
            entries,
        })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn entry(&self, asset_id: u32) -> Option<&IndexEntry> {
        self.entries
            .binary_search_by_key(&asset_id, |e| e.asset_id)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Total size of all records as handed to decoders.
    pub fn raw_size(&self) -> u64 {
        self.entries.iter().map(|e| e.raw_len as u64).sum()
    }

    /// Total stored size of all records (excluding index/header).
    pub fn stored_size(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed_len as u64).sum()
    }

    /// Compression ratio (raw / stored).
    pub fn ratio(&self) -> f64 {
        let stored = self.stored_size();
        if stored == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / stored as f64
    }

    fn read_entry(&self, entry: &IndexEntry) -> Result<Vec<u8>> {
        let mut stored = vec![0u8; entry.compressed_len as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(entry.offset))?;
            file.read_exact(&mut stored)?;
        }

        if self.header.has_flag(FLAG_HAS_CHECKSUM) {
            let actual = xxh3_64(&stored);
            if actual != entry.checksum {
                return Err(DatError::ChecksumMismatch {
                    id: entry.asset_id,
                    expected: entry.checksum,
                    actual,
                });
            }
        }

        let raw = self.compression.decompress(&stored, entry.raw_len)?;
        if raw.len() != entry.raw_len as usize {
            return Err(DatError::LengthMismatch {
                id: entry.asset_id,
                expected: entry.raw_len,
                actual: raw.len(),
            });
        }
        Ok(raw)
    }
}

impl AssetStore for DatArchive {
    fn fetch_bytes(&self, asset_id: u32) -> Result<Vec<u8>> {
        let entry = self.entry(asset_id).ok_or(DatError::NotFound(asset_id))?;
        trace!(asset_id, offset = entry.offset, len = entry.compressed_len, "reading record");
        self.read_entry(entry)
    }

    fn contains(&self, asset_id: u32) -> bool {
        self.entry(asset_id).is_some()
    }

    fn asset_ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.asset_id).collect()
    }
}
