use std::collections::HashMap;

use crate::error::{DatError, Result};

/// Source of raw record bytes keyed by asset id.
///
/// Implementations must be shareable across threads; the returned buffer is
/// one complete record, decoded from offset 0.
pub trait AssetStore: Send + Sync {
    fn fetch_bytes(&self, asset_id: u32) -> Result<Vec<u8>>;

    fn contains(&self, asset_id: u32) -> bool;

    /// All asset ids in ascending order.
    fn asset_ids(&self) -> Vec<u32>;
}

/// In-memory store, handy for tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<u32, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record.
    pub fn insert(&mut self, asset_id: u32, bytes: Vec<u8>) {
        self.records.insert(asset_id, bytes);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(u32, Vec<u8>)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (u32, Vec<u8>)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl AssetStore for MemoryStore {
    fn fetch_bytes(&self, asset_id: u32) -> Result<Vec<u8>> {
        self.records
            .get(&asset_id)
            .cloned()
            .ok_or(DatError::NotFound(asset_id))
    }

    fn contains(&self, asset_id: u32) -> bool {
        self.records.contains_key(&asset_id)
    }

    fn asset_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
