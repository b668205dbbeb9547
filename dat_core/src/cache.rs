//! Append-only, process-lifetime cache of decoded records keyed by asset id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

/// Thread-safe memo of decoded records.
///
/// Entries are never evicted or replaced with different data: a record is a
/// pure function of its bytes, so two threads that miss on the same id at
/// once both decode it and the second insert simply overwrites an equal value.
/// No lock is held while loading.
pub struct FileCache<T> {
    entries: RwLock<HashMap<u32, Arc<T>>>,
}

impl<T> Default for FileCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> FileCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<Arc<T>> {
        self.entries.read().get(&id).cloned()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Insert a value, replacing any earlier one (last write wins).
    pub fn insert(&self, id: u32, value: Arc<T>) {
        if self.entries.write().insert(id, value).is_some() {
            debug!(id, "cache entry written twice by concurrent loads");
        }
    }

    /// Return the cached value, or run `load` and cache its result.
    ///
    /// A failed load caches nothing.
    pub fn get_or_try_insert_with<E, F>(&self, id: u32, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(hit) = self.get(id) {
            trace!(id, "cache hit");
            return Ok(hit);
        }

        debug!(id, "cache miss");
        let value = Arc::new(load()?);
        self.insert(id, Arc::clone(&value));
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_loads_once() {
        let cache = FileCache::<String>::new();
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with(7, || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>("seven".to_string())
                })
                .unwrap();
            assert_eq!(*v, "seven");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = FileCache::<u32>::new();
        let err = cache.get_or_try_insert_with(1, || Err("boom")).unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
        assert!(!cache.contains(1));

        let v = cache.get_or_try_insert_with(1, || Ok::<_, &str>(5)).unwrap();
        assert_eq!(*v, 5);
    }

    #[test]
    fn test_concurrent_inserts() {
        let cache = FileCache::<u64>::new();
        std::thread::scope(|s| {
            for t in 0..8u64 {
                let cache = &cache;
                s.spawn(move || {
                    for id in 0..64u32 {
                        let v = cache
                            .get_or_try_insert_with(id, || Ok::<_, ()>(id as u64 * 10))
                            .unwrap();
                        assert_eq!(*v, id as u64 * 10, "thread {t}");
                    }
                });
            }
        });
        assert_eq!(cache.len(), 64);
    }
}
