use std::sync::Arc;

use dat_core::{AssetStore, DatError, FileCache, Result};
use tracing::debug;

use crate::motion_table::AnimationSource;
use crate::{Animation, DatFile, DatFileType, LanguageString, MotionTable};

/// Cached access to the records of one asset store.
///
/// Each record type has its own append-only cache. A record is fetched and
/// decoded at most once per id under sequential use; concurrent first
/// requests may each decode it, and all of them observe equal values.
pub struct DatManager {
    store: Box<dyn AssetStore>,
    motion_tables: FileCache<MotionTable>,
    animations: FileCache<Animation>,
    strings: FileCache<LanguageString>,
}

impl DatManager {
    pub fn new(store: impl AssetStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            motion_tables: FileCache::new(),
            animations: FileCache::new(),
            strings: FileCache::new(),
        }
    }

    pub fn store(&self) -> &dyn AssetStore {
        self.store.as_ref()
    }

    fn read_from_dat<T: DatFile>(&self, cache: &FileCache<T>, id: u32) -> Result<Arc<T>> {
        if DatFileType::from_id(id) != Some(T::FILE_TYPE) {
            return Err(DatError::WrongFileType {
                id,
                expected: T::FILE_TYPE.name(),
            });
        }

        cache.get_or_try_insert_with::<DatError, _>(id, || {
            let bytes = self.store.fetch_bytes(id)?;
            let record = T::decode(&bytes)?;
            debug!(id, kind = T::FILE_TYPE.name(), len = bytes.len(), "decoded record");
            Ok(record)
        })
    }

    pub fn get_motion_table(&self, id: u32) -> Result<Arc<MotionTable>> {
        self.read_from_dat(&self.motion_tables, id)
    }

    pub fn get_animation(&self, id: u32) -> Result<Arc<Animation>> {
        self.read_from_dat(&self.animations, id)
    }

    pub fn get_string(&self, id: u32) -> Result<Arc<LanguageString>> {
        self.read_from_dat(&self.strings, id)
    }

    /// Length of `motion` in table `table_id`, from its default style.
    pub fn animation_length(&self, table_id: u32, motion: u32) -> Result<f32> {
        self.get_motion_table(table_id)?
            .animation_length(motion, self)
    }

    /// Length of `motion` in table `table_id`, from the default motion of `stance`.
    pub fn animation_length_in_style(&self, table_id: u32, stance: u32, motion: u32) -> Result<f32> {
        self.get_motion_table(table_id)?
            .animation_length_in_style(stance, motion, self)
    }

    /// Length of the link from `current_state` to `motion` in `stance`.
    pub fn animation_length_from(
        &self,
        table_id: u32,
        current_state: u32,
        stance: u32,
        motion: u32,
    ) -> Result<f32> {
        self.get_motion_table(table_id)?
            .animation_length_from(current_state, stance, motion, self)
    }

    /// Number of cached motion tables, animations and strings.
    pub fn cached_counts(&self) -> (usize, usize, usize) {
        (
            self.motion_tables.len(),
            self.animations.len(),
            self.strings.len(),
        )
    }
}

impl AnimationSource for DatManager {
    fn frame_count(&self, anim_id: u32) -> Result<u32> {
        Ok(self.get_animation(anim_id)?.num_frames)
    }
}
