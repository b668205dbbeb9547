mod animation;
mod language_string;
mod manager;
mod motion_data;
mod motion_table;
pub mod portal;

pub use animation::{Animation, Frame, ANIMATION_HAS_POS_FRAMES};
pub use language_string::LanguageString;
pub use manager::DatManager;
pub use motion_data::{
    AnimData, MotionData, FULL_CLIP_HIGH_FRAME, FULL_CLIP_LOW_FRAME, MOTION_HAS_OMEGA,
    MOTION_HAS_VELOCITY,
};
pub use motion_table::{link_key, AnimationSource, MotionTable, MOTION_INVALID};

use dat_core::{DatError, Result, Unpack};
use serde::Serialize;

/// Record types this crate can decode, selected by the high byte of the asset id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatFileType {
    Animation,
    MotionTable,
    String,
}

impl DatFileType {
    /// Resolve the record type from an asset id.
    pub fn from_id(asset_id: u32) -> Option<Self> {
        match asset_id >> 24 {
            0x03 => Some(DatFileType::Animation),
            0x09 => Some(DatFileType::MotionTable),
            0x31 => Some(DatFileType::String),
            _ => None,
        }
    }

    /// High byte shared by every id of this type.
    pub fn tag(&self) -> u8 {
        match self {
            DatFileType::Animation => 0x03,
            DatFileType::MotionTable => 0x09,
            DatFileType::String => 0x31,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatFileType::Animation => "animation",
            DatFileType::MotionTable => "motion table",
            DatFileType::String => "string",
        }
    }
}

/// A decodable record type tied to its id range.
pub trait DatFile: Unpack + Send + Sync + 'static {
    const FILE_TYPE: DatFileType;
}

/// One decoded record of any supported type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatRecord {
    Animation(Animation),
    MotionTable(MotionTable),
    String(LanguageString),
}

impl DatRecord {
    /// Decode `bytes` with the decoder chosen by the id's type tag.
    pub fn decode(asset_id: u32, bytes: &[u8]) -> Result<Self> {
        let record = match DatFileType::from_id(asset_id) {
            Some(DatFileType::Animation) => DatRecord::Animation(Animation::decode(bytes)?),
            Some(DatFileType::MotionTable) => DatRecord::MotionTable(MotionTable::decode(bytes)?),
            Some(DatFileType::String) => DatRecord::String(LanguageString::decode(bytes)?),
            None => {
                return Err(DatError::WrongFileType {
                    id: asset_id,
                    expected: "known record type",
                })
            }
        };
        Ok(record)
    }

    pub fn file_type(&self) -> DatFileType {
        match self {
            DatRecord::Animation(_) => DatFileType::Animation,
            DatRecord::MotionTable(_) => DatFileType::MotionTable,
            DatRecord::String(_) => DatFileType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dat_core::Pack;

    #[test]
    fn test_file_type_from_id() {
        assert_eq!(DatFileType::from_id(0x0300_1234), Some(DatFileType::Animation));
        assert_eq!(DatFileType::from_id(0x0900_0001), Some(DatFileType::MotionTable));
        assert_eq!(DatFileType::from_id(0x3100_0001), Some(DatFileType::String));
        assert_eq!(DatFileType::from_id(0x0100_0001), None);
        for t in [DatFileType::Animation, DatFileType::MotionTable, DatFileType::String] {
            assert_eq!(DatFileType::from_id((t.tag() as u32) << 24), Some(t));
        }
    }

    #[test]
    fn test_record_dispatch_by_tag() {
        let s = LanguageString {
            id: 0x3100_0009,
            text: Some("Greetings".into()),
        };
        let record = DatRecord::decode(s.id, &s.encode().unwrap()).unwrap();
        assert_eq!(record.file_type(), DatFileType::String);
        assert_eq!(record, DatRecord::String(s));
    }

    #[test]
    fn test_unknown_tag() {
        let err = DatRecord::decode(0x0D00_0001, &[0; 16]).unwrap_err();
        assert!(matches!(err, DatError::WrongFileType { id: 0x0D00_0001, .. }));
    }
}
