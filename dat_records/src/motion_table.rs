use std::collections::HashMap;

use dat_core::{read_mapping, write_mapping, DatBuffer, DatReader, DecodeError, Pack, Result, Unpack};
use serde::Serialize;

use crate::motion_data::MotionData;
use crate::{DatFile, DatFileType};

/// Returned by [`MotionTable::style_default`] when a stance has no default motion.
pub const MOTION_INVALID: u32 = 0x8000_0000;

/// Looks up the total frame count of a raw animation by id.
///
/// Only consulted for segments that ask to play the whole clip.
pub trait AnimationSource {
    fn frame_count(&self, anim_id: u32) -> Result<u32>;
}

impl<F> AnimationSource for F
where
    F: Fn(u32) -> Result<u32>,
{
    fn frame_count(&self, anim_id: u32) -> Result<u32> {
        self(anim_id)
    }
}

/// Key of the `links` map for a transition out of `current_state` while in `stance`.
///
/// The two fields overlap in bits 16..24 and are OR'd together; bits of
/// `stance` shifted past bit 31 are dropped.
#[inline]
pub fn link_key(current_state: u32, stance: u32) -> u32 {
    (current_state & 0x00FF_FFFF) | (stance << 16)
}

/// The animation set of one character type (ids starting with 0x09).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MotionTable {
    pub id: u32,
    pub default_style: u32,
    /// stance → default motion while idle in that stance.
    pub style_defaults: HashMap<u32, u32>,
    pub cycles: HashMap<u32, MotionData>,
    pub modifiers: HashMap<u32, MotionData>,
    /// [`link_key`] → target motion → segments to play.
    pub links: HashMap<u32, HashMap<u32, MotionData>>,
}

impl MotionTable {
    /// The recorded default motion for `stance`, or [`MOTION_INVALID`].
    pub fn style_default(&self, stance: u32) -> u32 {
        self.style_defaults
            .get(&stance)
            .copied()
            .unwrap_or(MOTION_INVALID)
    }

    /// The link played to reach `motion` from `current_state` in `stance`.
    pub fn link(&self, current_state: u32, stance: u32, motion: u32) -> Option<&MotionData> {
        self.links
            .get(&link_key(current_state, stance))
            .and_then(|targets| targets.get(&motion))
    }

    /// Length of `motion` starting from the default motion of the default style.
    pub fn animation_length<S: AnimationSource + ?Sized>(&self, motion: u32, anims: &S) -> Result<f32> {
        let style = self.default_style;
        let current_state = self.style_default(style);
        self.animation_length_from(current_state, style, motion, anims)
    }

    /// Length of `motion` starting from the default motion of `stance`.
    pub fn animation_length_in_style<S: AnimationSource + ?Sized>(
        &self,
        stance: u32,
        motion: u32,
        anims: &S,
    ) -> Result<f32> {
        let current_state = self.style_default(stance);
        self.animation_length_from(current_state, stance, motion, anims)
    }

    /// Total seconds of the link from `current_state` to `motion` in `stance`.
    ///
    /// No link is a valid outcome and lasts `0.0`. Errors only come from the
    /// raw-animation lookup of full-clip segments.
    pub fn animation_length_from<S: AnimationSource + ?Sized>(
        &self,
        current_state: u32,
        stance: u32,
        motion: u32,
        anims: &S,
    ) -> Result<f32> {
        match self.link(current_state, stance, motion) {
            Some(data) => data.duration(anims),
            None => Ok(0.0),
        }
    }
}

impl Unpack for MotionTable {
    fn unpack(reader: &mut DatReader<'_>) -> std::result::Result<Self, DecodeError> {
        let id = reader.read_u32()?;
        let default_style = reader.read_u32()?;
        let style_defaults = read_mapping(reader, |r| r.read_u32(), |r| r.read_u32())?;
        let cycles = read_mapping(reader, |r| r.read_u32(), MotionData::unpack)?;
        let modifiers = read_mapping(reader, |r| r.read_u32(), MotionData::unpack)?;
        let links = read_mapping(
            reader,
            |r| r.read_u32(),
            |r| read_mapping(r, |r| r.read_u32(), MotionData::unpack),
        )?;

        Ok(Self {
            id,
            default_style,
            style_defaults,
            cycles,
            modifiers,
            links,
        })
    }
}

fn write_key(buf: &mut DatBuffer, key: &u32) -> std::result::Result<(), DecodeError> {
    buf.write_u32(*key);
    Ok(())
}

fn write_motion(buf: &mut DatBuffer, data: &MotionData) -> std::result::Result<(), DecodeError> {
    data.pack(buf)
}

impl Pack for MotionTable {
    fn pack(&self, buf: &mut DatBuffer) -> std::result::Result<(), DecodeError> {
        buf.write_u32(self.id);
        buf.write_u32(self.default_style);
        write_mapping(buf, &self.style_defaults, write_key, write_key)?;
        write_mapping(buf, &self.cycles, write_key, write_motion)?;
        write_mapping(buf, &self.modifiers, write_key, write_motion)?;
        write_mapping(buf, &self.links, write_key, |buf, targets| {
            write_mapping(buf, targets, write_key, write_motion)
        })
    }
}

impl DatFile for MotionTable {
    const FILE_TYPE: DatFileType = DatFileType::MotionTable;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion_data::{AnimData, FULL_CLIP_HIGH_FRAME};
    use dat_core::DatError;

    const STANCE_NON_COMBAT: u32 = 0x8000_003D;
    const STANCE_SWORD: u32 = 0x8000_003E;
    const MOTION_READY: u32 = 0x4100_0003;
    const MOTION_ATTACK: u32 = 0x1000_0062;
    const MOTION_DEATH: u32 = 0x4000_0011;

    fn segment(anim_id: u32, low: u32, high: u32, framerate: f32) -> AnimData {
        AnimData {
            anim_id,
            low_frame: low,
            high_frame: high,
            framerate,
        }
    }

    fn no_animations(id: u32) -> Result<u32> {
        Err(DatError::NotFound(id))
    }

    fn table() -> MotionTable {
        let mut table = MotionTable {
            id: 0x0900_0001,
            default_style: STANCE_NON_COMBAT,
            ..Default::default()
        };
        table.style_defaults.insert(STANCE_NON_COMBAT, MOTION_READY);
        table.style_defaults.insert(STANCE_SWORD, MOTION_READY);

        let mut from_ready = HashMap::new();
        from_ready.insert(
            MOTION_ATTACK,
            MotionData::new(vec![
                segment(0x0300_0010, 0, 60, 30.0),
                segment(0x0300_0011, 0, 90, -30.0),
            ]),
        );
        from_ready.insert(MOTION_DEATH, MotionData::new(vec![]));
        table
            .links
            .insert(link_key(MOTION_READY, STANCE_NON_COMBAT), from_ready);

        let mut sword = HashMap::new();
        sword.insert(
            MOTION_ATTACK,
            MotionData::new(vec![segment(0x0300_0020, 0, FULL_CLIP_HIGH_FRAME, 30.0)]),
        );
        table.links.insert(link_key(MOTION_READY, STANCE_SWORD), sword);
        table
    }

    #[test]
    fn test_link_key() {
        assert_eq!(link_key(0x4100_0003, 0x8000_003D), 0x003D_0003);
        assert_eq!(link_key(0xFFFF_FFFF, 0), 0x00FF_FFFF);
        // Overlapping bits are OR'd.
        assert_eq!(link_key(0x0012_0000, 0x0001), 0x0013_0000);
    }

    #[test]
    fn test_style_default() {
        let t = table();
        assert_eq!(t.style_default(STANCE_SWORD), MOTION_READY);
        assert_eq!(t.style_default(0x8000_0040), MOTION_INVALID);
    }

    #[test]
    fn test_two_segments_forward_and_reverse() {
        let t = table();
        let length = t.animation_length(MOTION_ATTACK, &no_animations).unwrap();
        assert_eq!(length, 5.0);
        assert_eq!(
            t.animation_length_from(MOTION_READY, STANCE_NON_COMBAT, MOTION_ATTACK, &no_animations)
                .unwrap(),
            5.0
        );
    }

    #[test]
    fn test_unknown_motion_is_zero() {
        let t = table();
        assert_eq!(t.animation_length(0x1000_0099, &no_animations).unwrap(), 0.0);
        assert_eq!(
            t.animation_length_from(0x4100_0004, STANCE_NON_COMBAT, MOTION_ATTACK, &no_animations)
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn test_stance_without_default_uses_invalid_state() {
        let mut t = table();
        let mut from_invalid = HashMap::new();
        from_invalid.insert(MOTION_ATTACK, MotionData::new(vec![segment(1, 0, 30, 30.0)]));
        t.links.insert(link_key(MOTION_INVALID, 0x8000_0040), from_invalid);

        let length = t
            .animation_length_in_style(0x8000_0040, MOTION_ATTACK, &no_animations)
            .unwrap();
        assert_eq!(length, 1.0);
    }

    #[test]
    fn test_empty_link_is_zero() {
        let t = table();
        assert_eq!(t.animation_length(MOTION_DEATH, &no_animations).unwrap(), 0.0);
    }

    #[test]
    fn test_full_clip_uses_raw_frame_count() {
        let t = table();
        let frames = |id: u32| -> Result<u32> {
            assert_eq!(id, 0x0300_0020);
            Ok(150)
        };
        let length = t
            .animation_length_in_style(STANCE_SWORD, MOTION_ATTACK, &frames)
            .unwrap();
        assert_eq!(length, 5.0);
    }

    #[test]
    fn test_full_clip_lookup_failure_propagates() {
        let t = table();
        let err = t
            .animation_length_in_style(STANCE_SWORD, MOTION_ATTACK, &no_animations)
            .unwrap_err();
        assert!(matches!(err, DatError::NotFound(0x0300_0020)));
    }

    #[test]
    fn test_round_trip() {
        let mut t = table();
        t.cycles.insert(
            MOTION_READY,
            MotionData {
                anims: vec![segment(0x0300_0001, 0, 30, 30.0)],
                bitfield: 1,
                flags: 0,
                velocity: Some([0.0, 1.5, 0.0]),
                omega: Some([0.0, 0.0, 0.25]),
            },
        );
        t.modifiers
            .insert(0x2000_0001, MotionData::new(vec![segment(0x0300_0002, 5, 9, -12.0)]));

        let bytes = t.encode().unwrap();
        assert_eq!(MotionTable::decode(&bytes).unwrap(), t);
    }

    #[test]
    fn test_truncation_anywhere_fails() {
        let bytes = table().encode().unwrap();
        for cut in 0..bytes.len() {
            assert!(MotionTable::decode(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }
}
