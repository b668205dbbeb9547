use dat_core::{read_list, DatBuffer, DatReader, DecodeError, Pack, Result, Unpack};
use serde::Serialize;

use crate::motion_table::AnimationSource;

/// `low_frame` value of the "play the whole clip" sentinel.
pub const FULL_CLIP_LOW_FRAME: u32 = 0;
/// `high_frame` value of the "play the whole clip" sentinel.
pub const FULL_CLIP_HIGH_FRAME: u32 = 0xFFFF_FFFF;

/// MotionData flag: a velocity vector follows the segments.
pub const MOTION_HAS_VELOCITY: u8 = 0x1;
/// MotionData flag: an angular velocity vector follows the velocity.
pub const MOTION_HAS_OMEGA: u8 = 0x2;

/// One contiguous frame range of a raw animation.
///
/// A negative framerate plays the range in reverse; only its magnitude
/// affects duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimData {
    pub anim_id: u32,
    pub low_frame: u32,
    pub high_frame: u32,
    pub framerate: f32,
}

impl AnimData {
    pub fn is_full_clip(&self) -> bool {
        self.low_frame == FULL_CLIP_LOW_FRAME && self.high_frame == FULL_CLIP_HIGH_FRAME
    }

    /// Frames this segment plays.
    ///
    /// For the full-clip sentinel this asks `anims` for the raw animation's
    /// length. Otherwise it is `high_frame - low_frame` in wrapping u32
    /// arithmetic, so an inverted range yields a huge count rather than zero.
    pub fn frame_count<S: AnimationSource + ?Sized>(&self, anims: &S) -> Result<u32> {
        if self.is_full_clip() {
            anims.frame_count(self.anim_id)
        } else {
            Ok(self.high_frame.wrapping_sub(self.low_frame))
        }
    }

    /// Seconds this segment plays. A zero framerate is not guarded and
    /// yields an infinite or NaN duration.
    pub fn duration<S: AnimationSource + ?Sized>(&self, anims: &S) -> Result<f32> {
        Ok(self.frame_count(anims)? as f32 / self.framerate.abs())
    }
}

impl Unpack for AnimData {
    fn unpack(reader: &mut DatReader<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            anim_id: reader.read_u32()?,
            low_frame: reader.read_u32()?,
            high_frame: reader.read_u32()?,
            framerate: reader.read_f32()?,
        })
    }
}

impl Pack for AnimData {
    fn pack(&self, buf: &mut DatBuffer) -> std::result::Result<(), DecodeError> {
        buf.write_u32(self.anim_id);
        buf.write_u32(self.low_frame);
        buf.write_u32(self.high_frame);
        buf.write_f32(self.framerate);
        Ok(())
    }
}

/// An ordered list of segments played back to back, plus optional motion vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MotionData {
    pub anims: Vec<AnimData>,
    pub bitfield: u8,
    pub flags: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omega: Option<[f32; 3]>,
}

impl MotionData {
    pub fn new(anims: Vec<AnimData>) -> Self {
        Self {
            anims,
            ..Self::default()
        }
    }

    /// Sum of every segment's duration, in order. Empty data lasts `0.0`.
    pub fn duration<S: AnimationSource + ?Sized>(&self, anims: &S) -> Result<f32> {
        let mut length = 0.0f32;
        for anim in &self.anims {
            length += anim.duration(anims)?;
        }
        Ok(length)
    }
}

fn read_vec3(reader: &mut DatReader<'_>) -> std::result::Result<[f32; 3], DecodeError> {
    Ok([reader.read_f32()?, reader.read_f32()?, reader.read_f32()?])
}

fn write_vec3(buf: &mut DatBuffer, v: &[f32; 3]) {
    for c in v {
        buf.write_f32(*c);
    }
}

impl Unpack for MotionData {
    /// `count:u8 bitfield:u8 flags:u8`, pad to 4 bytes, `count` segments,
    /// then the vectors announced by `flags`.
    fn unpack(reader: &mut DatReader<'_>) -> std::result::Result<Self, DecodeError> {
        let count = reader.read_u8()?;
        let bitfield = reader.read_u8()?;
        let flags = reader.read_u8()?;
        reader.align_boundary()?;

        let anims = read_list(reader, count as u32, AnimData::unpack)?;
        let velocity = if flags & MOTION_HAS_VELOCITY != 0 {
            Some(read_vec3(reader)?)
        } else {
            None
        };
        let omega = if flags & MOTION_HAS_OMEGA != 0 {
            Some(read_vec3(reader)?)
        } else {
            None
        };

        Ok(Self {
            anims,
            bitfield,
            flags,
            velocity,
            omega,
        })
    }
}

impl Pack for MotionData {
    fn pack(&self, buf: &mut DatBuffer) -> std::result::Result<(), DecodeError> {
        let count = u8::try_from(self.anims.len()).map_err(|_| DecodeError::Unencodable {
            value: self.anims.len() as u64,
            encoding: "u8 segment count",
        })?;

        let mut flags = self.flags & !(MOTION_HAS_VELOCITY | MOTION_HAS_OMEGA);
        if self.velocity.is_some() {
            flags |= MOTION_HAS_VELOCITY;
        }
        if self.omega.is_some() {
            flags |= MOTION_HAS_OMEGA;
        }

        buf.write_u8(count);
        buf.write_u8(self.bitfield);
        buf.write_u8(flags);
        buf.align_boundary();

        for anim in &self.anims {
            anim.pack(buf)?;
        }
        if let Some(v) = &self.velocity {
            write_vec3(buf, v);
        }
        if let Some(w) = &self.omega {
            write_vec3(buf, w);
        }
        Ok(())
    }
}
