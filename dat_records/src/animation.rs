use dat_core::{read_list, DatBuffer, DatReader, DecodeError, Pack, Unpack};
use serde::Serialize;

use crate::{DatFile, DatFileType};

/// Animation flag: one root position frame per animation frame follows the header.
pub const ANIMATION_HAS_POS_FRAMES: u32 = 0x1;

/// A placement: origin plus orientation quaternion stored as `w, x, y, z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub origin: [f32; 3],
    pub orientation: [f32; 4],
}

impl Unpack for Frame {
    fn unpack(reader: &mut DatReader<'_>) -> Result<Self, DecodeError> {
        let origin = [reader.read_f32()?, reader.read_f32()?, reader.read_f32()?];
        let orientation = [
            reader.read_f32()?,
            reader.read_f32()?,
            reader.read_f32()?,
            reader.read_f32()?,
        ];
        Ok(Self { origin, orientation })
    }
}

impl Pack for Frame {
    fn pack(&self, buf: &mut DatBuffer) -> Result<(), DecodeError> {
        for c in self.origin.iter().chain(self.orientation.iter()) {
            buf.write_f32(*c);
        }
        Ok(())
    }
}

/// A raw animation clip (ids starting with 0x03).
///
/// Only the header and root motion are decoded; the per-part frames and
/// hooks are kept as opaque bytes since durations only need `num_frames`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Animation {
    pub id: u32,
    pub flags: u32,
    pub num_parts: u32,
    pub num_frames: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pos_frames: Vec<Frame>,
    #[serde(skip)]
    pub part_frames: Vec<u8>,
}

impl Unpack for Animation {
    fn unpack(reader: &mut DatReader<'_>) -> Result<Self, DecodeError> {
        let id = reader.read_u32()?;
        let flags = reader.read_u32()?;
        let num_parts = reader.read_u32()?;
        let num_frames = reader.read_u32()?;

        let pos_frames = if flags & ANIMATION_HAS_POS_FRAMES != 0 {
            read_list(reader, num_frames, Frame::unpack)?
        } else {
            Vec::new()
        };
        let part_frames = reader.read_bytes(reader.remaining())?.to_vec();

        Ok(Self {
            id,
            flags,
            num_parts,
            num_frames,
            pos_frames,
            part_frames,
        })
    }
}

impl Pack for Animation {
    fn pack(&self, buf: &mut DatBuffer) -> Result<(), DecodeError> {
        let mut flags = self.flags & !ANIMATION_HAS_POS_FRAMES;
        if !self.pos_frames.is_empty() {
            flags |= ANIMATION_HAS_POS_FRAMES;
        }
        buf.write_u32(self.id);
        buf.write_u32(flags);
        buf.write_u32(self.num_parts);
        buf.write_u32(self.num_frames);
        for frame in &self.pos_frames {
            frame.pack(buf)?;
        }
        buf.write_bytes(&self.part_frames);
        Ok(())
    }
}

impl DatFile for Animation {
    const FILE_TYPE: DatFileType = DatFileType::Animation;
}
