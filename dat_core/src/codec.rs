use crate::error::DecodeError;

/// Largest value representable as a compressed u32 (30 payload bits).
pub const COMPRESSED_U32_MAX: u32 = 0x3FFF_FFFF;

/// A record type that can be decoded from a DAT byte stream.
pub trait Unpack: Sized {
    fn unpack(reader: &mut DatReader<'_>) -> Result<Self, DecodeError>;

    /// Decode a complete record from offset 0 of `bytes`.
    ///
    /// Trailing bytes after the record are ignored; record buffers handed out
    /// by the container are often padded.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = DatReader::new(bytes);
        Self::unpack(&mut reader)
    }
}

/// The inverse of [`Unpack`], used to author records and build fixtures.
pub trait Pack {
    fn pack(&self, buf: &mut DatBuffer) -> Result<(), DecodeError>;

    fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let mut buf = DatBuffer::new();
        self.pack(&mut buf)?;
        Ok(buf.into_bytes())
    }
}

/// Little-endian read cursor over a single record buffer.
///
/// Every read either consumes exactly the bytes it needs or fails with
/// [`DecodeError::TruncatedInput`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct DatReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DatReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the record.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::TruncatedInput {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read a variable-length u32.
    ///
    /// Layout by leading byte `b0`:
    /// - `0xxxxxxx`                      → 1 byte, value `b0`
    /// - `10xxxxxx b1`                   → 2 bytes, `(b0 & 0x7F) << 8 | b1`
    /// - `11xxxxxx b1 lo:u16`            → 4 bytes, `((b0 & 0x3F) << 8 | b1) << 16 | lo`
    pub fn read_compressed_u32(&mut self) -> Result<u32, DecodeError> {
        let start = self.pos;
        let result = self.read_compressed_u32_inner();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_compressed_u32_inner(&mut self) -> Result<u32, DecodeError> {
        let b0 = self.read_u8()? as u32;
        if b0 & 0x80 == 0 {
            return Ok(b0);
        }

        let b1 = self.read_u8()? as u32;
        if b0 & 0x40 == 0 {
            return Ok(((b0 & 0x7F) << 8) | b1);
        }

        let lo = self.read_u16()? as u32;
        Ok(((((b0 & 0x3F) << 8) | b1) << 16) | lo)
    }

    /// Read `len` bytes of single-byte text.
    ///
    /// Each byte maps to the code point of the same value, so every byte
    /// sequence decodes.
    pub fn read_pstring(&mut self, len: u32) -> Result<String, DecodeError> {
        let bytes = self.read_bytes(len as usize)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    /// Skip padding up to the next 4-byte boundary, measured from the record start.
    pub fn align_boundary(&mut self) -> Result<(), DecodeError> {
        let pad = (4 - (self.pos % 4)) % 4;
        self.read_bytes(pad)?;
        Ok(())
    }
}

/// Little-endian write buffer mirroring [`DatReader`].
#[derive(Debug, Clone, Default)]
pub struct DatBuffer {
    bytes: Vec<u8>,
}

impl DatBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Write `v` in the shortest compressed form.
    pub fn write_compressed_u32(&mut self, v: u32) -> Result<(), DecodeError> {
        match v {
            0..=0x7F => self.write_u8(v as u8),
            0x80..=0x3FFF => {
                self.write_u8(0x80 | (v >> 8) as u8);
                self.write_u8(v as u8);
            }
            0x4000..=COMPRESSED_U32_MAX => {
                self.write_u8(0xC0 | (v >> 24) as u8);
                self.write_u8((v >> 16) as u8);
                self.write_u16(v as u16);
            }
            _ => {
                return Err(DecodeError::Unencodable {
                    value: v as u64,
                    encoding: "compressed u32",
                })
            }
        }
        Ok(())
    }

    /// Write the compressed length followed by the single-byte text.
    pub fn write_pstring(&mut self, s: &str) -> Result<(), DecodeError> {
        let bytes = s
            .chars()
            .map(|c| {
                u8::try_from(c as u32).map_err(|_| DecodeError::Unencodable {
                    value: c as u64,
                    encoding: "single-byte text",
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        self.write_compressed_u32(bytes.len() as u32)?;
        self.write_bytes(&bytes);
        Ok(())
    }

    /// Pad with zeros up to the next 4-byte boundary.
    pub fn align_boundary(&mut self) {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
    }
}
