use dat_core::{DatBuffer, DatReader, DecodeError, Pack, Unpack};
use serde::Serialize;

use crate::{DatFile, DatFileType};

/// A localized text record (ids starting with 0x31).
///
/// `text` is `None` when the stored length is zero. A present but empty
/// string has no encoding of its own and is refused by [`Pack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageString {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Unpack for LanguageString {
    fn unpack(reader: &mut DatReader<'_>) -> Result<Self, DecodeError> {
        let id = reader.read_u32()?;
        let len = reader.read_compressed_u32()?;
        let text = if len > 0 {
            Some(reader.read_pstring(len)?)
        } else {
            None
        };
        Ok(Self { id, text })
    }
}

impl Pack for LanguageString {
    fn pack(&self, buf: &mut DatBuffer) -> Result<(), DecodeError> {
        buf.write_u32(self.id);
        match &self.text {
            // A zero length reads back as absent text.
            Some(text) if text.is_empty() => Err(DecodeError::Unencodable {
                value: 0,
                encoding: "present pstring (zero length means absent)",
            }),
            Some(text) => buf.write_pstring(text),
            None => buf.write_compressed_u32(0),
        }
    }
}

impl DatFile for LanguageString {
    const FILE_TYPE: DatFileType = DatFileType::String;
}
