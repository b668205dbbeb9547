use thiserror::Error;

/// Failure while decoding a record from its byte buffer.
///
/// Decoding never yields a partially populated value: any of these aborts
/// the whole record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream ended before a declared field could be fully read.
    #[error("truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A collection declared more entries than the buffer could possibly hold.
    #[error("malformed collection at offset {offset}: count {count} exceeds {remaining} remaining bytes")]
    MalformedCollection {
        offset: usize,
        count: u32,
        remaining: usize,
    },

    /// A value cannot be represented in the on-disk encoding.
    #[error("value {value:#x} cannot be encoded as {encoding}")]
    Unencodable { value: u64, encoding: &'static str },
}

/// Failure anywhere between the container file and a decoded record.
#[derive(Error, Debug)]
pub enum DatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store has no record for this asset id.
    #[error("asset {0:#010x} not found")]
    NotFound(u32),

    #[error("invalid container magic bytes: not a motion DAT file")]
    InvalidMagic,

    #[error("unsupported container version {0} (only version 1 is supported)")]
    UnsupportedVersion(u16),

    #[error("unknown compression id {0}")]
    UnknownCompression(u16),

    /// The footer and header describe an index that does not fit in the file.
    #[error("corrupt index: {entry_count} entries at offset {index_offset} overrun a {file_len}-byte file")]
    CorruptIndex {
        entry_count: u32,
        index_offset: u64,
        file_len: u64,
    },

    #[error("asset {id:#010x} checksum mismatch: expected {expected:016x}, got {actual:016x}")]
    ChecksumMismatch { id: u32, expected: u64, actual: u64 },

    #[error("asset {id:#010x} decompressed to {actual} bytes but index says {expected}")]
    LengthMismatch { id: u32, expected: u32, actual: usize },

    #[error("compression error: {0}")]
    Compression(String),

    #[error("asset {0:#010x} added twice")]
    DuplicateAsset(u32),

    /// The id's type tag does not match the record type being requested.
    #[error("asset {id:#010x} is not a {expected} record")]
    WrongFileType { id: u32, expected: &'static str },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, DatError>;
