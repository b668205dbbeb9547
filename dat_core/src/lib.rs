pub mod cache;
pub mod codec;
pub mod collection;
pub mod compression;
pub mod error;
pub mod format;
pub mod reader;
pub mod store;
pub mod writer;

pub use cache::FileCache;
pub use codec::{DatBuffer, DatReader, Pack, Unpack};
pub use collection::{read_count, read_list, read_mapping, write_mapping};
pub use compression::Compression;
pub use error::{DatError, DecodeError, Result};
pub use format::{DatHeader, IndexEntry, HEADER_SIZE, MAGIC};
pub use reader::DatArchive;
pub use store::{AssetStore, MemoryStore};
pub use writer::DatWriter;
