//! Dremel-style record shredding and materialization, with the PLAIN and
//! RLE/bit-packing hybrid value codecs and page compression.
//!
//! Records are shredded into one [`ColumnBuffer`] per schema leaf, encoded
//! into compressed [`Page`]s, and read back the same way in reverse.

#[macro_use]
mod errors;

pub mod buffer;
pub mod compression;
pub mod encodings;
pub mod read;
pub mod schema;
pub mod types;
pub mod util;
pub mod value;
pub mod write;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use buffer::{ColumnBuffer, RecordBuffer};
pub use compression::Compression;
pub use encodings::{CodecOptions, ColumnValues, Cursor, Encoding, Primitive};
pub use errors::{Error, Result};
pub use schema::{Schema, SchemaDefinition, SchemaNode};
pub use value::{Record, Value};

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    // compressed size of this page
    pub length: u64,
    // level entries of this page, nulls included
    pub num_values: u64,
    // records starting in this page
    pub num_rows: u64,
    pub uncompressed_size: u64,
    pub encoding: Encoding,
    pub compression: Compression,
}

/// One encoded column page: repetition levels, definition levels and values,
/// compressed as a whole.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub meta: PageMeta,
    pub buffer: Bytes,
}

impl Page {
    /// The uncompressed page body.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        if self.meta.compression.is_none() {
            return Ok(self.buffer.to_vec());
        }
        let size = usize::try_from(self.meta.uncompressed_size)
            .map_err(|_| general_err!("page too large: {} bytes", self.meta.uncompressed_size))?;
        let mut out = Vec::new();
        out.try_reserve_exact(size)
            .map_err(|e| general_err!("cannot allocate a page of {} bytes: {}", size, e))?;
        out.resize(size, 0);
        self.meta.compression.decompress(&self.buffer, &mut out)?;
        Ok(out)
    }
}
