//! APIs to decode pages into column buffers and materialize records.
mod materialize;
mod page;

pub use materialize::{materialize_into, materialize_records};
pub use page::{decode_column, decode_page, decode_page_body, decode_record_buffer};

/// Options declaring how pages are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadOptions {
    /// Decode INT96 values as Julian day timestamps instead of integers.
    pub treat_int96_as_timestamp: bool,
}
