//! APIs to shred records into column buffers and encode them into pages.
mod common;
mod page;
mod shred;

pub use common::{encode_column, encode_record_buffer, WriteOptions};
pub use page::encode_page;
pub(crate) use page::value_bit_width;
pub use shred::{shred_record, shred_records};
