pub mod bit_util;

pub use bit_util::{ceil8, decode_varint, encode_varint, get_bits_needed, is_native_little_endian};
