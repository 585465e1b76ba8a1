use bytes::{BufMut, Bytes};

use crate::buffer::ColumnBuffer;
use crate::encodings::{self, rle, CodecOptions, Encoding};
use crate::errors::{Error, Result};
use crate::schema::SchemaNode;
use crate::types::PhysicalType;
use crate::util::get_bits_needed;
use crate::{Page, PageMeta};

use super::WriteOptions;

/// Bit width of RLE-encoded values: 1 for booleans, else the column's
/// declared type length.
pub(crate) fn value_bit_width(node: &SchemaNode, physical: PhysicalType) -> Result<u32> {
    match physical {
        PhysicalType::Boolean => Ok(1),
        _ => node
            .leaf()
            .and_then(|l| l.type_length)
            .map(|len| len as u32)
            .ok_or(Error::MissingOption {
                option: "typeLength",
                type_name: "RLE",
            }),
    }
}

/// Encodes a leaf column into one page.
///
/// The page body is the repetition levels, then the definition levels, then
/// the values. A level stream is omitted when its maximum level is 0. Level
/// streams always use RLE with a length envelope, values use the column's
/// encoding. The whole body is compressed with the column's codec.
pub fn encode_page(
    node: &SchemaNode,
    column: &ColumnBuffer<'_>,
    options: &WriteOptions,
) -> Result<Page> {
    let leaf = node
        .leaf()
        .ok_or_else(|| general_err!("{} is not a leaf column", node.path_string()))?;

    let mut body = vec![];
    if node.r_level_max > 0 {
        let bit_width = get_bits_needed(node.r_level_max as u64);
        body.put_slice(&rle::encode_levels(&column.rlevels, bit_width, false)?);
    }
    if node.d_level_max > 0 {
        let bit_width = get_bits_needed(node.d_level_max as u64);
        body.put_slice(&rle::encode_levels(&column.dlevels, bit_width, false)?);
    }

    let mut codec_options = CodecOptions::for_column(node);
    if node.encoding == Encoding::RLE {
        codec_options.bit_width = Some(value_bit_width(node, leaf.physical)?);
    }
    body.put_slice(&encodings::encode_values(
        leaf.physical,
        node.encoding,
        &column.values,
        &codec_options,
    )?);

    let compression = options.compression_for(node);
    let mut buffer = Vec::with_capacity(body.len());
    let length = compression.compress(&body, &mut buffer)?;

    log::debug!(
        "column {}: {} entries, {} values, {:?} / {}, {} -> {} bytes",
        node.path_string(),
        column.count,
        column.values.len(),
        node.encoding,
        compression.name(),
        body.len(),
        length
    );

    Ok(Page {
        meta: PageMeta {
            length: length as u64,
            num_values: column.count as u64,
            num_rows: column.num_rows() as u64,
            uncompressed_size: body.len() as u64,
            encoding: node.encoding,
            compression,
        },
        buffer: Bytes::from(buffer),
    })
}
