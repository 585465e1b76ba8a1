use ahash::RandomState;
use hashbrown::HashSet;

use crate::buffer::{ColumnBuffer, RecordBuffer};
use crate::encodings::{self, rle, CodecOptions, Cursor, Encoding};
use crate::errors::Result;
use crate::schema::{Schema, SchemaNode};
use crate::util::get_bits_needed;
use crate::write::value_bit_width;
use crate::Page;

use super::ReadOptions;

fn decode_levels(
    cursor: &mut Cursor<'_>,
    count: usize,
    max_level: u32,
) -> Result<Vec<u32>> {
    if max_level == 0 {
        let mut levels = Vec::new();
        levels
            .try_reserve_exact(count)
            .map_err(|e| general_err!("cannot allocate {} levels: {}", count, e))?;
        levels.resize(count, 0);
        return Ok(levels);
    }
    rle::decode_levels(cursor, count, get_bits_needed(max_level as u64), false)
}

/// Decodes an uncompressed page body holding `num_values` entries. Byte
/// array values borrow from `body`.
pub fn decode_page_body<'a>(
    node: &SchemaNode,
    body: &'a [u8],
    num_values: usize,
    options: &ReadOptions,
) -> Result<ColumnBuffer<'a>> {
    let leaf = node
        .leaf()
        .ok_or_else(|| general_err!("{} is not a leaf column", node.path_string()))?;

    let mut cursor = Cursor::new(body);
    let rlevels = decode_levels(&mut cursor, num_values, node.r_level_max)?;
    let dlevels = decode_levels(&mut cursor, num_values, node.d_level_max)?;
    let defined = dlevels.iter().filter(|d| **d == node.d_level_max).count();

    let mut codec_options = CodecOptions::for_column(node);
    codec_options.treat_int96_as_timestamp = options.treat_int96_as_timestamp;
    if node.encoding == Encoding::RLE {
        codec_options.bit_width = Some(value_bit_width(node, leaf.physical)?);
    }
    let values = encodings::decode_values(
        leaf.physical,
        node.encoding,
        &mut cursor,
        defined,
        &codec_options,
    )?;

    if !cursor.is_empty() {
        return Err(general_err!(
            "{} trailing bytes in page of column {}",
            cursor.remaining().len(),
            node.path_string()
        ));
    }

    Ok(ColumnBuffer {
        column: node.id,
        values,
        rlevels,
        dlevels,
        count: num_values,
        distinct_values: HashSet::with_hasher(RandomState::new()),
    })
}

/// Decompresses and decodes one page.
pub fn decode_page(
    node: &SchemaNode,
    page: &Page,
    options: &ReadOptions,
) -> Result<ColumnBuffer<'static>> {
    let body = page.decompress()?;
    let column = decode_page_body(node, &body, page.meta.num_values as usize, options)?;
    Ok(column.into_owned())
}

/// Decodes the pages of one column, in order, into a single buffer.
pub fn decode_column(
    node: &SchemaNode,
    pages: &[Page],
    options: &ReadOptions,
) -> Result<ColumnBuffer<'static>> {
    let mut column = ColumnBuffer::new(node, options.treat_int96_as_timestamp);
    for page in pages {
        column.append(decode_page(node, page, options)?)?;
    }
    Ok(column)
}

/// Decodes the pages of every column of `schema`, given in leaf order.
pub fn decode_record_buffer(
    schema: &Schema,
    pages: &[Vec<Page>],
    options: &ReadOptions,
) -> Result<RecordBuffer<'static>> {
    if pages.len() != schema.num_columns() {
        return Err(general_err!(
            "expected pages for {} columns, got {}",
            schema.num_columns(),
            pages.len()
        ));
    }
    let columns = schema
        .leaves()
        .zip(pages)
        .map(|(node, pages)| decode_column(node, pages, options))
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<usize> = columns.iter().map(ColumnBuffer::num_rows).collect();
    if rows.windows(2).any(|w| w[0] != w[1]) {
        return Err(general_err!("columns disagree on the number of records: {:?}", rows));
    }
    Ok(RecordBuffer::from_columns(columns))
}
