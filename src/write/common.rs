use ahash::RandomState;
use hashbrown::HashMap;

use crate::buffer::{ColumnBuffer, RecordBuffer};
use crate::errors::Result;
use crate::schema::{Schema, SchemaNode};
use crate::{Compression, Page};

use super::page::encode_page;

/// Options declaring how columns are written to pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Page compression for columns that declare none.
    pub compression: Compression,
    /// Maximum number of records per page; `None` writes one page per column.
    pub max_page_size: Option<usize>,
    /// Per-column compression keyed by dotted path. Takes precedence over the
    /// schema.
    pub column_compression: HashMap<String, Compression, RandomState>,
}

impl WriteOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = Some(max_page_size);
        self
    }

    pub fn with_column_compression(mut self, path: &str, compression: Compression) -> Self {
        self.column_compression.insert(path.to_owned(), compression);
        self
    }

    pub fn compression_for(&self, node: &SchemaNode) -> Compression {
        self.column_compression
            .get(&node.path_string())
            .copied()
            .or(node.compression)
            .unwrap_or(self.compression)
    }
}

/// Entry offsets at which each page starts. Pages never split a record.
fn page_starts(column: &ColumnBuffer<'_>, max_page_size: Option<usize>) -> Vec<usize> {
    let mut starts = vec![0];
    let page_size = match max_page_size {
        Some(size) if size > 0 => size,
        _ => return starts,
    };
    let mut rows = 0;
    for (i, rlevel) in column.rlevels.iter().enumerate().take(column.count) {
        if *rlevel == 0 {
            if rows == page_size {
                starts.push(i);
                rows = 0;
            }
            rows += 1;
        }
    }
    starts
}

/// Encodes one column into pages of at most `options.max_page_size` records.
pub fn encode_column(
    node: &SchemaNode,
    column: &ColumnBuffer<'_>,
    options: &WriteOptions,
) -> Result<Vec<Page>> {
    let starts = page_starts(column, options.max_page_size);
    if starts.len() == 1 {
        return Ok(vec![encode_page(node, column, options)?]);
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = starts.get(i + 1).copied().unwrap_or(column.count);
            encode_page(node, &column.slice(*start, end, node.d_level_max), options)
        })
        .collect()
}

/// Encodes every column of `buffer`, in leaf order.
pub fn encode_record_buffer(
    schema: &Schema,
    buffer: &RecordBuffer<'_>,
    options: &WriteOptions,
) -> Result<Vec<Vec<Page>>> {
    buffer
        .columns
        .iter()
        .map(|column| encode_column(schema.node(column.column), column, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::shred_record;
    use crate::{Record, Value};

    #[test]
    fn test_compression_precedence() {
        let schema = Schema::from_json(
            r#"{ "a": { "type": "INT32", "compression": "GZIP" }, "b": { "type": "INT32" } }"#,
        )
        .unwrap();
        let a = schema.find_field("a").unwrap();
        let b = schema.find_field("b").unwrap();

        let options = WriteOptions::default().with_compression(Compression::Zstd);
        assert_eq!(options.compression_for(a), Compression::Gzip);
        assert_eq!(options.compression_for(b), Compression::Zstd);

        let options = options.with_column_compression("a", Compression::Snappy);
        assert_eq!(options.compression_for(a), Compression::Snappy);
    }

    #[test]
    fn test_pages_split_on_records() {
        let schema = Schema::from_json(r#"{ "x": { "type": "INT32", "repeated": true } }"#).unwrap();
        let mut buffer = RecordBuffer::new();
        for n in 0..5 {
            let values: Vec<Value> = (0..n).map(Value::from).collect();
            let record = Record::new().with("x", values);
            shred_record(&schema, &record, &mut buffer).unwrap();
        }
        let column = &buffer.columns[0];
        assert_eq!(page_starts(column, Some(2)), vec![0, 2, 7]);

        let options = WriteOptions::default().with_max_page_size(2);
        let pages = encode_column(schema.node(column.column), column, &options).unwrap();
        let rows: Vec<_> = pages.iter().map(|p| p.meta.num_rows).collect();
        assert_eq!(rows, vec![2, 2, 1]);
        let values: u64 = pages.iter().map(|p| p.meta.num_values).sum();
        assert_eq!(values as usize, column.count);
    }
}
