//! Per-column buffers of shredded values and levels.
use std::hash::{Hash, Hasher};

use ahash::RandomState;
use hashbrown::HashSet;

use crate::encodings::{ColumnValues, Primitive};
use crate::errors::Result;
use crate::schema::{NodeId, Schema, SchemaNode};

/// Hashable key of a primitive, used for the distinct-value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistinctValue {
    Boolean(bool),
    Int(i64),
    /// Bit pattern of a float or double.
    Float(u64),
    Timestamp(i64),
    Bytes(Vec<u8>),
}

impl Hash for DistinctValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            DistinctValue::Boolean(v) => v.hash(state),
            DistinctValue::Int(v) | DistinctValue::Timestamp(v) => v.hash(state),
            DistinctValue::Float(v) => v.hash(state),
            DistinctValue::Bytes(v) => v.hash(state),
        }
    }
}

impl From<&Primitive<'_>> for DistinctValue {
    fn from(p: &Primitive<'_>) -> Self {
        match p {
            Primitive::Boolean(v) => DistinctValue::Boolean(*v),
            Primitive::Int32(v) => DistinctValue::Int(*v as i64),
            Primitive::Int64(v) | Primitive::Int96(v) => DistinctValue::Int(*v),
            Primitive::Timestamp(v) => DistinctValue::Timestamp(v.timestamp_micros()),
            Primitive::Float(v) => DistinctValue::Float(v.to_bits() as u64),
            Primitive::Double(v) | Primitive::Decimal(v) => DistinctValue::Float(v.to_bits()),
            Primitive::ByteArray(v) => DistinctValue::Bytes(v.to_vec()),
        }
    }
}

/// Shredded data of one leaf column.
///
/// `values` holds only the entries whose definition level equals the leaf's
/// `d_level_max`; `rlevels`, `dlevels` and `count` cover every entry,
/// including null occurrences.
#[derive(Debug, Clone)]
pub struct ColumnBuffer<'a> {
    pub column: NodeId,
    pub values: ColumnValues<'a>,
    pub rlevels: Vec<u32>,
    pub dlevels: Vec<u32>,
    pub count: usize,
    pub distinct_values: HashSet<DistinctValue, RandomState>,
}

impl<'a> ColumnBuffer<'a> {
    pub fn new(node: &SchemaNode, treat_int96_as_timestamp: bool) -> Self {
        let values = match node.leaf() {
            Some(leaf) => ColumnValues::empty(leaf.physical, leaf.converted, treat_int96_as_timestamp),
            None => ColumnValues::ByteArray(vec![]),
        };
        Self {
            column: node.id,
            values,
            rlevels: vec![],
            dlevels: vec![],
            count: 0,
            distinct_values: HashSet::with_hasher(RandomState::new()),
        }
    }

    /// Appends a null occurrence.
    pub fn push_null(&mut self, rlevel: u32, dlevel: u32) {
        self.rlevels.push(rlevel);
        self.dlevels.push(dlevel);
        self.count += 1;
    }

    /// Appends a defined value.
    pub fn push_value(&mut self, value: Primitive<'a>, rlevel: u32, dlevel: u32) -> Result<()> {
        let key = DistinctValue::from(&value);
        self.values.push(value)?;
        self.distinct_values.insert(key);
        self.push_null(rlevel, dlevel);
        Ok(())
    }

    /// Moves every entry of `other` to the end of this buffer.
    pub fn append(&mut self, other: ColumnBuffer<'a>) -> Result<()> {
        self.values.extend(other.values)?;
        self.rlevels.extend(other.rlevels);
        self.dlevels.extend(other.dlevels);
        self.count += other.count;
        self.distinct_values.extend(other.distinct_values);
        Ok(())
    }

    /// Copies entries `start..end`, with the values they define. The
    /// distinct-value set is not carried over.
    pub fn slice(&self, start: usize, end: usize, d_level_max: u32) -> ColumnBuffer<'_> {
        let defined = |levels: &[u32]| levels.iter().filter(|d| **d == d_level_max).count();
        let value_start = defined(&self.dlevels[..start]);
        let value_end = value_start + defined(&self.dlevels[start..end]);
        ColumnBuffer {
            column: self.column,
            values: self.values.slice(value_start..value_end),
            rlevels: self.rlevels[start..end].to_vec(),
            dlevels: self.dlevels[start..end].to_vec(),
            count: end - start,
            distinct_values: HashSet::with_hasher(RandomState::new()),
        }
    }

    /// Number of records with an entry in this buffer.
    pub fn num_rows(&self) -> usize {
        self.rlevels.iter().filter(|r| **r == 0).count()
    }

    pub fn into_owned(self) -> ColumnBuffer<'static> {
        ColumnBuffer {
            column: self.column,
            values: self.values.into_owned(),
            rlevels: self.rlevels,
            dlevels: self.dlevels,
            count: self.count,
            distinct_values: self.distinct_values,
        }
    }

    pub fn num_distinct_values(&self) -> usize {
        self.distinct_values.len()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.rlevels.clear();
        self.dlevels.clear();
        self.count = 0;
        self.distinct_values.clear();
    }
}

/// Column buffers for every leaf of one schema, in leaf order, plus row
/// counters.
#[derive(Debug, Clone, Default)]
pub struct RecordBuffer<'a> {
    pub columns: Vec<ColumnBuffer<'a>>,
    pub row_count: usize,
    /// Rows shredded since the last [`RecordBuffer::reset_page`].
    pub page_row_count: usize,
}

impl<'a> RecordBuffer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer with one empty column per leaf of `schema`.
    pub fn for_schema(schema: &Schema) -> Self {
        Self {
            columns: schema
                .leaves()
                .map(|leaf| ColumnBuffer::new(leaf, false))
                .collect(),
            row_count: 0,
            page_row_count: 0,
        }
    }

    /// A buffer over already decoded columns. The row count is taken from
    /// the first column.
    pub fn from_columns(columns: Vec<ColumnBuffer<'a>>) -> Self {
        let row_count = columns.first().map(ColumnBuffer::num_rows).unwrap_or(0);
        Self {
            columns,
            row_count,
            page_row_count: row_count,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn column(&self, schema: &Schema, path: &str) -> Option<&ColumnBuffer<'a>> {
        let id = schema.find_field(path)?.id;
        self.columns.iter().find(|c| c.column == id)
    }

    pub fn column_by_id(&self, id: NodeId) -> Option<&ColumnBuffer<'a>> {
        self.columns.iter().find(|c| c.column == id)
    }

    pub fn reset_page(&mut self) {
        self.page_row_count = 0;
    }

    /// Drops all buffered data, keeping the column layout.
    pub fn clear(&mut self) {
        self.columns.iter_mut().for_each(ColumnBuffer::clear);
        self.row_count = 0;
        self.page_row_count = 0;
    }
}
