// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Value codecs: PLAIN and the RLE/bit-packing hybrid.
//!
//! Codecs are stateless. Encoders take a typed [`ColumnValues`] array and
//! return bytes; decoders read from a [`Cursor`] and advance it by exactly the
//! number of bytes consumed, so sequential decodes over one buffer compose.
pub mod plain;
pub mod rle;

use std::borrow::Cow;
use std::ops::Range;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::schema::SchemaNode;
use crate::types::{ConvertedType, PhysicalType};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
#[allow(non_camel_case_types)]
pub enum Encoding {
    /// Default byte encoding.
    /// - BOOLEAN - 1 bit per value, 0 is false; 1 is true.
    /// - NUMBER - 4, 8 or 12 bytes per value, stored as little-endian.
    /// - BYTE_ARRAY - 4 byte length stored as little endian, followed by bytes.
    #[default]
    PLAIN,

    /// Run length / bit-packing hybrid.
    ///
    /// Used for repetition and definition levels, and for BOOLEAN, INT32 and
    /// INT64 values.
    RLE,
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PLAIN" => Ok(Encoding::PLAIN),
            "RLE" => Ok(Encoding::RLE),
            other => Err(Error::UnsupportedType(format!("encoding {other}"))),
        }
    }
}

/// A byte buffer plus a read offset.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    pub buffer: &'a [u8],
    pub offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buffer[self.offset.min(self.buffer.len())..]
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| {
                general_err!(
                    "unexpected end of buffer: need {} bytes at offset {}, have {}",
                    len,
                    self.offset,
                    self.buffer.len()
                )
            })?;
        let slice = &self.buffer[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Options recognised by the value codecs.
///
/// Type specific fields fall back to `column` when not set directly.
#[derive(Debug, Clone, Default)]
pub struct CodecOptions<'a> {
    pub original_type: Option<ConvertedType>,
    pub scale: Option<u32>,
    pub precision: Option<u32>,
    pub type_length: Option<usize>,
    pub bit_width: Option<u32>,
    pub disable_envelope: bool,
    pub treat_int96_as_timestamp: bool,
    /// Used in diagnostics only.
    pub name: Option<String>,
    pub column: Option<&'a SchemaNode>,
}

impl<'a> CodecOptions<'a> {
    pub fn for_column(column: &'a SchemaNode) -> Self {
        Self {
            column: Some(column),
            ..Default::default()
        }
    }

    pub fn with_bit_width(mut self, bit_width: u32) -> Self {
        self.bit_width = Some(bit_width);
        self
    }

    pub fn with_disable_envelope(mut self, disable_envelope: bool) -> Self {
        self.disable_envelope = disable_envelope;
        self
    }

    pub fn original_type(&self) -> Option<ConvertedType> {
        self.original_type
            .or_else(|| self.column.and_then(|c| c.leaf()).and_then(|l| l.converted))
    }

    pub fn scale(&self) -> u32 {
        self.scale
            .or_else(|| self.column.and_then(|c| c.leaf()).and_then(|l| l.scale))
            .unwrap_or(0)
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
            .or_else(|| self.column.and_then(|c| c.leaf()).and_then(|l| l.precision))
    }

    pub fn type_length(&self) -> Option<usize> {
        self.type_length
            .or_else(|| self.column.and_then(|c| c.leaf()).and_then(|l| l.type_length))
    }

    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.column.map(|c| c.name.as_str()))
    }

    pub(crate) fn is_decimal(&self) -> bool {
        self.original_type() == Some(ConvertedType::Decimal)
    }
}

/// One wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// INT96 limited to 64 bits of magnitude.
    Int96(i64),
    /// INT96 read in timestamp mode.
    Timestamp(DateTime<Utc>),
    Float(f32),
    Double(f64),
    /// Logical DECIMAL, stored unscaled as INT32 or INT64.
    Decimal(f64),
    ByteArray(Cow<'a, [u8]>),
}

impl<'a> Primitive<'a> {
    pub fn into_owned(self) -> Primitive<'static> {
        match self {
            Primitive::ByteArray(b) => Primitive::ByteArray(Cow::Owned(b.into_owned())),
            Primitive::Boolean(v) => Primitive::Boolean(v),
            Primitive::Int32(v) => Primitive::Int32(v),
            Primitive::Int64(v) => Primitive::Int64(v),
            Primitive::Int96(v) => Primitive::Int96(v),
            Primitive::Timestamp(v) => Primitive::Timestamp(v),
            Primitive::Float(v) => Primitive::Float(v),
            Primitive::Double(v) => Primitive::Double(v),
            Primitive::Decimal(v) => Primitive::Decimal(v),
        }
    }
}

/// A typed array of wire values, one variant per [`Primitive`] variant.
///
/// Decoded byte arrays borrow from the decoded buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues<'a> {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<i64>),
    Timestamp(Vec<DateTime<Utc>>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Decimal(Vec<f64>),
    ByteArray(Vec<Cow<'a, [u8]>>),
}

impl<'a> ColumnValues<'a> {
    /// An empty array of the variant that `physical` (refined by
    /// `converted`) produces when shredded or decoded.
    pub fn empty(
        physical: PhysicalType,
        converted: Option<ConvertedType>,
        treat_int96_as_timestamp: bool,
    ) -> Self {
        match (physical, converted) {
            (PhysicalType::Int32 | PhysicalType::Int64, Some(ConvertedType::Decimal)) => {
                ColumnValues::Decimal(vec![])
            }
            (PhysicalType::Boolean, _) => ColumnValues::Boolean(vec![]),
            (PhysicalType::Int32, _) => ColumnValues::Int32(vec![]),
            (PhysicalType::Int64, _) => ColumnValues::Int64(vec![]),
            (PhysicalType::Int96, _) if treat_int96_as_timestamp => {
                ColumnValues::Timestamp(vec![])
            }
            (PhysicalType::Int96, _) => ColumnValues::Int96(vec![]),
            (PhysicalType::Float, _) => ColumnValues::Float(vec![]),
            (PhysicalType::Double, _) => ColumnValues::Double(vec![]),
            (PhysicalType::ByteArray | PhysicalType::FixedLenByteArray, _) => {
                ColumnValues::ByteArray(vec![])
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Int96(v) => v.len(),
            ColumnValues::Timestamp(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::Decimal(v) => v.len(),
            ColumnValues::ByteArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            ColumnValues::Boolean(_) => "BOOLEAN",
            ColumnValues::Int32(_) => "INT32",
            ColumnValues::Int64(_) => "INT64",
            ColumnValues::Int96(_) => "INT96",
            ColumnValues::Timestamp(_) => "INT96 (timestamp)",
            ColumnValues::Float(_) => "FLOAT",
            ColumnValues::Double(_) => "DOUBLE",
            ColumnValues::Decimal(_) => "DECIMAL",
            ColumnValues::ByteArray(_) => "BYTE_ARRAY",
        }
    }

    fn is_int96(&self) -> bool {
        matches!(self, ColumnValues::Int96(_) | ColumnValues::Timestamp(_))
    }

    /// Whether `other` can be appended to this array. INT96 arrays hold either
    /// integers or timestamps; an empty one takes the other's representation.
    pub fn can_extend(&self, other: &ColumnValues<'_>) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            || (self.is_int96() && other.is_int96() && (self.is_empty() || other.is_empty()))
    }

    /// Appends a value; the primitive must match the array's variant.
    pub fn push(&mut self, value: Primitive<'a>) -> Result<()> {
        if self.is_empty() {
            let adopted = match (&*self, &value) {
                (ColumnValues::Int96(_), Primitive::Timestamp(_)) => Some(ColumnValues::Timestamp(vec![])),
                (ColumnValues::Timestamp(_), Primitive::Int96(_)) => Some(ColumnValues::Int96(vec![])),
                _ => None,
            };
            if let Some(adopted) = adopted {
                *self = adopted;
            }
        }
        match (self, value) {
            (ColumnValues::Boolean(v), Primitive::Boolean(x)) => v.push(x),
            (ColumnValues::Int32(v), Primitive::Int32(x)) => v.push(x),
            (ColumnValues::Int64(v), Primitive::Int64(x)) => v.push(x),
            (ColumnValues::Int96(v), Primitive::Int96(x)) => v.push(x),
            (ColumnValues::Timestamp(v), Primitive::Timestamp(x)) => v.push(x),
            (ColumnValues::Float(v), Primitive::Float(x)) => v.push(x),
            (ColumnValues::Double(v), Primitive::Double(x)) => v.push(x),
            (ColumnValues::Decimal(v), Primitive::Decimal(x)) => v.push(x),
            (ColumnValues::ByteArray(v), Primitive::ByteArray(x)) => v.push(x),
            (this, value) => {
                return Err(Error::UnsupportedType(format!(
                    "cannot append {value:?} to {} values",
                    this.variant_name()
                )))
            }
        }
        Ok(())
    }

    /// Appends every value of `other`, which must be of the same variant.
    pub fn extend(&mut self, other: ColumnValues<'a>) -> Result<()> {
        if self.is_int96() && other.is_int96() {
            if other.is_empty() {
                return Ok(());
            }
            if self.is_empty() {
                *self = other;
                return Ok(());
            }
        }
        match (self, other) {
            (ColumnValues::Boolean(v), ColumnValues::Boolean(x)) => v.extend(x),
            (ColumnValues::Int32(v), ColumnValues::Int32(x)) => v.extend(x),
            (ColumnValues::Int64(v), ColumnValues::Int64(x)) => v.extend(x),
            (ColumnValues::Int96(v), ColumnValues::Int96(x)) => v.extend(x),
            (ColumnValues::Timestamp(v), ColumnValues::Timestamp(x)) => v.extend(x),
            (ColumnValues::Float(v), ColumnValues::Float(x)) => v.extend(x),
            (ColumnValues::Double(v), ColumnValues::Double(x)) => v.extend(x),
            (ColumnValues::Decimal(v), ColumnValues::Decimal(x)) => v.extend(x),
            (ColumnValues::ByteArray(v), ColumnValues::ByteArray(x)) => v.extend(x),
            (this, other) => {
                return Err(Error::UnsupportedType(format!(
                    "cannot append {} values to {} values",
                    other.variant_name(),
                    this.variant_name()
                )))
            }
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<Primitive<'_>> {
        Some(match self {
            ColumnValues::Boolean(v) => Primitive::Boolean(*v.get(index)?),
            ColumnValues::Int32(v) => Primitive::Int32(*v.get(index)?),
            ColumnValues::Int64(v) => Primitive::Int64(*v.get(index)?),
            ColumnValues::Int96(v) => Primitive::Int96(*v.get(index)?),
            ColumnValues::Timestamp(v) => Primitive::Timestamp(*v.get(index)?),
            ColumnValues::Float(v) => Primitive::Float(*v.get(index)?),
            ColumnValues::Double(v) => Primitive::Double(*v.get(index)?),
            ColumnValues::Decimal(v) => Primitive::Decimal(*v.get(index)?),
            ColumnValues::ByteArray(v) => Primitive::ByteArray(Cow::Borrowed(v.get(index)?.as_ref())),
        })
    }

    /// Copies the values in `range`; byte arrays borrow from `self`.
    pub fn slice(&self, range: Range<usize>) -> ColumnValues<'_> {
        match self {
            ColumnValues::Boolean(v) => ColumnValues::Boolean(v[range].to_vec()),
            ColumnValues::Int32(v) => ColumnValues::Int32(v[range].to_vec()),
            ColumnValues::Int64(v) => ColumnValues::Int64(v[range].to_vec()),
            ColumnValues::Int96(v) => ColumnValues::Int96(v[range].to_vec()),
            ColumnValues::Timestamp(v) => ColumnValues::Timestamp(v[range].to_vec()),
            ColumnValues::Float(v) => ColumnValues::Float(v[range].to_vec()),
            ColumnValues::Double(v) => ColumnValues::Double(v[range].to_vec()),
            ColumnValues::Decimal(v) => ColumnValues::Decimal(v[range].to_vec()),
            ColumnValues::ByteArray(v) => ColumnValues::ByteArray(
                v[range].iter().map(|b| Cow::Borrowed(b.as_ref())).collect(),
            ),
        }
    }

    pub fn clear(&mut self) {
        match self {
            ColumnValues::Boolean(v) => v.clear(),
            ColumnValues::Int32(v) => v.clear(),
            ColumnValues::Int64(v) => v.clear(),
            ColumnValues::Int96(v) => v.clear(),
            ColumnValues::Timestamp(v) => v.clear(),
            ColumnValues::Float(v) => v.clear(),
            ColumnValues::Double(v) => v.clear(),
            ColumnValues::Decimal(v) => v.clear(),
            ColumnValues::ByteArray(v) => v.clear(),
        }
    }

    pub fn into_owned(self) -> ColumnValues<'static> {
        match self {
            ColumnValues::ByteArray(v) => ColumnValues::ByteArray(
                v.into_iter()
                    .map(|b| Cow::Owned(b.into_owned()))
                    .collect(),
            ),
            ColumnValues::Boolean(v) => ColumnValues::Boolean(v),
            ColumnValues::Int32(v) => ColumnValues::Int32(v),
            ColumnValues::Int64(v) => ColumnValues::Int64(v),
            ColumnValues::Int96(v) => ColumnValues::Int96(v),
            ColumnValues::Timestamp(v) => ColumnValues::Timestamp(v),
            ColumnValues::Float(v) => ColumnValues::Float(v),
            ColumnValues::Double(v) => ColumnValues::Double(v),
            ColumnValues::Decimal(v) => ColumnValues::Decimal(v),
        }
    }
}

/// Encodes `values` of physical type `type_` with `encoding`.
pub fn encode_values(
    type_: PhysicalType,
    encoding: Encoding,
    values: &ColumnValues<'_>,
    options: &CodecOptions<'_>,
) -> Result<Vec<u8>> {
    match encoding {
        Encoding::PLAIN => plain::encode_values(type_, values, options),
        Encoding::RLE => rle::encode_values(type_, values, options),
    }
}

/// Decodes `count` values of physical type `type_`, advancing `cursor`.
pub fn decode_values<'a>(
    type_: PhysicalType,
    encoding: Encoding,
    cursor: &mut Cursor<'a>,
    count: usize,
    options: &CodecOptions<'_>,
) -> Result<ColumnValues<'a>> {
    let result = match encoding {
        Encoding::PLAIN => plain::decode_values(type_, cursor, count, options),
        Encoding::RLE => rle::decode_values(type_, cursor, count, options),
    };
    if let Err(e) = &result {
        log::warn!(
            "error decoding column {}: {}",
            options.name().unwrap_or("<unnamed>"),
            e
        );
    }
    result
}
