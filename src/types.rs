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

//! Type tags and the conversion between user values and wire primitives.
//!
//! [`to_primitive`] validates a user [`Value`] against the numeric domain of a
//! leaf type and produces the exact wire representation. [`from_primitive`]
//! is the inverse used when materializing records.
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use num::{BigInt, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::encodings::plain::JULIAN_DAY_OF_EPOCH;
use crate::encodings::Primitive;
use crate::errors::{Error, Result};
use crate::value::{Record, Value};

const MILLIS_PER_DAY: i64 = 86_400_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Physical (storage) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

impl PhysicalType {
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalType::Boolean => "BOOLEAN",
            PhysicalType::Int32 => "INT32",
            PhysicalType::Int64 => "INT64",
            PhysicalType::Int96 => "INT96",
            PhysicalType::Float => "FLOAT",
            PhysicalType::Double => "DOUBLE",
            PhysicalType::ByteArray => "BYTE_ARRAY",
            PhysicalType::FixedLenByteArray => "FIXED_LEN_BYTE_ARRAY",
        }
    }
}

/// Logical annotations layered on a physical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvertedType {
    Utf8,
    Enum,
    Json,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal,
    Interval,
    List,
    Map,
}

impl ConvertedType {
    pub fn name(&self) -> &'static str {
        match self {
            ConvertedType::Utf8 => "UTF8",
            ConvertedType::Enum => "ENUM",
            ConvertedType::Json => "JSON",
            ConvertedType::Date => "DATE",
            ConvertedType::TimeMillis => "TIME_MILLIS",
            ConvertedType::TimeMicros => "TIME_MICROS",
            ConvertedType::TimestampMillis => "TIMESTAMP_MILLIS",
            ConvertedType::TimestampMicros => "TIMESTAMP_MICROS",
            ConvertedType::Int8 => "INT_8",
            ConvertedType::Int16 => "INT_16",
            ConvertedType::Int32 => "INT_32",
            ConvertedType::Int64 => "INT_64",
            ConvertedType::Uint8 => "UINT_8",
            ConvertedType::Uint16 => "UINT_16",
            ConvertedType::Uint32 => "UINT_32",
            ConvertedType::Uint64 => "UINT_64",
            ConvertedType::Decimal => "DECIMAL",
            ConvertedType::Interval => "INTERVAL",
            ConvertedType::List => "LIST",
            ConvertedType::Map => "MAP",
        }
    }
}

/// A type tag as written in a schema definition, e.g. `"INT64"` or `"UTF8"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Physical(PhysicalType),
    Converted(ConvertedType),
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Physical(p) => p.name(),
            TypeTag::Converted(c) => c.name(),
        }
    }

    /// Physical storage of a converted type. DECIMAL depends on precision.
    fn physical_type(&self, precision: Option<u32>) -> Option<PhysicalType> {
        use ConvertedType::*;
        Some(match self {
            TypeTag::Physical(p) => *p,
            TypeTag::Converted(c) => match c {
                Utf8 | Enum | Json => PhysicalType::ByteArray,
                Date | TimeMillis | Int8 | Int16 | Int32 | Uint8 | Uint16 | Uint32 => {
                    PhysicalType::Int32
                }
                TimeMicros | TimestampMillis | TimestampMicros | Int64 | Uint64 => {
                    PhysicalType::Int64
                }
                Interval => PhysicalType::FixedLenByteArray,
                Decimal => match precision {
                    Some(p) if p > 9 => PhysicalType::Int64,
                    _ => PhysicalType::Int32,
                },
                List | Map => return None,
            },
        })
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use ConvertedType as C;
        use PhysicalType as P;
        Ok(match s {
            "BOOLEAN" => TypeTag::Physical(P::Boolean),
            "INT32" => TypeTag::Physical(P::Int32),
            "INT64" => TypeTag::Physical(P::Int64),
            "INT96" => TypeTag::Physical(P::Int96),
            "FLOAT" => TypeTag::Physical(P::Float),
            "DOUBLE" => TypeTag::Physical(P::Double),
            "BYTE_ARRAY" => TypeTag::Physical(P::ByteArray),
            "FIXED_LEN_BYTE_ARRAY" => TypeTag::Physical(P::FixedLenByteArray),
            "UTF8" => TypeTag::Converted(C::Utf8),
            "ENUM" => TypeTag::Converted(C::Enum),
            "JSON" => TypeTag::Converted(C::Json),
            "DATE" => TypeTag::Converted(C::Date),
            "TIME_MILLIS" => TypeTag::Converted(C::TimeMillis),
            "TIME_MICROS" => TypeTag::Converted(C::TimeMicros),
            "TIMESTAMP_MILLIS" => TypeTag::Converted(C::TimestampMillis),
            "TIMESTAMP_MICROS" => TypeTag::Converted(C::TimestampMicros),
            "INT_8" => TypeTag::Converted(C::Int8),
            "INT_16" => TypeTag::Converted(C::Int16),
            "INT_32" => TypeTag::Converted(C::Int32),
            "INT_64" => TypeTag::Converted(C::Int64),
            "UINT_8" => TypeTag::Converted(C::Uint8),
            "UINT_16" => TypeTag::Converted(C::Uint16),
            "UINT_32" => TypeTag::Converted(C::Uint32),
            "UINT_64" => TypeTag::Converted(C::Uint64),
            "DECIMAL" => TypeTag::Converted(C::Decimal),
            "INTERVAL" => TypeTag::Converted(C::Interval),
            "LIST" => TypeTag::Converted(C::List),
            "MAP" => TypeTag::Converted(C::Map),
            other => return Err(Error::UnsupportedType(other.to_owned())),
        })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The resolved type of a leaf column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafType {
    pub physical: PhysicalType,
    pub converted: Option<ConvertedType>,
    pub type_length: Option<usize>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl LeafType {
    pub fn new(
        tag: TypeTag,
        type_length: Option<usize>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Result<Self> {
        let physical = tag.physical_type(precision).ok_or_else(|| {
            schema_err!("{} must be declared with nested fields", tag.name())
        })?;
        let converted = match tag {
            TypeTag::Converted(c) => Some(c),
            TypeTag::Physical(_) => None,
        };

        let type_length = match converted {
            Some(ConvertedType::Interval) => Some(12),
            _ => type_length,
        };
        if physical == PhysicalType::FixedLenByteArray && type_length.is_none() {
            return Err(Error::MissingOption {
                option: "typeLength",
                type_name: "FIXED_LEN_BYTE_ARRAY",
            });
        }
        if converted == Some(ConvertedType::Decimal) {
            match precision {
                None => {
                    return Err(Error::MissingOption {
                        option: "precision",
                        type_name: "DECIMAL",
                    })
                }
                Some(p) if p == 0 || p > 18 => {
                    return Err(schema_err!("invalid DECIMAL precision: {}", p))
                }
                Some(p) if scale.unwrap_or(0) > p => {
                    return Err(schema_err!("DECIMAL scale must not exceed precision {}", p))
                }
                _ => {}
            }
        }

        Ok(Self {
            physical,
            converted,
            type_length,
            precision,
            scale,
        })
    }

    pub fn physical(physical: PhysicalType) -> Self {
        Self {
            physical,
            converted: None,
            type_length: None,
            precision: None,
            scale: None,
        }
    }

    /// The converted type name when present, else the physical type name.
    pub fn name(&self) -> &'static str {
        self.converted
            .map(|c| c.name())
            .unwrap_or_else(|| self.physical.name())
    }
}

fn parse_numeric(type_name: &str, s: &str) -> Result<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if let Ok(b) = s.parse::<BigInt>() {
        return Ok(Value::BigInt(b));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Value::Float(f)),
        _ => Err(Error::domain(type_name, s)),
    }
}

/// Integer view of a numeric value, wide enough for every supported domain.
fn to_integer(type_name: &str, value: &Value) -> Result<i128> {
    match value {
        Value::Int(i) => Ok(*i as i128),
        Value::BigInt(b) => b.to_i128().ok_or_else(|| Error::domain(type_name, b)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38 => Ok(*f as i128),
        Value::String(s) => to_integer(type_name, &parse_numeric(type_name, s)?),
        other => Err(Error::domain(type_name, other)),
    }
}

fn to_float(type_name: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::BigInt(b) => b.to_f64().ok_or_else(|| Error::domain(type_name, b)),
        Value::Float(f) => Ok(*f),
        Value::String(s) => to_float(type_name, &parse_numeric(type_name, s)?),
        other => Err(Error::domain(type_name, other)),
    }
}

fn check_range(type_name: &str, value: &Value, min: i128, max: i128) -> Result<i128> {
    let v = to_integer(type_name, value)?;
    if v < min || v > max {
        return Err(Error::domain(type_name, v));
    }
    Ok(v)
}

fn to_bytes(type_name: &str, value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        other => Err(Error::domain(type_name, other)),
    }
}

fn interval_part(record: &Record, name: &str) -> Result<u32> {
    match record.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(v) => Ok(check_range("INTERVAL", v, 0, u32::MAX as i128)? as u32),
    }
}

/// Converts a user value into the wire primitive for `leaf`.
pub fn to_primitive(leaf: &LeafType, value: &Value) -> Result<Primitive<'static>> {
    use ConvertedType::*;
    let name = leaf.name();
    if value.is_null() {
        return Err(Error::domain(name, value));
    }

    let converted = match leaf.converted {
        Some(c) => c,
        None => return physical_to_primitive(leaf, value),
    };

    Ok(match converted {
        Utf8 | Enum => match value {
            Value::String(s) => Primitive::ByteArray(Cow::Owned(s.as_bytes().to_vec())),
            Value::Bytes(b) if std::str::from_utf8(b).is_ok() => {
                Primitive::ByteArray(Cow::Owned(b.clone()))
            }
            other => return Err(Error::domain(name, other)),
        },
        Json => Primitive::ByteArray(Cow::Owned(serde_json::to_vec(&value.to_json())?)),
        Int8 => Primitive::Int32(check_range(name, value, i8::MIN as i128, i8::MAX as i128)? as i32),
        Int16 => {
            Primitive::Int32(check_range(name, value, i16::MIN as i128, i16::MAX as i128)? as i32)
        }
        Int32 => {
            Primitive::Int32(check_range(name, value, i32::MIN as i128, i32::MAX as i128)? as i32)
        }
        Uint8 => Primitive::Int32(check_range(name, value, 0, u8::MAX as i128)? as i32),
        Uint16 => Primitive::Int32(check_range(name, value, 0, u16::MAX as i128)? as i32),
        Uint32 => Primitive::Int32(check_range(name, value, 0, u32::MAX as i128)? as u32 as i32),
        Int64 => {
            Primitive::Int64(check_range(name, value, i64::MIN as i128, i64::MAX as i128)? as i64)
        }
        Uint64 => Primitive::Int64(check_range(name, value, 0, u64::MAX as i128)? as u64 as i64),
        Date => match value {
            Value::Timestamp(ts) => {
                let days = ts.timestamp_millis().div_euclid(MILLIS_PER_DAY);
                Primitive::Int32(check_range(name, &Value::Int(days), 0, i32::MAX as i128)? as i32)
            }
            other => Primitive::Int32(check_range(name, other, 0, i32::MAX as i128)? as i32),
        },
        TimeMillis => Primitive::Int32(check_range(name, value, 0, i32::MAX as i128)? as i32),
        TimeMicros => Primitive::Int64(check_range(name, value, 0, i64::MAX as i128)? as i64),
        TimestampMillis => match value {
            Value::Timestamp(ts) => {
                let millis = Value::Int(ts.timestamp_millis());
                Primitive::Int64(check_range(name, &millis, 0, i64::MAX as i128)? as i64)
            }
            other => Primitive::Int64(check_range(name, other, 0, i64::MAX as i128)? as i64),
        },
        TimestampMicros => match value {
            Value::Timestamp(ts) => {
                let micros = Value::Int(ts.timestamp_micros());
                Primitive::Int64(check_range(name, &micros, 0, i64::MAX as i128)? as i64)
            }
            other => Primitive::Int64(check_range(name, other, 0, i64::MAX as i128)? as i64),
        },
        Decimal => Primitive::Decimal(to_float(name, value)?),
        Interval => match value {
            Value::Record(r) => {
                let mut buf = Vec::with_capacity(12);
                for part in ["months", "days", "milliseconds"] {
                    buf.extend_from_slice(&interval_part(r, part)?.to_le_bytes());
                }
                Primitive::ByteArray(Cow::Owned(buf))
            }
            Value::Bytes(b) if b.len() == 12 => Primitive::ByteArray(Cow::Owned(b.clone())),
            other => return Err(Error::domain(name, other)),
        },
        List | Map => return Err(Error::UnsupportedType(format!("{name} leaf"))),
    })
}

fn physical_to_primitive(leaf: &LeafType, value: &Value) -> Result<Primitive<'static>> {
    let name = leaf.name();
    Ok(match leaf.physical {
        PhysicalType::Boolean => match value {
            Value::Boolean(b) => Primitive::Boolean(*b),
            Value::Int(i) => Primitive::Boolean(*i != 0),
            Value::String(s) if s == "true" || s == "false" => Primitive::Boolean(s == "true"),
            other => return Err(Error::domain(name, other)),
        },
        PhysicalType::Int32 => {
            Primitive::Int32(check_range(name, value, i32::MIN as i128, i32::MAX as i128)? as i32)
        }
        PhysicalType::Int64 => {
            Primitive::Int64(check_range(name, value, i64::MIN as i128, i64::MAX as i128)? as i64)
        }
        PhysicalType::Int96 => match value {
            Value::Timestamp(ts) => {
                let julian_day = ts.timestamp().div_euclid(SECONDS_PER_DAY) + JULIAN_DAY_OF_EPOCH;
                if julian_day < 0 || julian_day > u32::MAX as i64 {
                    return Err(Error::domain(name, value));
                }
                Primitive::Timestamp(*ts)
            }
            other => {
                Primitive::Int96(check_range(name, other, i64::MIN as i128, i64::MAX as i128)? as i64)
            }
        },
        PhysicalType::Float => Primitive::Float(to_float(name, value)? as f32),
        PhysicalType::Double => Primitive::Double(to_float(name, value)?),
        PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => {
            Primitive::ByteArray(Cow::Owned(to_bytes(name, value)?))
        }
    })
}

fn timestamp_from_millis(type_name: &str, millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::domain(type_name, millis))
}

fn timestamp_from_micros(type_name: &str, micros: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(
        micros.div_euclid(1_000_000),
        (micros.rem_euclid(1_000_000) * 1_000) as u32,
    )
    .single()
    .ok_or_else(|| Error::domain(type_name, micros))
}

/// Converts a decoded wire primitive back into a user value.
pub fn from_primitive(leaf: &LeafType, primitive: Primitive<'_>) -> Result<Value> {
    use ConvertedType::*;
    let name = leaf.name();

    Ok(match (leaf.converted, primitive) {
        (Some(Utf8 | Enum), Primitive::ByteArray(b)) => Value::String(
            String::from_utf8(b.into_owned())
                .map_err(|e| general_err!("invalid UTF8 value: {}", e))?,
        ),
        // a JSON `null` document materializes as a null value
        (Some(Json), Primitive::ByteArray(b)) => {
            Value::from(serde_json::from_slice::<serde_json::Value>(&b)?)
        }
        (Some(Uint8 | Uint16 | Uint32), Primitive::Int32(v)) => Value::Int(v as u32 as i64),
        (Some(Uint64), Primitive::Int64(v)) => Value::from(v as u64),
        (Some(Date), Primitive::Int32(days)) => {
            Value::Timestamp(timestamp_from_millis(name, days as i64 * MILLIS_PER_DAY)?)
        }
        (Some(TimestampMillis), Primitive::Int64(v)) => {
            Value::Timestamp(timestamp_from_millis(name, v)?)
        }
        (Some(TimestampMicros), Primitive::Int64(v)) => {
            Value::Timestamp(timestamp_from_micros(name, v)?)
        }
        (Some(Interval), Primitive::ByteArray(b)) => {
            if b.len() != 12 {
                return Err(Error::InvalidFixedLengthValue {
                    expected: 12,
                    actual: b.len(),
                });
            }
            let part = |i: usize| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&b[i * 4..i * 4 + 4]);
                Value::Int(u32::from_le_bytes(raw) as i64)
            };
            Value::Record(
                Record::new()
                    .with("months", part(0))
                    .with("days", part(1))
                    .with("milliseconds", part(2)),
            )
        }
        (_, Primitive::Boolean(v)) => Value::Boolean(v),
        (_, Primitive::Int32(v)) => Value::Int(v as i64),
        (_, Primitive::Int64(v)) => Value::Int(v),
        (_, Primitive::Int96(v)) => Value::Int(v),
        (_, Primitive::Timestamp(ts)) => Value::Timestamp(ts),
        (_, Primitive::Float(v)) => Value::Float(v as f64),
        (_, Primitive::Double(v)) => Value::Float(v),
        (_, Primitive::Decimal(v)) => Value::Float(v),
        (_, Primitive::ByteArray(b)) => Value::Bytes(b.into_owned()),
    })
}
