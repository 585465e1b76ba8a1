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

//! The PLAIN encoding.
//!
//! * BOOLEAN: bit-packed LSB-first, padded to a whole byte.
//! * INT32, INT64, FLOAT, DOUBLE: little-endian, 4 or 8 bytes.
//! * INT96: 12 bytes. As an integer, the low 8 bytes hold the value and the
//!   high 4 bytes its sign extension. As a timestamp, the low 8 bytes hold the
//!   nanoseconds within the day and the high 4 bytes the Julian day.
//! * BYTE_ARRAY: 4-byte little-endian length followed by the bytes.
//! * FIXED_LEN_BYTE_ARRAY: exactly `type_length` bytes.
use std::borrow::Cow;
use std::mem::size_of;

use byteorder::{ByteOrder, LittleEndian};
use bytemuck::Pod;
use bytes::BufMut;
use chrono::{DateTime, TimeZone, Utc};

use super::{CodecOptions, ColumnValues, Cursor};
use crate::errors::{Error, Result};
use crate::types::PhysicalType;
use crate::util::{ceil8, is_native_little_endian};

/// Julian day number of 1970-01-01.
pub const JULIAN_DAY_OF_EPOCH: i64 = 2_440_588;
const SECONDS_PER_DAY: i64 = 86_400;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const MILLIS_PER_DAY: i64 = 86_400_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

fn write_native<T: Pod>(values: &[T], out: &mut Vec<u8>, write: impl Fn(&mut Vec<u8>, T)) {
    if is_native_little_endian() {
        out.extend_from_slice(bytemuck::cast_slice(values));
    } else {
        out.reserve(values.len() * size_of::<T>());
        for v in values {
            write(out, *v);
        }
    }
}

fn read_native<T: Pod>(cursor: &mut Cursor<'_>, count: usize, read: fn(&[u8]) -> T) -> Result<Vec<T>> {
    let len = count
        .checked_mul(size_of::<T>())
        .ok_or_else(|| general_err!("too many values: {}", count))?;
    let bytes = cursor.take(len)?;
    if is_native_little_endian() {
        let mut out = vec![T::zeroed(); count];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
        Ok(out)
    } else {
        Ok(bytes.chunks_exact(size_of::<T>()).map(read).collect())
    }
}

fn encode_booleans(values: &[bool], out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + ceil8(values.len()), 0);
    for (i, v) in values.iter().enumerate() {
        if *v {
            out[start + i / 8] |= 1 << (i % 8);
        }
    }
}

fn decode_booleans(cursor: &mut Cursor<'_>, count: usize) -> Result<Vec<bool>> {
    let bytes = cursor.take(ceil8(count))?;
    Ok((0..count).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect())
}

/// Unscaled integer of a decimal. Values within rounding noise of an integer
/// (e.g. `1.1 * 100 = 110.00000000000001`) snap to it; others are floored.
fn unscale(value: f64, scale: u32) -> f64 {
    let scaled = value * 10f64.powi(scale as i32);
    let rounded = scaled.round();
    let tolerance = (scaled.abs() * f64::EPSILON * 4.0).max(1e-6);
    if (scaled - rounded).abs() < tolerance {
        rounded
    } else {
        scaled.floor()
    }
}

fn decimal_to_int(value: f64, scale: u32, min: f64, max: f64) -> Result<i64> {
    let unscaled = unscale(value, scale);
    if !unscaled.is_finite() || unscaled < min || unscaled > max {
        return Err(Error::domain("DECIMAL", value));
    }
    Ok(unscaled as i64)
}

fn decimal_precision(options: &CodecOptions<'_>) -> Result<u32> {
    options.precision().ok_or(Error::MissingOption {
        option: "precision",
        type_name: "DECIMAL",
    })
}

/// Bytes per stored decimal: precision above 9 digits always takes 8 bytes,
/// even on an INT32 column.
fn decimal_width(type_: PhysicalType, precision: Option<u32>) -> usize {
    match (type_, precision) {
        (_, Some(p)) if p > 9 => 8,
        (PhysicalType::Int32, _) => 4,
        _ => 8,
    }
}

fn encode_int96(value: i64, out: &mut Vec<u8>) {
    out.put_i64_le(value);
    out.put_u32_le(if value < 0 { u32::MAX } else { 0 });
}

fn encode_int96_timestamp(ts: &DateTime<Utc>, out: &mut Vec<u8>) {
    let secs = ts.timestamp();
    let day = secs.div_euclid(SECONDS_PER_DAY) + JULIAN_DAY_OF_EPOCH;
    let nanos =
        secs.rem_euclid(SECONDS_PER_DAY) * NANOS_PER_SECOND + ts.timestamp_subsec_nanos() as i64;
    out.put_u64_le(nanos as u64);
    out.put_u32_le(day as u32);
}

/// Timestamps are truncated to whole milliseconds.
fn decode_int96_timestamp(raw: &[u8]) -> Result<DateTime<Utc>> {
    let nanos = LittleEndian::read_u64(&raw[0..8]);
    let day = LittleEndian::read_u32(&raw[8..12]) as i64;
    (day - JULIAN_DAY_OF_EPOCH)
        .checked_mul(MILLIS_PER_DAY)
        .and_then(|millis| millis.checked_add((nanos / NANOS_PER_MILLI as u64) as i64))
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .ok_or_else(|| Error::domain("INT96", format!("julian day {day}, {nanos} ns")))
}

fn fixed_length(options: &CodecOptions<'_>) -> Result<usize> {
    options.type_length().ok_or(Error::MissingOption {
        option: "typeLength",
        type_name: "FIXED_LEN_BYTE_ARRAY",
    })
}

/// Encodes `values` as PLAIN.
pub fn encode_values(
    type_: PhysicalType,
    values: &ColumnValues<'_>,
    options: &CodecOptions<'_>,
) -> Result<Vec<u8>> {
    let mut out = vec![];
    match (type_, values) {
        (PhysicalType::Boolean, ColumnValues::Boolean(v)) => encode_booleans(v, &mut out),
        (PhysicalType::Int32, ColumnValues::Int32(v)) => {
            write_native(v, &mut out, |o, x| o.put_i32_le(x))
        }
        (PhysicalType::Int64, ColumnValues::Int64(v)) => {
            write_native(v, &mut out, |o, x| o.put_i64_le(x))
        }
        (PhysicalType::Int32 | PhysicalType::Int64, ColumnValues::Decimal(v)) => {
            let scale = options.scale();
            let width = decimal_width(type_, options.precision());
            out.reserve(v.len() * width);
            for x in v {
                if width == 4 {
                    let unscaled = decimal_to_int(*x, scale, i32::MIN as f64, i32::MAX as f64)?;
                    out.put_i32_le(unscaled as i32);
                } else {
                    out.put_i64_le(decimal_to_int(*x, scale, i64::MIN as f64, i64::MAX as f64)?);
                }
            }
        }
        (PhysicalType::Int96, ColumnValues::Int96(v)) => {
            out.reserve(v.len() * 12);
            v.iter().for_each(|x| encode_int96(*x, &mut out));
        }
        (PhysicalType::Int96, ColumnValues::Timestamp(v)) => {
            out.reserve(v.len() * 12);
            v.iter().for_each(|ts| encode_int96_timestamp(ts, &mut out));
        }
        (PhysicalType::Float, ColumnValues::Float(v)) => {
            write_native(v, &mut out, |o, x| o.put_f32_le(x))
        }
        (PhysicalType::Double, ColumnValues::Double(v)) => {
            write_native(v, &mut out, |o, x| o.put_f64_le(x))
        }
        (PhysicalType::ByteArray, ColumnValues::ByteArray(v)) => {
            out.reserve(v.iter().map(|b| b.len() + 4).sum());
            for b in v {
                out.put_u32_le(b.len() as u32);
                out.put_slice(b);
            }
        }
        (PhysicalType::FixedLenByteArray, ColumnValues::ByteArray(v)) => {
            let length = fixed_length(options)?;
            out.reserve(v.len() * length);
            for b in v {
                if b.len() != length {
                    return Err(Error::InvalidFixedLengthValue {
                        expected: length,
                        actual: b.len(),
                    });
                }
                out.put_slice(b);
            }
        }
        (type_, values) => {
            return Err(Error::UnsupportedType(format!(
                "PLAIN cannot encode {} values as {}",
                values.variant_name(),
                type_.name()
            )))
        }
    }
    Ok(out)
}

/// Decodes `count` PLAIN values. Byte arrays borrow from the cursor's buffer.
pub fn decode_values<'a>(
    type_: PhysicalType,
    cursor: &mut Cursor<'a>,
    count: usize,
    options: &CodecOptions<'_>,
) -> Result<ColumnValues<'a>> {
    Ok(match type_ {
        PhysicalType::Boolean => ColumnValues::Boolean(decode_booleans(cursor, count)?),
        PhysicalType::Int32 | PhysicalType::Int64 if options.is_decimal() => {
            let precision = decimal_precision(options)?;
            let divisor = 10f64.powi(options.scale() as i32);
            let unscaled: Vec<f64> = if decimal_width(type_, Some(precision)) == 4 {
                read_native(cursor, count, LittleEndian::read_i32)?
                    .into_iter()
                    .map(f64::from)
                    .collect()
            } else {
                read_native(cursor, count, LittleEndian::read_i64)?
                    .into_iter()
                    .map(|x| x as f64)
                    .collect()
            };
            ColumnValues::Decimal(unscaled.into_iter().map(|x| x / divisor).collect())
        }
        PhysicalType::Int32 => ColumnValues::Int32(read_native(cursor, count, LittleEndian::read_i32)?),
        PhysicalType::Int64 => ColumnValues::Int64(read_native(cursor, count, LittleEndian::read_i64)?),
        PhysicalType::Int96 => {
            let len = count
                .checked_mul(12)
                .ok_or_else(|| general_err!("too many values: {}", count))?;
            let bytes = cursor.take(len)?;
            if options.treat_int96_as_timestamp {
                ColumnValues::Timestamp(
                    bytes
                        .chunks_exact(12)
                        .map(decode_int96_timestamp)
                        .collect::<Result<_>>()?,
                )
            } else {
                ColumnValues::Int96(
                    bytes
                        .chunks_exact(12)
                        .map(|raw| LittleEndian::read_i64(&raw[0..8]))
                        .collect(),
                )
            }
        }
        PhysicalType::Float => ColumnValues::Float(read_native(cursor, count, LittleEndian::read_f32)?),
        PhysicalType::Double => {
            ColumnValues::Double(read_native(cursor, count, LittleEndian::read_f64)?)
        }
        PhysicalType::ByteArray => {
            let mut v = Vec::with_capacity(count.min(cursor.remaining().len() / 4));
            for _ in 0..count {
                let len = LittleEndian::read_u32(&cursor.take_array::<4>()?) as usize;
                v.push(Cow::Borrowed(cursor.take(len)?));
            }
            ColumnValues::ByteArray(v)
        }
        PhysicalType::FixedLenByteArray => {
            let length = fixed_length(options)?;
            let mut v = Vec::with_capacity(count.min(cursor.remaining().len() / length.max(1)));
            for _ in 0..count {
                v.push(Cow::Borrowed(cursor.take(length)?));
            }
            ColumnValues::ByteArray(v)
        }
    })
}
