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

//! The RLE / bit-packing hybrid.
//!
//! A stream of runs, each prefixed by a varint header
//! `(run_length << 1) | flag`:
//!
//! * `flag = 1`: bit-packed run of `run_length` groups of 8 values, packed
//!   LSB-first at `bit_width` bits each. The final group is zero padded.
//! * `flag = 0`: repeated run of `run_length` copies of one value, stored in
//!   `ceil(bit_width / 8)` little-endian bytes.
//!
//! Unless the envelope is disabled, the run stream is prefixed by its length
//! as a 4-byte little-endian integer.
//!
//! The run framing is generic over [`HybridScalar`]. Levels, booleans and
//! INT32 use `u32`; INT64 uses [`BigUint`] so that every 64-bit pattern
//! survives unchanged.
use std::fmt::Debug;

use byteorder::{ByteOrder, LittleEndian};
use num::{BigUint, One, ToPrimitive, Zero};

use super::{CodecOptions, ColumnValues, Cursor};
use crate::errors::{Error, Result};
use crate::types::PhysicalType;
use crate::util::{ceil8, decode_varint, encode_varint};

/// Scalar element of a hybrid run.
pub trait HybridScalar: Clone + PartialEq + Debug {
    /// Widest supported bit width.
    const MAX_BIT_WIDTH: u32;

    fn zero() -> Self;

    fn bit(&self, i: u32) -> bool;

    fn set_bit(&mut self, i: u32);

    /// Number of significant bits.
    fn bits(&self) -> u32;
}

impl HybridScalar for u32 {
    const MAX_BIT_WIDTH: u32 = 32;

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn bit(&self, i: u32) -> bool {
        i < 32 && (self >> i) & 1 == 1
    }

    #[inline]
    fn set_bit(&mut self, i: u32) {
        *self |= 1 << i;
    }

    #[inline]
    fn bits(&self) -> u32 {
        u32::BITS - self.leading_zeros()
    }
}

impl HybridScalar for BigUint {
    const MAX_BIT_WIDTH: u32 = 64;

    fn zero() -> Self {
        Zero::zero()
    }

    fn bit(&self, i: u32) -> bool {
        ((self >> i as usize) & BigUint::one()).is_one()
    }

    fn set_bit(&mut self, i: u32) {
        *self |= BigUint::one() << i as usize;
    }

    fn bits(&self) -> u32 {
        BigUint::bits(self) as u32
    }
}

fn check_bit_width<T: HybridScalar>(bit_width: u32) -> Result<()> {
    if bit_width > T::MAX_BIT_WIDTH {
        return Err(rle_err!(
            "bit width {} exceeds the maximum of {}",
            bit_width,
            T::MAX_BIT_WIDTH
        ));
    }
    Ok(())
}

fn encode_run_bitpacked<T: HybridScalar>(values: &[T], bit_width: u32, out: &mut Vec<u8>) {
    let groups = (values.len() + 7) / 8;
    encode_varint(((groups as u64) << 1) | 1, out);

    let bit_width = bit_width as usize;
    let start = out.len();
    out.resize(start + ceil8(bit_width * groups * 8), 0);
    for (i, value) in values.iter().enumerate() {
        for b in 0..bit_width {
            if value.bit(b as u32) {
                let pos = i * bit_width + b;
                out[start + pos / 8] |= 1 << (pos % 8);
            }
        }
    }
}

fn encode_run_repeated<T: HybridScalar>(value: &T, count: usize, bit_width: u32, out: &mut Vec<u8>) {
    encode_varint((count as u64) << 1, out);
    for byte in 0..ceil8(bit_width as usize) {
        let mut b = 0u8;
        for i in 0..8 {
            if value.bit((byte * 8 + i) as u32) {
                b |= 1 << i;
            }
        }
        out.push(b);
    }
}

/// Encodes `values` as a hybrid run stream.
///
/// A repeated run is opened when the next two values are equal and the
/// pending bit-packed run holds a multiple of 8 values, so bit-packed runs
/// never need padding except at the very end.
pub fn encode<T: HybridScalar>(
    values: &[T],
    bit_width: u32,
    disable_envelope: bool,
) -> Result<Vec<u8>> {
    check_bit_width::<T>(bit_width)?;
    if let Some(v) = values.iter().find(|v| v.bits() > bit_width) {
        return Err(rle_err!("value {:?} does not fit in {} bits", v, bit_width));
    }

    let mut out = if disable_envelope {
        vec![]
    } else {
        vec![0u8; 4]
    };

    let n = values.len();
    let mut run_start = 0;
    let mut run_len = 0;
    let mut repeats = 0;
    for i in 0..n {
        if repeats == 0 && run_len % 8 == 0 && i + 1 < n && values[i] == values[i + 1] {
            if run_len > 0 {
                encode_run_bitpacked(&values[run_start..run_start + run_len], bit_width, &mut out);
                run_len = 0;
            }
            repeats = 1;
        } else if repeats > 0 && values[i] == values[i - 1] {
            repeats += 1;
        } else {
            if repeats > 0 {
                encode_run_repeated(&values[i - 1], repeats, bit_width, &mut out);
                repeats = 0;
            }
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        }
    }

    if repeats > 0 {
        encode_run_repeated(&values[n - 1], repeats, bit_width, &mut out);
    } else if run_len > 0 {
        encode_run_bitpacked(&values[run_start..run_start + run_len], bit_width, &mut out);
    }

    if !disable_envelope {
        let len = (out.len() - 4) as u32;
        LittleEndian::write_u32(&mut out[0..4], len);
    }
    Ok(out)
}

/// Decodes exactly `count` values, advancing `cursor` past the run stream
/// (and its envelope, when present).
pub fn decode<T: HybridScalar>(
    cursor: &mut Cursor<'_>,
    count: usize,
    bit_width: u32,
    disable_envelope: bool,
) -> Result<Vec<T>> {
    check_bit_width::<T>(bit_width)?;

    let data = if disable_envelope {
        cursor.remaining()
    } else {
        let len = LittleEndian::read_u32(&cursor.take_array::<4>()?) as usize;
        cursor.take(len).map_err(|_| {
            rle_err!(
                "envelope declares {} bytes but only {} remain",
                len,
                cursor.remaining().len()
            )
        })?
    };

    let bit_width = bit_width as usize;
    // a bit-packed stream holds at most 8 values per byte; repeated runs grow
    // the vector as they are read
    let mut values = Vec::with_capacity(count.min(data.len().saturating_mul(8)));
    let mut pos = 0;
    while values.len() < count {
        let (header, read) = decode_varint(&data[pos..])?;
        pos += read;
        let run_length = (header >> 1) as usize;
        if run_length == 0 {
            return Err(rle_err!("zero-length run at byte {}", pos - read));
        }
        let missing = count - values.len();

        if header & 1 == 1 {
            let num_values = run_length
                .checked_mul(8)
                .ok_or_else(|| rle_err!("bit-packed run too long"))?;
            // only the zero padding of the final group may exceed `count`
            if num_values - 8 >= missing {
                return Err(rle_err!(
                    "bit-packed run of {} values exceeds the {} values left",
                    num_values,
                    missing
                ));
            }
            let num_bytes = bit_width
                .checked_mul(num_values)
                .map(ceil8)
                .ok_or_else(|| rle_err!("bit-packed run too long"))?;
            let run = data
                .get(pos..pos.saturating_add(num_bytes))
                .ok_or_else(|| rle_err!("truncated bit-packed run"))?;
            pos += num_bytes;

            for i in 0..num_values.min(missing) {
                let mut value = T::zero();
                for b in 0..bit_width {
                    let bit = i * bit_width + b;
                    if run[bit / 8] & (1 << (bit % 8)) != 0 {
                        value.set_bit(b as u32);
                    }
                }
                values.push(value);
            }
        } else {
            if run_length > missing {
                return Err(rle_err!(
                    "repeated run of {} values exceeds the {} values left",
                    run_length,
                    missing
                ));
            }
            let num_bytes = ceil8(bit_width);
            let raw = data
                .get(pos..pos + num_bytes)
                .ok_or_else(|| rle_err!("truncated repeated run"))?;
            pos += num_bytes;

            let mut value = T::zero();
            for (byte, b) in raw.iter().enumerate() {
                for i in 0..8 {
                    if b & (1 << i) != 0 {
                        value.set_bit((byte * 8 + i) as u32);
                    }
                }
            }
            values
                .try_reserve(run_length)
                .map_err(|e| rle_err!("repeated run of {} values: {}", run_length, e))?;
            values.resize(values.len() + run_length, value);
        }
    }

    if disable_envelope {
        cursor.offset += pos;
    } else if pos != data.len() {
        return Err(rle_err!(
            "{} trailing bytes after {} values",
            data.len() - pos,
            count
        ));
    }
    Ok(values)
}

/// Encodes repetition or definition levels.
pub fn encode_levels(levels: &[u32], bit_width: u32, disable_envelope: bool) -> Result<Vec<u8>> {
    encode(levels, bit_width, disable_envelope)
}

pub fn decode_levels(
    cursor: &mut Cursor<'_>,
    count: usize,
    bit_width: u32,
    disable_envelope: bool,
) -> Result<Vec<u32>> {
    decode(cursor, count, bit_width, disable_envelope)
}

fn bit_width(options: &CodecOptions<'_>) -> Result<u32> {
    options.bit_width.ok_or(Error::MissingOption {
        option: "bitWidth",
        type_name: "RLE",
    })
}

/// Encodes BOOLEAN, INT32 or INT64 values.
pub fn encode_values(
    type_: PhysicalType,
    values: &ColumnValues<'_>,
    options: &CodecOptions<'_>,
) -> Result<Vec<u8>> {
    let bit_width = bit_width(options)?;
    let disable_envelope = options.disable_envelope;
    match (type_, values) {
        (PhysicalType::Boolean, ColumnValues::Boolean(v)) => {
            let v: Vec<u32> = v.iter().map(|b| *b as u32).collect();
            encode(&v, bit_width, disable_envelope)
        }
        (PhysicalType::Int32, ColumnValues::Int32(v)) => {
            let v: Vec<u32> = v.iter().map(|x| *x as u32).collect();
            encode(&v, bit_width, disable_envelope)
        }
        (PhysicalType::Int64, ColumnValues::Int64(v)) => {
            let v: Vec<BigUint> = v.iter().map(|x| BigUint::from(*x as u64)).collect();
            encode(&v, bit_width, disable_envelope)
        }
        (type_, values) => Err(Error::UnsupportedType(format!(
            "RLE cannot encode {} values as {}",
            values.variant_name(),
            type_.name()
        ))),
    }
}

/// Decodes `count` BOOLEAN, INT32 or INT64 values.
pub fn decode_values(
    type_: PhysicalType,
    cursor: &mut Cursor<'_>,
    count: usize,
    options: &CodecOptions<'_>,
) -> Result<ColumnValues<'static>> {
    let bit_width = bit_width(options)?;
    let disable_envelope = options.disable_envelope;
    Ok(match type_ {
        PhysicalType::Boolean => ColumnValues::Boolean(
            decode::<u32>(cursor, count, bit_width, disable_envelope)?
                .into_iter()
                .map(|v| v != 0)
                .collect(),
        ),
        PhysicalType::Int32 => ColumnValues::Int32(
            decode::<u32>(cursor, count, bit_width, disable_envelope)?
                .into_iter()
                .map(|v| v as i32)
                .collect(),
        ),
        PhysicalType::Int64 => ColumnValues::Int64(
            decode::<BigUint>(cursor, count, bit_width, disable_envelope)?
                .into_iter()
                .map(|v| {
                    v.to_u64()
                        .map(|v| v as i64)
                        .ok_or_else(|| rle_err!("value {} exceeds 64 bits", v))
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        other => {
            return Err(Error::UnsupportedType(format!(
                "RLE cannot decode {}",
                other.name()
            )))
        }
    })
}
