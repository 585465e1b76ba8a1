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

use crate::errors::Result;

/// Returns the number of bits needed to represent `max`, the bit width used for
/// definition and repetition level streams.
#[inline]
pub fn get_bits_needed(max: u64) -> u32 {
    u64::BITS - max.leading_zeros()
}

#[inline]
pub fn ceil8(bits: usize) -> usize {
    bits / 8 + usize::from(bits % 8 != 0)
}

#[inline]
pub fn is_native_little_endian() -> bool {
    cfg!(target_endian = "little")
}

/// Appends `n` as an unsigned LEB128 varint.
pub fn encode_varint(mut n: u64, buf: &mut Vec<u8>) {
    while n >= 0x80 {
        buf.push((n as u8) | 0x80);
        n >>= 7;
    }
    buf.push(n as u8);
}

/// Decodes an unsigned LEB128 varint, returning (value, bytes_read).
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return Err(rle_err!("varint overflow"));
        }
    }
    Err(rle_err!("varint truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_needed() {
        assert_eq!(get_bits_needed(0), 0);
        assert_eq!(get_bits_needed(1), 1);
        assert_eq!(get_bits_needed(2), 2);
        assert_eq!(get_bits_needed(7), 3);
        assert_eq!(get_bits_needed(8), 4);
        assert_eq!(get_bits_needed(u64::MAX), 64);
    }

    #[test]
    fn test_varint() {
        let mut buf = vec![];
        encode_varint(300, &mut buf);
        assert_eq!(buf, vec![0xac, 0x02]);
        assert_eq!(decode_varint(&buf).unwrap(), (300, 2));

        assert!(decode_varint(&[0x80, 0x80]).is_err());
        assert!(decode_varint(&[]).is_err());
    }
}
