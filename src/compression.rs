use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Compression codec applied to whole encoded pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compression {
    #[default]
    Uncompressed,
    /// GZIP (deflate with gzip framing)
    Gzip,
    /// Snappy raw format
    Snappy,
    Brotli,
    /// ZSTD
    Zstd,
    /// LZ4 block format
    Lz4,
}

impl Compression {
    pub fn is_none(&self) -> bool {
        matches!(self, Compression::Uncompressed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Compression::Uncompressed => "UNCOMPRESSED",
            Compression::Gzip => "GZIP",
            Compression::Snappy => "SNAPPY",
            Compression::Brotli => "BROTLI",
            Compression::Zstd => "ZSTD",
            Compression::Lz4 => "LZ4",
        }
    }

    pub fn from_codec(t: u8) -> Result<Self> {
        match t {
            0 => Ok(Compression::Uncompressed),
            1 => Ok(Compression::Snappy),
            2 => Ok(Compression::Gzip),
            4 => Ok(Compression::Brotli),
            6 => Ok(Compression::Zstd),
            7 => Ok(Compression::Lz4),
            other => Err(Error::Compression(format!(
                "Unknown compression codec {other}",
            ))),
        }
    }

    /// Decompresses `input` into `out_slice`, which must be sized to the
    /// uncompressed length.
    pub fn decompress(&self, input: &[u8], out_slice: &mut [u8]) -> Result<()> {
        match self {
            Compression::Gzip => decompress_gzip(input, out_slice),
            Compression::Snappy => decompress_snappy(input, out_slice),
            Compression::Brotli => decompress_brotli(input, out_slice),
            Compression::Zstd => decompress_zstd(input, out_slice),
            Compression::Lz4 => decompress_lz4(input, out_slice),
            Compression::Uncompressed => {
                if input.len() != out_slice.len() {
                    return Err(Error::Compression(format!(
                        "uncompressed page has {} bytes, expected {}",
                        input.len(),
                        out_slice.len()
                    )));
                }
                out_slice.copy_from_slice(input);
                Ok(())
            }
        }
    }

    /// Appends the compressed form of `input_buf` to `output_buf`, returning
    /// the number of bytes appended.
    pub fn compress(&self, input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<usize> {
        match self {
            Compression::Gzip => compress_gzip(input_buf, output_buf),
            Compression::Snappy => compress_snappy(input_buf, output_buf),
            Compression::Brotli => compress_brotli(input_buf, output_buf),
            Compression::Zstd => compress_zstd(input_buf, output_buf),
            Compression::Lz4 => compress_lz4(input_buf, output_buf),
            Compression::Uncompressed => {
                output_buf.extend_from_slice(input_buf);
                Ok(input_buf.len())
            }
        }
    }
}

impl From<Compression> for u8 {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Uncompressed => 0,
            Compression::Snappy => 1,
            Compression::Gzip => 2,
            Compression::Brotli => 4,
            Compression::Zstd => 6,
            Compression::Lz4 => 7,
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UNCOMPRESSED" => Ok(Compression::Uncompressed),
            "GZIP" => Ok(Compression::Gzip),
            "SNAPPY" => Ok(Compression::Snappy),
            "BROTLI" => Ok(Compression::Brotli),
            "ZSTD" => Ok(Compression::Zstd),
            "LZ4" => Ok(Compression::Lz4),
            other => Err(Error::Compression(format!(
                "invalid compression method: {other}"
            ))),
        }
    }
}

fn read_exact_to_end<R: Read>(mut reader: R, output_buf: &mut [u8]) -> Result<()> {
    reader.read_exact(output_buf)?;
    let mut extra = [0u8; 1];
    if reader.read(&mut extra)? != 0 {
        return Err(Error::Compression(
            "decompressed data is longer than expected".to_owned(),
        ));
    }
    Ok(())
}

pub fn decompress_gzip(input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
    read_exact_to_end(flate2::read::GzDecoder::new(input_buf), output_buf)
}

pub fn decompress_brotli(input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
    read_exact_to_end(brotli::Decompressor::new(input_buf, 4096), output_buf)
}

pub fn decompress_lz4(input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
    lz4::block::decompress_to_buffer(input_buf, Some(output_buf.len() as i32), output_buf)
        .map(|_| {})
        .map_err(|e| e.into())
}

pub fn decompress_zstd(input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
    zstd::bulk::decompress_to_buffer(input_buf, output_buf)
        .map(|_| {})
        .map_err(|e| e.into())
}

pub fn decompress_snappy(input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
    snap::raw::Decoder::new()
        .decompress(input_buf, output_buf)
        .map(|_| {})
        .map_err(|e| Error::Compression(format!("decompress snappy failed: {e}")))
}

pub fn compress_gzip(input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<usize> {
    let start = output_buf.len();
    let mut encoder = flate2::write::GzEncoder::new(output_buf, flate2::Compression::default());
    encoder.write_all(input_buf)?;
    let output_buf = encoder.finish()?;
    Ok(output_buf.len() - start)
}

pub fn compress_brotli(input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<usize> {
    let start = output_buf.len();
    {
        let mut encoder = brotli::CompressorWriter::new(&mut *output_buf, 4096, 9, 22);
        encoder.write_all(input_buf)?;
        encoder.flush()?;
    }
    Ok(output_buf.len() - start)
}

pub fn compress_lz4(input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<usize> {
    let start = output_buf.len();
    let bound = lz4::block::compress_bound(input_buf.len())?;
    output_buf.resize(start + bound, 0);
    let size = lz4::block::compress_to_buffer(input_buf, None, false, &mut output_buf[start..])?;
    output_buf.truncate(start + size);
    Ok(size)
}

pub fn compress_zstd(input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<usize> {
    let start = output_buf.len();
    let bound = zstd::zstd_safe::compress_bound(input_buf.len());
    output_buf.resize(start + bound, 0);
    let size = zstd::bulk::compress_to_buffer(input_buf, &mut output_buf[start..], 0)?;
    output_buf.truncate(start + size);
    Ok(size)
}

pub fn compress_snappy(input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<usize> {
    let start = output_buf.len();
    let bound = snap::raw::max_compress_len(input_buf.len());
    output_buf.resize(start + bound, 0);
    let size = snap::raw::Encoder::new()
        .compress(input_buf, &mut output_buf[start..])
        .map_err(|e| Error::Compression(format!("compress snappy failed: {e}")))?;
    output_buf.truncate(start + size);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Compression; 6] = [
        Compression::Uncompressed,
        Compression::Gzip,
        Compression::Snappy,
        Compression::Brotli,
        Compression::Zstd,
        Compression::Lz4,
    ];

    #[test]
    fn test_roundtrip_all_codecs() {
        let input: Vec<u8> = (0..4096u32).flat_map(|i| (i % 17).to_le_bytes()).collect();
        for c in ALL {
            let mut compressed = vec![0xAA];
            let size = c.compress(&input, &mut compressed).unwrap();
            assert_eq!(size, compressed.len() - 1, "{c:?}");

            let mut out = vec![0u8; input.len()];
            c.decompress(&compressed[1..], &mut out).unwrap();
            assert_eq!(out, input, "{c:?}");
        }
    }

    #[test]
    fn test_names() {
        for c in ALL {
            assert_eq!(c.name().parse::<Compression>().unwrap(), c);
            assert_eq!(Compression::from_codec(u8::from(c)).unwrap(), c);
        }
        assert!(matches!(
            "LZO".parse::<Compression>(),
            Err(Error::Compression(_))
        ));
    }
}
