use std::borrow::Cow;

use dremel_columnar::encodings::{decode_values, encode_values, rle};
use dremel_columnar::types::{ConvertedType, PhysicalType};
use dremel_columnar::{CodecOptions, ColumnValues, Compression, Cursor, Encoding, Error};

fn rle_options(bit_width: u32) -> CodecOptions<'static> {
    CodecOptions::default()
        .with_bit_width(bit_width)
        .with_disable_envelope(true)
}

fn roundtrip(type_: PhysicalType, encoding: Encoding, values: ColumnValues<'_>, options: &CodecOptions<'_>) {
    let buf = encode_values(type_, encoding, &values, options).unwrap();
    let mut cursor = Cursor::new(&buf);
    let decoded = decode_values(type_, encoding, &mut cursor, values.len(), options).unwrap();
    assert_eq!(decoded, values);
    assert!(cursor.is_empty());
}

#[test]
fn test_rle_mixed_runs() {
    let mut values: Vec<i32> = (0..8).collect();
    values.extend([4; 8]);
    values.extend(0..8);
    let values = ColumnValues::Int32(values);

    let options = rle_options(3);
    let buf = encode_values(PhysicalType::Int32, Encoding::RLE, &values, &options).unwrap();
    assert_eq!(
        buf,
        vec![0x03, 0x88, 0xc6, 0xfa, 0x10, 0x04, 0x03, 0x88, 0xc6, 0xfa]
    );
    roundtrip(PhysicalType::Int32, Encoding::RLE, values, &options);
}

#[test]
fn test_rle_int64_44_bits() {
    let values = ColumnValues::Int64((0..4).map(|i| 8796093022208 + i).collect());
    let options = rle_options(44);
    let buf = encode_values(PhysicalType::Int64, Encoding::RLE, &values, &options).unwrap();

    let mut expected = vec![
        0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, 0x80, 0x02, 0x00, 0x00,
        0x00, 0x00, 0x38, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00,
    ];
    expected.resize(45, 0);
    assert_eq!(buf, expected);
    roundtrip(PhysicalType::Int64, Encoding::RLE, values, &options);
}

#[test]
fn test_rle_int64_63_bits() {
    let base = 1i64 << 62;
    let values = ColumnValues::Int64((0..4).map(|i| base + i).collect());
    let options = rle_options(63);
    let buf = encode_values(PhysicalType::Int64, Encoding::RLE, &values, &options).unwrap();

    assert_eq!(buf.len(), 64);
    assert_eq!(buf[0], 0x03);
    assert_eq!(&buf[1..9], &[0, 0, 0, 0, 0, 0, 0, 0xc0]);
    assert!(buf[33..].iter().all(|b| *b == 0));
    roundtrip(PhysicalType::Int64, Encoding::RLE, values, &options);
}

#[test]
fn test_rle_boolean() {
    let values = ColumnValues::Boolean(vec![true, false, true]);
    let options = rle_options(1);
    let buf = encode_values(PhysicalType::Boolean, Encoding::RLE, &values, &options).unwrap();
    assert_eq!(buf, vec![0x03, 0x05]);
    roundtrip(PhysicalType::Boolean, Encoding::RLE, values, &options);
}

#[test]
fn test_rle_options() {
    let values = ColumnValues::Int32(vec![1, 2]);
    assert!(matches!(
        encode_values(PhysicalType::Int32, Encoding::RLE, &values, &CodecOptions::default()),
        Err(Error::MissingOption { option: "bitWidth", .. })
    ));
    let values = ColumnValues::Double(vec![1.0]);
    assert!(matches!(
        encode_values(PhysicalType::Double, Encoding::RLE, &values, &rle_options(8)),
        Err(Error::UnsupportedType(_))
    ));
}

#[test]
fn test_sequential_decodes_share_a_cursor() {
    let mut buf = rle::encode_levels(&[0, 1, 1, 2], 2, false).unwrap();
    buf.extend(rle::encode_levels(&[3, 3, 3], 2, false).unwrap());
    buf.extend(
        encode_values(
            PhysicalType::ByteArray,
            Encoding::PLAIN,
            &ColumnValues::ByteArray(vec![Cow::Borrowed(&b"xyz"[..])]),
            &CodecOptions::default(),
        )
        .unwrap(),
    );

    let mut cursor = Cursor::new(&buf);
    assert_eq!(rle::decode_levels(&mut cursor, 4, 2, false).unwrap(), vec![0, 1, 1, 2]);
    assert_eq!(rle::decode_levels(&mut cursor, 3, 2, false).unwrap(), vec![3, 3, 3]);
    let values = decode_values(
        PhysicalType::ByteArray,
        Encoding::PLAIN,
        &mut cursor,
        1,
        &CodecOptions::default(),
    )
    .unwrap();
    assert_eq!(values, ColumnValues::ByteArray(vec![Cow::Borrowed(&b"xyz"[..])]));
    assert!(cursor.is_empty());
}

#[test]
fn test_plain_roundtrips() {
    let default = CodecOptions::default();
    roundtrip(
        PhysicalType::Int64,
        Encoding::PLAIN,
        ColumnValues::Int64(vec![i64::MIN, 0, i64::MAX]),
        &default,
    );
    roundtrip(
        PhysicalType::Float,
        Encoding::PLAIN,
        ColumnValues::Float(vec![1.5, -2.25, f32::MAX]),
        &default,
    );
    roundtrip(
        PhysicalType::Int96,
        Encoding::PLAIN,
        ColumnValues::Int96(vec![i64::MIN, -1, 0, i64::MAX]),
        &default,
    );

    let decimal = CodecOptions {
        original_type: Some(ConvertedType::Decimal),
        precision: Some(12),
        scale: Some(3),
        ..Default::default()
    };
    roundtrip(
        PhysicalType::Int64,
        Encoding::PLAIN,
        ColumnValues::Decimal(vec![1234.567, -0.001, 0.0, 98765432.1]),
        &decimal,
    );
}

#[test]
fn test_compression_names() {
    for (name, codec) in [
        ("UNCOMPRESSED", Compression::Uncompressed),
        ("GZIP", Compression::Gzip),
        ("SNAPPY", Compression::Snappy),
        ("BROTLI", Compression::Brotli),
        ("ZSTD", Compression::Zstd),
        ("LZ4", Compression::Lz4),
    ] {
        assert_eq!(name.parse::<Compression>().unwrap(), codec);
        assert_eq!(Compression::from_codec(u8::from(codec)).unwrap(), codec);
    }
    assert!("LZO".parse::<Compression>().is_err());
}
