use chrono::{TimeZone, Utc};
use dremel_columnar::read::{decode_record_buffer, materialize_records, ReadOptions};
use dremel_columnar::schema::{
    decimal_field, double_field, int_field, scalar_list_field, string_field, struct_list_field,
    timestamp_field, FieldDefinition,
};
use dremel_columnar::write::{encode_record_buffer, shred_records, WriteOptions};
use dremel_columnar::{
    Compression, Encoding, Error, Page, Record, RecordBuffer, Schema, SchemaDefinition, Value,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const WRITE_PAGE: usize = 128;

fn random_schema() -> Schema {
    let definition = SchemaDefinition::new()
        .field("id", int_field(64, false))
        .field("name", string_field(true))
        .field(
            "flag",
            FieldDefinition::leaf("BOOLEAN")
                .optional()
                .with_encoding(Encoding::RLE),
        )
        .field("score", double_field(false))
        .field("price", decimal_field(9, 2, true))
        .field("created", timestamp_field(true))
        .field("tags", scalar_list_field("UTF8", true))
        .field(
            "items",
            struct_list_field(
                SchemaDefinition::new()
                    .field(
                        "qty",
                        FieldDefinition::leaf("INT32")
                            .with_encoding(Encoding::RLE)
                            .with_type_length(16),
                    )
                    .field("sku", string_field(true)),
                true,
            ),
        )
        .field(
            "uid",
            FieldDefinition::leaf("UINT_64").with_compression(Compression::Zstd),
        );
    Schema::new(&definition).unwrap()
}

fn random_string(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..12);
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

fn list(elements: Vec<Value>) -> Value {
    let list = elements
        .into_iter()
        .map(|e| Value::Record(Record::new().with("element", e)))
        .collect::<Vec<_>>();
    Value::Record(Record::new().with("list", list))
}

fn create_random_records(size: usize, null_density: f32) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..size)
        .map(|i| {
            let mut record = Record::new()
                .with("id", i as i64)
                .with("score", rng.gen::<f64>())
                .with("uid", Value::from(rng.gen::<u64>()));

            if rng.gen::<f32>() > null_density {
                record.insert("name", random_string(&mut rng));
            }
            if rng.gen::<f32>() > null_density {
                record.insert("flag", rng.gen::<bool>());
            }
            if rng.gen::<f32>() > null_density {
                let cents = rng.gen_range(-99_999_999i64..99_999_999);
                record.insert("price", cents as f64 / 100.0);
            }
            if rng.gen::<f32>() > null_density {
                let millis = rng.gen_range(0..2_000_000_000_000i64);
                record.insert("created", Utc.timestamp_millis_opt(millis).unwrap());
            }
            if rng.gen::<f32>() > null_density {
                let tags = (0..rng.gen_range(1..4))
                    .map(|_| {
                        if rng.gen::<f32>() > null_density {
                            Value::from(random_string(&mut rng))
                        } else {
                            Value::Null
                        }
                    })
                    .collect();
                record.insert("tags", list(tags));
            }
            if rng.gen::<f32>() > null_density {
                let items = (0..rng.gen_range(1..5))
                    .map(|_| {
                        let mut item = Record::new().with("qty", rng.gen_range(0..u16::MAX as i32));
                        if rng.gen::<f32>() > null_density {
                            item.insert("sku", random_string(&mut rng));
                        }
                        Value::Record(item)
                    })
                    .collect();
                record.insert("items", list(items));
            }
            record
        })
        .collect()
}

fn test_write_read(records: &[Record]) {
    let compressions = vec![
        Compression::Uncompressed,
        Compression::Gzip,
        Compression::Snappy,
        Compression::Brotli,
        Compression::Zstd,
        Compression::Lz4,
    ];
    for compression in compressions {
        for max_page_size in [None, Some(WRITE_PAGE)] {
            let options = WriteOptions {
                compression,
                max_page_size,
                ..Default::default()
            };
            test_write_read_with_options(records, options);
        }
    }

    // per-column override
    let options = WriteOptions::default()
        .with_compression(Compression::Lz4)
        .with_column_compression("name", Compression::Snappy)
        .with_column_compression("items.list.element.qty", Compression::Gzip);
    test_write_read_with_options(records, options);
}

fn test_write_read_with_options(records: &[Record], options: WriteOptions) {
    let schema = random_schema();
    let mut buffer = RecordBuffer::new();
    shred_records(&schema, records, &mut buffer).unwrap();
    assert_eq!(buffer.row_count, records.len());

    let pages = encode_record_buffer(&schema, &buffer, &options).unwrap();
    for (node, column_pages) in schema.leaves().zip(&pages) {
        let expected = options.compression_for(node);
        assert!(column_pages.iter().all(|p| p.meta.compression == expected));
        let rows: u64 = column_pages.iter().map(|p| p.meta.num_rows).sum();
        assert_eq!(rows as usize, records.len());
        if let Some(size) = options.max_page_size {
            assert!(column_pages.iter().all(|p| p.meta.num_rows as usize <= size));
        }
    }

    let decoded = decode_record_buffer(&schema, &pages, &ReadOptions::default()).unwrap();
    assert_eq!(decoded.row_count, records.len());
    for (original, decoded) in buffer.columns.iter().zip(&decoded.columns) {
        assert_eq!(original.rlevels, decoded.rlevels);
        assert_eq!(original.dlevels, decoded.dlevels);
        assert_eq!(original.values, decoded.values);
    }

    let result = materialize_records(&schema, &decoded).unwrap();
    assert_eq!(result, records);
}

#[test]
fn test_random_nonull() {
    test_write_read(&create_random_records(1000, 0.0));
}

#[test]
fn test_random() {
    test_write_read(&create_random_records(1000, 0.3));
}

#[test]
fn test_uid_compression_from_schema() {
    let schema = random_schema();
    let uid = schema.find_field("uid").unwrap();
    assert_eq!(
        WriteOptions::default().compression_for(uid),
        Compression::Zstd
    );
}

#[test]
fn test_int96_timestamps() {
    let schema = Schema::from_json(r#"{ "ts": { "type": "INT96", "optional": true } }"#).unwrap();
    let records = vec![
        Record::new().with("ts", 0),
        Record::new(),
        Record::new().with("ts", 86_400_000_000_000i64),
    ];
    let mut buffer = RecordBuffer::new();
    shred_records(&schema, &records, &mut buffer).unwrap();
    let pages = encode_record_buffer(&schema, &buffer, &WriteOptions::default()).unwrap();

    let decoded = decode_record_buffer(&schema, &pages, &ReadOptions::default()).unwrap();
    assert_eq!(materialize_records(&schema, &decoded).unwrap(), records);

    // an INT96 integer of 0 has Julian day 0
    let options = ReadOptions {
        treat_int96_as_timestamp: true,
    };
    let decoded = decode_record_buffer(&schema, &pages, &options).unwrap();
    let result = materialize_records(&schema, &decoded).unwrap();
    let expected = Utc.timestamp_opt(-2_440_588 * 86_400, 0).unwrap();
    assert_eq!(result[0].get("ts"), Some(&Value::Timestamp(expected)));
    assert_eq!(result[1].get("ts"), Some(&Value::Null));
}

#[test]
fn test_int96_timestamp_records() {
    let schema = Schema::from_json(r#"{ "ts": { "type": "INT96", "optional": true } }"#).unwrap();
    let records: Vec<Record> = [0i64, 1_669_852_801_123, -86_400_000]
        .iter()
        .map(|millis| Record::new().with("ts", Utc.timestamp_millis_opt(*millis).unwrap()))
        .chain(std::iter::once(Record::new()))
        .collect();
    let mut buffer = RecordBuffer::new();
    shred_records(&schema, &records, &mut buffer).unwrap();
    let pages = encode_record_buffer(&schema, &buffer, &WriteOptions::default()).unwrap();

    let options = ReadOptions {
        treat_int96_as_timestamp: true,
    };
    let decoded = decode_record_buffer(&schema, &pages, &options).unwrap();
    assert_eq!(materialize_records(&schema, &decoded).unwrap(), records);
}

#[test]
fn test_corrupt_page() {
    let schema = Schema::from_json(r#"{ "x": { "type": "INT32", "repeated": true } }"#).unwrap();
    let records = vec![Record::new().with("x", vec![Value::from(1), Value::from(2)])];
    let mut buffer = RecordBuffer::new();
    shred_records(&schema, &records, &mut buffer).unwrap();
    let mut pages = encode_record_buffer(&schema, &buffer, &WriteOptions::default()).unwrap();

    let page = &pages[0][0];
    let mut body = page.buffer.to_vec();
    body.truncate(body.len() - 2);
    let mut meta = page.meta.clone();
    meta.length = body.len() as u64;
    meta.uncompressed_size = body.len() as u64;
    pages[0][0] = Page {
        meta,
        buffer: body.into(),
    };
    assert!(matches!(
        decode_record_buffer(&schema, &pages, &ReadOptions::default()),
        Err(Error::OutOfSpec(_))
    ));
}
