use dremel_columnar::read::materialize_records;
use dremel_columnar::write::{shred_record, shred_records};
use dremel_columnar::{Error, Record, RecordBuffer, Schema};
use serde_json::json;

fn document_schema() -> Schema {
    Schema::from_json(
        r#"{
            "DocId": { "type": "INT64" },
            "Links": { "optional": true, "fields": {
                "Backward": { "type": "INT64", "repeated": true },
                "Forward": { "type": "INT64", "repeated": true }
            }},
            "Name": { "repeated": true, "fields": {
                "Language": { "repeated": true, "fields": {
                    "Code": { "type": "UTF8" },
                    "Country": { "type": "UTF8", "optional": true }
                }},
                "Url": { "type": "UTF8", "optional": true }
            }}
        }"#,
    )
    .unwrap()
}

fn documents() -> Vec<Record> {
    vec![
        Record::from_json(json!({
            "DocId": 10,
            "Links": { "Forward": [20, 40, 60] },
            "Name": [
                {
                    "Language": [
                        { "Code": "en-us", "Country": "us" },
                        { "Code": "en" }
                    ],
                    "Url": "http://A"
                },
                { "Url": "http://B" },
                { "Language": [{ "Code": "en-gb", "Country": "gb" }] }
            ]
        }))
        .unwrap(),
        Record::from_json(json!({
            "DocId": 20,
            "Links": { "Backward": [10, 30], "Forward": [80] },
            "Name": [{ "Url": "http://C" }]
        }))
        .unwrap(),
    ]
}

fn levels(buffer: &RecordBuffer<'_>, schema: &Schema, path: &str) -> (Vec<u32>, Vec<u32>) {
    let column = buffer.column(schema, path).unwrap();
    (column.rlevels.clone(), column.dlevels.clone())
}

#[test]
fn test_schema_levels() {
    let schema = document_schema();
    let expected = [
        ("DocId", 0, 0),
        ("Links", 0, 1),
        ("Links.Backward", 1, 2),
        ("Links.Forward", 1, 2),
        ("Name", 1, 1),
        ("Name.Language", 2, 2),
        ("Name.Language.Code", 2, 2),
        ("Name.Language.Country", 2, 3),
        ("Name.Url", 1, 2),
    ];
    for (path, r, d) in expected {
        let node = schema.find_field(path).unwrap();
        assert_eq!((node.r_level_max, node.d_level_max), (r, d), "{path}");
    }
    assert_eq!(schema.num_columns(), 6);
}

#[test]
fn test_shred_documents() {
    let schema = document_schema();
    let mut buffer = RecordBuffer::new();
    shred_records(&schema, &documents(), &mut buffer).unwrap();
    assert_eq!(buffer.row_count, 2);

    assert_eq!(levels(&buffer, &schema, "DocId"), (vec![0, 0], vec![0, 0]));
    assert_eq!(
        levels(&buffer, &schema, "Links.Backward"),
        (vec![0, 0, 1], vec![1, 2, 2])
    );
    assert_eq!(
        levels(&buffer, &schema, "Links.Forward"),
        (vec![0, 1, 1, 0], vec![2, 2, 2, 2])
    );
    assert_eq!(
        levels(&buffer, &schema, "Name.Language.Code"),
        (vec![0, 2, 1, 1, 0], vec![2, 2, 1, 2, 1])
    );
    assert_eq!(
        levels(&buffer, &schema, "Name.Language.Country"),
        (vec![0, 2, 1, 1, 0], vec![3, 2, 1, 3, 1])
    );
    assert_eq!(
        levels(&buffer, &schema, "Name.Url"),
        (vec![0, 1, 1, 0], vec![2, 2, 1, 2])
    );

    let country = buffer.column(&schema, "Name.Language.Country").unwrap();
    assert_eq!(country.count, 5);
    assert_eq!(country.values.len(), 2);
}

#[test]
fn test_materialize_documents() {
    let schema = document_schema();
    let mut buffer = RecordBuffer::new();
    shred_records(&schema, &documents(), &mut buffer).unwrap();
    assert_eq!(materialize_records(&schema, &buffer).unwrap(), documents());
}

#[test]
fn test_cardinality_errors() {
    let schema = document_schema();
    let mut buffer = RecordBuffer::new();

    let missing = Record::from_json(json!({ "Name": [{ "Url": "x" }] })).unwrap();
    assert!(matches!(
        shred_record(&schema, &missing, &mut buffer),
        Err(Error::MissingRequiredField(path)) if path == "DocId"
    ));

    let twice = Record::from_json(json!({ "DocId": [1, 2] })).unwrap();
    assert!(matches!(
        shred_record(&schema, &twice, &mut buffer),
        Err(Error::TooManyValuesForField(path)) if path == "DocId"
    ));

    let links = Record::from_json(json!({ "DocId": 1, "Links": [{}, {}] })).unwrap();
    assert!(matches!(
        shred_record(&schema, &links, &mut buffer),
        Err(Error::TooManyValuesForField(path)) if path == "Links"
    ));

    let code = Record::from_json(json!({ "DocId": 1, "Name": [{ "Language": [{}] }] })).unwrap();
    assert!(matches!(
        shred_record(&schema, &code, &mut buffer),
        Err(Error::MissingRequiredField(path)) if path == "Name.Language.Code"
    ));

    assert_eq!(buffer.row_count, 0);
    assert!(buffer.columns.iter().all(|c| c.count == 0));
}

#[test]
fn test_domain_error() {
    let schema = Schema::from_json(r#"{ "age": { "type": "UINT_8" } }"#).unwrap();
    let mut buffer = RecordBuffer::new();
    let err = shred_record(&schema, &Record::new().with("age", 256), &mut buffer).unwrap_err();
    assert_eq!(err.to_string(), "UINT_8 value is out of bounds: 256");
}
