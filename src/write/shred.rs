//! Record shredding (Dremel).
//!
//! Every leaf column receives one `(rlevel, dlevel)` pair per occurrence,
//! including occurrences where the leaf or one of its ancestors is absent, and
//! a value only when the leaf itself is defined. The levels alone describe the
//! record's shape, so each column can later be read back independently.
use crate::buffer::{ColumnBuffer, RecordBuffer};
use crate::errors::{Error, Result};
use crate::schema::{NodeId, NodeKind, Repetition, Schema};
use crate::types;
use crate::value::{Record, Value};

/// Shreds `record` into `buffer`, initializing the buffer on first use.
///
/// On error the buffer is left exactly as it was before the call.
pub fn shred_record(
    schema: &Schema,
    record: &Record,
    buffer: &mut RecordBuffer<'static>,
) -> Result<()> {
    if !buffer.is_initialized() {
        *buffer = RecordBuffer::for_schema(schema);
    }
    if buffer.columns.len() != schema.num_columns()
        || buffer
            .columns
            .iter()
            .zip(schema.leaf_ids())
            .any(|(c, id)| c.column != *id)
    {
        return Err(general_err!("record buffer was created for a different schema"));
    }

    let mut scratch: Vec<ColumnBuffer<'static>> = schema
        .leaves()
        .map(|leaf| ColumnBuffer::new(leaf, false))
        .collect();
    shred_fields(schema, schema.root_ids(), Some(record), &mut scratch, 0, 0)?;

    if let Some((column, _)) = buffer
        .columns
        .iter()
        .zip(&scratch)
        .find(|(column, shredded)| !column.values.can_extend(&shredded.values))
    {
        return Err(Error::UnsupportedType(format!(
            "column {} mixes INT96 integers and timestamps",
            schema.node(column.column).path_string()
        )));
    }
    for (column, shredded) in buffer.columns.iter_mut().zip(scratch) {
        column.append(shredded)?;
    }
    buffer.row_count += 1;
    buffer.page_row_count += 1;
    Ok(())
}

/// Shreds every record in order, stopping at the first failure. Records
/// before the failing one stay in the buffer.
pub fn shred_records<'r>(
    schema: &Schema,
    records: impl IntoIterator<Item = &'r Record>,
    buffer: &mut RecordBuffer<'static>,
) -> Result<()> {
    for record in records {
        shred_record(schema, record, buffer)?;
    }
    Ok(())
}

fn field_values<'v>(record: Option<&'v Record>, name: &str) -> &'v [Value] {
    match record.and_then(|r| r.get(name)) {
        None | Some(Value::Null) => &[],
        Some(Value::List(values)) => values,
        Some(value) => std::slice::from_ref(value),
    }
}

fn shred_fields(
    schema: &Schema,
    fields: &[NodeId],
    record: Option<&Record>,
    columns: &mut [ColumnBuffer<'static>],
    rlevel: u32,
    dlevel: u32,
) -> Result<()> {
    for &id in fields {
        let field = schema.node(id);
        let values = field_values(record, &field.name);

        if values.is_empty() && record.is_some() && field.repetition == Repetition::Required {
            return Err(Error::MissingRequiredField(field.path_string()));
        }
        if values.len() > 1 && field.repetition != Repetition::Repeated {
            return Err(Error::TooManyValuesForField(field.path_string()));
        }

        match &field.kind {
            NodeKind::Group { children, .. } => {
                if values.is_empty() {
                    shred_fields(schema, children, None, columns, rlevel, dlevel)?;
                    continue;
                }
                for (i, value) in values.iter().enumerate() {
                    let rlevel_i = if i == 0 { rlevel } else { field.r_level_max };
                    let nested = match value {
                        Value::Record(r) => r,
                        Value::Null => return Err(Error::MissingRequiredField(field.path_string())),
                        other => {
                            return Err(general_err!(
                                "expected a record for group {}, got {}",
                                field.path_string(),
                                other
                            ))
                        }
                    };
                    shred_fields(schema, children, Some(nested), columns, rlevel_i, field.d_level_max)?;
                }
            }
            NodeKind::Leaf(leaf) => {
                let index = schema
                    .column_index(id)
                    .ok_or_else(|| general_err!("{} is not a leaf column", field.path_string()))?;
                let column = &mut columns[index];
                if values.is_empty() {
                    column.push_null(rlevel, dlevel);
                    continue;
                }
                for (i, value) in values.iter().enumerate() {
                    if value.is_null() {
                        return Err(Error::MissingRequiredField(field.path_string()));
                    }
                    let rlevel_i = if i == 0 { rlevel } else { field.r_level_max };
                    let primitive = types::to_primitive(leaf, value)?;
                    column.push_value(primitive, rlevel_i, field.d_level_max)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::ColumnValues;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{
                "name": { "type": "UTF8" },
                "tags": { "type": "UTF8", "repeated": true },
                "stock": { "repeated": true, "fields": {
                    "quantity": { "type": "INT64", "repeated": true },
                    "warehouse": { "type": "UTF8" }
                }},
                "price": { "type": "DOUBLE", "optional": true }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_levels() {
        let schema = schema();
        let mut buffer = RecordBuffer::new();
        let record = Record::from_json(serde_json::json!({
            "name": "apples",
            "tags": ["red", "green"],
            "stock": [
                { "quantity": [10], "warehouse": "A" },
                { "quantity": [20, 30], "warehouse": "B" },
                { "warehouse": "C" }
            ]
        }))
        .unwrap();
        shred_record(&schema, &record, &mut buffer).unwrap();
        assert_eq!(buffer.row_count, 1);

        let tags = buffer.column(&schema, "tags").unwrap();
        assert_eq!(tags.rlevels, vec![0, 1]);
        assert_eq!(tags.dlevels, vec![1, 1]);

        let quantity = buffer.column(&schema, "stock.quantity").unwrap();
        assert_eq!(quantity.rlevels, vec![0, 1, 2, 1]);
        assert_eq!(quantity.dlevels, vec![2, 2, 2, 1]);
        assert_eq!(quantity.values, ColumnValues::Int64(vec![10, 20, 30]));
        assert_eq!(quantity.count, 4);

        let price = buffer.column(&schema, "price").unwrap();
        assert_eq!(price.rlevels, vec![0]);
        assert_eq!(price.dlevels, vec![0]);
        assert!(price.values.is_empty());
    }

    #[test]
    fn test_failed_record_leaves_buffer_untouched() {
        let schema = schema();
        let mut buffer = RecordBuffer::new();
        let good = Record::new().with("name", "a");
        shred_record(&schema, &good, &mut buffer).unwrap();

        // `name` is shredded before the bad `stock` element is reached
        let bad = Record::from_json(serde_json::json!({
            "name": "b",
            "stock": [{ "quantity": [1] }]
        }))
        .unwrap();
        assert!(matches!(
            shred_record(&schema, &bad, &mut buffer),
            Err(Error::MissingRequiredField(path)) if path == "stock.warehouse"
        ));

        assert_eq!(buffer.row_count, 1);
        let name = buffer.column(&schema, "name").unwrap();
        assert_eq!(name.count, 1);
        assert_eq!(name.values.len(), 1);
    }

    #[test]
    fn test_null_list_elements() {
        let schema = schema();
        let mut buffer = RecordBuffer::new();
        let records = [
            serde_json::json!({ "name": "a", "stock": [null] }),
            serde_json::json!({ "name": "a", "stock": [{ "warehouse": "W" }, null] }),
            serde_json::json!({ "name": "a", "tags": ["x", null] }),
        ];
        for record in records {
            let record = Record::from_json(record).unwrap();
            assert!(matches!(
                shred_record(&schema, &record, &mut buffer),
                Err(Error::MissingRequiredField(_))
            ));
        }

        let record = Record::from_json(serde_json::json!({
            "name": "a",
            "stock": [{ "warehouse": "W" }]
        }))
        .unwrap();
        shred_record(&schema, &record, &mut buffer).unwrap();
        let warehouse = buffer.column(&schema, "stock.warehouse").unwrap();
        assert_eq!(warehouse.dlevels, vec![1]);
        assert_eq!(warehouse.values.len(), 1);
    }

    #[test]
    fn test_int96_timestamps() {
        use chrono::{TimeZone, Utc};

        let schema = Schema::from_json(r#"{ "t": { "type": "INT96", "optional": true } }"#).unwrap();
        let ts = Utc.timestamp_millis_opt(1_669_852_801_000).unwrap();
        let mut buffer = RecordBuffer::new();
        shred_record(&schema, &Record::new(), &mut buffer).unwrap();
        shred_record(&schema, &Record::new().with("t", ts), &mut buffer).unwrap();
        assert_eq!(buffer.columns[0].values, ColumnValues::Timestamp(vec![ts]));

        assert!(matches!(
            shred_record(&schema, &Record::new().with("t", 5), &mut buffer),
            Err(Error::UnsupportedType(_))
        ));
        assert_eq!(buffer.row_count, 2);
        assert_eq!(buffer.columns[0].count, 2);
    }

    #[test]
    fn test_distinct_values() {
        let schema = schema();
        let mut buffer = RecordBuffer::new();
        for name in ["a", "b", "a"] {
            shred_record(&schema, &Record::new().with("name", name), &mut buffer).unwrap();
        }
        assert_eq!(
            buffer.column(&schema, "name").unwrap().num_distinct_values(),
            2
        );
        assert_eq!(buffer.row_count, 3);
        assert_eq!(buffer.page_row_count, 3);
    }
}
