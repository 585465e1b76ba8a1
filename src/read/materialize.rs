//! Record materialization (Dremel), the inverse of shredding.
//!
//! Columns are processed independently. For each entry the repetition level
//! says at which depth a new element starts and the definition level says how
//! deep the path is present; no column needs another column's state.
use crate::buffer::{ColumnBuffer, RecordBuffer};
use crate::errors::Result;
use crate::schema::{Schema, SchemaNode};
use crate::types;
use crate::value::{Record, Value};

/// Rebuilds the records held in `buffer`.
pub fn materialize_records(schema: &Schema, buffer: &RecordBuffer<'_>) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(buffer.row_count);
    materialize_into(schema, buffer, &mut records)?;
    Ok(records)
}

/// Rebuilds the records held in `buffer`, appending them to `records`.
pub fn materialize_into(
    schema: &Schema,
    buffer: &RecordBuffer<'_>,
    records: &mut Vec<Record>,
) -> Result<()> {
    let base = records.len();
    for column in &buffer.columns {
        materialize_column(schema, column, base, records)?;
    }
    Ok(())
}

fn materialize_column(
    schema: &Schema,
    column: &ColumnBuffer<'_>,
    base: usize,
    records: &mut Vec<Record>,
) -> Result<()> {
    let field = schema.node(column.column);
    let leaf = field
        .leaf()
        .ok_or_else(|| general_err!("{} is not a leaf column", field.path_string()))?;
    let branch = schema.branch(column.column);

    if column.rlevels.len() < column.count || column.dlevels.len() < column.count {
        return Err(general_err!(
            "column {} declares {} entries but has {} rlevels and {} dlevels",
            field.path_string(),
            column.count,
            column.rlevels.len(),
            column.dlevels.len()
        ));
    }

    let mut rep_counters = vec![0usize; field.r_level_max as usize + 1];
    let mut next_value = 0;

    for i in 0..column.count {
        let rlevel = column.rlevels[i] as usize;
        let dlevel = column.dlevels[i];
        if rlevel > field.r_level_max as usize || dlevel > field.d_level_max {
            return Err(general_err!(
                "column {}: levels ({}, {}) exceed maximum ({}, {})",
                field.path_string(),
                rlevel,
                dlevel,
                field.r_level_max,
                field.d_level_max
            ));
        }

        rep_counters[rlevel] += 1;
        rep_counters[rlevel + 1..].iter_mut().for_each(|c| *c = 0);
        if rep_counters[0] == 0 {
            return Err(general_err!(
                "column {} does not start with a new record",
                field.path_string()
            ));
        }

        let value = if dlevel == field.d_level_max {
            let primitive = column.values.get(next_value).ok_or_else(|| {
                general_err!(
                    "column {} has fewer values than defined entries",
                    field.path_string()
                )
            })?;
            next_value += 1;
            types::from_primitive(leaf, primitive)?
        } else {
            Value::Null
        };

        let index = base + rep_counters[0] - 1;
        if records.len() <= index {
            records.resize_with(index + 1, Record::new);
        }
        materialize_field(&mut records[index], &branch, &rep_counters[1..], dlevel, value);
    }
    Ok(())
}

fn as_list(slot: &mut Value) -> &mut Vec<Value> {
    if !matches!(slot, Value::List(_)) {
        *slot = Value::List(vec![]);
    }
    match slot {
        Value::List(list) => list,
        _ => unreachable!(),
    }
}

fn as_record(slot: &mut Value) -> &mut Record {
    if !matches!(slot, Value::Record(_)) {
        *slot = Value::Record(Record::new());
    }
    match slot {
        Value::Record(record) => record,
        _ => unreachable!(),
    }
}

fn materialize_field(
    record: &mut Record,
    branch: &[&SchemaNode],
    rep_counters: &[usize],
    dlevel: u32,
    value: Value,
) {
    let node = branch[0];

    // the subtree below `node` is absent
    if dlevel < node.d_level_max {
        record.insert(node.name.as_str(), value);
        return;
    }

    let slot = record.entry(&node.name).or_insert(Value::Null);
    if branch.len() > 1 {
        let (child, rep_counters) = if node.is_repeated() {
            let list = as_list(slot);
            let index = rep_counters[0];
            if list.len() <= index {
                list.resize_with(index + 1, || Value::Record(Record::new()));
            }
            (as_record(&mut list[index]), &rep_counters[1..])
        } else {
            (as_record(slot), rep_counters)
        };
        materialize_field(child, &branch[1..], rep_counters, dlevel, value);
    } else if node.is_repeated() {
        let list = as_list(slot);
        let index = rep_counters[0];
        if list.len() <= index {
            list.resize(index + 1, Value::Null);
        }
        list[index] = value;
    } else {
        *slot = value;
    }
}
