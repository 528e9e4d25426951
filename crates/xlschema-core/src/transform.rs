use crate::infer::{parse_float, parse_int};
use crate::model::{DataType, FieldEntry, Record};
use crate::workbook::is_blank_row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Name of the identifier field every materialized class carries.
pub const ID_FIELD: &str = "Id";

/// What to do with a sheet whose fields do not include [`ID_FIELD`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// Add an integer `Id` numbered from 0 in row order.
    #[default]
    Synthesize,
    /// Refuse to materialize the sheet.
    Reject,
}

pub fn has_id_field(fields: &[FieldEntry]) -> bool {
    fields.iter().any(|field| field.name == ID_FIELD)
}

/// Converts `rows` into records keyed by field name.
///
/// Blank rows are skipped. A field whose name is not in `header_index` is
/// emitted with its default when it has one and left out otherwise. When
/// `synthesize_id` is set each record starts with an `Id` counting the
/// emitted records from 0. `first_row_number` is the 1-based sheet row of
/// `rows[0]` and only feeds log output.
pub fn transform_rows(
    rows: &[Vec<String>],
    header_index: &HashMap<String, usize>,
    fields: &[FieldEntry],
    synthesize_id: bool,
    first_row_number: usize,
) -> Vec<Record> {
    let mut records = Vec::with_capacity(rows.len());

    for (offset, row) in rows.iter().enumerate() {
        if is_blank_row(row) {
            continue;
        }
        let row_number = first_row_number + offset;

        let mut record = Record::new();
        if synthesize_id {
            record.insert(ID_FIELD.to_string(), Value::from(records.len()));
        }

        for field in fields {
            match header_index.get(&field.name) {
                Some(&column) => {
                    let raw = row.get(column).map(String::as_str).unwrap_or_default();
                    record.insert(field.name.clone(), coerce_cell(raw, field, row_number));
                }
                None => {
                    if let Some(default) = &field.default {
                        record.insert(field.name.clone(), default.clone());
                    }
                }
            }
        }

        records.push(record);
    }

    trace!(records = records.len(), "Transformed rows");
    records
}

/// Coerces one cell to the field's declared type. Never fails: an
/// unparseable number becomes the field default, or the trimmed text when
/// there is none.
pub fn coerce_cell(raw: &str, field: &FieldEntry, row_number: usize) -> Value {
    let value = raw.trim();

    let converted = match field.data_type {
        DataType::String => return Value::String(value.to_string()),
        DataType::Bool => return Value::Bool(is_truthy(value)),
        DataType::Int if value.is_empty() => return Value::from(0),
        DataType::Float if value.is_empty() => return Value::from(0.0),
        DataType::Int => parse_int(value).map(Value::from),
        DataType::Float => parse_float(value).map(Value::from),
    };

    converted.unwrap_or_else(|| {
        debug!(
            field = %field.name,
            value,
            data_type = %field.data_type,
            row = row_number,
            "Could not convert value, using fallback"
        );
        field
            .default
            .clone()
            .unwrap_or_else(|| Value::String(value.to_string()))
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

/// Logs a warning for every record that lacks a value for a required field
/// and returns how many were found.
pub fn check_required_fields(
    file: &str,
    sheet: &str,
    records: &[Record],
    fields: &[FieldEntry],
) -> usize {
    let mut missing = 0;
    for field in fields.iter().filter(|field| field.required) {
        for (index, record) in records.iter().enumerate() {
            let empty = match record.get(&field.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(text)) => text.is_empty(),
                Some(_) => false,
            };
            if empty {
                warn!(
                    file,
                    sheet,
                    field = %field.name,
                    record = index,
                    "Required field is missing a value"
                );
                missing += 1;
            }
        }
    }
    missing
}
