use crate::infer::{column_values, infer_type};
use crate::model::{DataType, FieldEntry, SheetEntry};
use crate::workbook::WorkbookSheet;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Rebuilds a field list from the current header row.
///
/// Output order follows the header row. A field that already exists is
/// carried forward with its curated attributes; its stored type is kept
/// whenever it differs from what inference now yields or is anything other
/// than `string`. Unknown headers become new fields with the inferred type.
/// Stored fields whose header is gone are dropped. When a header repeats,
/// the last occurrence wins.
pub fn reconcile_fields(
    headers: &[String],
    rows: &[Vec<String>],
    existing: Option<&[FieldEntry]>,
    sample_limit: usize,
) -> Vec<FieldEntry> {
    let existing_by_name: HashMap<&str, &FieldEntry> = existing
        .unwrap_or_default()
        .iter()
        .map(|field| (field.name.as_str(), field))
        .collect();

    let mut fields: Vec<FieldEntry> = Vec::with_capacity(headers.len());

    for (column, header) in headers.iter().enumerate() {
        let name = header.trim();
        if name.is_empty() {
            continue;
        }

        let inferred = infer_type(column_values(rows, column), sample_limit);

        let field = match existing_by_name.get(name) {
            Some(stored) => {
                let mut field = (*stored).clone();
                let manually_modified =
                    stored.data_type != inferred || stored.data_type != DataType::String;
                if !manually_modified {
                    field.data_type = inferred;
                }
                trace!(field = name, stored = %stored.data_type, inferred = %inferred, "Carried field forward");
                field
            }
            None => {
                debug!(field = name, data_type = %inferred, "New field");
                FieldEntry::new(name, inferred)
            }
        };

        if let Some(position) = fields.iter().position(|f| f.name == field.name) {
            fields.remove(position);
        }
        fields.push(field);
    }

    if let Some(existing) = existing {
        for dropped in existing
            .iter()
            .filter(|stored| !fields.iter().any(|f| f.name == stored.name))
        {
            debug!(field = %dropped.name, "Dropped field no longer in header row");
        }
    }

    fields
}

/// Builds the schema entry for one sheet, reusing the curated class name,
/// header offset and validation rules of `existing`. Returns `None` when the
/// sheet has no header row at that offset.
pub fn reconcile_sheet(
    sheet: &WorkbookSheet,
    existing: Option<&SheetEntry>,
    sample_limit: usize,
) -> Option<SheetEntry> {
    let mut entry = SheetEntry::new(sheet.name.as_str());

    if let Some(existing) = existing {
        if !existing.class_name.is_empty() {
            entry.class_name = existing.class_name.clone();
        }
        entry.offset_header = existing.offset_header.max(1);
        entry.validation_rules = existing.validation_rules.clone();
    }

    let table = sheet.table(entry.offset_header)?;
    if !table.has_headers() {
        return None;
    }

    entry.data_class = reconcile_fields(
        &table.headers,
        table.rows,
        existing.map(|sheet| sheet.data_class.as_slice()),
        sample_limit,
    );
    entry.row_count = Some(table.non_empty_row_count());

    Some(entry)
}
