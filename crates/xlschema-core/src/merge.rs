use crate::error::Error;
use crate::model::{FileEntry, SchemaDocument};
use crate::validate::validate_schema;
use tracing::{debug, info};

/// Merges `additional` into a copy of `base`.
///
/// Files only in `additional` are added as they are. For a file in both,
/// sheets only in `additional` are added, and a shared sheet is replaced
/// when the `additional` copy has more fields. The file checksum and
/// timestamp come from `additional` when it was updated later.
///
/// The result is not symmetric: `base` is the starting point and wins ties,
/// so `merge_schemas(a, b)` and `merge_schemas(b, a)` generally differ.
pub fn merge_schemas(base: &SchemaDocument, additional: &SchemaDocument) -> Result<SchemaDocument, Error> {
    debug!(
        base_files = base.file_count(),
        additional_files = additional.file_count(),
        "Merging schemas"
    );

    let mut merged = base.clone();
    let mut merged_count = 0;

    for (relative_path, file) in &additional.files {
        match merged.files.get_mut(relative_path) {
            Some(existing) => {
                merge_file(existing, file);
                merged_count += 1;
            }
            None => {
                merged.files.insert(relative_path.clone(), file.clone());
            }
        }
    }

    merged.metadata.description = format!(
        "Merged schema - Base: {} files, Additional: {} files",
        base.file_count(),
        additional.file_count()
    );
    merged.touch();

    validate_schema(&merged)?;

    info!(
        total_files = merged.file_count(),
        merged_files = merged_count,
        "Schema merge completed"
    );
    Ok(merged)
}

fn merge_file(target: &mut FileEntry, additional: &FileEntry) {
    if additional.last_updated > target.last_updated {
        target.last_updated = additional.last_updated;
        target.checksum = additional.checksum.clone();
    }

    for (sheet_name, sheet) in &additional.sheets {
        match target.sheets.get(sheet_name) {
            Some(current) if current.data_class.len() >= sheet.data_class.len() => {}
            _ => {
                target.sheets.insert(sheet_name.clone(), sheet.clone());
            }
        }
    }
}
