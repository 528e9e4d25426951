use crate::error::Error;
use crate::model::{FileEntry, SchemaDocument, SheetEntry};

/// Rejects a schema that cannot be materialized safely. The first problem
/// found is reported with its file, sheet and field.
pub fn validate_schema(schema: &SchemaDocument) -> Result<(), Error> {
    if schema.version.trim().is_empty() {
        return Err(Error::validation("schema version is required"));
    }

    if schema.files.is_empty() {
        return Err(Error::validation("schema must contain at least one file"));
    }

    for (relative_path, file) in &schema.files {
        validate_file(relative_path, file)?;
    }

    Ok(())
}

fn validate_file(relative_path: &str, file: &FileEntry) -> Result<(), Error> {
    if file.file_name.trim().is_empty() {
        return Err(Error::validation(format!(
            "file name is required for file: {}",
            relative_path
        )));
    }

    if file.sheets.is_empty() {
        return Err(Error::validation(format!(
            "file must contain at least one sheet: {}",
            relative_path
        )));
    }

    for (sheet_key, sheet) in &file.sheets {
        validate_sheet(relative_path, sheet_key, sheet)?;
    }

    Ok(())
}

fn validate_sheet(relative_path: &str, sheet_key: &str, sheet: &SheetEntry) -> Result<(), Error> {
    if sheet.sheet_name.trim().is_empty() {
        return Err(Error::validation(format!(
            "sheet name is required for sheet: {} in file: {}",
            sheet_key, relative_path
        )));
    }

    if sheet.class_name.trim().is_empty() {
        return Err(Error::validation(format!(
            "class name is required for sheet: {} in file: {}",
            sheet_key, relative_path
        )));
    }

    if sheet.offset_header < 1 {
        return Err(Error::validation(format!(
            "header offset must be at least 1 for sheet: {} in file: {}",
            sheet_key, relative_path
        )));
    }

    for (index, field) in sheet.data_class.iter().enumerate() {
        if field.name.trim().is_empty() {
            return Err(Error::validation(format!(
                "field name is required for field {} in sheet: {}, file: {}",
                index, sheet_key, relative_path
            )));
        }
    }

    Ok(())
}
