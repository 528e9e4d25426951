use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::model::{DataType, FieldInfo, OutputDocument, SchemaDocument, SheetEntry};
use crate::progress::{FileOutcome, Phase, ProgressReporter, SilentReporter};
use crate::transform::{check_required_fields, has_id_field, transform_rows, IdPolicy, ID_FIELD};
use crate::validate::validate_schema;
use crate::workbook::{Workbook, WorkbookReader};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct DataMaterializer<'a> {
    reader: &'a dyn WorkbookReader,
    id_policy: IdPolicy,
    reporter: &'a dyn ProgressReporter,
    cancel: CancellationToken,
}

impl<'a> DataMaterializer<'a> {
    pub fn new(reader: &'a dyn WorkbookReader, id_policy: IdPolicy) -> Self {
        Self {
            reader,
            id_policy,
            reporter: &SilentReporter,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reads every file in `schema` from `root` and collects typed records by
    /// class name. Files that cannot be read and sheets that no longer exist
    /// are logged and skipped.
    pub fn materialize(&self, schema: &SchemaDocument, root: &Path) -> Result<OutputDocument, Error> {
        validate_schema(schema)?;
        info!(folder = %root.display(), files = schema.file_count(), "Starting data generation");

        let mut output = OutputDocument::new(schema.version.clone());
        self.reporter.on_phase_start(Phase::Data, schema.file_count());
        let start = Instant::now();

        for (relative_path, file) in &schema.files {
            self.cancel.check()?;
            self.reporter.on_file_start(relative_path);

            let workbook = match self.reader.read_workbook(&root.join(relative_path)) {
                Ok(workbook) => workbook,
                Err(err) => {
                    warn!(file = %relative_path, "Failed to open spreadsheet, skipping: {}", err);
                    self.reporter.on_file_done(relative_path, FileOutcome::Skipped);
                    continue;
                }
            };

            let mut file_records = 0;
            for sheet in file.sheets.values() {
                file_records += self.materialize_sheet(&mut output, relative_path, sheet, &workbook)?;
            }

            debug!(file = %relative_path, records = file_records, "Extracted file");
            self.reporter.on_file_done(
                relative_path,
                FileOutcome::Extracted {
                    records: file_records,
                },
            );
        }

        output.metadata.file_count = schema.file_count();
        output.metadata.record_count = output.total_record_count();

        self.reporter
            .on_phase_complete(Phase::Data, start.elapsed().as_secs_f64());
        info!(
            classes = output.class_count(),
            records = output.metadata.record_count,
            "Data generation completed"
        );
        Ok(output)
    }

    fn materialize_sheet(
        &self,
        output: &mut OutputDocument,
        relative_path: &str,
        sheet: &SheetEntry,
        workbook: &Workbook,
    ) -> Result<usize, Error> {
        let Some(source) = workbook.sheet(&sheet.sheet_name) else {
            let err = Error::SheetMissing {
                file: relative_path.to_string(),
                sheet: sheet.sheet_name.clone(),
            };
            warn!("{}, skipping", err);
            return Ok(0);
        };

        let synthesize_id = !has_id_field(&sheet.data_class);
        if synthesize_id && self.id_policy == IdPolicy::Reject {
            return Err(Error::MissingIdentifier {
                file: relative_path.to_string(),
                sheet: sheet.sheet_name.clone(),
            });
        }

        let Some(table) = source.table(sheet.offset_header) else {
            warn!(
                file = relative_path,
                sheet = %sheet.sheet_name,
                offset_header = sheet.offset_header,
                "Header row is past the end of the sheet, skipping"
            );
            return Ok(0);
        };

        let records = transform_rows(
            table.rows,
            &table.header_index(),
            &sheet.data_class,
            synthesize_id,
            sheet.offset_header + 1,
        );
        check_required_fields(relative_path, &sheet.sheet_name, &records, &sheet.data_class);

        let class_name = if sheet.class_name.is_empty() {
            &sheet.sheet_name
        } else {
            &sheet.class_name
        };

        if !output.has_class(class_name) {
            let mut fields = Vec::with_capacity(sheet.data_class.len() + 1);
            if synthesize_id {
                fields.push(FieldInfo {
                    name: ID_FIELD.to_string(),
                    data_type: DataType::Int,
                });
            }
            fields.extend(sheet.data_class.iter().map(FieldInfo::from));
            output.register_class(class_name, fields);
        }

        let count = records.len();
        output.append_records(class_name, records);
        debug!(
            file = relative_path,
            sheet = %sheet.sheet_name,
            class = %class_name,
            records = count,
            "Extracted sheet"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldEntry, FileEntry};
    use crate::workbook::InMemoryReader;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sheet_entry(sheet: &str, class: &str, fields: &[(&str, DataType)]) -> SheetEntry {
        let mut entry = SheetEntry::new(sheet);
        entry.class_name = class.to_string();
        entry.data_class = fields
            .iter()
            .map(|(name, data_type)| FieldEntry::new(*name, *data_type))
            .collect();
        entry
    }

    fn add_file(schema: &mut SchemaDocument, path: &str, sheets: Vec<SheetEntry>) {
        schema.insert_file(
            path,
            FileEntry {
                file_name: path.to_string(),
                file_path: path.to_string(),
                checksum: String::new(),
                last_updated: Utc::now(),
                sheets: sheets
                    .into_iter()
                    .map(|s| (s.sheet_name.clone(), s))
                    .collect::<BTreeMap<_, _>>(),
            },
        );
    }

    fn root() -> &'static Path {
        Path::new("data")
    }

    #[test]
    fn test_classes_aggregate_across_files() {
        let reader = InMemoryReader::new()
            .with_sheet("data/a.xlsx", "People", &[&["Name"], &["ann"], &["bob"]])
            .with_sheet("data/b.xlsx", "Staff", &[&["Name", "Extra"], &["cy", "1"]]);

        let mut schema = SchemaDocument::new();
        add_file(&mut schema, "a.xlsx", vec![sheet_entry("People", "Person", &[("Name", DataType::String)])]);
        add_file(
            &mut schema,
            "b.xlsx",
            vec![sheet_entry(
                "Staff",
                "Person",
                &[("Name", DataType::String), ("Extra", DataType::Int)],
            )],
        );

        let output = DataMaterializer::new(&reader, IdPolicy::Synthesize)
            .materialize(&schema, root())
            .unwrap();

        assert_eq!(output.data["Person"].len(), 3);
        // The first sheet seen defines the class layout.
        assert_eq!(output.schema["Person"].len(), 2);
        assert_eq!(output.schema["Person"][0].name, "Id");
        assert_eq!(output.data["Person"][2]["Id"], json!(0));
        assert_eq!(output.metadata.record_count, 3);
        assert_eq!(output.metadata.file_count, 2);
    }

    #[test]
    fn test_missing_sheet_and_file_are_skipped() {
        let reader = InMemoryReader::new().with_sheet("data/a.xlsx", "Other", &[&["Id"], &["1"]]);

        let mut schema = SchemaDocument::new();
        add_file(&mut schema, "a.xlsx", vec![sheet_entry("Gone", "Gone", &[("Id", DataType::Int)])]);
        add_file(&mut schema, "b.xlsx", vec![sheet_entry("S", "S", &[("Id", DataType::Int)])]);

        let output = DataMaterializer::new(&reader, IdPolicy::Synthesize)
            .materialize(&schema, root())
            .unwrap();
        assert_eq!(output.total_record_count(), 0);
        assert_eq!(output.class_count(), 0);
    }

    #[test]
    fn test_header_offset_is_honoured() {
        let reader = InMemoryReader::new().with_sheet(
            "data/a.xlsx",
            "S",
            &[&["Report title"], &["Id", "Qty"], &["1", "5"]],
        );
        let mut entry = sheet_entry("S", "S", &[("Id", DataType::Int), ("Qty", DataType::Int)]);
        entry.offset_header = 2;
        let mut schema = SchemaDocument::new();
        add_file(&mut schema, "a.xlsx", vec![entry]);

        let output = DataMaterializer::new(&reader, IdPolicy::Synthesize)
            .materialize(&schema, root())
            .unwrap();
        assert_eq!(
            serde_json::Value::Object(output.data["S"][0].clone()),
            json!({"Id": 1, "Qty": 5})
        );
    }

    #[test]
    fn test_reject_policy_requires_id() {
        let reader = InMemoryReader::new().with_sheet("data/a.xlsx", "S", &[&["Name"], &["x"]]);
        let mut schema = SchemaDocument::new();
        add_file(&mut schema, "a.xlsx", vec![sheet_entry("S", "S", &[("Name", DataType::String)])]);

        let result = DataMaterializer::new(&reader, IdPolicy::Reject).materialize(&schema, root());
        assert!(matches!(result, Err(Error::MissingIdentifier { .. })));
    }

    #[test]
    fn test_reject_policy_still_skips_missing_sheet() {
        let reader = InMemoryReader::new().with_sheet("data/a.xlsx", "Renamed", &[&["Name"], &["x"]]);
        let mut schema = SchemaDocument::new();
        add_file(&mut schema, "a.xlsx", vec![sheet_entry("S", "S", &[("Name", DataType::String)])]);

        let output = DataMaterializer::new(&reader, IdPolicy::Reject)
            .materialize(&schema, root())
            .unwrap();
        assert_eq!(output.total_record_count(), 0);
        assert_eq!(output.class_count(), 0);
    }

    #[test]
    fn test_cancelled_before_first_file() {
        let reader = InMemoryReader::new().with_sheet("data/a.xlsx", "S", &[&["Id"], &["1"]]);
        let mut schema = SchemaDocument::new();
        add_file(&mut schema, "a.xlsx", vec![sheet_entry("S", "S", &[("Id", DataType::Int)])]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = DataMaterializer::new(&reader, IdPolicy::Synthesize)
            .with_cancellation(cancel)
            .materialize(&schema, root());
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
