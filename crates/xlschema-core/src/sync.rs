use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::infer::DEFAULT_SAMPLE_LIMIT;
use crate::model::{FileEntry, SchemaDocument};
use crate::progress::{FileOutcome, Phase, ProgressReporter, SilentReporter};
use crate::reconcile::reconcile_sheet;
use crate::scanner::{self, FileFingerprint};
use crate::validate::validate_schema;
use crate::workbook::WorkbookReader;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub sample_limit: usize,
    pub ignore_patterns: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            ignore_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Changed,
    Unchanged,
    Removed,
}

/// Compares a stored entry with what is on disk now. Checksums decide when
/// both sides have one; otherwise a newer modification time means changed.
pub fn classify(existing: Option<&FileEntry>, current: &FileFingerprint) -> FileStatus {
    let Some(existing) = existing else {
        return FileStatus::New;
    };

    let changed = if !existing.checksum.is_empty() && !current.checksum.is_empty() {
        existing.checksum != current.checksum
    } else {
        existing.last_updated < current.last_modified
    };

    if changed {
        FileStatus::Changed
    } else {
        FileStatus::Unchanged
    }
}

/// Per-status file lists for a folder, computed without parsing any sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub new: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeReport {
    pub fn has_changes(&self) -> bool {
        !(self.new.is_empty() && self.changed.is_empty() && self.removed.is_empty())
    }

    fn push(&mut self, status: FileStatus, relative_path: String) {
        match status {
            FileStatus::New => self.new.push(relative_path),
            FileStatus::Changed => self.changed.push(relative_path),
            FileStatus::Unchanged => self.unchanged.push(relative_path),
            FileStatus::Removed => self.removed.push(relative_path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Builds and refreshes schemas from a folder of spreadsheets.
///
/// Files are parsed one at a time. A file is committed to the schema only
/// once all of its sheets were reconciled; unreadable files are logged and
/// skipped, leaving any previous entry in place.
pub struct SchemaSynchronizer<'a> {
    reader: &'a dyn WorkbookReader,
    options: SyncOptions,
    reporter: &'a dyn ProgressReporter,
    cancel: CancellationToken,
}

impl<'a> SchemaSynchronizer<'a> {
    pub fn new(reader: &'a dyn WorkbookReader, options: SyncOptions) -> Self {
        Self {
            reader,
            options,
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

    /// First-time build: every file is new and every field starts uncurated.
    pub fn generate(&self, root: &Path) -> Result<(SchemaDocument, SyncSummary), Error> {
        info!(folder = %root.display(), "Starting schema generation");

        let files = scanner::discover_workbooks(root, &self.options.ignore_patterns)?;
        if files.is_empty() {
            warn!(folder = %root.display(), "No spreadsheet files found in folder");
            return Err(Error::NoWorkbooks {
                folder: root.to_path_buf(),
            });
        }

        let mut schema = SchemaDocument::new();
        schema.metadata.description = format!("Generated schema from folder: {}", root.display());

        let summary = self.synchronize(&mut schema, root, &files)?;
        validate_schema(&schema)?;

        info!(
            files = schema.file_count(),
            sheets = schema.sheet_count(),
            "Schema generation completed"
        );
        Ok((schema, summary))
    }

    /// Rescans `root` and brings `schema` in line with it: new files are
    /// added, changed files rebuilt on top of their stored sheets, unchanged
    /// files left as they are, and vanished files removed.
    pub fn update(&self, schema: &mut SchemaDocument, root: &Path) -> Result<SyncSummary, Error> {
        info!(folder = %root.display(), "Starting schema update");

        let files = scanner::discover_workbooks(root, &self.options.ignore_patterns)?;
        let summary = self.synchronize(schema, root, &files)?;
        validate_schema(schema)?;

        info!(
            added = summary.added,
            updated = summary.updated,
            unchanged = summary.unchanged,
            removed = summary.removed,
            skipped = summary.skipped,
            total_files = schema.file_count(),
            "Schema update completed"
        );
        Ok(summary)
    }

    pub fn detect_changes(&self, schema: &SchemaDocument, root: &Path) -> Result<ChangeReport, Error> {
        let files = scanner::discover_workbooks(root, &self.options.ignore_patterns)?;
        let mut report = ChangeReport::default();

        for (relative, fingerprint) in self.fingerprint_phase(root, &files) {
            let status = match fingerprint {
                Ok(fingerprint) => classify(schema.file(&relative), &fingerprint),
                Err(err) => {
                    warn!(file = %relative, "Failed to check file, assuming changed: {}", err);
                    FileStatus::Changed
                }
            };
            report.push(status, relative);
        }

        let current: HashSet<&str> = files.iter().map(String::as_str).collect();
        for relative in schema.files.keys() {
            if !current.contains(relative.as_str()) {
                report.push(FileStatus::Removed, relative.clone());
            }
        }

        Ok(report)
    }

    fn synchronize(
        &self,
        schema: &mut SchemaDocument,
        root: &Path,
        files: &[String],
    ) -> Result<SyncSummary, Error> {
        let mut summary = SyncSummary::default();
        let fingerprints = self.fingerprint_phase(root, files);

        self.reporter.on_phase_start(Phase::Schema, files.len());
        let start = Instant::now();

        for (relative, fingerprint) in fingerprints {
            self.cancel.check()?;
            self.reporter.on_file_start(&relative);

            let fingerprint = match fingerprint {
                Ok(fingerprint) => fingerprint,
                Err(err) => {
                    warn!(file = %relative, "Failed to read file metadata: {}", err);
                    summary.skipped += 1;
                    self.reporter.on_file_done(&relative, FileOutcome::Skipped);
                    continue;
                }
            };

            let existing = schema.file(&relative);
            let status = classify(existing, &fingerprint);
            debug!(file = %relative, ?status, "Checked file");

            if status == FileStatus::Unchanged {
                summary.unchanged += 1;
                self.reporter.on_file_done(&relative, FileOutcome::Unchanged);
                continue;
            }

            let outcome = match self.build_file_entry(root, &fingerprint, existing) {
                Ok(Some(entry)) => {
                    schema.insert_file(relative.clone(), entry);
                    if status == FileStatus::New {
                        summary.added += 1;
                        FileOutcome::Added
                    } else {
                        summary.updated += 1;
                        FileOutcome::Updated
                    }
                }
                Ok(None) => {
                    warn!(file = %relative, "No sheet with a header row, skipping file");
                    summary.skipped += 1;
                    FileOutcome::Skipped
                }
                Err(err) => {
                    warn!(file = %relative, "Failed to process spreadsheet: {}", err);
                    summary.skipped += 1;
                    FileOutcome::Skipped
                }
            };
            self.reporter.on_file_done(&relative, outcome);
        }

        let current: HashSet<&str> = files.iter().map(String::as_str).collect();
        let vanished: Vec<String> = schema
            .files
            .keys()
            .filter(|relative| !current.contains(relative.as_str()))
            .cloned()
            .collect();
        for relative in vanished {
            schema.remove_file(&relative);
            summary.removed += 1;
            debug!(file = %relative, "Removed missing file from schema");
        }

        schema.touch();
        self.reporter
            .on_phase_complete(Phase::Schema, start.elapsed().as_secs_f64());

        Ok(summary)
    }

    fn fingerprint_phase(
        &self,
        root: &Path,
        files: &[String],
    ) -> Vec<(String, Result<FileFingerprint, Error>)> {
        self.reporter.on_phase_start(Phase::Fingerprint, files.len());
        let start = Instant::now();
        let fingerprints = scanner::fingerprint_all(root, files);
        self.reporter
            .on_phase_complete(Phase::Fingerprint, start.elapsed().as_secs_f64());
        fingerprints
    }

    fn build_file_entry(
        &self,
        root: &Path,
        fingerprint: &FileFingerprint,
        existing: Option<&FileEntry>,
    ) -> Result<Option<FileEntry>, Error> {
        let workbook = self
            .reader
            .read_workbook(&root.join(&fingerprint.relative_path))?;

        let mut sheets = BTreeMap::new();
        for sheet in &workbook.sheets {
            let existing_sheet = existing.and_then(|file| file.sheets.get(&sheet.name));
            match reconcile_sheet(sheet, existing_sheet, self.options.sample_limit) {
                Some(entry) => {
                    sheets.insert(sheet.name.clone(), entry);
                }
                None => debug!(
                    file = %fingerprint.relative_path,
                    sheet = %sheet.name,
                    "Skipping sheet without header row"
                ),
            }
        }

        if sheets.is_empty() {
            return Ok(None);
        }

        Ok(Some(FileEntry {
            file_name: fingerprint.file_name.clone(),
            file_path: fingerprint.relative_path.clone(),
            checksum: fingerprint.checksum.clone(),
            last_updated: fingerprint.last_modified,
            sheets,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::InMemoryReader;
    use chrono::{Duration, Utc};
    use std::fs;
    use tempfile::tempdir;

    /// Cancels the run as soon as any file finishes.
    struct CancelAfterFirstFile {
        cancel: CancellationToken,
    }

    impl ProgressReporter for CancelAfterFirstFile {
        fn on_file_done(&self, _relative_path: &str, _outcome: FileOutcome) {
            self.cancel.cancel();
        }
    }

    fn entry(checksum: &str, last_updated: chrono::DateTime<Utc>) -> FileEntry {
        FileEntry {
            file_name: "a.xlsx".to_string(),
            file_path: "a.xlsx".to_string(),
            checksum: checksum.to_string(),
            last_updated,
            sheets: BTreeMap::new(),
        }
    }

    fn print(checksum: &str, last_modified: chrono::DateTime<Utc>) -> FileFingerprint {
        FileFingerprint {
            relative_path: "a.xlsx".to_string(),
            file_name: "a.xlsx".to_string(),
            checksum: checksum.to_string(),
            last_modified,
        }
    }

    #[test]
    fn test_classify_new() {
        assert_eq!(classify(None, &print("x", Utc::now())), FileStatus::New);
    }

    #[test]
    fn test_classify_by_checksum_ignores_mtime() {
        let now = Utc::now();
        let later = now + Duration::hours(1);
        assert_eq!(
            classify(Some(&entry("x", now)), &print("x", later)),
            FileStatus::Unchanged
        );
        assert_eq!(
            classify(Some(&entry("x", later)), &print("y", now)),
            FileStatus::Changed
        );
    }

    #[test]
    fn test_classify_falls_back_to_mtime() {
        let now = Utc::now();
        let later = now + Duration::seconds(5);
        assert_eq!(
            classify(Some(&entry("", now)), &print("y", later)),
            FileStatus::Changed
        );
        assert_eq!(
            classify(Some(&entry("x", later)), &print("", now)),
            FileStatus::Unchanged
        );
        assert_eq!(
            classify(Some(&entry("", now)), &print("", now)),
            FileStatus::Unchanged
        );
    }

    #[test]
    fn test_change_report_has_changes() {
        let mut report = ChangeReport::default();
        report.push(FileStatus::Unchanged, "a.xlsx".to_string());
        assert!(!report.has_changes());
        report.push(FileStatus::Removed, "b.xlsx".to_string());
        assert!(report.has_changes());
    }

    #[test]
    fn test_cancel_between_files_keeps_committed_and_stored_entries() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        for name in ["a.xlsx", "b.xlsx", "c.xlsx"] {
            fs::write(root.join(name), format!("{name} v1")).unwrap();
        }

        let mut reader = InMemoryReader::new();
        for name in ["a.xlsx", "b.xlsx", "c.xlsx"] {
            reader = reader.with_sheet(root.join(name), "S", &[&["Id"], &["1"]]);
        }
        let (mut schema, _) = SchemaSynchronizer::new(&reader, SyncOptions::default())
            .generate(root)
            .unwrap();
        schema.remove_file("a.xlsx");
        let stored = schema.files.clone();

        // b and c change on disk and gain a column; a is new to the schema.
        let mut reader = InMemoryReader::new();
        for name in ["a.xlsx", "b.xlsx", "c.xlsx"] {
            fs::write(root.join(name), format!("{name} v2")).unwrap();
            reader = reader.with_sheet(root.join(name), "S", &[&["Id", "Extra"], &["1", "x"]]);
        }

        let cancel = CancellationToken::new();
        let reporter = CancelAfterFirstFile {
            cancel: cancel.clone(),
        };
        let result = SchemaSynchronizer::new(&reader, SyncOptions::default())
            .with_reporter(&reporter)
            .with_cancellation(cancel)
            .update(&mut schema, root);

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(
            schema.files.keys().cloned().collect::<Vec<_>>(),
            vec!["a.xlsx", "b.xlsx", "c.xlsx"]
        );
        assert!(schema.file("a.xlsx").unwrap().sheets["S"].has_field("Extra"));
        assert_eq!(schema.files["b.xlsx"], stored["b.xlsx"]);
        assert_eq!(schema.files["c.xlsx"], stored["c.xlsx"]);
    }
}
