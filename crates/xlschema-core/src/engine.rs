use crate::cancel::CancellationToken;
use crate::config::AppConfig;
use crate::error::Error;
use crate::materialize::DataMaterializer;
use crate::merge;
use crate::model::{OutputDocument, SchemaDocument, SchemaStatistics};
use crate::progress::ProgressReporter;
use crate::sync::{ChangeReport, SchemaSynchronizer, SyncSummary};
use crate::validate::validate_schema;
use crate::workbook::{CalamineReader, WorkbookReader};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Single entry point for the command line: wires configuration, the
/// spreadsheet reader and cancellation into each pipeline.
pub struct SchemaEngine {
    config: AppConfig,
    reader: Arc<dyn WorkbookReader>,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct GenerateResult {
    pub schema: SchemaDocument,
    pub summary: SyncSummary,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct UpdateResult {
    pub summary: SyncSummary,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct DataResult {
    pub output: OutputDocument,
    pub duration: Duration,
}

impl SchemaEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            reader: Arc::new(CalamineReader),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn WorkbookReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn generate_schema(
        &self,
        folder: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<GenerateResult, Error> {
        let start = Instant::now();
        let (mut schema, summary) = self.synchronizer(reporter).generate(folder)?;
        schema.metadata.author = self.config.author.clone();
        let duration = start.elapsed();

        debug!("Generate completed in {:.2}s", duration.as_secs_f64());
        Ok(GenerateResult {
            schema,
            summary,
            duration,
        })
    }

    pub fn update_schema(
        &self,
        schema: &mut SchemaDocument,
        folder: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<UpdateResult, Error> {
        let start = Instant::now();
        let summary = self.synchronizer(reporter).update(schema, folder)?;
        let duration = start.elapsed();

        debug!("Update completed in {:.2}s", duration.as_secs_f64());
        Ok(UpdateResult { summary, duration })
    }

    pub fn detect_changes(&self, schema: &SchemaDocument, folder: &Path) -> Result<ChangeReport, Error> {
        let report = SchemaSynchronizer::new(self.reader.as_ref(), self.config.sync_options())
            .detect_changes(schema, folder)?;
        info!(
            new = report.new.len(),
            changed = report.changed.len(),
            unchanged = report.unchanged.len(),
            removed = report.removed.len(),
            "Change detection completed"
        );
        Ok(report)
    }

    pub fn generate_data(
        &self,
        schema: &SchemaDocument,
        folder: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<DataResult, Error> {
        let start = Instant::now();
        let output = DataMaterializer::new(self.reader.as_ref(), self.config.missing_id)
            .with_reporter(reporter)
            .with_cancellation(self.cancel.clone())
            .materialize(schema, folder)?;
        let duration = start.elapsed();

        debug!("Data generation completed in {:.2}s", duration.as_secs_f64());
        Ok(DataResult { output, duration })
    }

    pub fn merge_schemas(
        &self,
        base: &SchemaDocument,
        additional: &SchemaDocument,
    ) -> Result<SchemaDocument, Error> {
        merge::merge_schemas(base, additional)
    }

    /// Validates the schema and returns its statistics when it passes.
    pub fn validate(&self, schema: &SchemaDocument) -> Result<SchemaStatistics, Error> {
        validate_schema(schema)?;
        Ok(schema.statistics())
    }

    fn synchronizer<'a>(&'a self, reporter: &'a dyn ProgressReporter) -> SchemaSynchronizer<'a> {
        SchemaSynchronizer::new(self.reader.as_ref(), self.config.sync_options())
            .with_reporter(reporter)
            .with_cancellation(self.cancel.clone())
    }
}
