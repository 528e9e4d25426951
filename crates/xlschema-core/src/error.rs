use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Schema document error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Output document error: {0}")]
    Json(#[from] serde_json::Error),

    /// A spreadsheet could not be opened or read.
    #[error("Failed to read spreadsheet {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Sheet '{sheet}' not found in {file}")]
    SheetMissing { file: String, sheet: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },

    #[error("Sheet '{sheet}' in {file} has no 'Id' field")]
    MissingIdentifier { file: String, sheet: String },

    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    #[error("No spreadsheet files found in {folder}")]
    NoWorkbooks { folder: PathBuf },

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::SchemaValidation {
            message: message.into(),
        }
    }
}
