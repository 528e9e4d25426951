use crate::error::Error;
use crate::model::{OutputDocument, SchemaDocument};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

pub fn load_schema(path: &Path) -> Result<SchemaDocument, Error> {
    let content = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(err),
    })?;

    let schema: SchemaDocument = serde_yaml::from_str(&content)?;
    debug!(path = %path.display(), files = schema.file_count(), "Loaded schema");
    Ok(schema)
}

pub fn save_schema(schema: &SchemaDocument, path: &Path) -> Result<(), Error> {
    let content = serde_yaml::to_string(schema)?;
    write_file(path, content.as_bytes())?;
    info!(path = %path.display(), files = schema.file_count(), "Saved schema");
    Ok(())
}

pub fn save_output(output: &OutputDocument, path: &Path) -> Result<(), Error> {
    let content = serde_json::to_vec_pretty(output)?;
    write_file(path, &content)?;
    info!(
        path = %path.display(),
        records = output.metadata.record_count,
        "Saved output"
    );
    Ok(())
}

pub fn load_output(path: &Path) -> Result<OutputDocument, Error> {
    let content = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(err),
    })?;
    Ok(serde_json::from_slice(&content)?)
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
